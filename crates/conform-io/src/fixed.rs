use conform::subject;
use tracing::trace;

use crate::error::StreamError;

/// Stream over a buffer whose size never changes. Writes that find no room
/// at all fail with `NoSpaceLeft`; writes that find some room are partial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedBufferStream {
    buffer: Box<[u8]>,
    pos: usize,
}

impl FixedBufferStream {
    /// A zero-filled stream of `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_bytes(vec![0; capacity])
    }

    pub fn from_bytes(bytes: impl Into<Box<[u8]>>) -> Self {
        Self {
            buffer: bytes.into(),
            pos: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes before the cursor.
    pub fn written(&self) -> &[u8] {
        &self.buffer[..self.pos]
    }

    pub fn reset(&mut self) {
        self.pos = 0;
    }
}

#[subject]
impl FixedBufferStream {
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        let n = (self.buffer.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.buffer[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<usize, StreamError> {
        if bytes.is_empty() {
            return Ok(0);
        }
        let available = self.buffer.len() - self.pos;
        if available == 0 {
            trace!(requested = bytes.len(), "fixed buffer full");
            return Err(StreamError::NoSpaceLeft {
                requested: bytes.len(),
                available,
            });
        }
        let n = available.min(bytes.len());
        self.buffer[self.pos..self.pos + n].copy_from_slice(&bytes[..n]);
        self.pos += n;
        Ok(n)
    }

    pub fn seek_to(&mut self, pos: u64) -> Result<(), StreamError> {
        let end = self.buffer.len() as u64;
        if pos > end {
            return Err(StreamError::OutOfBounds { target: pos, end });
        }
        self.pos = pos as usize;
        Ok(())
    }

    pub fn position(&self) -> Result<u64, StreamError> {
        Ok(self.pos as u64)
    }

    pub fn end_position(&self) -> Result<u64, StreamError> {
        Ok(self.buffer.len() as u64)
    }
}
