use conform::subject;

use crate::error::StreamError;

/// Growable in-memory stream with a single cursor shared by reads and
/// writes. Writes past the end extend the buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStream {
    buffer: Vec<u8>,
    pos: usize,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stream positioned at the start of `bytes`.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            buffer: bytes.into(),
            pos: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}

#[subject]
impl MemoryStream {
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        let available = &self.buffer[self.pos.min(self.buffer.len())..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        Ok(n)
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<usize, StreamError> {
        let end = self.pos + bytes.len();
        if end > self.buffer.len() {
            self.buffer.resize(end, 0);
        }
        self.buffer[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(bytes.len())
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_overwrites_then_extends() {
        let mut stream = MemoryStream::from_bytes(b"abcdef".to_vec());
        stream.seek_to(4).unwrap();
        assert_eq!(stream.write(b"XYZ").unwrap(), 3);
        assert_eq!(stream.as_bytes(), b"abcdXYZ");
        assert_eq!(stream.position().unwrap(), 7);
    }

    #[test]
    fn read_at_end_returns_zero() {
        let mut stream = MemoryStream::from_bytes(vec![1, 2]);
        let mut buf = [0u8; 4];
        assert_eq!(stream.read(&mut buf).unwrap(), 2);
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn seek_past_end_is_rejected() {
        let mut stream = MemoryStream::from_bytes(vec![0; 3]);
        assert_eq!(
            stream.seek_to(4),
            Err(StreamError::OutOfBounds { target: 4, end: 3 })
        );
        assert!(stream.seek_to(3).is_ok());
    }
}
