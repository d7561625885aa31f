use tracing::debug;

use crate::contracts::{ReaderBinding, ReaderHandle, SeekerBinding, WriterBinding, WriterHandle};
use crate::error::StreamError;

const CHUNK: usize = 256;

impl<S> ReaderBinding<S> {
    /// Fill all of `buf` or fail with `EndOfStream`.
    pub fn read_exact(self, subject: &mut S, buf: &mut [u8]) -> Result<(), StreamError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(subject, &mut buf[filled..])? {
                0 => {
                    return Err(StreamError::EndOfStream {
                        needed: buf.len() - filled,
                    })
                }
                n => filled += n,
            }
        }
        Ok(())
    }

    pub fn read_byte(self, subject: &mut S) -> Result<u8, StreamError> {
        let mut byte = [0u8; 1];
        self.read_exact(subject, &mut byte)?;
        Ok(byte[0])
    }

    /// Append everything left in the stream to `out`.
    pub fn read_to_end(self, subject: &mut S, out: &mut Vec<u8>) -> Result<usize, StreamError> {
        let mut chunk = [0u8; CHUNK];
        let start = out.len();
        loop {
            match self.read(subject, &mut chunk)? {
                0 => return Ok(out.len() - start),
                n => out.extend_from_slice(&chunk[..n]),
            }
        }
    }

    /// Read and discard `count` bytes.
    pub fn skip(self, subject: &mut S, count: u64) -> Result<(), StreamError> {
        let mut chunk = [0u8; CHUNK];
        let mut left = count;
        while left > 0 {
            let want = left.min(CHUNK as u64) as usize;
            left -= want as u64;
            match self.read_exact(subject, &mut chunk[..want]) {
                Ok(()) => {}
                Err(StreamError::EndOfStream { needed }) => {
                    let rest = usize::try_from(left).unwrap_or(usize::MAX);
                    return Err(StreamError::EndOfStream {
                        needed: needed.saturating_add(rest),
                    });
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}

impl<S> WriterBinding<S> {
    pub fn write_all(self, subject: &mut S, bytes: &[u8]) -> Result<(), StreamError> {
        let mut written = 0;
        while written < bytes.len() {
            match self.write(subject, &bytes[written..])? {
                0 => return Err(StreamError::WriteZero),
                n => written += n,
            }
        }
        Ok(())
    }

    pub fn write_byte(self, subject: &mut S, byte: u8) -> Result<(), StreamError> {
        self.write_all(subject, &[byte])
    }
}

impl<S> SeekerBinding<S> {
    /// Move by `delta` from the current position; returns the new position.
    pub fn seek_by(self, subject: &mut S, delta: i64) -> Result<u64, StreamError> {
        let from = self.position(subject)?;
        let target = from
            .checked_add_signed(delta)
            .ok_or(StreamError::SeekOutOfRange { from, delta })?;
        self.seek_to(subject, target)?;
        Ok(target)
    }
}

/// Pump `source` into `sink` until the source is exhausted.
pub fn copy<R, W>(
    reader: ReaderBinding<R>,
    source: &mut R,
    writer: WriterBinding<W>,
    sink: &mut W,
) -> Result<u64, StreamError> {
    let mut chunk = [0u8; CHUNK];
    let mut total = 0u64;
    loop {
        let n = reader.read(source, &mut chunk)?;
        if n == 0 {
            break;
        }
        writer.write_all(sink, &chunk[..n])?;
        total += n as u64;
    }
    debug!(target: "conform_io", bytes = total, "stream copied");
    Ok(total)
}

/// [`ReaderBinding::read_exact`] through an erased handle.
pub fn read_exact_erased(reader: &mut ReaderHandle<'_>, buf: &mut [u8]) -> Result<(), StreamError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => {
                return Err(StreamError::EndOfStream {
                    needed: buf.len() - filled,
                })
            }
            n => filled += n,
        }
    }
    Ok(())
}

/// [`WriterBinding::write_all`] through an erased handle.
pub fn write_all_erased(writer: &mut WriterHandle<'_>, bytes: &[u8]) -> Result<(), StreamError> {
    let mut written = 0;
    while written < bytes.len() {
        match writer.write(&bytes[written..])? {
            0 => return Err(StreamError::WriteZero),
            n => written += n,
        }
    }
    Ok(())
}
