use conform::contract;

use crate::error::StreamError;

#[contract]
pub trait Reader {
    /// Fill the front of `buf`, returning how many bytes were read. `Ok(0)`
    /// with a non-empty `buf` means the stream is exhausted.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError>;
}

#[contract]
pub trait Writer {
    /// Write a prefix of `bytes`, returning its length.
    fn write(&mut self, bytes: &[u8]) -> Result<usize, StreamError>;
}

#[contract]
pub trait Seeker {
    fn seek_to(&mut self, pos: u64) -> Result<(), StreamError>;
    fn position(&self) -> Result<u64, StreamError>;
    fn end_position(&self) -> Result<u64, StreamError>;
}
