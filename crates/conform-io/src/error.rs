#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("stream ended with {needed} more bytes needed")]
    EndOfStream { needed: usize },
    #[error("no space left: {requested} bytes requested, {available} available")]
    NoSpaceLeft { requested: usize, available: usize },
    #[error("write accepted zero bytes")]
    WriteZero,
    #[error("position {target} is past the end of the stream ({end})")]
    OutOfBounds { target: u64, end: u64 },
    #[error("seeking by {delta} from {from} leaves the addressable range")]
    SeekOutOfRange { from: u64, delta: i64 },
}
