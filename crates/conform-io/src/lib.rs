//! Byte-stream contracts and the helpers built on them.
//!
//! `Reader`, `Writer` and `Seeker` are contracts, so any type with matching
//! `read`/`write`/`seek_to` members can be used through a binding or an
//! erased handle without implementing a trait. `MemoryStream` and
//! `FixedBufferStream` are the bundled subjects.

#![forbid(unsafe_code)]

mod contracts;
mod error;
mod fixed;
mod helpers;
mod memory;

pub use contracts::{
    Reader, ReaderBinding, ReaderBindingBuilder, ReaderHandle, ReaderVTable, Seeker,
    SeekerBinding, SeekerBindingBuilder, SeekerHandle, SeekerVTable, Writer, WriterBinding,
    WriterBindingBuilder, WriterHandle, WriterVTable,
};
pub use error::StreamError;
pub use fixed::FixedBufferStream;
pub use helpers::{copy, read_exact_erased, write_all_erased};
pub use memory::MemoryStream;
