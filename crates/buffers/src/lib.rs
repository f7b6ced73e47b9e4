//! Byte buffers shared by the OSON codec and the JSON print façade.
//!
//! - [`Writer`]: auto-growing big-endian writer with reserved-slot
//!   back-patching and an optional hard size limit.
//! - [`Reader`]: cursor reader over a borrowed slice. Every read is bounds
//!   checked so untrusted images surface as [`BufferError`] instead of panics.

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("unexpected end of buffer at {at}: wanted {wanted} more bytes")]
    Eof { at: usize, wanted: usize },
    #[error("buffer limit of {limit} bytes exceeded ({required} bytes required)")]
    LimitExceeded { limit: usize, required: usize },
    #[error("allocation of {requested} bytes failed")]
    OutOfMemory { requested: usize },
    #[error("invalid utf-8 at {at}")]
    InvalidUtf8 { at: usize },
}
