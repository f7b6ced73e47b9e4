//! JSON text as an event source.

mod input;
mod source;

pub use source::JsonTextSource;
