//! Mutable in-memory backend: an arena of nodes with parent links, link
//! counts and a free list.

mod arena;
mod backend;
mod builder;

pub(crate) use backend::MemoryBackend;
