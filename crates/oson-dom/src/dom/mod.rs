//! Backend-independent document model.
//!
//! A [`Document`] owns every node it hands out. [`Node`] is a plain handle
//! (owner, slot and generation) that stays cheap to copy; using a handle after
//! its node was freed, or on a document that did not issue it, is reported as
//! an error, never undefined behavior.

mod backend;
mod dictionary;
mod document;
mod equal;
mod visit;
mod walker;

use std::sync::atomic::{AtomicU32, Ordering};

pub(crate) use backend::DomBackend;
pub use dictionary::{
    field_hash, FieldDictionary, FieldFlags, FieldName, SharedDictionary, MAX_FIELD_NAME,
};
pub(crate) use dictionary::NameTable;
pub use document::Document;
pub use equal::{copy, equals};
pub use visit::{Visit, VisitInfo};
pub use walker::DomEventSource;
pub(crate) use walker::WalkState;

/// Number of fields or elements walkers fetch per batch call.
pub const BATCH_SIZE: usize = 128;

/// Opaque node handle. Only meaningful for the document that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Node {
    pub(crate) owner: u32,
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl Node {
    pub(crate) fn new(owner: u32, slot: u32, generation: u32) -> Self {
        Self {
            owner,
            slot,
            generation,
        }
    }
}

static NEXT_OWNER: AtomicU32 = AtomicU32::new(1);

/// Fresh id for a node store; handles only resolve against the store whose
/// id they carry.
pub(crate) fn next_owner_id() -> u32 {
    NEXT_OWNER.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Scalar,
    Object,
    Array,
}

/// One object member as returned by the field listing calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameValuePair {
    pub name: FieldName,
    pub node: Node,
}

/// Orders members by key name (byte order).
pub fn sort_fields(fields: &mut [NameValuePair]) {
    fields.sort_by(|a, b| a.name.name().cmp(b.name.name()));
}
