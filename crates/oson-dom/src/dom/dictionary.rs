//! Field-name dictionaries and the [`FieldName`] handles resolved against them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bitflags::bitflags;
use indexmap::IndexSet;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{DomError, Result};

/// Longest field name, in bytes, a dictionary accepts.
pub const MAX_FIELD_NAME: usize = 256;

static NEXT_TAG: AtomicU64 = AtomicU64::new(1);

/// FNV-1a over the UTF-8 bytes of a name.
pub fn field_hash(name: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for &b in name {
        hash ^= b as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// Interned field names with 1-based ids in insertion order.
///
/// Every dictionary carries a process-unique tag so a [`FieldName`] can
/// tell whether its cached id was issued here.
#[derive(Debug)]
pub struct FieldDictionary {
    tag: u64,
    names: IndexSet<Arc<str>>,
}

impl Default for FieldDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldDictionary {
    pub fn new() -> Self {
        Self {
            tag: NEXT_TAG.fetch_add(1, Ordering::Relaxed),
            names: IndexSet::new(),
        }
    }

    pub fn tag(&self) -> u64 {
        self.tag
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.names.get_index_of(name).map(|i| i as u32 + 1)
    }

    pub fn name_of(&self, id: u32) -> Option<&Arc<str>> {
        if id == 0 {
            return None;
        }
        self.names.get_index(id as usize - 1)
    }

    /// Returns the id of `name`, adding it when absent.
    pub fn intern(&mut self, name: &str) -> Result<u32> {
        if let Some(id) = self.id_of(name) {
            return Ok(id);
        }
        if name.len() > MAX_FIELD_NAME {
            return Err(DomError::malformed(
                0,
                format!("field name of {} bytes exceeds {MAX_FIELD_NAME}", name.len()),
            ));
        }
        if u32::try_from(self.names.len() + 1).is_err() {
            return Err(DomError::OutOfMemory("field dictionary is full".into()));
        }
        self.names
            .try_reserve(1)
            .map_err(|_| DomError::OutOfMemory("field dictionary growth failed".into()))?;
        let (index, _) = self.names.insert_full(Arc::from(name));
        Ok(index as u32 + 1)
    }

    /// Names in id order (id 1 first).
    pub fn names(&self) -> impl Iterator<Item = &Arc<str>> {
        self.names.iter()
    }

    /// Drops every name and issues a fresh tag, invalidating cached ids.
    pub fn clear(&mut self) {
        self.names.clear();
        self.tag = NEXT_TAG.fetch_add(1, Ordering::Relaxed);
    }
}

/// A dictionary shared by every document and image of one set, so that a
/// field id means the same name across all of them.
#[derive(Debug, Clone, Default)]
pub struct SharedDictionary(Arc<RwLock<FieldDictionary>>);

impl SharedDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, FieldDictionary> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, FieldDictionary> {
        self.0.write()
    }

    pub fn intern(&self, name: &str) -> Result<u32> {
        if let Some(id) = self.read().id_of(name) {
            return Ok(id);
        }
        self.write().intern(name)
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.read().id_of(name)
    }

    pub fn name_of(&self, id: u32) -> Option<Arc<str>> {
        self.read().name_of(id).cloned()
    }

    pub fn tag(&self) -> u64 {
        self.read().tag()
    }

    pub fn ptr_eq(&self, other: &SharedDictionary) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// The dictionary a document resolves field ids against: its own, or one
/// shared by a set of documents.
#[derive(Debug)]
pub(crate) enum NameTable {
    Local(FieldDictionary),
    Shared(SharedDictionary),
}

impl NameTable {
    pub(crate) fn new(shared: Option<&SharedDictionary>) -> Self {
        match shared {
            Some(dict) => NameTable::Shared(dict.clone()),
            None => NameTable::Local(FieldDictionary::new()),
        }
    }

    pub(crate) fn tag(&self) -> u64 {
        match self {
            NameTable::Local(dict) => dict.tag(),
            NameTable::Shared(dict) => dict.tag(),
        }
    }

    pub(crate) fn is_shared(&self) -> bool {
        matches!(self, NameTable::Shared(_))
    }

    pub(crate) fn id_of(&self, name: &str) -> Option<u32> {
        match self {
            NameTable::Local(dict) => dict.id_of(name),
            NameTable::Shared(dict) => dict.id_of(name),
        }
    }

    pub(crate) fn name_of(&self, id: u32) -> Option<Arc<str>> {
        match self {
            NameTable::Local(dict) => dict.name_of(id).cloned(),
            NameTable::Shared(dict) => dict.name_of(id),
        }
    }

    pub(crate) fn intern(&mut self, name: &str) -> Result<u32> {
        match self {
            NameTable::Local(dict) => dict.intern(name),
            NameTable::Shared(dict) => dict.intern(name),
        }
    }

    /// Id for `name`, trusting its cached id only when this table issued it.
    pub(crate) fn lookup(&self, name: &FieldName) -> Option<u32> {
        name.id_for(self.tag()).or_else(|| self.id_of(name.name()))
    }

    pub(crate) fn resolve(&self, id: u32) -> Option<FieldName> {
        let name = self.name_of(id)?;
        Some(FieldName::resolved(name, id, self.tag(), self.is_shared()))
    }

    /// Shared tables outlive any one document and are left alone.
    pub(crate) fn clear(&mut self) {
        if let NameTable::Local(dict) = self {
            dict.clear();
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldFlags: u8 {
        /// The name was looked up but is absent from the dictionary.
        const NOT_IN_SET = 0x01;
        /// Scratch marker for callers iterating key lists.
        const USED = 0x02;
    }
}

/// A field name with its hash and, once resolved, the id it has in one
/// dictionary. The cached id is only trusted by the dictionary that issued it.
#[derive(Debug, Clone)]
pub struct FieldName {
    name: Arc<str>,
    hash: u32,
    local_id: u32,
    set_id: u32,
    dictionary: u64,
    pub flags: FieldFlags,
}

impl FieldName {
    pub fn new(name: &str) -> Self {
        Self {
            hash: field_hash(name.as_bytes()),
            name: Arc::from(name),
            local_id: 0,
            set_id: 0,
            dictionary: 0,
            flags: FieldFlags::empty(),
        }
    }

    pub(crate) fn resolved(name: Arc<str>, id: u32, dictionary: u64, set_scoped: bool) -> Self {
        Self {
            hash: field_hash(name.as_bytes()),
            name,
            local_id: id,
            set_id: if set_scoped { id } else { 0 },
            dictionary,
            flags: FieldFlags::empty(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Id in the issuing dictionary; 0 when unresolved.
    pub fn local_id(&self) -> u32 {
        self.local_id
    }

    /// Id in a shared set dictionary; 0 outside set mode.
    pub fn set_id(&self) -> u32 {
        self.set_id
    }

    pub fn is_resolved(&self) -> bool {
        self.local_id != 0
    }

    /// Cached id if it was issued by the dictionary tagged `dictionary`.
    pub(crate) fn id_for(&self, dictionary: u64) -> Option<u32> {
        (self.local_id != 0 && self.dictionary == dictionary).then_some(self.local_id)
    }

    pub(crate) fn clear_ids(&mut self) {
        self.local_id = 0;
        self.set_id = 0;
        self.dictionary = 0;
    }
}

impl PartialEq for FieldName {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.name == other.name
    }
}

impl Eq for FieldName {}

impl From<&str> for FieldName {
    fn from(name: &str) -> Self {
        FieldName::new(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_one_based_and_stable() {
        let mut dict = FieldDictionary::new();
        assert_eq!(dict.intern("a").unwrap(), 1);
        assert_eq!(dict.intern("b").unwrap(), 2);
        assert_eq!(dict.intern("a").unwrap(), 1);
        assert_eq!(dict.name_of(2).map(|n| n.as_ref()), Some("b"));
        assert_eq!(dict.name_of(0), None);
        assert_eq!(dict.name_of(3), None);
    }

    #[test]
    fn tags_are_unique() {
        let a = FieldDictionary::new();
        let b = FieldDictionary::new();
        assert_ne!(a.tag(), b.tag());
        let mut c = FieldDictionary::new();
        let before = c.tag();
        c.clear();
        assert_ne!(before, c.tag());
    }

    #[test]
    fn long_names_are_rejected() {
        let mut dict = FieldDictionary::new();
        assert!(dict.intern(&"x".repeat(MAX_FIELD_NAME)).is_ok());
        assert!(dict.intern(&"y".repeat(MAX_FIELD_NAME + 1)).is_err());
    }

    #[test]
    fn shared_dictionary_is_shared() {
        let shared = SharedDictionary::new();
        let other = shared.clone();
        assert_eq!(shared.intern("k").unwrap(), 1);
        assert_eq!(other.id_of("k"), Some(1));
        assert!(shared.ptr_eq(&other));
    }

    #[test]
    fn cached_id_only_trusted_by_issuer() {
        let name = FieldName::resolved(Arc::from("a"), 3, 77, false);
        assert_eq!(name.id_for(77), Some(3));
        assert_eq!(name.id_for(78), None);
        assert_eq!(FieldName::new("a"), name);
        assert_eq!(FieldName::new("a").hash(), field_hash(b"a"));
    }
}
