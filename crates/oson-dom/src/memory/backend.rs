use indexmap::IndexMap;
use tracing::debug;

use super::arena::{Arena, Data, Record};
use super::builder::TreeBuilder;
use crate::config::{BackendKind, DomFlags, DomOptions, NumberEncoding};
use crate::dom::{DomBackend, FieldName, NameTable, NameValuePair, Node, NodeType};
use crate::event::EventSource;
use crate::scalar::ScalarValue;
use crate::{DomError, Result};

const CONSTRUCTOR_ONLY: &str = "constructor-only in-memory";

/// Mutable tree stored in an [`Arena`].
#[derive(Debug)]
pub(crate) struct MemoryBackend {
    arena: Arena,
    names: NameTable,
    root: Option<Node>,
    flags: DomFlags,
    numbers: NumberEncoding,
}

impl MemoryBackend {
    pub fn new(options: &DomOptions) -> Self {
        let recycle = !options.has(DomFlags::NO_FREE_LIST) && !options.has(DomFlags::PRESERVE_NODES);
        Self {
            arena: Arena::new(recycle),
            names: NameTable::new(options.dictionary.as_ref()),
            root: None,
            flags: options.flags,
            numbers: options.number_encoding(),
        }
    }

    pub fn number_encoding(&self) -> NumberEncoding {
        self.numbers
    }

    #[cfg(test)]
    pub fn live_nodes(&self) -> usize {
        self.arena.live()
    }

    fn object(&self, node: Node) -> Result<&IndexMap<u32, Node>> {
        match &self.arena.get(node)?.data {
            Data::Object(map) => Ok(map),
            _ => Err(DomError::invalid_state("node is not an object")),
        }
    }

    fn object_mut(&mut self, node: Node) -> Result<&mut IndexMap<u32, Node>> {
        match &mut self.arena.get_mut(node)?.data {
            Data::Object(map) => Ok(map),
            _ => Err(DomError::invalid_state("node is not an object")),
        }
    }

    fn array(&self, node: Node) -> Result<&Vec<Node>> {
        match &self.arena.get(node)?.data {
            Data::Array(items) => Ok(items),
            _ => Err(DomError::invalid_state("node is not an array")),
        }
    }

    fn array_mut(&mut self, node: Node) -> Result<&mut Vec<Node>> {
        match &mut self.arena.get_mut(node)?.data {
            Data::Array(items) => Ok(items),
            _ => Err(DomError::invalid_state("node is not an array")),
        }
    }

    fn constructor_only(&self, op: &'static str) -> Result<()> {
        if self.flags.contains(DomFlags::CONSTRUCTOR_ONLY) {
            return Err(DomError::unsupported(op, CONSTRUCTOR_ONLY));
        }
        Ok(())
    }

    fn allows_shared_nodes(&self) -> bool {
        self.flags.contains(DomFlags::MULTI_PARENT) && !self.flags.contains(DomFlags::CHECK_LINKS)
    }

    /// True when `target` sits in the subtree rooted at `node`.
    fn reaches(&self, node: Node, target: Node) -> Result<bool> {
        if !self.flags.contains(DomFlags::MULTI_PARENT) {
            let mut cursor = Some(target);
            while let Some(at) = cursor {
                if at == node {
                    return Ok(true);
                }
                cursor = self.arena.get(at)?.parent;
            }
            return Ok(false);
        }
        let mut stack = vec![node];
        while let Some(at) = stack.pop() {
            if at == target {
                return Ok(true);
            }
            stack.extend(self.arena.get(at)?.children());
        }
        Ok(false)
    }

    /// Records a new attach point for `child` under `parent` (`None` for
    /// the root slot), enforcing the link and cycle policies.
    fn attach(&mut self, parent: Option<Node>, child: Node) -> Result<()> {
        let links = self.arena.get(child)?.links;
        if links > 0 && !self.allows_shared_nodes() {
            return Err(DomError::integrity("node is already attached"));
        }
        if let Some(parent) = parent {
            if self.reaches(child, parent)? {
                return Err(DomError::integrity("attaching the node would create a cycle"));
            }
        }
        let record = self.arena.get_mut(child)?;
        if record.links == 0 {
            record.parent = parent;
        }
        record.links += 1;
        Ok(())
    }

    /// Drops one attach point of `child`; a node left with none is freed
    /// when `free` is set.
    fn detach(&mut self, parent: Option<Node>, child: Node, free: bool) -> Result<()> {
        let record = self.arena.get_mut(child)?;
        record.links = record.links.saturating_sub(1);
        if record.links == 0 || record.parent == parent {
            record.parent = None;
        }
        if record.links == 0 && free {
            self.free_subtree(child)?;
        }
        Ok(())
    }

    /// Releases `node` and every descendant no other attach point holds.
    pub(crate) fn free_subtree(&mut self, node: Node) -> Result<()> {
        let mut stack = vec![node];
        while let Some(at) = stack.pop() {
            let record: Record = self.arena.release(at)?;
            for child in record.children() {
                let child_record = self.arena.get_mut(child)?;
                child_record.links = child_record.links.saturating_sub(1);
                if child_record.parent == Some(at) {
                    child_record.parent = None;
                }
                if child_record.links == 0 {
                    stack.push(child);
                }
            }
        }
        Ok(())
    }

    /// Links a node the builder just created. No policy checks apply since
    /// the child has never been attached.
    pub(crate) fn adopt_field(&mut self, obj: Node, name: &str, child: Node) -> Result<()> {
        let id = self.names.intern(name)?;
        let map = self.object_mut(obj)?;
        map.try_reserve(1)
            .map_err(|_| DomError::OutOfMemory("object member table growth failed".into()))?;
        let previous = map.insert(id, child);
        let record = self.arena.get_mut(child)?;
        record.parent = Some(obj);
        record.links = 1;
        if let Some(previous) = previous {
            self.detach(Some(obj), previous, true)?;
        }
        Ok(())
    }

    pub(crate) fn adopt_item(&mut self, ary: Node, child: Node) -> Result<()> {
        let items = self.array_mut(ary)?;
        crate::error::reserve(items, 1)?;
        items.push(child);
        let record = self.arena.get_mut(child)?;
        record.parent = Some(ary);
        record.links = 1;
        Ok(())
    }

    pub(crate) fn alloc(&mut self, data: Data) -> Result<Node> {
        self.arena.alloc(data)
    }
}

impl DomBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::InMemory
    }

    fn root(&self) -> Option<Node> {
        self.root
    }

    fn node_type(&self, node: Node) -> Result<NodeType> {
        Ok(match self.arena.get(node)?.data {
            Data::Scalar(_) => NodeType::Scalar,
            Data::Object(_) => NodeType::Object,
            Data::Array(_) => NodeType::Array,
        })
    }

    fn scalar(&self, node: Node) -> Result<ScalarValue<'_>> {
        match &self.arena.get(node)?.data {
            Data::Scalar(value) => Ok(value.borrowed()),
            _ => Err(DomError::invalid_state("node is not a scalar")),
        }
    }

    fn num_fields(&self, obj: Node) -> Result<usize> {
        Ok(self.object(obj)?.len())
    }

    fn field(&self, obj: Node, name: &FieldName) -> Result<Option<Node>> {
        let map = self.object(obj)?;
        Ok(self
            .names
            .lookup(name)
            .and_then(|id| map.get(&id).copied()))
    }

    fn fields_batch(
        &self,
        obj: Node,
        start: usize,
        count: usize,
        out: &mut Vec<NameValuePair>,
    ) -> Result<()> {
        let map = self.object(obj)?;
        let end = start.saturating_add(count).min(map.len());
        if start >= end {
            return Ok(());
        }
        crate::error::reserve(out, end - start)?;
        for (id, node) in (start..end).filter_map(|i| map.get_index(i)) {
            let name = self
                .names
                .resolve(*id)
                .ok_or_else(|| DomError::invalid_state(format!("field id {id} has no name")))?;
            out.push(NameValuePair { name, node: *node });
        }
        Ok(())
    }

    fn array_size(&self, ary: Node) -> Result<usize> {
        Ok(self.array(ary)?.len())
    }

    fn array_element(&self, ary: Node, index: usize) -> Result<Node> {
        let items = self.array(ary)?;
        items.get(index).copied().ok_or(DomError::OutOfBounds {
            index,
            len: items.len(),
        })
    }

    fn array_batch(
        &self,
        ary: Node,
        start: usize,
        count: usize,
        out: &mut Vec<Node>,
    ) -> Result<()> {
        let items = self.array(ary)?;
        let end = start.saturating_add(count).min(items.len());
        if start < end {
            crate::error::reserve(out, end - start)?;
            out.extend_from_slice(&items[start..end]);
        }
        Ok(())
    }

    fn parent(&self, node: Node) -> Result<Option<Node>> {
        if self.flags.contains(DomFlags::MULTI_PARENT) {
            return Err(DomError::unsupported("get_parent", "multi-parent in-memory"));
        }
        Ok(self.arena.get(node)?.parent)
    }

    fn store_field_name(&mut self, name: &str) -> Result<FieldName> {
        let id = self.names.intern(name)?;
        self.names
            .resolve(id)
            .ok_or_else(|| DomError::invalid_state("interned field name vanished"))
    }

    fn dictionary_tag(&self) -> u64 {
        self.names.tag()
    }

    fn resolve_field_id(&self, id: u32) -> Option<FieldName> {
        self.names.resolve(id)
    }

    fn reset(&mut self) {
        let release = self.flags.contains(DomFlags::RECYCLE_ALL);
        debug!(live = self.arena.live(), release, "resetting in-memory document");
        self.arena.clear(release);
        self.names.clear();
        self.root = None;
    }

    fn load_events(&mut self, source: &mut dyn EventSource<'_>) -> Result<Node> {
        let node = TreeBuilder::new(self).build(source, false)?;
        if let Err(err) = self.set_root(Some(node)) {
            self.free_subtree(node)?;
            return Err(err);
        }
        debug!(live = self.arena.live(), "loaded in-memory document");
        Ok(node)
    }

    fn import_events(
        &mut self,
        source: &mut dyn EventSource<'_>,
        whole_item_only: bool,
    ) -> Result<Node> {
        TreeBuilder::new(self).build(source, whole_item_only)
    }

    fn set_root(&mut self, node: Option<Node>) -> Result<()> {
        if node == self.root {
            return Ok(());
        }
        if let Some(node) = node {
            self.attach(None, node)?;
        }
        if let Some(old) = self.root.take() {
            self.detach(None, old, true)?;
        }
        self.root = node;
        Ok(())
    }

    fn put_field(&mut self, obj: Node, name: &str, node: Node) -> Result<()> {
        self.object(obj)?;
        let existing = self.names.id_of(name).and_then(|id| {
            self.object(obj)
                .ok()
                .and_then(|map| map.get(&id).copied())
        });
        if existing == Some(node) {
            return Ok(());
        }
        if existing.is_some() {
            self.constructor_only("put_field replacing a member")?;
        }
        self.attach(Some(obj), node)?;
        let id = match self.names.intern(name) {
            Ok(id) => id,
            Err(err) => {
                self.detach(Some(obj), node, false)?;
                return Err(err);
            }
        };
        let map = self.object_mut(obj)?;
        if map.try_reserve(1).is_err() {
            self.detach(Some(obj), node, false)?;
            return Err(DomError::OutOfMemory(
                "object member table growth failed".into(),
            ));
        }
        let previous = map.insert(id, node);
        if let Some(previous) = previous {
            self.detach(Some(obj), previous, true)?;
        }
        Ok(())
    }

    fn put_item(&mut self, ary: Node, node: Node, pos: usize) -> Result<()> {
        let len = self.array(ary)?.len();
        if pos > len {
            return Err(DomError::OutOfBounds { index: pos, len });
        }
        self.attach(Some(ary), node)?;
        let items = self.array_mut(ary)?;
        if let Err(err) = crate::error::reserve(items, 1) {
            self.detach(Some(ary), node, false)?;
            return Err(err);
        }
        items.insert(pos, node);
        Ok(())
    }

    fn replace_item(&mut self, ary: Node, node: Node, pos: usize) -> Result<()> {
        self.constructor_only("replace_item")?;
        let items = self.array(ary)?;
        let previous = *items.get(pos).ok_or(DomError::OutOfBounds {
            index: pos,
            len: items.len(),
        })?;
        if previous == node {
            return Ok(());
        }
        self.attach(Some(ary), node)?;
        self.array_mut(ary)?[pos] = node;
        self.detach(Some(ary), previous, true)
    }

    fn remove_field(&mut self, obj: Node, name: &FieldName, free: bool) -> Result<Option<Node>> {
        self.constructor_only(if free { "delete_field" } else { "unlink_field" })?;
        let Some(id) = self.names.lookup(name) else {
            self.object(obj)?;
            return Ok(None);
        };
        let removed = self.object_mut(obj)?.shift_remove(&id);
        if let Some(child) = removed {
            self.detach(Some(obj), child, free)?;
        }
        Ok(removed)
    }

    fn rename_field(&mut self, obj: Node, from: &str, to: &str) -> Result<()> {
        self.constructor_only("rename_field")?;
        let from_id = self.names.id_of(from);
        let map = self.object(obj)?;
        let index = from_id
            .and_then(|id| map.get_index_of(&id))
            .ok_or_else(|| DomError::NotFound(format!("no field named {from:?}")))?;
        if from == to {
            return Ok(());
        }
        if self
            .names
            .id_of(to)
            .is_some_and(|id| map.contains_key(&id))
        {
            return Err(DomError::invalid_state(format!(
                "field {to:?} already exists"
            )));
        }
        let to_id = self.names.intern(to)?;
        let map = self.object_mut(obj)?;
        if let Some((_, node)) = map.shift_remove_index(index) {
            map.shift_insert(index, to_id, node);
        }
        Ok(())
    }

    fn remove_items(
        &mut self,
        ary: Node,
        start: usize,
        count: usize,
        free: bool,
    ) -> Result<Vec<Node>> {
        self.constructor_only(if free { "delete_item" } else { "unlink_item" })?;
        let items = self.array_mut(ary)?;
        let len = items.len();
        if start > len {
            return Err(DomError::OutOfBounds { index: start, len });
        }
        let end = start.saturating_add(count).min(len);
        let removed: Vec<Node> = items.drain(start..end).collect();
        for child in &removed {
            self.detach(Some(ary), *child, free)?;
        }
        Ok(removed)
    }

    fn new_object(&mut self, hint: usize) -> Result<Node> {
        let mut map = IndexMap::new();
        map.try_reserve(hint)
            .map_err(|_| DomError::OutOfMemory(format!("object of {hint} members")))?;
        self.arena.alloc(Data::Object(map))
    }

    fn new_array(&mut self, hint: usize) -> Result<Node> {
        let mut items = Vec::new();
        crate::error::reserve(&mut items, hint)?;
        self.arena.alloc(Data::Array(items))
    }

    fn new_scalar(&mut self, value: ScalarValue<'_>) -> Result<Node> {
        self.arena.alloc(Data::Scalar(value.into_owned()))
    }

    fn free_node(&mut self, node: Node) -> Result<bool> {
        if self.arena.get(node)?.links > 0 {
            return Ok(false);
        }
        self.free_subtree(node)?;
        Ok(true)
    }
}
