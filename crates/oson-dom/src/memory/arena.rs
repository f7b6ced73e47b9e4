use indexmap::IndexMap;

use crate::dom::Node;
use crate::scalar::ScalarValue;
use crate::{DomError, Result};

/// Payload of a live node. Object members are keyed by field id.
#[derive(Debug)]
pub(crate) enum Data {
    Scalar(ScalarValue<'static>),
    Object(IndexMap<u32, Node>),
    Array(Vec<Node>),
}

#[derive(Debug)]
pub(crate) struct Record {
    pub data: Data,
    /// First attach point; `None` for orphans and the root.
    pub parent: Option<Node>,
    /// Attach points currently holding this node, the root slot included.
    pub links: u32,
}

impl Record {
    fn new(data: Data) -> Self {
        Self {
            data,
            parent: None,
            links: 0,
        }
    }

    /// Child handles of a container, in order.
    pub fn children(&self) -> Vec<Node> {
        match &self.data {
            Data::Scalar(_) => Vec::new(),
            Data::Object(map) => map.values().copied().collect(),
            Data::Array(items) => items.clone(),
        }
    }
}

#[derive(Debug)]
enum Slot {
    Live(Record),
    /// Released and waiting on the free list.
    Free { next: Option<u32> },
    /// Released and never handed out again.
    Dead,
}

#[derive(Debug)]
struct Entry {
    generation: u32,
    slot: Slot,
}

/// Slot storage for the nodes of one document.
///
/// Handles carry the arena id and the slot generation, so a handle to a
/// released slot is rejected even after the slot is recycled for another
/// node, and a handle from another arena never resolves here.
#[derive(Debug)]
pub(crate) struct Arena {
    owner: u32,
    entries: Vec<Entry>,
    free_head: Option<u32>,
    recycle: bool,
    live: usize,
    /// Generation given to brand-new slots; raised when slots are dropped so
    /// old handles never match a fresh slot.
    floor: u32,
}

impl Arena {
    /// With `recycle` off, released slots turn dead instead of joining the
    /// free list.
    pub fn new(recycle: bool) -> Self {
        Self {
            owner: crate::dom::next_owner_id(),
            entries: Vec::new(),
            free_head: None,
            recycle,
            live: 0,
            floor: 0,
        }
    }

    pub fn live(&self) -> usize {
        self.live
    }

    pub fn alloc(&mut self, data: Data) -> Result<Node> {
        if let Some(slot) = self.free_head {
            let entry = &mut self.entries[slot as usize];
            self.free_head = match entry.slot {
                Slot::Free { next } => next,
                _ => None,
            };
            entry.slot = Slot::Live(Record::new(data));
            self.live += 1;
            return Ok(Node::new(self.owner, slot, entry.generation));
        }
        let slot = u32::try_from(self.entries.len())
            .map_err(|_| DomError::OutOfMemory("node arena is full".into()))?;
        crate::error::reserve(&mut self.entries, 1)?;
        self.entries.push(Entry {
            generation: self.floor,
            slot: Slot::Live(Record::new(data)),
        });
        self.live += 1;
        Ok(Node::new(self.owner, slot, self.floor))
    }

    fn entry(&self, node: Node) -> Result<&Entry> {
        if node.owner != self.owner {
            return Err(DomError::invalid_state("node handle from another document"));
        }
        let entry = self
            .entries
            .get(node.slot as usize)
            .ok_or_else(|| DomError::invalid_state("node handle out of range"))?;
        if entry.generation != node.generation {
            return Err(DomError::invalid_state("stale node handle"));
        }
        Ok(entry)
    }

    pub fn get(&self, node: Node) -> Result<&Record> {
        match &self.entry(node)?.slot {
            Slot::Live(record) => Ok(record),
            _ => Err(DomError::invalid_state("node has been freed")),
        }
    }

    pub fn get_mut(&mut self, node: Node) -> Result<&mut Record> {
        self.entry(node)?;
        match &mut self.entries[node.slot as usize].slot {
            Slot::Live(record) => Ok(record),
            _ => Err(DomError::invalid_state("node has been freed")),
        }
    }

    #[cfg(test)]
    pub fn is_live(&self, node: Node) -> bool {
        self.get(node).is_ok()
    }

    /// Releases one slot and returns what it held.
    pub fn release(&mut self, node: Node) -> Result<Record> {
        self.get(node)?;
        let entry = &mut self.entries[node.slot as usize];
        let next = if self.recycle {
            entry.generation = entry.generation.wrapping_add(1);
            let next = self.free_head;
            self.free_head = Some(node.slot);
            Slot::Free { next }
        } else {
            Slot::Dead
        };
        self.live -= 1;
        match std::mem::replace(&mut entry.slot, next) {
            Slot::Live(record) => Ok(record),
            _ => Err(DomError::invalid_state("node has been freed")),
        }
    }

    /// Drops every node. Handles issued before stay invalid because the
    /// generations survive unless `release_memory` also drops the slots.
    /// Without recycling every slot turns dead and is never handed out again,
    /// whatever `release_memory` says.
    pub fn clear(&mut self, release_memory: bool) {
        self.live = 0;
        if !self.recycle {
            for entry in &mut self.entries {
                entry.slot = Slot::Dead;
            }
            self.free_head = None;
            return;
        }
        if release_memory {
            let highest = self.entries.iter().map(|e| e.generation).max();
            if let Some(highest) = highest {
                self.floor = self.floor.max(highest).wrapping_add(1);
            }
            self.entries = Vec::new();
            self.free_head = None;
            return;
        }
        self.free_head = None;
        for (slot, entry) in self.entries.iter_mut().enumerate().rev() {
            entry.generation = entry.generation.wrapping_add(1);
            entry.slot = Slot::Free {
                next: self.free_head,
            };
            self.free_head = Some(slot as u32);
        }
    }
}
