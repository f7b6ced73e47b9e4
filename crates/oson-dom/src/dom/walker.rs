use std::borrow::Cow;

use super::{Document, NameValuePair, Node, NodeType, BATCH_SIZE};
use crate::event::{EventKind, EventRecord, EventSource, MAX_DEPTH};
use crate::{DomError, Result};

enum Cursor {
    Object {
        node: Node,
        pos: usize,
        len: usize,
        batch: Vec<NameValuePair>,
        batch_start: usize,
    },
    Array {
        node: Node,
        pos: usize,
        len: usize,
        batch: Vec<Node>,
        batch_start: usize,
    },
}

/// Depth-first walk over a subtree, one event per step. Children are pulled
/// from the document in batches of [`BATCH_SIZE`].
pub(crate) struct WalkState {
    start: Option<Node>,
    stack: Vec<Cursor>,
    pending: Option<Node>,
    started: bool,
    ended: bool,
    last: Option<EventKind>,
}

impl WalkState {
    pub fn new(start: Option<Node>) -> Self {
        Self {
            start,
            stack: Vec::new(),
            pending: None,
            started: false,
            ended: false,
            last: None,
        }
    }

    pub fn reset(&mut self) {
        self.stack.clear();
        self.pending = None;
        self.started = false;
        self.ended = false;
        self.last = None;
    }

    pub fn restart(&mut self, start: Option<Node>) {
        self.reset();
        self.start = start;
    }

    pub fn last_kind(&self) -> Option<EventKind> {
        self.last
    }

    pub fn step<'d>(&mut self, doc: &'d Document) -> Result<EventRecord<'d>> {
        let event = self.advance(doc)?;
        self.last = Some(event.kind());
        Ok(event)
    }

    fn enter<'d>(&mut self, doc: &'d Document, node: Node) -> Result<EventRecord<'d>> {
        let node_type = doc.node_type(node)?;
        if node_type != NodeType::Scalar && self.stack.len() >= MAX_DEPTH {
            return Err(DomError::malformed(0, format!("nesting deeper than {MAX_DEPTH}")));
        }
        Ok(match node_type {
            NodeType::Scalar => EventRecord::Item(doc.scalar_info(node)?),
            NodeType::Object => {
                self.stack.push(Cursor::Object {
                    node,
                    pos: 0,
                    len: doc.num_fields(node)?,
                    batch: Vec::new(),
                    batch_start: 0,
                });
                EventRecord::StartObject
            }
            NodeType::Array => {
                self.stack.push(Cursor::Array {
                    node,
                    pos: 0,
                    len: doc.array_size(node)?,
                    batch: Vec::new(),
                    batch_start: 0,
                });
                EventRecord::StartArray
            }
        })
    }

    fn advance<'d>(&mut self, doc: &'d Document) -> Result<EventRecord<'d>> {
        if let Some(node) = self.pending.take() {
            return self.enter(doc, node);
        }
        let Some(top) = self.stack.last_mut() else {
            if !self.started {
                self.started = true;
                let start = self
                    .start
                    .ok_or_else(|| DomError::invalid_state("document has no root to walk"))?;
                return self.enter(doc, start);
            }
            if self.ended {
                return Err(DomError::invalid_state("read past the End event"));
            }
            self.ended = true;
            return Ok(EventRecord::End);
        };
        match top {
            Cursor::Object {
                node,
                pos,
                len,
                batch,
                batch_start,
            } if *pos < *len => {
                if *pos >= *batch_start + batch.len() {
                    *batch_start = *pos;
                    *batch = doc.fields_batch(*node, *pos, BATCH_SIZE)?;
                }
                let pair = batch
                    .get(*pos - *batch_start)
                    .ok_or_else(|| DomError::invalid_state("object changed during the walk"))?;
                let key = Cow::Owned(pair.name.name().to_owned());
                self.pending = Some(pair.node);
                *pos += 1;
                Ok(EventRecord::Key(key))
            }
            Cursor::Array {
                node,
                pos,
                len,
                batch,
                batch_start,
            } if *pos < *len => {
                if *pos >= *batch_start + batch.len() {
                    *batch_start = *pos;
                    *batch = doc.array_elements_batch(*node, *pos, BATCH_SIZE)?;
                }
                let child = *batch
                    .get(*pos - *batch_start)
                    .ok_or_else(|| DomError::invalid_state("array changed during the walk"))?;
                *pos += 1;
                self.enter(doc, child)
            }
            Cursor::Object { .. } => {
                self.stack.pop();
                Ok(EventRecord::EndObject)
            }
            Cursor::Array { .. } => {
                self.stack.pop();
                Ok(EventRecord::EndArray)
            }
        }
    }
}

/// Replays a document subtree as an event stream. The document is borrowed
/// for the life of the source, so it cannot change mid-walk.
pub struct DomEventSource<'d> {
    doc: &'d Document,
    state: WalkState,
}

impl<'d> DomEventSource<'d> {
    pub(crate) fn new(doc: &'d Document, start: Option<Node>) -> Self {
        Self {
            doc,
            state: WalkState::new(start),
        }
    }
}

impl<'d> EventSource<'d> for DomEventSource<'d> {
    fn next_event(&mut self) -> Result<EventRecord<'d>> {
        self.state.step(self.doc)
    }

    fn last_kind(&self) -> Option<EventKind> {
        self.state.last_kind()
    }

    fn reset(&mut self) {
        self.state.reset();
    }

    fn source_name(&self) -> &'static str {
        "document"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DomOptions;
    use crate::event::RecordedSource;
    use crate::scalar::ScalarValue;
    use serde_json::json;

    #[test]
    fn walks_in_document_order() {
        let doc = Document::from(&json!({"a": [1, {"b": null}], "c": "x"}));
        let mut source = doc.as_event_source(doc.root_node().unwrap());
        let events = RecordedSource::record(&mut source).unwrap();
        let kinds: Vec<EventKind> = events.events().iter().map(EventRecord::kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::StartObject,
                EventKind::Key,
                EventKind::StartArray,
                EventKind::Item,
                EventKind::StartObject,
                EventKind::Key,
                EventKind::Item,
                EventKind::EndObject,
                EventKind::EndArray,
                EventKind::Key,
                EventKind::Item,
                EventKind::EndObject,
                EventKind::End,
            ]
        );
        assert!(source.next_event().is_err());
    }

    #[test]
    fn crosses_batch_boundaries() {
        let items: Vec<serde_json::Value> = (0..(BATCH_SIZE as i64 * 2 + 3)).map(|i| json!(i)).collect();
        let doc = Document::from(&serde_json::Value::Array(items));
        let mut source = doc.as_event_source(doc.root_node().unwrap());
        let events = RecordedSource::record(&mut source).unwrap();
        assert_eq!(events.events().len(), BATCH_SIZE * 2 + 3 + 3);
        assert_eq!(
            events.events()[BATCH_SIZE + 1],
            EventRecord::Item(ScalarValue::Int64(BATCH_SIZE as i64))
        );
    }

    #[test]
    fn walking_a_scalar_subtree() {
        let doc = Document::from(&json!({"k": true}));
        let root = doc.root_node().unwrap();
        let k = doc.field_by_name(root, "k").unwrap().unwrap();
        let mut source = doc.as_event_source(k);
        assert_eq!(
            source.next_event().unwrap(),
            EventRecord::Item(ScalarValue::Bool(true))
        );
        assert_eq!(source.next_event().unwrap(), EventRecord::End);
    }

    #[test]
    fn stale_start_node_fails_on_first_step() {
        let mut doc = Document::new(DomOptions::in_memory());
        let node = doc.new_array(0).unwrap();
        assert!(doc.free_node(node).unwrap());
        let mut source = doc.as_event_source(node);
        assert!(source.next_event().is_err());
    }
}
