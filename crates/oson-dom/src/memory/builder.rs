use indexmap::IndexMap;
use tracing::warn;

use super::arena::Data;
use super::backend::MemoryBackend;
use crate::dom::Node;
use crate::event::{EventRecord, EventSource, OrderCheck};
use crate::{DomError, Result};

enum Frame {
    Object { node: Node, key: Option<String> },
    Array { node: Node },
}

/// Turns an event stream into an orphan subtree of a [`MemoryBackend`].
///
/// Textual numbers are re-encoded under the backend's number policy. On
/// failure every node built so far is released again.
pub(crate) struct TreeBuilder<'b> {
    backend: &'b mut MemoryBackend,
    order: OrderCheck,
    stack: Vec<Frame>,
    top: Option<Node>,
    position: u64,
}

impl<'b> TreeBuilder<'b> {
    pub fn new(backend: &'b mut MemoryBackend) -> Self {
        Self {
            backend,
            order: OrderCheck::new(),
            stack: Vec::new(),
            top: None,
            position: 0,
        }
    }

    /// With `whole_item_only` exactly one value is consumed and the source
    /// is left positioned right after it; otherwise the stream must end
    /// with `End` right after the value.
    pub fn build(
        mut self,
        source: &mut dyn EventSource<'_>,
        whole_item_only: bool,
    ) -> Result<Node> {
        match self.run(source, whole_item_only) {
            Ok(node) => Ok(node),
            Err(err) => {
                if let Some(top) = self.top {
                    if let Err(cleanup) = self.backend.free_subtree(top) {
                        warn!(error = %cleanup, "could not free a partially built tree");
                    }
                }
                Err(err)
            }
        }
    }

    fn run(&mut self, source: &mut dyn EventSource<'_>, whole_item_only: bool) -> Result<Node> {
        loop {
            let event = source.next_event()?;
            self.order.check(event.kind()).map_err(|err| match err {
                DomError::MalformedInput { msg, .. } => {
                    DomError::malformed(self.position as usize, msg)
                }
                other => other,
            })?;
            match event {
                EventRecord::StartObject => {
                    let node = self.attach_new(Data::Object(IndexMap::new()))?;
                    self.stack.push(Frame::Object { node, key: None });
                }
                EventRecord::StartArray => {
                    let node = self.attach_new(Data::Array(Vec::new()))?;
                    self.stack.push(Frame::Array { node });
                }
                EventRecord::EndObject | EventRecord::EndArray => {
                    self.stack.pop();
                }
                EventRecord::Key(name) => {
                    if let Some(Frame::Object { key, .. }) = self.stack.last_mut() {
                        *key = Some(name.into_owned());
                    }
                }
                EventRecord::Item(value) => {
                    let value = value.with_number_encoding(self.backend.number_encoding());
                    self.attach_new(Data::Scalar(value.into_owned()))?;
                }
                EventRecord::Error(msg) => {
                    return Err(DomError::malformed(self.position as usize, msg.into_owned()));
                }
                EventRecord::Position(pos) => {
                    self.position = pos;
                    continue;
                }
                EventRecord::End => {
                    return match self.top {
                        Some(top) if self.order.root_done() => Ok(top),
                        _ => Err(DomError::malformed(
                            self.position as usize,
                            "event stream ended before a complete value",
                        )),
                    };
                }
                _ => continue,
            }
            if whole_item_only && self.stack.is_empty() {
                if let Some(top) = self.top {
                    return Ok(top);
                }
            }
        }
    }

    fn attach_new(&mut self, data: Data) -> Result<Node> {
        let node = self.backend.alloc(data)?;
        if let Err(err) = self.place(node) {
            if let Err(cleanup) = self.backend.free_subtree(node) {
                warn!(error = %cleanup, "could not free an unplaced node");
            }
            return Err(err);
        }
        Ok(node)
    }

    /// Hangs a fresh node under the open container, or makes it the top.
    fn place(&mut self, node: Node) -> Result<()> {
        match self.stack.last_mut() {
            None => {
                self.top = Some(node);
                Ok(())
            }
            Some(Frame::Array { node: ary }) => {
                let ary = *ary;
                self.backend.adopt_item(ary, node)
            }
            Some(Frame::Object { node: obj, key }) => {
                let obj = *obj;
                let name = key
                    .take()
                    .ok_or_else(|| DomError::invalid_state("object value without a key"))?;
                self.backend.adopt_field(obj, &name, node)
            }
        }
    }
}
