use std::any::Any;
use std::cell::RefCell;
use std::fmt;

use bytes::Bytes;
use tracing::warn;

use super::walker::DomEventSource;
use super::{DomBackend, FieldName, NameValuePair, Node, NodeType, Visit, VisitInfo, BATCH_SIZE};
use crate::config::{BackendKind, DomOptions, ParseOptions};
use crate::event::{EventSource, JsonValueSource};
use crate::memory::MemoryBackend;
use crate::oson::{BinaryBackend, OsonEncoder};
use crate::scalar::ScalarValue;
use crate::text::JsonTextSource;
use crate::{DomError, ErrorKind, Result};

type FatalHandler = Box<dyn FnMut(&DomError) + Send>;

/// A JSON document behind one of two storage backends.
///
/// Reads work the same on both. Mutations are only implemented by the
/// in-memory backend; the binary backend answers them with `Unsupported`.
/// Every failing call leaves its error in a sticky slot readable through
/// [`Document::last_error`] until [`Document::clear_error`].
pub struct Document {
    backend: Box<dyn DomBackend>,
    options: DomOptions,
    error: RefCell<Option<DomError>>,
    mod_count: u64,
    fatal_handler: RefCell<Option<FatalHandler>>,
    user_context: Option<Box<dyn Any + Send>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("backend", &self.backend.kind())
            .field("root", &self.backend.root())
            .field("mod_count", &self.mod_count)
            .field("error", &self.error.borrow())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl Document {
    pub fn new(options: DomOptions) -> Self {
        let backend: Box<dyn DomBackend> = match options.backend {
            BackendKind::InMemory => Box::new(MemoryBackend::new(&options)),
            BackendKind::Binary => Box::new(BinaryBackend::new(&options)),
        };
        Self {
            backend,
            options,
            error: RefCell::new(None),
            mod_count: 0,
            fatal_handler: RefCell::new(None),
            user_context: None,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(DomOptions::in_memory())
    }

    pub fn binary() -> Self {
        Self::new(DomOptions::binary())
    }

    pub fn options(&self) -> &DomOptions {
        &self.options
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Bytes of the loaded image for binary documents.
    pub fn image(&self) -> Option<Bytes> {
        self.backend.image()
    }

    fn track<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if err.kind() == ErrorKind::OutOfMemory {
                warn!(error = %err, "fatal allocation failure");
                if let Some(handler) = self.fatal_handler.borrow_mut().as_mut() {
                    handler(err);
                }
            }
            *self.error.borrow_mut() = Some(err.clone());
        }
        result
    }

    /// Like `track`, counting a successful call as a modification.
    fn mutated<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_ok() && self.backend.kind() == BackendKind::InMemory {
            self.mod_count += 1;
        }
        self.track(result)
    }

    // Loading

    /// Replaces the whole tree with one built from `source`.
    pub fn load_from_event_source(&mut self, source: &mut dyn EventSource<'_>) -> Result<Node> {
        let result = self.backend.load_events(source);
        self.mutated(result)
    }

    /// Maps an OSON image. The bytes are shared, not copied, unless the
    /// document was created with `COPY_INPUT`.
    pub fn load_from_binary_image(&mut self, image: impl Into<Bytes>) -> Result<Node> {
        let result = self.backend.load_image(image.into());
        self.mutated(result)
    }

    /// Builds an orphan subtree from `source` without touching the root.
    /// With `whole_item_only` exactly one value is consumed and the rest of
    /// the stream is left for the caller.
    pub fn import_from_event_source(
        &mut self,
        source: &mut dyn EventSource<'_>,
        whole_item_only: bool,
    ) -> Result<Node> {
        let result = self.backend.import_events(source, whole_item_only);
        self.mutated(result)
    }

    pub fn load_json(&mut self, value: &serde_json::Value) -> Result<Node> {
        self.load_from_event_source(&mut JsonValueSource::new(value))
    }

    /// Parses JSON text into a new tree. On failure the previous root is
    /// kept and the parse error is recorded.
    pub fn load_text(&mut self, text: &str, options: &ParseOptions) -> Result<Node> {
        let source = JsonTextSource::from_str(text, options.clone());
        let mut source = self.track(source)?;
        self.load_from_event_source(&mut source)
    }

    // Reading

    pub fn root_node(&self) -> Option<Node> {
        self.backend.root()
    }

    pub fn node_type(&self, node: Node) -> Result<NodeType> {
        self.track(self.backend.node_type(node))
    }

    pub fn scalar_info(&self, node: Node) -> Result<ScalarValue<'_>> {
        self.track(self.backend.scalar(node))
    }

    pub fn num_fields(&self, obj: Node) -> Result<usize> {
        self.track(self.backend.num_fields(obj))
    }

    /// Member lookup; a missing member is `Ok(None)`, not an error.
    pub fn field_value(&self, obj: Node, name: &FieldName) -> Result<Option<Node>> {
        self.track(self.backend.field(obj, name))
    }

    pub fn field_by_name(&self, obj: Node, name: &str) -> Result<Option<Node>> {
        self.field_value(obj, &FieldName::new(name))
    }

    pub fn all_fields(&self, obj: Node) -> Result<Vec<NameValuePair>> {
        let len = self.num_fields(obj)?;
        self.fields_batch(obj, 0, len)
    }

    pub fn fields_batch(&self, obj: Node, start: usize, count: usize) -> Result<Vec<NameValuePair>> {
        let mut out = Vec::new();
        let result = self.backend.fields_batch(obj, start, count, &mut out);
        self.track(result).map(|_| out)
    }

    pub fn array_size(&self, ary: Node) -> Result<usize> {
        self.track(self.backend.array_size(ary))
    }

    pub fn array_element(&self, ary: Node, index: usize) -> Result<Node> {
        self.track(self.backend.array_element(ary, index))
    }

    pub fn array_elements_batch(&self, ary: Node, start: usize, count: usize) -> Result<Vec<Node>> {
        let mut out = Vec::new();
        let result = self.backend.array_batch(ary, start, count, &mut out);
        self.track(result).map(|_| out)
    }

    /// `Ok(None)` for the root and for orphans.
    pub fn get_parent(&self, node: Node) -> Result<Option<Node>> {
        self.track(self.backend.parent(node))
    }

    // Mutation

    /// Attaches `node` as the root, freeing the previous root. `None` frees
    /// the current root and leaves the document empty.
    pub fn set_root(&mut self, node: Option<Node>) -> Result<()> {
        let result = self.backend.set_root(node);
        self.mutated(result)
    }

    /// Creates or replaces a member; a replaced value is freed.
    pub fn put_field(&mut self, obj: Node, name: &str, node: Node) -> Result<()> {
        let result = self.backend.put_field(obj, name, node);
        self.mutated(result)
    }

    /// Inserts at `pos`, shifting later elements right.
    pub fn put_item(&mut self, ary: Node, node: Node, pos: usize) -> Result<()> {
        let result = self.backend.put_item(ary, node, pos);
        self.mutated(result)
    }

    pub fn append_item(&mut self, ary: Node, node: Node) -> Result<()> {
        let result = self
            .backend
            .array_size(ary)
            .and_then(|len| self.backend.put_item(ary, node, len));
        self.mutated(result)
    }

    pub fn replace_item(&mut self, ary: Node, node: Node, pos: usize) -> Result<()> {
        let result = self.backend.replace_item(ary, node, pos);
        self.mutated(result)
    }

    /// Removes and frees a member. `false` when there was no such member.
    pub fn delete_field(&mut self, obj: Node, name: &FieldName) -> Result<bool> {
        let result = self.backend.remove_field(obj, name, true);
        match result {
            Ok(None) => self.track(Ok(false)),
            Ok(Some(_)) => self.mutated(Ok(true)),
            Err(err) => self.track(Err(err)),
        }
    }

    pub fn delete_field_by_name(&mut self, obj: Node, name: &str) -> Result<bool> {
        self.delete_field(obj, &FieldName::new(name))
    }

    /// Detaches a member and hands it back as an orphan.
    pub fn unlink_field(&mut self, obj: Node, name: &FieldName) -> Result<Option<Node>> {
        let result = self.backend.remove_field(obj, name, false);
        match result {
            Ok(None) => self.track(Ok(None)),
            other => self.mutated(other),
        }
    }

    pub fn unlink_field_by_name(&mut self, obj: Node, name: &str) -> Result<Option<Node>> {
        self.unlink_field(obj, &FieldName::new(name))
    }

    /// Fails with `NotFound` when `from` is absent and `InvalidState` when
    /// `to` already exists.
    pub fn rename_field(&mut self, obj: Node, from: &str, to: &str) -> Result<()> {
        let result = self.backend.rename_field(obj, from, to);
        self.mutated(result)
    }

    fn remove_one(&mut self, ary: Node, pos: usize, free: bool) -> Result<Node> {
        let len = self.backend.array_size(ary)?;
        if pos >= len {
            return Err(DomError::OutOfBounds { index: pos, len });
        }
        self.backend
            .remove_items(ary, pos, 1, free)?
            .pop()
            .ok_or_else(|| DomError::invalid_state("array element vanished"))
    }

    pub fn delete_item(&mut self, ary: Node, pos: usize) -> Result<()> {
        let result = self.remove_one(ary, pos, true).map(|_| ());
        self.mutated(result)
    }

    pub fn unlink_item(&mut self, ary: Node, pos: usize) -> Result<Node> {
        let result = self.remove_one(ary, pos, false);
        self.mutated(result)
    }

    /// Deletes up to `count` elements from `start` and returns how many
    /// were actually removed.
    pub fn delete_item_range(&mut self, ary: Node, start: usize, count: usize) -> Result<usize> {
        let result = self
            .backend
            .remove_items(ary, start, count, true)
            .map(|removed| removed.len());
        self.mutated(result)
    }

    // Construction

    pub fn new_object(&mut self, hint: usize) -> Result<Node> {
        let result = self.backend.new_object(hint);
        self.mutated(result)
    }

    pub fn new_array(&mut self, hint: usize) -> Result<Node> {
        let result = self.backend.new_array(hint);
        self.mutated(result)
    }

    pub fn new_scalar(&mut self, value: ScalarValue<'_>) -> Result<Node> {
        let result = self.backend.new_scalar(value);
        self.mutated(result)
    }

    // Lifecycle

    /// Drops the root and every orphan; the document stays usable.
    pub fn reset(&mut self) {
        self.backend.reset();
        if self.backend.kind() == BackendKind::InMemory {
            self.mod_count += 1;
        }
    }

    /// Frees an orphan subtree. Attached nodes are refused with `false`.
    pub fn free_node(&mut self, node: Node) -> Result<bool> {
        let result = self.backend.free_node(node);
        match result {
            Ok(false) => self.track(Ok(false)),
            other => self.mutated(other),
        }
    }

    // Field names

    /// Interns `name`. Binary documents only resolve it; names their image
    /// lacks come back flagged `NOT_IN_SET`.
    pub fn store_field_name(&mut self, name: &str) -> Result<FieldName> {
        let result = self.backend.store_field_name(name);
        self.track(result)
    }

    /// Clears the cached ids this document did not issue and returns how
    /// many keys were reset.
    pub fn valid_field_ids(&self, keys: &mut [FieldName]) -> usize {
        let tag = self.backend.dictionary_tag();
        let mut cleared = 0;
        for key in keys.iter_mut() {
            if key.is_resolved() && key.id_for(tag).is_none() {
                key.clear_ids();
                cleared += 1;
            }
        }
        cleared
    }

    /// Name interned under `id` in this document's dictionary.
    pub fn field_name(&self, id: u32) -> Option<FieldName> {
        self.backend.resolve_field_id(id)
    }

    // Export

    /// Walks the subtree at `node` as an event stream.
    pub fn as_event_source(&self, node: Node) -> DomEventSource<'_> {
        DomEventSource::new(self, Some(node))
    }

    /// Encodes the subtree at `node` as OSON with this document's encoding
    /// flags. A binary document's own root is returned without re-encoding.
    pub fn to_binary_image(&self, node: Node) -> Result<Vec<u8>> {
        if let Some(image) = self.backend.image() {
            if self.backend.root() == Some(node) {
                return Ok(image.to_vec());
            }
        }
        let mut encoder = OsonEncoder::new(self.options.encode_options());
        let result = encoder.encode(&mut self.as_event_source(node));
        self.track(result)
    }

    pub fn to_json_value(&self, node: Node) -> Result<serde_json::Value> {
        let result = crate::print::to_json_value(self, node);
        self.track(result)
    }

    /// Depth-first pre-order walk. The callback decides whether to descend
    /// into each container or to stop altogether.
    pub fn visit<F>(&self, node: Node, mut visitor: F) -> Result<()>
    where
        F: FnMut(&VisitInfo<'_>) -> Visit,
    {
        struct Pending {
            node: Node,
            depth: usize,
            key: Option<FieldName>,
            index: Option<usize>,
            parent: Option<Node>,
        }
        let mut stack = vec![Pending {
            node,
            depth: 0,
            key: None,
            index: None,
            parent: None,
        }];
        while let Some(item) = stack.pop() {
            let node_type = self.node_type(item.node)?;
            let info = VisitInfo {
                node: item.node,
                node_type,
                depth: item.depth,
                key: item.key.as_ref().map(FieldName::name),
                index: item.index,
                parent: item.parent,
            };
            match visitor(&info) {
                Visit::Stop => return Ok(()),
                Visit::SkipChildren => continue,
                Visit::Continue => {}
            }
            let first = stack.len();
            match node_type {
                NodeType::Scalar => {}
                NodeType::Object => {
                    let len = self.num_fields(item.node)?;
                    for start in (0..len).step_by(BATCH_SIZE) {
                        for pair in self.fields_batch(item.node, start, BATCH_SIZE)? {
                            stack.push(Pending {
                                node: pair.node,
                                depth: item.depth + 1,
                                key: Some(pair.name),
                                index: None,
                                parent: Some(item.node),
                            });
                        }
                    }
                }
                NodeType::Array => {
                    let len = self.array_size(item.node)?;
                    for start in (0..len).step_by(BATCH_SIZE) {
                        let batch = self.array_elements_batch(item.node, start, BATCH_SIZE)?;
                        for (i, child) in batch.into_iter().enumerate() {
                            stack.push(Pending {
                                node: child,
                                depth: item.depth + 1,
                                key: None,
                                index: Some(start + i),
                                parent: Some(item.node),
                            });
                        }
                    }
                }
            }
            stack[first..].reverse();
        }
        Ok(())
    }

    /// Deep copy of `node` as an orphan of this same document.
    pub fn copy_within(&mut self, node: Node) -> Result<Node> {
        let recorded = super::equal::copy_recorded(self, node);
        let mut events = self.track(recorded)?;
        self.import_from_event_source(&mut events, true)
    }

    // Bookkeeping

    /// Increases on every successful mutation of an in-memory document.
    pub fn modification_count(&self) -> u64 {
        self.mod_count
    }

    pub fn last_error(&self) -> Option<DomError> {
        self.error.borrow().clone()
    }

    pub fn clear_error(&self) {
        self.error.borrow_mut().take();
    }

    /// Called with every `OutOfMemory` error before it is returned.
    pub fn set_fatal_handler(&mut self, handler: impl FnMut(&DomError) + Send + 'static) {
        *self.fatal_handler.get_mut() = Some(Box::new(handler));
    }

    pub fn set_user_context(&mut self, context: Box<dyn Any + Send>) {
        self.user_context = Some(context);
    }

    pub fn user_context(&self) -> Option<&(dyn Any + Send)> {
        self.user_context.as_deref()
    }

    pub fn user_context_mut(&mut self) -> Option<&mut (dyn Any + Send)> {
        self.user_context.as_deref_mut()
    }

    pub fn take_user_context(&mut self) -> Option<Box<dyn Any + Send>> {
        self.user_context.take()
    }

    #[cfg(test)]
    pub(crate) fn record_error(&self, err: DomError) {
        let _ = self.track::<()>(Err(err));
    }
}

impl From<&serde_json::Value> for Document {
    /// In-memory document holding `value`. Conversion cannot fail for a
    /// `serde_json::Value`; an allocation failure leaves the document empty
    /// with the error recorded.
    fn from(value: &serde_json::Value) -> Self {
        let mut doc = Document::in_memory();
        let _ = doc.load_json(value);
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DomFlags;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn builds_the_sample_document() {
        let mut doc = Document::in_memory();
        let root = doc.new_object(2).unwrap();
        let one = doc.new_scalar(ScalarValue::Int32(1)).unwrap();
        doc.put_field(root, "a", one).unwrap();
        let list = doc.new_array(3).unwrap();
        for value in [ScalarValue::Bool(true), ScalarValue::Null, ScalarValue::string("x")] {
            let item = doc.new_scalar(value).unwrap();
            doc.append_item(list, item).unwrap();
        }
        doc.put_field(root, "b", list).unwrap();
        doc.set_root(Some(root)).unwrap();
        assert_eq!(doc.num_fields(root).unwrap(), 2);
        let b = doc.field_by_name(root, "b").unwrap().unwrap();
        assert_eq!(doc.array_size(b).unwrap(), 3);
        assert_eq!(doc.get_parent(b).unwrap(), Some(root));
        assert_eq!(doc.to_json_value(root).unwrap(), json!({"a": 1, "b": [true, null, "x"]}));
    }

    #[test]
    fn malformed_text_leaves_the_document_empty() {
        let mut doc = Document::in_memory();
        let err = doc.load_text(r#"{"a":}"#, &ParseOptions::default()).unwrap_err();
        match &err {
            DomError::MalformedInput { pos, msg } => {
                assert_eq!(*pos, 5);
                assert!(!msg.is_empty());
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(doc.root_node(), None);
        assert_eq!(doc.last_error(), Some(err));
    }

    #[test]
    fn errors_are_sticky_until_cleared() {
        let mut doc = Document::in_memory();
        let ary = doc.new_array(0).unwrap();
        assert!(doc.array_element(ary, 4).is_err());
        assert_eq!(doc.last_error().map(|e| e.kind()), Some(ErrorKind::OutOfBounds));
        doc.num_fields(ary).unwrap_err();
        assert_eq!(doc.last_error().map(|e| e.kind()), Some(ErrorKind::InvalidState));
        doc.clear_error();
        assert!(doc.last_error().is_none());
    }

    #[test]
    fn fatal_handler_sees_only_out_of_memory() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut doc = Document::in_memory();
        let seen = calls.clone();
        doc.set_fatal_handler(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        doc.record_error(DomError::NotFound("x".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        doc.record_error(DomError::OutOfMemory("arena".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reads_leave_the_modification_count_alone() {
        let mut doc = Document::from(&json!({"a": [1, 2]}));
        let before = doc.modification_count();
        let root = doc.root_node().unwrap();
        doc.all_fields(root).unwrap();
        doc.field_by_name(root, "a").unwrap();
        doc.to_json_value(root).unwrap();
        assert_eq!(doc.modification_count(), before);
        let a = doc.field_by_name(root, "a").unwrap().unwrap();
        doc.delete_item(a, 0).unwrap();
        assert!(doc.modification_count() > before);
        assert!(!doc.delete_field_by_name(root, "missing").unwrap());
    }

    #[test]
    fn unlinked_members_become_orphans() {
        let mut doc = Document::from(&json!({"a": {"b": 1}, "c": 2}));
        let root = doc.root_node().unwrap();
        let a = doc.unlink_field_by_name(root, "a").unwrap().unwrap();
        assert_eq!(doc.get_parent(a).unwrap(), None);
        assert_eq!(doc.to_json_value(root).unwrap(), json!({"c": 2}));
        assert!(doc.free_node(a).unwrap());
        assert!(doc.node_type(a).is_err());
    }

    #[test]
    fn delete_item_range_reports_actual_count() {
        let mut doc = Document::from(&json!([1, 2, 3, 4]));
        let root = doc.root_node().unwrap();
        assert_eq!(doc.delete_item_range(root, 2, 10).unwrap(), 2);
        assert_eq!(doc.to_json_value(root).unwrap(), json!([1, 2]));
        assert_eq!(
            doc.delete_item(root, 5).unwrap_err().kind(),
            ErrorKind::OutOfBounds
        );
    }

    #[test]
    fn field_ids_from_another_document_are_cleared() {
        let mut a = Document::in_memory();
        let mut b = Document::in_memory();
        let mut keys = vec![a.store_field_name("x").unwrap(), b.store_field_name("x").unwrap()];
        assert_eq!(b.valid_field_ids(&mut keys), 1);
        assert_eq!(keys[0].local_id(), 0);
        assert_eq!(keys[1].local_id(), 1);
    }

    #[test]
    fn shared_dictionary_ids_travel() {
        let dict = crate::dom::SharedDictionary::new();
        let mut a = Document::new(DomOptions::in_memory().with_dictionary(dict.clone()));
        let b = Document::new(DomOptions::in_memory().with_dictionary(dict));
        let mut keys = vec![a.store_field_name("x").unwrap()];
        assert_eq!(b.valid_field_ids(&mut keys), 0);
        assert!(keys[0].is_resolved());
        assert_eq!(keys[0].set_id(), keys[0].local_id());
    }

    #[test]
    fn binary_documents_reject_mutation_and_keep_their_count() {
        let image = crate::oson::encode_value(&json!({"a": 1}), &Default::default()).unwrap();
        let mut doc = Document::binary();
        let root = doc.load_from_binary_image(image.clone()).unwrap();
        let count = doc.modification_count();
        assert_eq!(doc.new_object(0).unwrap_err().kind(), ErrorKind::Unsupported);
        assert_eq!(
            doc.delete_field_by_name(root, "a").unwrap_err().kind(),
            ErrorKind::Unsupported
        );
        assert_eq!(doc.modification_count(), count);
        assert_eq!(doc.to_binary_image(root).unwrap(), image);
    }

    #[test]
    fn visit_reports_keys_indices_and_depth() {
        let doc = Document::from(&json!({"a": [10, 20], "b": {"c": null}}));
        let root = doc.root_node().unwrap();
        let mut seen = Vec::new();
        doc.visit(root, |info| {
            let label = match (info.key, info.index) {
                (Some(k), _) => k.to_string(),
                (None, Some(i)) => format!("[{i}]"),
                _ => "$".to_string(),
            };
            seen.push((label, info.depth));
            if info.key == Some("b") {
                Visit::SkipChildren
            } else {
                Visit::Continue
            }
        })
        .unwrap();
        assert_eq!(
            seen,
            vec![
                ("$".to_string(), 0),
                ("a".to_string(), 1),
                ("[0]".to_string(), 2),
                ("[1]".to_string(), 2),
                ("b".to_string(), 1),
            ]
        );
    }

    #[test]
    fn copy_within_the_same_document() {
        let mut doc = Document::from(&json!({"a": [1, {"b": true}]}));
        let root = doc.root_node().unwrap();
        let a = doc.field_by_name(root, "a").unwrap().unwrap();
        let copy = doc.copy_within(a).unwrap();
        doc.put_field(root, "a2", copy).unwrap();
        assert_eq!(
            doc.to_json_value(root).unwrap(),
            json!({"a": [1, {"b": true}], "a2": [1, {"b": true}]})
        );
    }

    #[test]
    fn user_context_round_trips() {
        let mut doc = Document::in_memory();
        doc.set_user_context(Box::new(42u32));
        assert_eq!(doc.user_context().and_then(|c| c.downcast_ref::<u32>()), Some(&42));
        if let Some(ctx) = doc.user_context_mut().and_then(|c| c.downcast_mut::<u32>()) {
            *ctx = 7;
        }
        assert_eq!(
            doc.take_user_context().and_then(|c| c.downcast::<u32>().ok()).map(|b| *b),
            Some(7)
        );
    }

    #[test]
    fn copy_input_detaches_from_the_callers_buffer() {
        let image = crate::oson::encode_value(&json!([1, 2]), &Default::default()).unwrap();
        let shared = Bytes::from(image);
        let mut doc = Document::new(DomOptions::binary().with_flags(DomFlags::COPY_INPUT));
        doc.load_from_binary_image(shared.clone()).unwrap();
        let held = doc.image().unwrap();
        assert_eq!(held, shared);
        assert_ne!(held.as_ptr(), shared.as_ptr());
    }
}
