use super::{FieldName, NameValuePair, Node, NodeType};
use crate::config::BackendKind;
use crate::event::EventSource;
use crate::scalar::ScalarValue;
use crate::{DomError, Result};

/// Storage behind a [`super::Document`]. Read operations are required;
/// mutators default to `Unsupported` so read-only backends only override
/// what they can do.
pub(crate) trait DomBackend: Send {
    fn kind(&self) -> BackendKind;

    fn root(&self) -> Option<Node>;

    fn node_type(&self, node: Node) -> Result<NodeType>;

    fn scalar(&self, node: Node) -> Result<ScalarValue<'_>>;

    fn num_fields(&self, obj: Node) -> Result<usize>;

    fn field(&self, obj: Node, name: &FieldName) -> Result<Option<Node>>;

    /// Appends up to `count` members starting at `start` to `out`.
    fn fields_batch(
        &self,
        obj: Node,
        start: usize,
        count: usize,
        out: &mut Vec<NameValuePair>,
    ) -> Result<()>;

    fn array_size(&self, ary: Node) -> Result<usize>;

    fn array_element(&self, ary: Node, index: usize) -> Result<Node>;

    fn array_batch(
        &self,
        ary: Node,
        start: usize,
        count: usize,
        out: &mut Vec<Node>,
    ) -> Result<()>;

    fn parent(&self, node: Node) -> Result<Option<Node>>;

    /// Interns `name` where the backend can, otherwise resolves it.
    fn store_field_name(&mut self, name: &str) -> Result<FieldName>;

    /// Tag of the dictionary field ids are resolved against.
    fn dictionary_tag(&self) -> u64;

    fn resolve_field_id(&self, id: u32) -> Option<FieldName>;

    /// The encoded image behind the document, when there is one.
    fn image(&self) -> Option<bytes::Bytes> {
        None
    }

    fn reset(&mut self);

    /// Replaces the whole tree with one built from `source`. The previous
    /// tree survives when this fails.
    fn load_events(&mut self, source: &mut dyn EventSource<'_>) -> Result<Node>;

    fn load_image(&mut self, image: bytes::Bytes) -> Result<Node> {
        let _ = image;
        Err(DomError::unsupported("load_from_binary_image", self.kind().name()))
    }

    fn import_events(
        &mut self,
        source: &mut dyn EventSource<'_>,
        whole_item_only: bool,
    ) -> Result<Node> {
        let _ = (source, whole_item_only);
        Err(DomError::unsupported("import_from_event_source", self.kind().name()))
    }

    fn set_root(&mut self, node: Option<Node>) -> Result<()> {
        let _ = node;
        Err(DomError::unsupported("set_root", self.kind().name()))
    }

    fn put_field(&mut self, obj: Node, name: &str, node: Node) -> Result<()> {
        let _ = (obj, name, node);
        Err(DomError::unsupported("put_field", self.kind().name()))
    }

    fn put_item(&mut self, ary: Node, node: Node, pos: usize) -> Result<()> {
        let _ = (ary, node, pos);
        Err(DomError::unsupported("put_item", self.kind().name()))
    }

    fn replace_item(&mut self, ary: Node, node: Node, pos: usize) -> Result<()> {
        let _ = (ary, node, pos);
        Err(DomError::unsupported("replace_item", self.kind().name()))
    }

    /// Detaches a member. With `free` the detached subtree is released and
    /// `None` comes back; otherwise the caller gets the orphan.
    fn remove_field(&mut self, obj: Node, name: &FieldName, free: bool) -> Result<Option<Node>> {
        let _ = (obj, name, free);
        Err(DomError::unsupported("remove_field", self.kind().name()))
    }

    fn rename_field(&mut self, obj: Node, from: &str, to: &str) -> Result<()> {
        let _ = (obj, from, to);
        Err(DomError::unsupported("rename_field", self.kind().name()))
    }

    fn remove_items(
        &mut self,
        ary: Node,
        start: usize,
        count: usize,
        free: bool,
    ) -> Result<Vec<Node>> {
        let _ = (ary, start, count, free);
        Err(DomError::unsupported("remove_items", self.kind().name()))
    }

    fn new_object(&mut self, hint: usize) -> Result<Node> {
        let _ = hint;
        Err(DomError::unsupported("new_object", self.kind().name()))
    }

    fn new_array(&mut self, hint: usize) -> Result<Node> {
        let _ = hint;
        Err(DomError::unsupported("new_array", self.kind().name()))
    }

    fn new_scalar(&mut self, value: ScalarValue<'_>) -> Result<Node> {
        let _ = value;
        Err(DomError::unsupported("new_scalar", self.kind().name()))
    }

    fn free_node(&mut self, node: Node) -> Result<bool> {
        let _ = node;
        Err(DomError::unsupported("free_node", self.kind().name()))
    }
}
