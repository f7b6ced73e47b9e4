use bytes::Bytes;
use tracing::debug;

use super::image::{Entry, ImageView, Layout};
use super::validate::validate;
use super::OsonEncoder;
use crate::config::{BackendKind, DomFlags, DomOptions};
use crate::dom::{
    DomBackend, FieldDictionary, FieldFlags, FieldName, NameTable, NameValuePair, Node, NodeType,
};
use crate::event::EventSource;
use crate::scalar::ScalarValue;
use crate::{DomError, Result};

/// Read-only view over an OSON image. Node handles carry the record's tree
/// offset; loading another image or resetting retires every old handle.
pub(crate) struct BinaryBackend {
    options: DomOptions,
    image: Option<(Bytes, Layout)>,
    names: NameTable,
    owner: u32,
    generation: u32,
}

impl BinaryBackend {
    pub fn new(options: &DomOptions) -> Self {
        Self {
            names: NameTable::new(options.dictionary.as_ref()),
            options: options.clone(),
            image: None,
            owner: crate::dom::next_owner_id(),
            generation: 0,
        }
    }

    fn view(&self) -> Result<ImageView<'_>> {
        let (bytes, layout) = self
            .image
            .as_ref()
            .ok_or_else(|| DomError::invalid_state("no binary image is loaded"))?;
        Ok(ImageView {
            bytes: &bytes[..],
            layout: *layout,
        })
    }

    fn offset(&self, node: Node) -> Result<u32> {
        if node.owner != self.owner {
            return Err(DomError::invalid_state("node handle from another document"));
        }
        if node.generation != self.generation {
            return Err(DomError::invalid_state("stale node handle"));
        }
        Ok(node.slot)
    }

    fn entry(&self, node: Node) -> Result<(ImageView<'_>, Entry)> {
        let view = self.view()?;
        let entry = view.entry(self.offset(node)?)?;
        Ok((view, entry))
    }

    fn node(&self, offset: u32) -> Node {
        Node::new(self.owner, offset, self.generation)
    }

    fn name(&self, id: u32) -> Result<FieldName> {
        self.names
            .resolve(id)
            .ok_or_else(|| DomError::malformed(0, format!("field id {id} not in the dictionary")))
    }

    /// Dictionary the image's field ids resolve against.
    fn names_for(&self, view: &ImageView<'_>) -> Result<NameTable> {
        if view.layout.shared_dictionary() {
            let shared = self.options.dictionary.as_ref().ok_or_else(|| {
                DomError::invalid_state("image was encoded against a shared dictionary")
            })?;
            let known = shared.read().len();
            if view.layout.dict_count as usize > known {
                return Err(DomError::malformed(
                    6,
                    format!(
                        "image needs {} shared field names, dictionary holds {known}",
                        view.layout.dict_count
                    ),
                ));
            }
            return Ok(NameTable::Shared(shared.clone()));
        }
        let mut local = FieldDictionary::new();
        for (i, (_, name)) in view.dictionary()?.into_iter().enumerate() {
            if local.intern(name)? as usize != i + 1 {
                return Err(DomError::malformed(
                    view.layout.dict_start,
                    format!("duplicate dictionary entry {name:?}"),
                ));
            }
        }
        Ok(NameTable::Local(local))
    }
}

impl DomBackend for BinaryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Binary
    }

    fn root(&self) -> Option<Node> {
        self.image
            .as_ref()
            .map(|(_, layout)| self.node(layout.root))
    }

    fn node_type(&self, node: Node) -> Result<NodeType> {
        Ok(match self.entry(node)?.1 {
            Entry::Scalar { .. } => NodeType::Scalar,
            Entry::Object { .. } => NodeType::Object,
            Entry::Array { .. } => NodeType::Array,
        })
    }

    fn scalar(&self, node: Node) -> Result<ScalarValue<'_>> {
        match self.entry(node)? {
            (view, Entry::Scalar { kind, at }) => Ok(view.scalar(kind, at)?.0),
            _ => Err(DomError::invalid_state("node is not a scalar")),
        }
    }

    fn num_fields(&self, obj: Node) -> Result<usize> {
        match self.entry(obj)?.1 {
            Entry::Object { count, .. } => Ok(count as usize),
            _ => Err(DomError::invalid_state("node is not an object")),
        }
    }

    fn field(&self, obj: Node, name: &FieldName) -> Result<Option<Node>> {
        let (view, entry) = self.entry(obj)?;
        if !matches!(entry, Entry::Object { .. }) {
            return Err(DomError::invalid_state("node is not an object"));
        }
        let Some(id) = self.names.lookup(name) else {
            return Ok(None);
        };
        Ok(view.find_member(entry, id)?.map(|child| self.node(child)))
    }

    fn fields_batch(
        &self,
        obj: Node,
        start: usize,
        count: usize,
        out: &mut Vec<NameValuePair>,
    ) -> Result<()> {
        let (view, entry) = self.entry(obj)?;
        if !matches!(entry, Entry::Object { .. }) {
            return Err(DomError::invalid_state("node is not an object"));
        }
        let start = u32::try_from(start).unwrap_or(u32::MAX);
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        let members = view.children(entry, start, count)?;
        crate::error::reserve(out, members.len())?;
        for (id, child) in members {
            out.push(NameValuePair {
                name: self.name(id)?,
                node: self.node(child),
            });
        }
        Ok(())
    }

    fn array_size(&self, ary: Node) -> Result<usize> {
        match self.entry(ary)?.1 {
            Entry::Array { count, .. } => Ok(count as usize),
            _ => Err(DomError::invalid_state("node is not an array")),
        }
    }

    fn array_element(&self, ary: Node, index: usize) -> Result<Node> {
        let (view, entry) = self.entry(ary)?;
        let index = u32::try_from(index).unwrap_or(u32::MAX);
        Ok(self.node(view.item(entry, index)?))
    }

    fn array_batch(
        &self,
        ary: Node,
        start: usize,
        count: usize,
        out: &mut Vec<Node>,
    ) -> Result<()> {
        let (view, entry) = self.entry(ary)?;
        if !matches!(entry, Entry::Array { .. }) {
            return Err(DomError::invalid_state("node is not an array"));
        }
        let start = u32::try_from(start).unwrap_or(u32::MAX);
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        let items = view.children(entry, start, count)?;
        crate::error::reserve(out, items.len())?;
        out.extend(items.into_iter().map(|(_, child)| self.node(child)));
        Ok(())
    }

    fn parent(&self, _node: Node) -> Result<Option<Node>> {
        Err(DomError::unsupported("get_parent", "binary"))
    }

    fn store_field_name(&mut self, name: &str) -> Result<FieldName> {
        if let Some(id) = self.names.id_of(name) {
            return self.name(id);
        }
        let mut field = FieldName::new(name);
        field.flags |= FieldFlags::NOT_IN_SET;
        Ok(field)
    }

    fn dictionary_tag(&self) -> u64 {
        self.names.tag()
    }

    fn resolve_field_id(&self, id: u32) -> Option<FieldName> {
        self.names.resolve(id)
    }

    fn image(&self) -> Option<Bytes> {
        self.image.as_ref().map(|(bytes, _)| bytes.clone())
    }

    fn reset(&mut self) {
        debug!("binary document reset");
        self.image = None;
        self.names = NameTable::new(self.options.dictionary.as_ref());
        self.generation = self.generation.wrapping_add(1);
    }

    fn load_events(&mut self, source: &mut dyn EventSource<'_>) -> Result<Node> {
        let mut encoder = OsonEncoder::new(self.options.encode_options());
        let image = encoder.encode(source)?;
        self.load_image(Bytes::from(image))
    }

    fn load_image(&mut self, image: Bytes) -> Result<Node> {
        let image = if self.options.has(DomFlags::COPY_INPUT) {
            Bytes::copy_from_slice(&image)
        } else {
            image
        };
        let view = ImageView::new(&image)?;
        if self.options.has(DomFlags::VALIDATE) || self.options.has(DomFlags::VALIDATE_STRINGS) {
            validate(&view, self.options.flags)?;
        }
        if self.options.has(DomFlags::DISALLOW_SCALARS)
            && matches!(view.entry(view.layout.root)?, Entry::Scalar { .. })
        {
            return Err(DomError::malformed(0, "scalar root is not allowed"));
        }
        let names = self.names_for(&view)?;
        let layout = view.layout;
        debug!(
            bytes = image.len(),
            fields = layout.dict_count,
            streaming = layout.streaming(),
            "loaded OSON image"
        );
        self.names = names;
        self.image = Some((image, layout));
        self.generation = self.generation.wrapping_add(1);
        Ok(self.node(layout.root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::SharedDictionary;
    use crate::event::JsonValueSource;
    use serde_json::json;

    fn loaded(value: &serde_json::Value, flags: DomFlags) -> BinaryBackend {
        let mut backend = BinaryBackend::new(&DomOptions::binary().with_flags(flags));
        backend
            .load_events(&mut JsonValueSource::new(value))
            .unwrap();
        backend
    }

    #[test]
    fn lookups_by_name() {
        let b = loaded(&json!({"b": 2, "a": [1, 2, 3]}), DomFlags::empty());
        let root = b.root().unwrap();
        assert_eq!(b.node_type(root).unwrap(), NodeType::Object);
        assert_eq!(b.num_fields(root).unwrap(), 2);
        let a = b.field(root, &FieldName::new("a")).unwrap().unwrap();
        assert_eq!(b.array_size(a).unwrap(), 3);
        assert!(b.field(root, &FieldName::new("zz")).unwrap().is_none());
    }

    #[test]
    fn streaming_batches_match_indexed() {
        let doc = json!({"x": 1, "y": [true, false, null], "z": "s"});
        for flags in [DomFlags::empty(), DomFlags::STREAM_ENCODED, DomFlags::NO_SORT_FIELD_IDS] {
            let b = loaded(&doc, flags);
            let root = b.root().unwrap();
            let mut first = Vec::new();
            b.fields_batch(root, 0, 2, &mut first).unwrap();
            b.fields_batch(root, 2, 2, &mut first).unwrap();
            let mut names: Vec<&str> = first.iter().map(|p| p.name.name()).collect();
            names.sort_unstable();
            assert_eq!(names, vec!["x", "y", "z"]);
        }
    }

    #[test]
    fn mutations_are_unsupported() {
        let mut b = loaded(&json!([1]), DomFlags::empty());
        let root = b.root().unwrap();
        let err = b.new_object(0).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Unsupported);
        assert_eq!(
            b.put_item(root, root, 0).unwrap_err().kind(),
            crate::ErrorKind::Unsupported
        );
        assert_eq!(b.parent(root).unwrap_err().kind(), crate::ErrorKind::Unsupported);
    }

    #[test]
    fn reset_retires_handles() {
        let mut b = loaded(&json!({"a": 1}), DomFlags::empty());
        let root = b.root().unwrap();
        b.reset();
        assert!(b.root().is_none());
        assert!(b.node_type(root).is_err());
    }

    #[test]
    fn unknown_names_are_flagged() {
        let mut b = loaded(&json!({"a": 1}), DomFlags::empty());
        assert!(b.store_field_name("a").unwrap().is_resolved());
        let missing = b.store_field_name("b").unwrap();
        assert!(missing.flags.contains(FieldFlags::NOT_IN_SET));
    }

    #[test]
    fn shared_dictionary_is_required_for_set_images() {
        let dict = SharedDictionary::new();
        let mut writer = BinaryBackend::new(&DomOptions::binary().with_dictionary(dict.clone()));
        writer
            .load_events(&mut JsonValueSource::new(&json!({"k": 1})))
            .unwrap();
        let image = writer.image().unwrap();
        let mut plain = BinaryBackend::new(&DomOptions::binary());
        assert_eq!(
            plain.load_image(image.clone()).unwrap_err().kind(),
            crate::ErrorKind::InvalidState
        );
        let mut sharing = BinaryBackend::new(&DomOptions::binary().with_dictionary(dict));
        let root = sharing.load_image(image).unwrap();
        assert!(sharing.field(root, &FieldName::new("k")).unwrap().is_some());
    }
}
