use std::borrow::Cow;
use std::io::Write;

use indexmap::IndexMap;
use oson_buffers::Writer;
use tracing::{debug, trace};

use super::image::{
    fixed_width, FLAG_SHARED_DICTIONARY, FLAG_SORTED, FLAG_STREAMING, HEADER_LEN, MAGIC,
    OUT_OF_LINE, TAG_ARRAY, TAG_OBJECT, TAG_SCALAR, VERSION,
};
use crate::config::NumberEncoding;
use crate::dom::{field_hash, NameTable, SharedDictionary};
use crate::event::{pump, EventRecord, EventSource, EventWriter, OrderCheck, Output};
use crate::scalar::{temporal, ScalarValue, INLINE_MAX};
use crate::{DomError, Result};

/// Settings for [`OsonEncoder`].
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Sort each object's field ids so readers can binary search.
    pub sort_field_ids: bool,
    /// Nest children inline without lookup tables.
    pub streaming: bool,
    /// Resolve field ids against a dictionary shared by a set of images.
    pub dictionary: Option<SharedDictionary>,
    /// Policy applied to textual numbers on the way in.
    pub numbers: NumberEncoding,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            sort_field_ids: true,
            streaming: false,
            dictionary: None,
            numbers: NumberEncoding::Text,
        }
    }
}

enum Frame {
    /// `start` is the container's own offset (streaming only); `header` the
    /// position of its reserved count slot.
    Object {
        members: IndexMap<u32, u32>,
        key: Option<u32>,
        start: u32,
        header: usize,
    },
    Array {
        items: Vec<u32>,
        start: u32,
        header: usize,
    },
}

/// Encodes an event stream into an OSON image.
///
/// Works as an [`EventWriter`]: feed it events through `End` and the image
/// becomes available from [`EventWriter::get_buffer`] or
/// [`OsonEncoder::take_image`].
pub struct OsonEncoder {
    options: EncodeOptions,
    tree: Writer,
    values: Writer,
    names: NameTable,
    stack: Vec<Frame>,
    order: OrderCheck,
    root: Option<u32>,
    limit: Option<usize>,
    sink: Option<Box<dyn Write + Send>>,
    image: Vec<u8>,
    pending_flush: bool,
}

impl Default for OsonEncoder {
    fn default() -> Self {
        Self::new(EncodeOptions::default())
    }
}

impl OsonEncoder {
    pub fn new(options: EncodeOptions) -> Self {
        let names = NameTable::new(options.dictionary.as_ref());
        Self {
            options,
            tree: Writer::new(),
            values: Writer::new(),
            names,
            stack: Vec::new(),
            order: OrderCheck::new(),
            root: None,
            limit: None,
            sink: None,
            image: Vec::new(),
            pending_flush: false,
        }
    }

    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Drains `source` through `End` and returns the image.
    pub fn encode(&mut self, source: &mut dyn EventSource<'_>) -> Result<Vec<u8>> {
        self.reset();
        pump(source, self)?;
        Ok(self.take_image())
    }

    pub fn take_image(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.image)
    }

    fn offset(&self) -> Result<u32> {
        u32::try_from(self.tree.position())
            .map_err(|_| DomError::OutOfMemory("OSON tree segment exceeds 4 GiB".into()))
    }

    fn streaming(&self) -> bool {
        self.options.streaming
    }

    /// Writes the pending field id ahead of an inline member.
    fn begin_value(&mut self) -> Result<()> {
        if !self.streaming() {
            return Ok(());
        }
        if let Some(Frame::Object { members, key, .. }) = self.stack.last_mut() {
            let id = key
                .take()
                .ok_or_else(|| DomError::invalid_state("object value without a key"))?;
            if members.contains_key(&id) {
                return Err(DomError::malformed(
                    0,
                    "duplicate field name in a streaming image",
                ));
            }
            members.insert(id, 0);
            self.tree.u32(id);
        }
        Ok(())
    }

    /// Registers a finished value at `offset` with its container.
    fn value_done(&mut self, offset: u32) -> Result<()> {
        match self.stack.last_mut() {
            None => self.root = Some(offset),
            Some(Frame::Object { members, key, .. }) => {
                if let Some(id) = key.take() {
                    members.try_reserve(1).map_err(|_| {
                        DomError::OutOfMemory("object member table growth failed".into())
                    })?;
                    members.insert(id, offset);
                }
            }
            Some(Frame::Array { items, .. }) => {
                crate::error::reserve(items, 1)?;
                items.push(offset);
            }
        }
        Ok(())
    }

    fn start_container(&mut self, object: bool) -> Result<()> {
        self.begin_value()?;
        let start = self.offset()?;
        let header = if self.streaming() {
            self.tree.u8(if object { TAG_OBJECT } else { TAG_ARRAY });
            let header = self.tree.reserve_u32();
            self.tree.reserve_u32();
            header
        } else {
            0
        };
        let frame = if object {
            Frame::Object {
                members: IndexMap::new(),
                key: None,
                start,
                header,
            }
        } else {
            Frame::Array {
                items: Vec::new(),
                start,
                header,
            }
        };
        self.stack.push(frame);
        Ok(())
    }

    fn end_container(&mut self) -> Result<()> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| DomError::invalid_state("container end without a start"))?;
        let offset = if self.streaming() {
            let (start, header, count) = match &frame {
                Frame::Object {
                    members,
                    start,
                    header,
                    ..
                } => (*start, *header, members.len()),
                Frame::Array {
                    items,
                    start,
                    header,
                } => (*start, *header, items.len()),
            };
            let body_len = self.tree.position() - (header + 8);
            self.tree.patch_u32(header, count as u32);
            self.tree.patch_u32(header + 4, body_len as u32);
            start
        } else {
            let offset = self.offset()?;
            match frame {
                Frame::Object { members, .. } => {
                    let mut members: Vec<(u32, u32)> = members.into_iter().collect();
                    if self.options.sort_field_ids {
                        members.sort_unstable_by_key(|(id, _)| *id);
                    }
                    self.tree.u8(TAG_OBJECT);
                    self.tree.u32(members.len() as u32);
                    for (id, _) in &members {
                        self.tree.u32(*id);
                    }
                    for (_, child) in &members {
                        self.tree.u32(*child);
                    }
                    trace!(offset, fields = members.len(), "encoded object");
                }
                Frame::Array { items, .. } => {
                    self.tree.u8(TAG_ARRAY);
                    self.tree.u32(items.len() as u32);
                    for child in &items {
                        self.tree.u32(*child);
                    }
                    trace!(offset, items = items.len(), "encoded array");
                }
            }
            offset
        };
        self.value_done(offset)
    }

    fn write_scalar(&mut self, value: &ScalarValue<'_>) -> Result<()> {
        self.begin_value()?;
        let value = value.borrowed().with_number_encoding(self.options.numbers);
        let offset = self.offset()?;
        let kind = value.kind();
        self.tree.u8(TAG_SCALAR | kind.code());
        if fixed_width(kind).is_some() {
            match value {
                ScalarValue::Int32(v) => self.tree.i32(v),
                ScalarValue::UInt32(v) => self.tree.u32(v),
                ScalarValue::Float(v) => self.tree.f32(v),
                ScalarValue::Int64(v) => self.tree.i64(v),
                ScalarValue::UInt64(v) => self.tree.u64(v),
                ScalarValue::Double(v) => self.tree.f64(v),
                _ => {}
            }
        } else {
            let payload = variable_payload(&value);
            let len = payload.len();
            if len <= INLINE_MAX {
                self.tree.u8(len as u8);
                self.tree.buf(&payload);
            } else {
                let at = u32::try_from(self.values.position()).map_err(|_| {
                    DomError::OutOfMemory("OSON value segment exceeds 4 GiB".into())
                })?;
                let len = u32::try_from(len)
                    .map_err(|_| DomError::OutOfMemory("scalar payload exceeds 4 GiB".into()))?;
                self.values.buf(&payload);
                self.tree.u8(OUT_OF_LINE);
                self.tree.u32(at);
                self.tree.u32(len);
            }
        }
        self.value_done(offset)
    }

    fn finish(&mut self) -> Result<()> {
        let root = self
            .root
            .ok_or_else(|| DomError::malformed(0, "event stream holds no value"))?;
        for writer in [&self.tree, &self.values] {
            if let Some(err) = writer.error() {
                return Err(err.clone().into());
            }
        }
        let mut flags = 0u16;
        if self.options.sort_field_ids && !self.streaming() {
            flags |= FLAG_SORTED;
        }
        if self.streaming() {
            flags |= FLAG_STREAMING;
        }
        let mut dict = Writer::new();
        let dict_count = match &self.names {
            NameTable::Local(names) => {
                for name in names.names() {
                    dict.u32(field_hash(name.as_bytes()));
                    dict.u16(name.len() as u16);
                    dict.buf(name.as_bytes());
                }
                names.len()
            }
            NameTable::Shared(shared) => {
                flags |= FLAG_SHARED_DICTIONARY;
                shared.read().len()
            }
        };
        let dict = dict.finish()?;
        let tree = self.tree.written();
        let values = self.values.written();
        let total = HEADER_LEN + dict.len() + tree.len() + values.len();
        if let Some(limit) = self.limit {
            if total > limit {
                return Err(DomError::BufferTooSmall { required: total });
            }
        }
        let mut out = Writer::with_alloc_size(total);
        out.buf(MAGIC);
        out.u8(VERSION);
        out.u16(flags);
        out.u32(dict_count as u32);
        out.u32(dict.len() as u32);
        out.u32(tree.len() as u32);
        out.u32(values.len() as u32);
        out.u32(root);
        out.buf(&dict);
        out.buf(tree);
        out.buf(values);
        self.image = out.finish()?;
        self.pending_flush = true;
        debug!(
            bytes = self.image.len(),
            fields = dict_count,
            streaming = self.streaming(),
            "encoded OSON image"
        );
        Ok(())
    }
}

/// Bytes stored for a length-prefixed scalar.
fn variable_payload<'v>(value: &'v ScalarValue<'_>) -> Cow<'v, [u8]> {
    match value {
        ScalarValue::String(s) | ScalarValue::Number(s) => Cow::Borrowed(s.as_bytes()),
        ScalarValue::Timestamp(t) => Cow::Owned(temporal::encode_timestamp(t).to_vec()),
        other => Cow::Borrowed(other.as_bytes().unwrap_or(&[])),
    }
}

impl EventWriter for OsonEncoder {
    fn reset(&mut self) {
        self.tree.clear();
        self.values.clear();
        self.names = NameTable::new(self.options.dictionary.as_ref());
        self.stack.clear();
        self.order.reset();
        self.root = None;
        self.image.clear();
        self.pending_flush = false;
    }

    fn set_output(&mut self, output: Output) -> Result<()> {
        self.limit = None;
        self.sink = None;
        match output {
            Output::Buffer(limit) => self.limit = Some(limit),
            Output::Extensible => {}
            Output::Stream(sink) => self.sink = Some(sink),
        }
        Ok(())
    }

    fn write_event(&mut self, event: &EventRecord<'_>) -> Result<()> {
        self.order.check(event.kind())?;
        match event {
            EventRecord::StartObject => self.start_container(true),
            EventRecord::StartArray => self.start_container(false),
            EventRecord::EndObject | EventRecord::EndArray => self.end_container(),
            EventRecord::Key(name) => {
                let id = self.names.intern(name)?;
                if let Some(Frame::Object { key, .. }) = self.stack.last_mut() {
                    *key = Some(id);
                }
                Ok(())
            }
            EventRecord::Item(value) => self.write_scalar(value),
            EventRecord::Error(msg) => Err(DomError::malformed(0, msg.to_string())),
            EventRecord::End => self.finish(),
            _ => Ok(()),
        }
    }

    fn flush(&mut self) -> Result<()> {
        if !self.pending_flush {
            return Ok(());
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.write_all(&self.image)
                .and_then(|_| sink.flush())
                .map_err(|e| DomError::invalid_state(format!("output stream failed: {e}")))?;
        }
        self.pending_flush = false;
        Ok(())
    }

    fn get_buffer(&self) -> &[u8] {
        &self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, RecordedSource};
    use crate::oson::image::{Entry, ImageView};
    use std::borrow::Cow;

    fn key(k: &str) -> EventRecord<'_> {
        EventRecord::Key(Cow::Borrowed(k))
    }

    fn sample() -> RecordedSource<'static> {
        RecordedSource::new(vec![
            EventRecord::StartObject,
            key("zeta"),
            EventRecord::Item(ScalarValue::Int32(1)),
            key("alpha"),
            EventRecord::StartArray,
            EventRecord::Item(ScalarValue::string("a string longer than fifteen")),
            EventRecord::Item(ScalarValue::Null),
            EventRecord::EndArray,
            EventRecord::EndObject,
        ])
    }

    #[test]
    fn indexed_image_sorts_field_ids() {
        let image = OsonEncoder::default().encode(&mut sample()).unwrap();
        let view = ImageView::new(&image).unwrap();
        assert!(view.layout.sorted());
        let root = view.entry(view.layout.root).unwrap();
        assert!(matches!(root, Entry::Object { count: 2, .. }));
        // "zeta" was seen first and got id 1
        assert_eq!(view.member(root, 0).unwrap().0, 1);
        assert_eq!(view.dictionary().unwrap()[1].1, "alpha");
        let list = view.find_member(root, 2).unwrap().unwrap();
        let list = view.entry(list).unwrap();
        let first = view.entry(view.item(list, 0).unwrap()).unwrap();
        let Entry::Scalar { kind, at } = first else {
            panic!("expected a scalar");
        };
        let (value, _) = view.scalar(kind, at).unwrap();
        assert_eq!(value, ScalarValue::string("a string longer than fifteen"));
    }

    #[test]
    fn streaming_image_keeps_encounter_order() {
        let options = EncodeOptions {
            streaming: true,
            ..EncodeOptions::default()
        };
        let image = OsonEncoder::new(options).encode(&mut sample()).unwrap();
        let view = ImageView::new(&image).unwrap();
        assert!(view.layout.streaming());
        assert_eq!(view.layout.root, 0);
        let root = view.entry(0).unwrap();
        assert_eq!(view.member(root, 1).unwrap().0, 2);
        assert!(view.find_member(root, 1).unwrap().is_some());
        assert!(view.find_member(root, 9).unwrap().is_none());
    }

    #[test]
    fn duplicate_keys_keep_the_last_value() {
        let mut src = RecordedSource::new(vec![
            EventRecord::StartObject,
            key("a"),
            EventRecord::Item(ScalarValue::Int32(1)),
            key("a"),
            EventRecord::Item(ScalarValue::Int32(2)),
            EventRecord::EndObject,
        ]);
        let image = OsonEncoder::default().encode(&mut src).unwrap();
        let view = ImageView::new(&image).unwrap();
        let root = view.entry(view.layout.root).unwrap();
        assert!(matches!(root, Entry::Object { count: 1, .. }));
        let Entry::Scalar { kind, at } = view.entry(view.member(root, 0).unwrap().1).unwrap()
        else {
            panic!("expected a scalar");
        };
        assert_eq!(view.scalar(kind, at).unwrap().0, ScalarValue::Int32(2));
    }

    #[test]
    fn fixed_output_buffer_reports_required_size() {
        let mut enc = OsonEncoder::default();
        enc.set_output(Output::Buffer(8)).unwrap();
        let err = pump(&mut sample(), &mut enc).unwrap_err();
        assert!(matches!(err, DomError::BufferTooSmall { required } if required > 8));
    }

    #[test]
    fn empty_stream_is_rejected() {
        let mut enc = OsonEncoder::default();
        let err = enc.write_event(&EventRecord::End).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::MalformedInput);
        assert_eq!(EventKind::End, EventRecord::End.kind());
    }
}
