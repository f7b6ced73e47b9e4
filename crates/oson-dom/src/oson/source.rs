use bytes::Bytes;

use crate::config::{BackendKind, DomOptions};
use crate::dom::{Document, WalkState};
use crate::event::{EventKind, EventRecord, EventSource, Input};
use crate::Result;

/// Event source over an OSON image, for feeding a binary document into any
/// [`crate::event::EventWriter`]. Records come out owned; walk a binary
/// [`Document`] directly to borrow payloads from the image instead.
pub struct OsonEventSource {
    doc: Document,
    state: WalkState,
}

impl std::fmt::Debug for OsonEventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OsonEventSource")
            .field("doc", &self.doc)
            .finish_non_exhaustive()
    }
}

impl OsonEventSource {
    /// Maps `image` under `options` (the backend choice is ignored).
    pub fn new(image: impl Into<Bytes>, options: &DomOptions) -> Result<Self> {
        let mut doc = Document::new(DomOptions {
            backend: BackendKind::Binary,
            ..options.clone()
        });
        let root = doc.load_from_binary_image(image)?;
        Ok(Self {
            doc,
            state: WalkState::new(Some(root)),
        })
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }
}

impl EventSource<'static> for OsonEventSource {
    fn next_event(&mut self) -> Result<EventRecord<'static>> {
        self.state.step(&self.doc).map(EventRecord::into_owned)
    }

    fn last_kind(&self) -> Option<EventKind> {
        self.state.last_kind()
    }

    fn reset(&mut self) {
        self.state.reset();
    }

    fn source_name(&self) -> &'static str {
        "OSON"
    }

    fn set_input(&mut self, input: Input) -> Result<()> {
        let bytes = input.into_bytes()?;
        let root = self.doc.load_from_binary_image(bytes)?;
        self.state.restart(Some(root));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DomFlags;
    use crate::oson::{encode_value, EncodeOptions};
    use crate::scalar::ScalarValue;
    use serde_json::json;
    use std::borrow::Cow;

    #[test]
    fn skip_event_passes_over_a_member() {
        let image = encode_value(&json!({"a": [1, 2, 3], "b": true}), &EncodeOptions::default())
            .unwrap();
        let mut source = OsonEventSource::new(image, &DomOptions::binary()).unwrap();
        assert_eq!(source.next_event().unwrap(), EventRecord::StartObject);
        assert_eq!(source.next_event().unwrap(), EventRecord::Key(Cow::Borrowed("a")));
        source.skip_event().unwrap();
        assert_eq!(source.next_event().unwrap(), EventRecord::Key(Cow::Borrowed("b")));
        assert_eq!(
            source.next_event().unwrap(),
            EventRecord::Item(ScalarValue::Bool(true))
        );
    }

    #[test]
    fn set_input_switches_images() {
        let first = encode_value(&json!(1), &EncodeOptions::default()).unwrap();
        let second = encode_value(&json!([null]), &EncodeOptions::default()).unwrap();
        let options = DomOptions::binary().with_flags(DomFlags::VALIDATE);
        let mut source = OsonEventSource::new(first, &options).unwrap();
        assert!(format!("{source:?}").starts_with("OsonEventSource"));
        assert_eq!(source.next_event().unwrap(), EventRecord::Item(ScalarValue::Int64(1)));
        source.set_input(Input::Buffer(second)).unwrap();
        assert_eq!(source.next_event().unwrap(), EventRecord::StartArray);
        source.reset();
        assert_eq!(source.next_event().unwrap(), EventRecord::StartArray);
    }

    #[test]
    fn garbage_input_is_rejected() {
        let err = OsonEventSource::new(vec![1u8, 2, 3], &DomOptions::binary()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::MalformedInput);
    }
}
