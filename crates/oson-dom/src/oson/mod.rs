//! OSON: a compact binary JSON encoding with a field-name dictionary,
//! per-object field id tables for binary search, and inline storage for
//! short values.

mod backend;
mod encoder;
pub(crate) mod image;
mod patch;
mod source;
mod validate;

use bytes::Bytes;

pub(crate) use backend::BinaryBackend;
pub use encoder::{EncodeOptions, OsonEncoder};
pub use patch::{OsonPatcher, PatchMode, Step};
pub use source::OsonEventSource;

use crate::config::{DomFlags, DomOptions};
use crate::event::{pump, EventSource, EventWriter, JsonValueSource};
use crate::{DomError, Result};

/// Encodes a whole event stream into a new image.
pub fn encode_events(source: &mut dyn EventSource<'_>, options: &EncodeOptions) -> Result<Vec<u8>> {
    OsonEncoder::new(options.clone()).encode(source)
}

/// Encodes into a caller-sized buffer and returns the number of bytes used.
/// A buffer that is too small yields `BufferTooSmall` with the size needed.
pub fn encode_into(
    source: &mut dyn EventSource<'_>,
    options: &EncodeOptions,
    out: &mut [u8],
) -> Result<usize> {
    let image = encode_events(source, options)?;
    let target = out
        .get_mut(..image.len())
        .ok_or(DomError::BufferTooSmall {
            required: image.len(),
        })?;
    target.copy_from_slice(&image);
    Ok(image.len())
}

pub fn encode_value(value: &serde_json::Value, options: &EncodeOptions) -> Result<Vec<u8>> {
    encode_events(&mut JsonValueSource::new(value), options)
}

/// Replays a validated image into `writer`, finishing with `End`.
pub fn decode_events(image: impl Into<Bytes>, writer: &mut dyn EventWriter) -> Result<()> {
    let options = DomOptions::binary().with_flags(DomFlags::VALIDATE);
    let mut source = OsonEventSource::new(image, &options)?;
    pump(&mut source, writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RecordedSource;
    use serde_json::json;

    #[test]
    fn encode_into_reports_required_size() {
        let value = json!({"name": "value", "list": [1, 2, 3]});
        let options = EncodeOptions::default();
        let expected = encode_value(&value, &options).unwrap();
        let mut small = [0u8; 4];
        let err = encode_into(&mut JsonValueSource::new(&value), &options, &mut small).unwrap_err();
        assert_eq!(
            err,
            DomError::BufferTooSmall {
                required: expected.len()
            }
        );
        let mut big = vec![0u8; expected.len() + 10];
        let used = encode_into(&mut JsonValueSource::new(&value), &options, &mut big).unwrap();
        assert_eq!(&big[..used], &expected[..]);
    }

    #[test]
    fn decode_replays_the_events() {
        let value = json!({"a": [true, {"b": null}]});
        let image = encode_value(&value, &EncodeOptions::default()).unwrap();
        let mut writer = crate::print::PrintContext::new(crate::print::PrintOptions::default());
        decode_events(image.clone(), &mut writer).unwrap();
        assert_eq!(writer.get_buffer(), br#"{"a":[true,{"b":null}]}"#);
        let mut source = OsonEventSource::new(image, &DomOptions::binary()).unwrap();
        let recorded = RecordedSource::record(&mut source).unwrap();
        assert_eq!(recorded.events().len(), 11);
    }
}
