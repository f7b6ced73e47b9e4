use std::borrow::Cow;
use std::io::Write;

use super::{EventKind, EventRecord, EventSource};
use crate::scalar::ScalarValue;
use crate::Result;

/// Where an event writer puts its output.
pub enum Output {
    /// Fixed capacity; exceeding it fails with `BufferTooSmall`.
    Buffer(usize),
    /// Grows as needed.
    Extensible,
    /// Buffered, then written through on `flush`.
    Stream(Box<dyn Write + Send>),
}

impl std::fmt::Debug for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Output::Buffer(n) => write!(f, "Output::Buffer({n})"),
            Output::Extensible => f.write_str("Output::Extensible"),
            Output::Stream(_) => f.write_str("Output::Stream"),
        }
    }
}

/// A push-style consumer of events, typically a serializer.
pub trait EventWriter {
    fn reset(&mut self);

    fn set_output(&mut self, output: Output) -> Result<()>;

    fn write_event(&mut self, event: &EventRecord<'_>) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    /// Bytes produced so far into a buffer output.
    fn get_buffer(&self) -> &[u8];

    fn push_event(&mut self, kind: EventKind, value: Option<ScalarValue<'_>>) -> Result<()> {
        let event = EventRecord::from_parts(kind, value)?;
        self.write_event(&event)
    }

    fn start_object(&mut self) -> Result<()> {
        self.write_event(&EventRecord::StartObject)
    }

    fn end_object(&mut self) -> Result<()> {
        self.write_event(&EventRecord::EndObject)
    }

    fn start_array(&mut self) -> Result<()> {
        self.write_event(&EventRecord::StartArray)
    }

    fn end_array(&mut self) -> Result<()> {
        self.write_event(&EventRecord::EndArray)
    }

    fn key(&mut self, name: &str) -> Result<()> {
        self.write_event(&EventRecord::Key(Cow::Borrowed(name)))
    }

    fn scalar(&mut self, value: ScalarValue<'_>) -> Result<()> {
        self.write_event(&EventRecord::Item(value))
    }

    fn end(&mut self) -> Result<()> {
        self.write_event(&EventRecord::End)?;
        self.flush()
    }
}

/// Copies every event from `source` into `writer` through `End`, then
/// flushes the writer.
pub fn pump<'a>(source: &mut dyn EventSource<'a>, writer: &mut dyn EventWriter) -> Result<()> {
    loop {
        let event = source.next_event()?;
        writer.write_event(&event)?;
        if event.kind() == EventKind::End {
            return writer.flush();
        }
    }
}
