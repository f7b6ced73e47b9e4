use std::fs;
use std::io::Read;
use std::path::PathBuf;

use super::{EventKind, EventRecord};
use crate::{DomError, Result};

/// Where an event source reads its bytes from.
pub enum Input {
    Buffer(Vec<u8>),
    Stream(Box<dyn Read + Send>),
    File(PathBuf),
}

impl Input {
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Input::Buffer(bytes) => Ok(bytes),
            Input::Stream(mut reader) => {
                let mut out = Vec::new();
                reader
                    .read_to_end(&mut out)
                    .map_err(|e| DomError::invalid_state(format!("input stream failed: {e}")))?;
                Ok(out)
            }
            Input::File(path) => fs::read(&path).map_err(|e| {
                DomError::NotFound(format!("cannot read {}: {e}", path.display()))
            }),
        }
    }
}

impl std::fmt::Debug for Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Input::Buffer(b) => write!(f, "Input::Buffer({} bytes)", b.len()),
            Input::Stream(_) => f.write_str("Input::Stream"),
            Input::File(p) => write!(f, "Input::File({})", p.display()),
        }
    }
}

/// Target character set for [`EventSource::convert_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharEncoding {
    Utf8,
    Utf16Be,
    Utf16Le,
}

/// A pull-style producer of [`EventRecord`]s.
///
/// The stream obeys the event grammar: one root value, every object member
/// introduced by a `Key`, balanced containers, then a single `End`. Reading
/// past `End` is an error.
pub trait EventSource<'a> {
    fn next_event(&mut self) -> Result<EventRecord<'a>>;

    /// Kind of the most recently returned event.
    fn last_kind(&self) -> Option<EventKind>;

    /// Rewinds to the beginning of the current input.
    fn reset(&mut self);

    /// Short name used in error messages.
    fn source_name(&self) -> &'static str {
        "event source"
    }

    fn set_input(&mut self, input: Input) -> Result<()> {
        let _ = input;
        Err(DomError::unsupported("set_input", self.source_name()))
    }

    /// Skips the value named by the Key just returned.
    fn skip_event(&mut self) -> Result<()> {
        if self.last_kind() != Some(EventKind::Key) {
            return Err(DomError::invalid_state(
                "skip_event is only valid right after a Key event",
            ));
        }
        let mut depth = 0usize;
        loop {
            let kind = self.next_event()?.kind();
            match kind {
                EventKind::StartObject | EventKind::StartArray => depth += 1,
                EventKind::EndObject | EventKind::EndArray => {
                    if depth == 0 {
                        return Err(DomError::malformed(0, "container closed before its value"));
                    }
                    depth -= 1;
                }
                EventKind::End => {
                    return Err(DomError::malformed(0, "stream ended inside a skipped value"))
                }
                k if k.is_marker() => continue,
                _ => {}
            }
            if depth == 0 {
                return Ok(());
            }
        }
    }

    /// Skips to the end of the innermost open container, consuming its
    /// closing event.
    fn skip_object(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.next_event()?.kind() {
                EventKind::StartObject | EventKind::StartArray => depth += 1,
                EventKind::EndObject | EventKind::EndArray => {
                    if depth == 0 {
                        return Ok(());
                    }
                    depth -= 1;
                }
                EventKind::End => {
                    return Err(DomError::invalid_state("skip_object outside any container"))
                }
                _ => {}
            }
        }
    }

    /// Switches validate-only mode and returns the previous setting.
    /// Sources without such a mode ignore the request.
    fn validate_only(&mut self, on: bool) -> bool {
        let _ = on;
        false
    }

    /// Restricts the top-level object members the source reports.
    /// `None` removes the restriction.
    fn set_field_list(&mut self, names: Option<&[&str]>) -> Result<()> {
        let _ = names;
        Err(DomError::unsupported("set_field_list", self.source_name()))
    }

    /// Re-encodes the text payload of `record` (a Key, string Item or
    /// Error) in `encoding`. Records without text yield `None`.
    fn convert_event(
        &self,
        record: &EventRecord<'_>,
        encoding: CharEncoding,
    ) -> Result<Option<Vec<u8>>> {
        let text: &str = match record {
            EventRecord::Key(k) => k.as_ref(),
            EventRecord::Error(m) => m.as_ref(),
            EventRecord::Item(v) => match v.as_str() {
                Some(s) => s,
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
        Ok(Some(match encoding {
            CharEncoding::Utf8 => text.as_bytes().to_vec(),
            CharEncoding::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            CharEncoding::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
        }))
    }
}

/// Replays a recorded event list.
#[derive(Debug, Clone, Default)]
pub struct RecordedSource<'a> {
    events: Vec<EventRecord<'a>>,
    next: usize,
    last: Option<EventKind>,
}

impl<'a> RecordedSource<'a> {
    /// An `End` is appended when the list does not already finish with one.
    pub fn new(mut events: Vec<EventRecord<'a>>) -> Self {
        if events.last().map(EventRecord::kind) != Some(EventKind::End) {
            events.push(EventRecord::End);
        }
        Self {
            events,
            next: 0,
            last: None,
        }
    }

    /// Drains `source` up to and including its `End`.
    pub fn record(source: &mut dyn EventSource<'a>) -> Result<Self> {
        let mut events = Vec::new();
        loop {
            let event = source.next_event()?;
            let done = event.kind() == EventKind::End;
            events.push(event);
            if done {
                return Ok(Self::new(events));
            }
        }
    }

    pub fn events(&self) -> &[EventRecord<'a>] {
        &self.events
    }

    /// Detaches the recording from whatever it borrowed.
    pub fn into_owned(self) -> RecordedSource<'static> {
        RecordedSource {
            events: self.events.into_iter().map(EventRecord::into_owned).collect(),
            next: self.next,
            last: self.last,
        }
    }
}

impl<'a> EventSource<'a> for RecordedSource<'a> {
    fn next_event(&mut self) -> Result<EventRecord<'a>> {
        let event = self
            .events
            .get(self.next)
            .cloned()
            .ok_or_else(|| DomError::invalid_state("read past the End event"))?;
        self.next += 1;
        self.last = Some(event.kind());
        Ok(event)
    }

    fn last_kind(&self) -> Option<EventKind> {
        self.last
    }

    fn reset(&mut self) {
        self.next = 0;
        self.last = None;
    }

    fn source_name(&self) -> &'static str {
        "recorded"
    }
}

impl<'a> From<Vec<EventRecord<'a>>> for RecordedSource<'a> {
    fn from(events: Vec<EventRecord<'a>>) -> Self {
        Self::new(events)
    }
}
