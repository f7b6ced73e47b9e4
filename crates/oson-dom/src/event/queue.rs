use tracing::trace;

use super::{EventKind, EventRecord, EventSource, Input};
use crate::{DomError, Result};

/// A saved replay position inside one recording window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bookmark {
    window: u64,
    index: usize,
}

/// Lookahead and replay over another [`EventSource`].
///
/// While recording, every event pulled from the inner source is kept.
/// `rewind` and `rewind_to` replay kept events (as clones) before any new
/// event is read. Once recording stops and the replay catches up, the kept
/// events are dropped.
pub struct EventQueue<'a, S: EventSource<'a>> {
    source: S,
    buffer: Vec<EventRecord<'a>>,
    /// Index of the next buffered event to hand out.
    cursor: usize,
    recording: bool,
    /// Bumped whenever a new recording window opens.
    window: u64,
    window_open: bool,
    last: Option<EventKind>,
}

impl<'a, S: EventSource<'a>> EventQueue<'a, S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            buffer: Vec::new(),
            cursor: 0,
            recording: false,
            window: 0,
            window_open: false,
            last: None,
        }
    }

    pub fn inner(&self) -> &S {
        &self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Opens a new recording window at the current position. Events already
    /// buffered but not yet replayed stay queued.
    pub fn start_recording(&mut self) {
        self.buffer.drain(..self.cursor);
        self.cursor = 0;
        self.recording = true;
        self.window_open = true;
        self.window += 1;
        trace!(window = self.window, queued = self.buffer.len(), "recording started");
    }

    pub fn stop_recording(&mut self) {
        self.recording = false;
        self.compact();
    }

    /// Replays the current window from its beginning.
    pub fn rewind(&mut self) -> Result<()> {
        if !self.window_open {
            return Err(DomError::invalid_state("rewind without a recording window"));
        }
        self.cursor = 0;
        Ok(())
    }

    /// Position of the next event within the current window.
    pub fn bookmark(&self) -> Result<Bookmark> {
        if !self.window_open {
            return Err(DomError::invalid_state("bookmark without a recording window"));
        }
        Ok(Bookmark {
            window: self.window,
            index: self.cursor,
        })
    }

    pub fn rewind_to(&mut self, bookmark: Bookmark) -> Result<()> {
        if !self.window_open || bookmark.window != self.window || bookmark.index > self.buffer.len()
        {
            return Err(DomError::invalid_state(
                "bookmark does not belong to the current recording window",
            ));
        }
        self.cursor = bookmark.index;
        Ok(())
    }

    /// Kind of the next event without consuming it.
    pub fn check_next(&mut self) -> Result<EventKind> {
        if let Some(event) = self.buffer.get(self.cursor) {
            return Ok(event.kind());
        }
        let event = self.source.next_event()?;
        let kind = event.kind();
        crate::error::reserve(&mut self.buffer, 1)?;
        self.buffer.push(event);
        Ok(kind)
    }

    /// Drops replayed events once nothing can rewind to them.
    fn compact(&mut self) {
        if !self.recording && self.cursor >= self.buffer.len() && !self.buffer.is_empty() {
            self.buffer.clear();
            self.cursor = 0;
            self.window_open = false;
        }
    }
}

impl<'a, S: EventSource<'a>> EventSource<'a> for EventQueue<'a, S> {
    fn next_event(&mut self) -> Result<EventRecord<'a>> {
        let event = if let Some(event) = self.buffer.get(self.cursor) {
            let event = event.clone();
            self.cursor += 1;
            event
        } else {
            let event = self.source.next_event()?;
            if self.recording {
                crate::error::reserve(&mut self.buffer, 1)?;
                self.buffer.push(event.clone());
                self.cursor += 1;
            }
            event
        };
        self.last = Some(event.kind());
        self.compact();
        Ok(event)
    }

    fn last_kind(&self) -> Option<EventKind> {
        self.last
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.recording = false;
        self.window_open = false;
        self.last = None;
        self.source.reset();
    }

    fn source_name(&self) -> &'static str {
        self.source.source_name()
    }

    fn set_input(&mut self, input: Input) -> Result<()> {
        self.source.set_input(input)?;
        self.buffer.clear();
        self.cursor = 0;
        self.recording = false;
        self.window_open = false;
        self.last = None;
        Ok(())
    }

    fn validate_only(&mut self, on: bool) -> bool {
        self.source.validate_only(on)
    }

    fn set_field_list(&mut self, names: Option<&[&str]>) -> Result<()> {
        self.source.set_field_list(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RecordedSource;
    use crate::scalar::ScalarValue;

    fn item(v: i32) -> EventRecord<'static> {
        EventRecord::Item(ScalarValue::Int32(v))
    }

    fn source() -> RecordedSource<'static> {
        RecordedSource::new(vec![
            EventRecord::StartArray,
            item(1),
            item(2),
            item(3),
            EventRecord::EndArray,
        ])
    }

    #[test]
    fn check_next_does_not_consume() {
        let mut q = EventQueue::new(source());
        assert_eq!(q.check_next().unwrap(), EventKind::StartArray);
        assert_eq!(q.check_next().unwrap(), EventKind::StartArray);
        assert_eq!(q.next_event().unwrap(), EventRecord::StartArray);
        assert_eq!(q.next_event().unwrap(), item(1));
    }

    #[test]
    fn rewind_replays_window() {
        let mut q = EventQueue::new(source());
        q.next_event().unwrap();
        q.start_recording();
        assert_eq!(q.next_event().unwrap(), item(1));
        assert_eq!(q.next_event().unwrap(), item(2));
        q.rewind().unwrap();
        q.stop_recording();
        assert_eq!(q.next_event().unwrap(), item(1));
        assert_eq!(q.next_event().unwrap(), item(2));
        assert_eq!(q.next_event().unwrap(), item(3));
        assert!(q.rewind().is_err());
    }

    #[test]
    fn bookmarks_are_window_scoped() {
        let mut q = EventQueue::new(source());
        q.start_recording();
        q.next_event().unwrap();
        let mark = q.bookmark().unwrap();
        q.next_event().unwrap();
        q.next_event().unwrap();
        q.rewind_to(mark).unwrap();
        assert_eq!(q.next_event().unwrap(), item(1));
        q.start_recording();
        assert!(q.rewind_to(mark).is_err());
    }

    #[test]
    fn rewind_without_window_fails() {
        let mut q = EventQueue::new(source());
        assert_eq!(
            q.rewind().unwrap_err().kind(),
            crate::ErrorKind::InvalidState
        );
        assert!(q.bookmark().is_err());
    }

    #[test]
    fn reset_restarts_source() {
        let mut q = EventQueue::new(source());
        q.start_recording();
        q.next_event().unwrap();
        q.next_event().unwrap();
        q.reset();
        assert!(!q.is_recording());
        assert_eq!(q.next_event().unwrap(), EventRecord::StartArray);
    }
}
