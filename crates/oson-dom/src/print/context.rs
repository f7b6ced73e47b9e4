use std::borrow::Cow;
use std::io::Write;

use oson_buffers::Writer;

use super::scalar::{write_scalar, write_str};
use crate::config::{PrintFlags, PrintOptions, SortMode};
use crate::dom::{Document, NameValuePair, Node, NodeType, BATCH_SIZE};
use crate::event::{
    pump, EventKind, EventRecord, EventSource, EventWriter, OrderCheck, Output, RecordedSource,
};
use crate::{DomError, Result};

enum Sink {
    Buffer,
    Stream(Box<dyn Write + Send>),
}

/// Stateful JSON text printer.
///
/// Accepts events like any other [`EventWriter`], so it can stand in for a
/// binary encoder. Keys are held back until their value arrives. With a
/// [`SortMode`] other than `None` the event stream is collected and printed
/// from a scratch document once `End` arrives.
pub struct PrintContext {
    options: PrintOptions,
    writer: Writer,
    sink: Sink,
    /// Values written so far in each open container.
    levels: Vec<usize>,
    order: OrderCheck,
    pending_key: Option<String>,
    collected: Option<Vec<EventRecord<'static>>>,
}

impl PrintContext {
    pub fn new(options: PrintOptions) -> Self {
        Self {
            options,
            writer: Writer::new(),
            sink: Sink::Buffer,
            levels: Vec::new(),
            order: OrderCheck::new(),
            pending_key: None,
            collected: None,
        }
    }

    pub fn options(&self) -> &PrintOptions {
        &self.options
    }

    fn pretty(&self) -> bool {
        self.options.has(PrintFlags::PRETTY)
    }

    fn newline(&mut self) {
        if self.pretty() {
            self.writer.u8(b'\n');
            for _ in 0..self.levels.len() {
                self.writer.buf(b"  ");
            }
        }
    }

    /// Separator, indentation and queued key ahead of a value.
    fn begin_value(&mut self) {
        let Some(count) = self.levels.last_mut() else {
            return;
        };
        let first = *count == 0;
        *count += 1;
        if !first {
            self.writer.u8(b',');
        }
        self.newline();
        if let Some(key) = self.pending_key.take() {
            write_str(&mut self.writer, &key, self.options.has(PrintFlags::ASCII));
            self.writer.buf(if self.pretty() { b": " } else { b":" });
        }
    }

    fn close(&mut self, bracket: u8) {
        if let Some(count) = self.levels.pop() {
            if count > 0 {
                self.newline();
            }
        }
        self.pending_key = None;
        self.writer.u8(bracket);
    }

    fn check_writer(&mut self) -> Result<()> {
        match self.writer.error() {
            Some(err) => Err(err.clone().into()),
            None => Ok(()),
        }
    }

    fn write_text(&mut self, event: &EventRecord<'_>) -> Result<()> {
        self.order.check(event.kind())?;
        match event {
            EventRecord::StartObject | EventRecord::StartArray => {
                self.begin_value();
                let object = matches!(event, EventRecord::StartObject);
                self.writer.u8(if object { b'{' } else { b'[' });
                self.levels.push(0);
            }
            EventRecord::EndObject => self.close(b'}'),
            EventRecord::EndArray => self.close(b']'),
            EventRecord::Key(name) => self.pending_key = Some(name.to_string()),
            EventRecord::Item(value) => {
                self.begin_value();
                write_scalar(
                    &mut self.writer,
                    value,
                    self.options.has(PrintFlags::ASCII),
                    self.options.has(PrintFlags::NUMFORMAT),
                )?;
            }
            EventRecord::Error(msg) => {
                return Err(DomError::invalid_state(format!("error event: {msg}")))
            }
            EventRecord::End => self.flush()?,
            _ => {}
        }
        self.check_writer()
    }

    /// Sorted printing needs the whole value first.
    fn collect(&mut self, event: &EventRecord<'_>) -> Result<()> {
        self.order.check(event.kind())?;
        if event.kind().is_marker() {
            return Ok(());
        }
        let events = self.collected.get_or_insert_with(Vec::new);
        if event.kind() != EventKind::End {
            events.push(event.clone().into_owned());
            return Ok(());
        }
        let events = self.collected.take().unwrap_or_default();
        let mut scratch = Document::in_memory();
        let root = scratch.load_from_event_source(&mut RecordedSource::new(events))?;
        self.print_node(&scratch, root)
    }

    fn sorted(&self, fields: &mut [NameValuePair]) {
        match self.options.sort {
            SortMode::None => {}
            SortMode::KeyName => crate::dom::sort_fields(fields),
            SortMode::Optimize => fields.sort_by(|a, b| {
                let (a, b) = (a.name.name(), b.name.name());
                a.len().cmp(&b.len()).then_with(|| a.cmp(b))
            }),
        }
    }

    fn write_node(&mut self, doc: &Document, node: Node) -> Result<()> {
        match doc.node_type(node)? {
            NodeType::Scalar => {
                let value = doc.scalar_info(node)?;
                self.write_text(&EventRecord::Item(value))
            }
            NodeType::Object => {
                self.write_text(&EventRecord::StartObject)?;
                let mut fields = doc.all_fields(node)?;
                self.sorted(&mut fields);
                for pair in fields {
                    self.write_text(&EventRecord::Key(Cow::Borrowed(pair.name.name())))?;
                    self.write_node(doc, pair.node)?;
                }
                self.write_text(&EventRecord::EndObject)
            }
            NodeType::Array => {
                self.write_text(&EventRecord::StartArray)?;
                let len = doc.array_size(node)?;
                for start in (0..len).step_by(BATCH_SIZE) {
                    for child in doc.array_elements_batch(node, start, BATCH_SIZE)? {
                        self.write_node(doc, child)?;
                    }
                }
                self.write_text(&EventRecord::EndArray)
            }
        }
    }

    /// Prints the subtree at `node`, sorted per the options, and ends the
    /// stream.
    pub fn print_node(&mut self, doc: &Document, node: Node) -> Result<()> {
        self.reset();
        self.write_node(doc, node)?;
        self.write_text(&EventRecord::End)
    }

    /// Prints every event of `source` through its `End`.
    pub fn print_events<'a>(&mut self, source: &mut dyn EventSource<'a>) -> Result<()> {
        pump(source, self)
    }

    /// The printed text so far. Only meaningful for buffer outputs.
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(self.writer.written())
            .map_err(|e| DomError::malformed(e.valid_up_to(), "printed text is not utf-8"))
    }

    pub fn into_string(mut self) -> Result<String> {
        let bytes = self.writer.finish()?;
        String::from_utf8(bytes)
            .map_err(|e| DomError::malformed(e.utf8_error().valid_up_to(), "printed text is not utf-8"))
    }
}

impl EventWriter for PrintContext {
    /// Drops pending output and starts a new stream on the same output.
    fn reset(&mut self) {
        self.writer.clear();
        self.levels.clear();
        self.order.reset();
        self.pending_key = None;
        self.collected = None;
    }

    fn set_output(&mut self, output: Output) -> Result<()> {
        let (writer, sink) = match output {
            Output::Buffer(capacity) => (Writer::with_limit(capacity), Sink::Buffer),
            Output::Extensible => (Writer::new(), Sink::Buffer),
            Output::Stream(stream) => (Writer::new(), Sink::Stream(stream)),
        };
        self.writer = writer;
        self.sink = sink;
        EventWriter::reset(self);
        Ok(())
    }

    fn write_event(&mut self, event: &EventRecord<'_>) -> Result<()> {
        match self.options.sort {
            SortMode::None => self.write_text(event),
            _ => self.collect(event),
        }
    }

    fn flush(&mut self) -> Result<()> {
        self.check_writer()?;
        if let Sink::Stream(stream) = &mut self.sink {
            let bytes = self.writer.flush();
            stream
                .write_all(&bytes)
                .and_then(|_| stream.flush())
                .map_err(|e| DomError::invalid_state(format!("output stream failed: {e}")))?;
        }
        Ok(())
    }

    fn get_buffer(&self) -> &[u8] {
        self.writer.written()
    }
}

impl std::fmt::Debug for PrintContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrintContext")
            .field("options", &self.options)
            .field("depth", &self.levels.len())
            .field("len", &self.writer.len())
            .finish()
    }
}
