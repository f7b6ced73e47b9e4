use std::borrow::Cow;
use std::collections::HashSet;

use crate::config::{ParseFlags, ParseOptions};
use crate::event::{EventKind, EventRecord, EventSource, Input, MAX_DEPTH};
use crate::scalar::ScalarValue;
use crate::{DomError, Result};

use super::input;

enum Frame {
    Object {
        first: bool,
        keys: Option<HashSet<String>>,
    },
    Array {
        first: bool,
    },
}

/// Pull parser turning JSON text into events.
///
/// Strict RFC 8259 unless [`ParseFlags`] relax it. Errors are
/// `MalformedInput` carrying the byte offset in the (UTF-8) text.
pub struct JsonTextSource {
    options: ParseOptions,
    text: Option<String>,
    x: usize,
    stack: Vec<Frame>,
    expect_value: bool,
    started: bool,
    ended: bool,
    fields: Option<HashSet<String>>,
    last: Option<EventKind>,
}

impl JsonTextSource {
    /// A source with no input yet; call [`EventSource::set_input`] first.
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            text: None,
            x: 0,
            stack: Vec::new(),
            expect_value: false,
            started: false,
            ended: false,
            fields: None,
            last: None,
        }
    }

    pub fn from_str(text: &str, options: ParseOptions) -> Result<Self> {
        Self::from_bytes(text.as_bytes().to_vec(), options)
    }

    pub fn from_bytes(bytes: Vec<u8>, options: ParseOptions) -> Result<Self> {
        let mut source = Self::new(options);
        source.set_input(Input::Buffer(bytes))?;
        Ok(source)
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Byte offset of the next unread character.
    pub fn position(&self) -> usize {
        self.x
    }

    fn has(&self, flag: ParseFlags) -> bool {
        self.options.flags.contains(flag)
    }

    fn bytes(&self) -> &[u8] {
        self.text.as_deref().map(str::as_bytes).unwrap_or_default()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.x).copied()
    }

    fn skip_whitespace(&mut self) {
        let bytes = self.bytes();
        let mut x = self.x;
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = bytes.get(x) {
            x += 1;
        }
        self.x = x;
    }

    fn push(&mut self, frame: Frame) -> Result<()> {
        if self.stack.len() >= MAX_DEPTH {
            return Err(DomError::malformed(self.x, "maximum nesting depth exceeded"));
        }
        self.stack.push(frame);
        Ok(())
    }

    fn read_value(&mut self) -> Result<EventRecord<'static>> {
        self.skip_whitespace();
        let at = self.x;
        let ch = self
            .peek()
            .ok_or_else(|| DomError::malformed(at, "unexpected end of input"))?;
        match ch {
            b'{' => {
                self.push(Frame::Object {
                    first: true,
                    keys: self
                        .has(ParseFlags::DISALLOW_DUPLICATES)
                        .then(HashSet::new),
                })?;
                self.x += 1;
                Ok(EventRecord::StartObject)
            }
            b'[' => {
                self.push(Frame::Array { first: true })?;
                self.x += 1;
                Ok(EventRecord::StartArray)
            }
            b'"' => self.read_string_item(),
            b'\'' if self.has(ParseFlags::SINGLE_QUOTES) => self.read_string_item(),
            b'-' | b'0'..=b'9' => {
                let text = self.read_number()?;
                let value = ScalarValue::Number(Cow::Owned(text));
                Ok(EventRecord::Item(value.with_number_encoding(self.options.numbers)))
            }
            b't' | b'f' | b'n' | b'T' | b'F' | b'N' => {
                Ok(EventRecord::Item(self.read_keyword()?))
            }
            _ => Err(DomError::malformed(at, format!("unexpected character {:?}", ch as char))),
        }
    }

    fn read_string_item(&mut self) -> Result<EventRecord<'static>> {
        let materialize = !self.options.validate_only;
        let text = self.read_string(materialize)?;
        Ok(EventRecord::Item(ScalarValue::String(Cow::Owned(text))))
    }

    fn read_keyword(&mut self) -> Result<ScalarValue<'static>> {
        let at = self.x;
        let mixed = self.has(ParseFlags::MIXEDCASE_KEYWORDS);
        let bytes = &self.bytes()[at..];
        let candidates: [(&[u8], ScalarValue<'static>); 3] = [
            (b"true", ScalarValue::Bool(true)),
            (b"false", ScalarValue::Bool(false)),
            (b"null", ScalarValue::Null),
        ];
        for (word, value) in candidates {
            let Some(found) = bytes.get(..word.len()) else {
                continue;
            };
            let matches = if mixed {
                found.eq_ignore_ascii_case(word)
            } else {
                found == word
            };
            if !matches {
                continue;
            }
            if bytes.get(word.len()).is_some_and(|b| is_ident_byte(*b)) {
                break;
            }
            self.x += word.len();
            return Ok(value);
        }
        Err(DomError::malformed(at, "invalid literal"))
    }

    /// Scans one number per the JSON grammar and returns its text.
    fn read_number(&mut self) -> Result<String> {
        let bytes = self.bytes();
        let start = self.x;
        let mut x = start;
        let digits = |x: &mut usize| {
            let from = *x;
            while bytes.get(*x).is_some_and(u8::is_ascii_digit) {
                *x += 1;
            }
            *x - from
        };
        if bytes.get(x) == Some(&b'-') {
            x += 1;
        }
        match bytes.get(x) {
            Some(b'0') => x += 1,
            Some(b'1'..=b'9') => {
                digits(&mut x);
            }
            _ => return Err(DomError::malformed(x, "digit expected")),
        }
        if bytes.get(x) == Some(&b'.') {
            x += 1;
            if digits(&mut x) == 0 {
                return Err(DomError::malformed(x, "digit expected after decimal point"));
            }
        }
        if let Some(b'e' | b'E') = bytes.get(x) {
            x += 1;
            if let Some(b'+' | b'-') = bytes.get(x) {
                x += 1;
            }
            if digits(&mut x) == 0 {
                return Err(DomError::malformed(x, "digit expected in exponent"));
            }
        }
        if bytes.get(x).is_some_and(|b| is_ident_byte(*b) || *b == b'.') {
            return Err(DomError::malformed(x, "invalid number"));
        }
        let text = String::from_utf8_lossy(&bytes[start..x]).into_owned();
        self.x = x;
        Ok(text)
    }

    /// Reads a quoted string starting at the opening quote. With
    /// `materialize` off the escapes are still checked but nothing is kept.
    fn read_string(&mut self, materialize: bool) -> Result<String> {
        let text = self.text.as_deref().unwrap_or_default();
        let bytes = text.as_bytes();
        let start = self.x;
        let quote = bytes[start];
        let mut x = start + 1;
        let mut run = x;
        let mut out = String::new();
        loop {
            let Some(&b) = bytes.get(x) else {
                return Err(DomError::malformed(start, "unterminated string"));
            };
            if b == quote {
                if materialize {
                    out.push_str(&text[run..x]);
                }
                self.x = x + 1;
                return Ok(out);
            }
            match b {
                b'\\' => {
                    if materialize {
                        out.push_str(&text[run..x]);
                    }
                    let at = x;
                    x += 1;
                    let ch = match bytes.get(x) {
                        Some(b'"') => '"',
                        Some(b'\\') => '\\',
                        Some(b'/') => '/',
                        Some(b'b') => '\u{8}',
                        Some(b'f') => '\u{c}',
                        Some(b'n') => '\n',
                        Some(b'r') => '\r',
                        Some(b't') => '\t',
                        Some(b'\'') if quote == b'\'' => '\'',
                        Some(b'u') => {
                            let (ch, next) = read_unicode_escape(bytes, x + 1, at)?;
                            x = next - 1;
                            ch
                        }
                        _ => return Err(DomError::malformed(at, "invalid escape sequence")),
                    };
                    if materialize {
                        out.push(ch);
                    }
                    x += 1;
                    run = x;
                }
                0x00..=0x1F => {
                    return Err(DomError::malformed(x, "control character in string"))
                }
                _ => x += 1,
            }
        }
    }

    fn read_key(&mut self, materialize: bool) -> Result<String> {
        let at = self.x;
        match self.peek() {
            Some(b'"') => self.read_string(materialize),
            Some(b'\'') if self.has(ParseFlags::SINGLE_QUOTES) => self.read_string(materialize),
            Some(_) if self.has(ParseFlags::UNQUOTED_NAMES) => {
                let text = self.text.as_deref().unwrap_or_default();
                let name: &str = {
                    let rest = &text[at..];
                    let end = rest
                        .char_indices()
                        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_' || *c == '$'))
                        .map_or(rest.len(), |(i, _)| i);
                    &rest[..end]
                };
                if name.is_empty() {
                    return Err(DomError::malformed(at, "field name expected"));
                }
                let name = name.to_owned();
                self.x += name.len();
                Ok(if materialize { name } else { String::new() })
            }
            Some(_) => Err(DomError::malformed(at, "quoted field name expected")),
            None => Err(DomError::malformed(at, "unterminated object")),
        }
    }

    /// Skips the separator before the next member or element. Returns true
    /// when the container closes instead.
    fn before_member(&mut self, first: bool, close: u8) -> Result<bool> {
        self.skip_whitespace();
        let at = self.x;
        let Some(ch) = self.peek() else {
            return Err(DomError::malformed(at, "unexpected end of input"));
        };
        if ch == close {
            self.x += 1;
            return Ok(true);
        }
        if first {
            return Ok(false);
        }
        if ch != b',' {
            let expected = if close == b'}' { "expected ',' or '}'" } else { "expected ',' or ']'" };
            return Err(DomError::malformed(at, expected));
        }
        self.x += 1;
        self.skip_whitespace();
        if self.peek() == Some(close) {
            if !self.has(ParseFlags::TRAILING_COMMAS) {
                return Err(DomError::malformed(at, "trailing comma"));
            }
            self.x += 1;
            return Ok(true);
        }
        Ok(false)
    }

    fn object_step(&mut self) -> Result<Option<EventRecord<'static>>> {
        let first = matches!(self.stack.last(), Some(Frame::Object { first: true, .. }));
        if self.before_member(first, b'}')? {
            self.stack.pop();
            return Ok(Some(EventRecord::EndObject));
        }
        let at = self.x;
        let projected = self.stack.len() == 1 && self.fields.is_some();
        let tracked = matches!(self.stack.last(), Some(Frame::Object { keys: Some(_), .. }));
        let name = self.read_key(!self.options.validate_only || projected || tracked)?;
        self.skip_whitespace();
        if self.peek() != Some(b':') {
            return Err(DomError::malformed(self.x, "expected ':'"));
        }
        self.x += 1;
        if let Some(Frame::Object { first, keys }) = self.stack.last_mut() {
            *first = false;
            if let Some(keys) = keys {
                if !keys.insert(name.clone()) {
                    return Err(DomError::malformed(at, format!("duplicate field {name:?}")));
                }
            }
        }
        if projected && !self.fields.as_ref().is_some_and(|f| f.contains(&name)) {
            self.skip_raw_value()?;
            return Ok(None);
        }
        self.expect_value = true;
        let name = if self.options.validate_only { String::new() } else { name };
        Ok(Some(EventRecord::Key(Cow::Owned(name))))
    }

    fn array_step(&mut self) -> Result<Option<EventRecord<'static>>> {
        let first = matches!(self.stack.last(), Some(Frame::Array { first: true }));
        if self.before_member(first, b']')? {
            self.stack.pop();
            return Ok(Some(EventRecord::EndArray));
        }
        if let Some(Frame::Array { first }) = self.stack.last_mut() {
            *first = false;
        }
        self.expect_value = true;
        Ok(None)
    }

    /// Passes over one whole value without producing events. Containers go
    /// through the same member grammar as the event path; nothing is built.
    fn skip_raw_value(&mut self) -> Result<()> {
        // Closing bracket of each open container and whether its next member
        // is the first one.
        let mut open: Vec<(u8, bool)> = Vec::new();
        let mut want_value = true;
        loop {
            if want_value {
                want_value = false;
                self.skip_whitespace();
                let at = self.x;
                match self.peek() {
                    Some(ch @ (b'{' | b'[')) => {
                        if self.stack.len() + open.len() >= MAX_DEPTH {
                            return Err(DomError::malformed(at, "maximum nesting depth exceeded"));
                        }
                        self.x += 1;
                        open.push((if ch == b'{' { b'}' } else { b']' }, true));
                    }
                    _ => self.skip_scalar()?,
                }
            }
            let Some((close, first)) = open.last_mut() else {
                return Ok(());
            };
            let close = *close;
            let first = std::mem::replace(first, false);
            if self.before_member(first, close)? {
                open.pop();
                continue;
            }
            if close == b'}' {
                self.read_key(false)?;
                self.skip_whitespace();
                if self.peek() != Some(b':') {
                    return Err(DomError::malformed(self.x, "expected ':'"));
                }
                self.x += 1;
            }
            want_value = true;
        }
    }

    fn skip_scalar(&mut self) -> Result<()> {
        let at = self.x;
        match self.peek() {
            Some(b'"') => {
                self.read_string(false)?;
            }
            Some(b'\'') if self.has(ParseFlags::SINGLE_QUOTES) => {
                self.read_string(false)?;
            }
            Some(b'-' | b'0'..=b'9') => {
                self.read_number()?;
            }
            Some(b't' | b'f' | b'n' | b'T' | b'F' | b'N') => {
                self.read_keyword()?;
            }
            Some(ch) => {
                return Err(DomError::malformed(at, format!("unexpected character {:?}", ch as char)));
            }
            None => return Err(DomError::malformed(at, "unexpected end of input")),
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<EventRecord<'static>> {
        if self.text.is_none() {
            return Err(DomError::invalid_state("no input set on the text source"));
        }
        if self.ended {
            return Err(DomError::invalid_state("read past the End event"));
        }
        loop {
            if self.expect_value {
                self.expect_value = false;
                return self.read_value();
            }
            let step = match self.stack.last() {
                Some(Frame::Object { .. }) => self.object_step()?,
                Some(Frame::Array { .. }) => self.array_step()?,
                None if !self.started => {
                    self.started = true;
                    self.skip_whitespace();
                    let at = self.x;
                    if self.peek().is_none() {
                        return Err(DomError::malformed(at, "no JSON value in input"));
                    }
                    let event = self.read_value()?;
                    if event.kind() == EventKind::Item && !self.has(ParseFlags::SCALAR_DOCUMENTS) {
                        return Err(DomError::malformed(at, "scalar documents are not allowed"));
                    }
                    Some(event)
                }
                None => {
                    self.skip_whitespace();
                    if self.x < self.bytes().len() {
                        return Err(DomError::malformed(self.x, "unexpected data after the document"));
                    }
                    self.ended = true;
                    Some(EventRecord::End)
                }
            };
            if let Some(event) = step {
                return Ok(event);
            }
        }
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn hex4(bytes: &[u8], x: usize, at: usize) -> Result<u16> {
    let digits = bytes
        .get(x..x + 4)
        .and_then(|d| std::str::from_utf8(d).ok())
        .ok_or_else(|| DomError::malformed(at, "truncated unicode escape"))?;
    u16::from_str_radix(digits, 16).map_err(|_| DomError::malformed(at, "invalid unicode escape"))
}

/// Decodes the four hex digits at `x` (and a trailing low surrogate when the
/// first unit is a high one). Returns the char and the offset after it.
fn read_unicode_escape(bytes: &[u8], x: usize, at: usize) -> Result<(char, usize)> {
    let unit = hex4(bytes, x, at)?;
    let mut next = x + 4;
    let code = match unit {
        0xD800..=0xDBFF => {
            if bytes.get(next..next + 2) != Some(b"\\u") {
                return Err(DomError::malformed(at, "unpaired surrogate escape"));
            }
            let low = hex4(bytes, next + 2, at)?;
            if !(0xDC00..=0xDFFF).contains(&low) {
                return Err(DomError::malformed(at, "unpaired surrogate escape"));
            }
            next += 6;
            0x10000 + ((u32::from(unit) - 0xD800) << 10) + (u32::from(low) - 0xDC00)
        }
        0xDC00..=0xDFFF => return Err(DomError::malformed(at, "unpaired surrogate escape")),
        _ => u32::from(unit),
    };
    let ch = char::from_u32(code).ok_or_else(|| DomError::malformed(at, "invalid unicode escape"))?;
    Ok((ch, next))
}

impl EventSource<'static> for JsonTextSource {
    fn next_event(&mut self) -> Result<EventRecord<'static>> {
        let event = self.advance()?;
        self.last = Some(event.kind());
        Ok(event)
    }

    fn last_kind(&self) -> Option<EventKind> {
        self.last
    }

    fn reset(&mut self) {
        self.x = 0;
        self.stack.clear();
        self.expect_value = false;
        self.started = false;
        self.ended = false;
        self.last = None;
    }

    fn source_name(&self) -> &'static str {
        "JSON text"
    }

    fn set_input(&mut self, input: Input) -> Result<()> {
        let bytes = input.into_bytes()?;
        self.text = Some(input::decode(bytes, self.options.flags)?);
        self.reset();
        Ok(())
    }

    fn skip_event(&mut self) -> Result<()> {
        if self.last != Some(EventKind::Key) || !self.expect_value {
            return Err(DomError::invalid_state(
                "skip_event is only valid right after a Key event",
            ));
        }
        self.expect_value = false;
        self.skip_raw_value()
    }

    fn validate_only(&mut self, on: bool) -> bool {
        std::mem::replace(&mut self.options.validate_only, on)
    }

    fn set_field_list(&mut self, names: Option<&[&str]>) -> Result<()> {
        self.fields = names.map(|names| names.iter().map(|n| (*n).to_owned()).collect());
        Ok(())
    }
}
