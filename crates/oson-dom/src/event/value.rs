use std::borrow::Cow;

use serde_json::Value;

use super::{EventKind, EventRecord, EventSource};
use crate::scalar::ScalarValue;
use crate::{DomError, Result};

enum Frame<'a> {
    Object(serde_json::map::Iter<'a>),
    Array(std::slice::Iter<'a, Value>),
}

/// Event source over an in-memory `serde_json::Value`.
///
/// Integers come out as `Int64` or `UInt64`, other numbers as `Double`.
pub struct JsonValueSource<'a> {
    root: &'a Value,
    stack: Vec<Frame<'a>>,
    pending: Option<&'a Value>,
    started: bool,
    ended: bool,
    last: Option<EventKind>,
}

impl<'a> JsonValueSource<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self {
            root,
            stack: Vec::new(),
            pending: None,
            started: false,
            ended: false,
            last: None,
        }
    }

    fn enter(&mut self, value: &'a Value) -> EventRecord<'a> {
        match value {
            Value::Null => EventRecord::Item(ScalarValue::Null),
            Value::Bool(b) => EventRecord::Item(ScalarValue::Bool(*b)),
            Value::Number(n) => EventRecord::Item(if let Some(i) = n.as_i64() {
                ScalarValue::Int64(i)
            } else if let Some(u) = n.as_u64() {
                ScalarValue::UInt64(u)
            } else {
                ScalarValue::Double(n.as_f64().unwrap_or(f64::NAN))
            }),
            Value::String(s) => EventRecord::Item(ScalarValue::String(Cow::Borrowed(s.as_str()))),
            Value::Array(items) => {
                self.stack.push(Frame::Array(items.iter()));
                EventRecord::StartArray
            }
            Value::Object(map) => {
                self.stack.push(Frame::Object(map.iter()));
                EventRecord::StartObject
            }
        }
    }

    fn step(&mut self) -> Result<EventRecord<'a>> {
        if let Some(value) = self.pending.take() {
            return Ok(self.enter(value));
        }
        let next = match self.stack.last_mut() {
            None => {
                if !self.started {
                    self.started = true;
                    let root = self.root;
                    return Ok(self.enter(root));
                }
                if self.ended {
                    return Err(DomError::invalid_state("read past the End event"));
                }
                self.ended = true;
                return Ok(EventRecord::End);
            }
            Some(Frame::Object(iter)) => match iter.next() {
                Some((key, value)) => {
                    self.pending = Some(value);
                    return Ok(EventRecord::Key(Cow::Borrowed(key.as_str())));
                }
                None => EventRecord::EndObject,
            },
            Some(Frame::Array(iter)) => match iter.next() {
                Some(value) => return Ok(self.enter(value)),
                None => EventRecord::EndArray,
            },
        };
        self.stack.pop();
        Ok(next)
    }
}

impl<'a> EventSource<'a> for JsonValueSource<'a> {
    fn next_event(&mut self) -> Result<EventRecord<'a>> {
        let event = self.step()?;
        self.last = Some(event.kind());
        Ok(event)
    }

    fn last_kind(&self) -> Option<EventKind> {
        self.last
    }

    fn reset(&mut self) {
        self.stack.clear();
        self.pending = None;
        self.started = false;
        self.ended = false;
        self.last = None;
    }

    fn source_name(&self) -> &'static str {
        "serde_json value"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kinds(value: &Value) -> Vec<EventKind> {
        let mut src = JsonValueSource::new(value);
        let mut out = Vec::new();
        loop {
            let ev = src.next_event().unwrap();
            out.push(ev.kind());
            if ev.kind() == EventKind::End {
                return out;
            }
        }
    }

    #[test]
    fn walks_nested_value() {
        use EventKind::*;
        let value = json!({"a": 1, "b": [true, null, "x"]});
        assert_eq!(
            kinds(&value),
            vec![StartObject, Key, Item, Key, StartArray, Item, Item, Item, EndArray, EndObject, End]
        );
    }

    #[test]
    fn number_kinds() {
        let value = json!([1, 18446744073709551615u64, 1.5]);
        let mut src = JsonValueSource::new(&value);
        src.next_event().unwrap();
        assert_eq!(src.next_event().unwrap(), EventRecord::Item(ScalarValue::Int64(1)));
        assert_eq!(
            src.next_event().unwrap(),
            EventRecord::Item(ScalarValue::UInt64(u64::MAX))
        );
        assert_eq!(src.next_event().unwrap(), EventRecord::Item(ScalarValue::Double(1.5)));
    }

    #[test]
    fn scalar_root_then_end() {
        let value = json!("solo");
        assert_eq!(kinds(&value), vec![EventKind::Item, EventKind::End]);
    }
}
