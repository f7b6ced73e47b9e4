//! Streaming event protocol: producers implement [`EventSource`], consumers
//! implement [`EventWriter`], and [`EventQueue`] adds lookahead and replay
//! on top of any source.

mod order;
mod queue;
mod source;
mod value;
mod writer;

use std::borrow::Cow;

use crate::scalar::{ScalarKind, ScalarValue};
use crate::{DomError, Result};

pub(crate) use order::OrderCheck;
pub use queue::{Bookmark, EventQueue};
pub use source::{CharEncoding, EventSource, Input, RecordedSource};
pub use value::JsonValueSource;
pub use writer::{pump, EventWriter, Output};

/// Deepest container nesting any source or writer accepts.
pub const MAX_DEPTH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    StartObject = 0,
    EndObject = 1,
    Key = 2,
    StartArray = 4,
    EndArray = 5,
    Item = 6,
    Error = 7,
    End = 8,
    Position = 9,
    StartCompound = 11,
    EndCompound = 12,
    RowSeparator = 13,
    ColumnNoValue = 14,
    ColumnSiblingNull = 15,
}

impl EventKind {
    /// Events that carry no document content and may appear anywhere.
    pub fn is_marker(self) -> bool {
        matches!(
            self,
            EventKind::Position
                | EventKind::StartCompound
                | EventKind::EndCompound
                | EventKind::RowSeparator
                | EventKind::ColumnNoValue
                | EventKind::ColumnSiblingNull
        )
    }

    /// Events that begin a value.
    pub fn starts_value(self) -> bool {
        matches!(
            self,
            EventKind::StartObject | EventKind::StartArray | EventKind::Item
        )
    }
}

/// One event. Key and scalar payloads borrow from the producer when it can
/// lend them for `'a`.
#[derive(Debug, Clone, PartialEq)]
pub enum EventRecord<'a> {
    StartObject,
    EndObject,
    Key(Cow<'a, str>),
    StartArray,
    EndArray,
    Item(ScalarValue<'a>),
    Error(Cow<'a, str>),
    End,
    Position(u64),
    StartCompound,
    EndCompound,
    RowSeparator,
    ColumnNoValue,
    ColumnSiblingNull,
}

impl<'a> EventRecord<'a> {
    pub fn kind(&self) -> EventKind {
        match self {
            EventRecord::StartObject => EventKind::StartObject,
            EventRecord::EndObject => EventKind::EndObject,
            EventRecord::Key(_) => EventKind::Key,
            EventRecord::StartArray => EventKind::StartArray,
            EventRecord::EndArray => EventKind::EndArray,
            EventRecord::Item(_) => EventKind::Item,
            EventRecord::Error(_) => EventKind::Error,
            EventRecord::End => EventKind::End,
            EventRecord::Position(_) => EventKind::Position,
            EventRecord::StartCompound => EventKind::StartCompound,
            EventRecord::EndCompound => EventKind::EndCompound,
            EventRecord::RowSeparator => EventKind::RowSeparator,
            EventRecord::ColumnNoValue => EventKind::ColumnNoValue,
            EventRecord::ColumnSiblingNull => EventKind::ColumnSiblingNull,
        }
    }

    /// Scalar kind of an `Item`; `String` for `Key` and `Error` text.
    pub fn value_type(&self) -> Option<ScalarKind> {
        match self {
            EventRecord::Item(v) => Some(v.kind()),
            EventRecord::Key(_) | EventRecord::Error(_) => Some(ScalarKind::String),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<&ScalarValue<'a>> {
        match self {
            EventRecord::Item(v) => Some(v),
            _ => None,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            EventRecord::Key(k) => Some(k.as_ref()),
            _ => None,
        }
    }

    /// Assembles a record from a kind and an optional payload.
    pub fn from_parts(kind: EventKind, value: Option<ScalarValue<'a>>) -> Result<Self> {
        let bad = |what: &str| DomError::invalid_state(format!("{kind:?} event {what}"));
        Ok(match (kind, value) {
            (EventKind::Key, Some(ScalarValue::String(name))) => EventRecord::Key(name),
            (EventKind::Key, _) => return Err(bad("needs a string name")),
            (EventKind::Item, Some(v)) => EventRecord::Item(v),
            (EventKind::Item, None) => return Err(bad("needs a value")),
            (EventKind::Error, Some(ScalarValue::String(msg))) => EventRecord::Error(msg),
            (EventKind::Error, None) => EventRecord::Error(Cow::Borrowed("error")),
            (EventKind::Position, Some(v)) => {
                let pos = match v {
                    ScalarValue::UInt64(p) => p,
                    ScalarValue::UInt32(p) => p as u64,
                    ScalarValue::Int64(p) if p >= 0 => p as u64,
                    ScalarValue::Int32(p) if p >= 0 => p as u64,
                    _ => return Err(bad("needs a non-negative integer")),
                };
                EventRecord::Position(pos)
            }
            (kind, None) => match kind {
                EventKind::StartObject => EventRecord::StartObject,
                EventKind::EndObject => EventRecord::EndObject,
                EventKind::StartArray => EventRecord::StartArray,
                EventKind::EndArray => EventRecord::EndArray,
                EventKind::End => EventRecord::End,
                EventKind::StartCompound => EventRecord::StartCompound,
                EventKind::EndCompound => EventRecord::EndCompound,
                EventKind::RowSeparator => EventRecord::RowSeparator,
                EventKind::ColumnNoValue => EventRecord::ColumnNoValue,
                EventKind::ColumnSiblingNull => EventRecord::ColumnSiblingNull,
                _ => return Err(bad("is missing its payload")),
            },
            (_, Some(_)) => return Err(bad("does not take a payload")),
        })
    }

    pub fn into_owned(self) -> EventRecord<'static> {
        match self {
            EventRecord::StartObject => EventRecord::StartObject,
            EventRecord::EndObject => EventRecord::EndObject,
            EventRecord::Key(k) => EventRecord::Key(Cow::Owned(k.into_owned())),
            EventRecord::StartArray => EventRecord::StartArray,
            EventRecord::EndArray => EventRecord::EndArray,
            EventRecord::Item(v) => EventRecord::Item(v.into_owned()),
            EventRecord::Error(m) => EventRecord::Error(Cow::Owned(m.into_owned())),
            EventRecord::End => EventRecord::End,
            EventRecord::Position(p) => EventRecord::Position(p),
            EventRecord::StartCompound => EventRecord::StartCompound,
            EventRecord::EndCompound => EventRecord::EndCompound,
            EventRecord::RowSeparator => EventRecord::RowSeparator,
            EventRecord::ColumnNoValue => EventRecord::ColumnNoValue,
            EventRecord::ColumnSiblingNull => EventRecord::ColumnSiblingNull,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_validates_payloads() {
        assert_eq!(
            EventRecord::from_parts(EventKind::Key, Some(ScalarValue::string("a"))).unwrap(),
            EventRecord::Key(Cow::Borrowed("a"))
        );
        assert!(EventRecord::from_parts(EventKind::Key, None).is_err());
        assert!(EventRecord::from_parts(EventKind::Item, None).is_err());
        assert!(EventRecord::from_parts(EventKind::StartObject, Some(ScalarValue::Null)).is_err());
        assert_eq!(
            EventRecord::from_parts(EventKind::Position, Some(ScalarValue::Int64(12))).unwrap(),
            EventRecord::Position(12)
        );
    }

    #[test]
    fn value_types() {
        assert_eq!(
            EventRecord::Item(ScalarValue::Int32(3)).value_type(),
            Some(ScalarKind::Int32)
        );
        assert_eq!(EventRecord::StartArray.value_type(), None);
        assert_eq!(
            EventRecord::Key(Cow::Borrowed("k")).value_type(),
            Some(ScalarKind::String)
        );
    }

    #[test]
    fn markers() {
        assert!(EventKind::Position.is_marker());
        assert!(!EventKind::Key.is_marker());
        assert!(EventKind::Item.starts_value());
    }
}
