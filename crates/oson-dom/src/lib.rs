//! Polymorphic JSON document model.
//!
//! A [`Document`] is backed either by a mutable in-memory tree or by a
//! read-only view over an OSON binary image; both answer the same node API.
//! Data moves between text, OSON and documents as a stream of events:
//!
//! - [`text::JsonTextSource`] parses JSON text into events.
//! - [`oson::OsonEncoder`] turns events into an OSON image and
//!   [`oson::OsonEventSource`] reads one back.
//! - [`Document::load_from_event_source`] builds a tree and
//!   [`Document::as_event_source`] walks it again.
//! - [`print::PrintContext`] prints events or a subtree as JSON text.
//!
//! ```
//! use oson_dom::{Document, ParseOptions};
//! use oson_dom::print::{to_json_string, PrintOptions};
//!
//! let mut doc = Document::in_memory();
//! let root = doc.load_text(r#"{"a": [1, true]}"#, &ParseOptions::default()).unwrap();
//! assert_eq!(doc.num_fields(root).unwrap(), 1);
//! assert_eq!(to_json_string(&doc, root, PrintOptions::default()).unwrap(), r#"{"a":[1,true]}"#);
//! ```

pub mod config;
pub mod dom;
mod error;
pub mod event;
mod memory;
pub mod oson;
pub mod print;
pub mod scalar;
pub mod text;

pub use config::{BackendKind, DomFlags, DomOptions, NumberEncoding, ParseFlags, ParseOptions};
pub use dom::{copy, equals, Document, FieldName, NameValuePair, Node, NodeType};
pub use error::{DomError, ErrorKind};
pub use event::{EventKind, EventRecord, EventSource, EventWriter};
pub use scalar::{ScalarKind, ScalarValue};

pub type Result<T> = std::result::Result<T, DomError>;
