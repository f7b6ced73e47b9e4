//! Print façade: JSON text out of a document or an event stream.

mod context;
mod scalar;

use serde_json::{Map, Number, Value};

pub use crate::config::{PrintFlags, PrintOptions, SortMode};
pub use context::PrintContext;

use crate::dom::{Document, Node, NodeType};
use crate::event::EventSource;
use crate::scalar::ScalarValue;
use crate::Result;

/// Prints the subtree at `node` into a string.
pub fn to_json_string(doc: &Document, node: Node, options: PrintOptions) -> Result<String> {
    let mut ctx = PrintContext::new(options);
    ctx.print_node(doc, node)?;
    ctx.into_string()
}

/// Prints a whole event stream into a string.
pub fn events_to_string<'a>(
    source: &mut dyn EventSource<'a>,
    options: PrintOptions,
) -> Result<String> {
    let mut ctx = PrintContext::new(options);
    ctx.print_events(source)?;
    ctx.into_string()
}

/// Integral number text becomes an integer value, anything else a float.
fn json_number(text: &str) -> Option<Number> {
    if !text.contains(['.', 'e', 'E']) {
        if let Ok(v) = text.parse::<i64>() {
            return Some(v.into());
        }
        if let Ok(v) = text.parse::<u64>() {
            return Some(v.into());
        }
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}

fn scalar_to_value(value: &ScalarValue<'_>) -> Result<Value> {
    Ok(match value {
        ScalarValue::Null => Value::Null,
        ScalarValue::Bool(b) => Value::Bool(*b),
        ScalarValue::String(s) => Value::String(s.to_string()),
        ScalarValue::Int32(v) => Value::from(*v),
        ScalarValue::Int64(v) => Value::from(*v),
        ScalarValue::UInt32(v) => Value::from(*v),
        ScalarValue::UInt64(v) => Value::from(*v),
        ScalarValue::Float(f) => Number::from_f64(f64::from(*f))
            .map_or_else(|| Value::String(value.to_text().unwrap_or_default()), Value::Number),
        ScalarValue::Double(f) => Number::from_f64(*f)
            .map_or_else(|| Value::String(value.to_text().unwrap_or_default()), Value::Number),
        v if v.kind().is_numeric() => {
            let text = v.to_text()?;
            match json_number(&text) {
                Some(n) => Value::Number(n),
                None => Value::String(text),
            }
        }
        v => Value::String(v.to_text()?),
    })
}

/// Converts the subtree at `node` into a `serde_json::Value`. Non-finite
/// numbers and the extended scalar kinds become strings, as they print.
pub(crate) fn to_json_value(doc: &Document, node: Node) -> Result<Value> {
    Ok(match doc.node_type(node)? {
        NodeType::Scalar => scalar_to_value(&doc.scalar_info(node)?)?,
        NodeType::Object => {
            let mut map = Map::new();
            for pair in doc.all_fields(node)? {
                map.insert(pair.name.name().to_owned(), to_json_value(doc, pair.node)?);
            }
            Value::Object(map)
        }
        NodeType::Array => {
            let len = doc.array_size(node)?;
            let mut items = Vec::with_capacity(len);
            for child in doc.array_elements_batch(node, 0, len)? {
                items.push(to_json_value(doc, child)?);
            }
            Value::Array(items)
        }
    })
}
