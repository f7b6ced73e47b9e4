//! JSON text for single scalars.

use oson_buffers::Writer;

use crate::scalar::{Decimal, ScalarValue};
use crate::Result;

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Writes `s` as a quoted JSON string. With `ascii` every code point
/// above 0x7F becomes a `\u` escape (surrogate pairs beyond the BMP).
pub(crate) fn write_str(writer: &mut Writer, s: &str, ascii: bool) {
    let bytes = s.as_bytes();
    let plain = bytes
        .iter()
        .all(|&b| (0x20..0x7F).contains(&b) && b != b'"' && b != b'\\');
    if plain || (!ascii && !bytes.iter().any(|&b| b < 0x20 || b == b'"' || b == b'\\')) {
        writer.ensure_capacity(bytes.len() + 2);
        writer.u8(b'"');
        writer.buf(bytes);
        writer.u8(b'"');
        return;
    }
    writer.u8(b'"');
    for ch in s.chars() {
        match ch {
            '"' => writer.buf(b"\\\""),
            '\\' => writer.buf(b"\\\\"),
            '\n' => writer.buf(b"\\n"),
            '\r' => writer.buf(b"\\r"),
            '\t' => writer.buf(b"\\t"),
            '\u{8}' => writer.buf(b"\\b"),
            '\u{c}' => writer.buf(b"\\f"),
            c if (c as u32) < 0x20 => write_unit(writer, c as u16),
            c if ascii && !c.is_ascii() => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    write_unit(writer, *unit);
                }
            }
            c => {
                let mut buf = [0u8; 4];
                writer.buf(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    writer.u8(b'"');
}

fn write_unit(writer: &mut Writer, unit: u16) {
    writer.buf(b"\\u");
    for shift in [12, 8, 4, 0] {
        writer.u8(HEX[((unit >> shift) & 0xF) as usize]);
    }
}

/// Number text as printed. Non-finite values come back as `None` so the
/// caller can quote them.
fn number_text(value: &ScalarValue<'_>, canonical: bool) -> Result<Option<String>> {
    let text = match value {
        ScalarValue::Int32(v) => return Ok(Some(v.to_string())),
        ScalarValue::Int64(v) => return Ok(Some(v.to_string())),
        ScalarValue::UInt32(v) => return Ok(Some(v.to_string())),
        ScalarValue::UInt64(v) => return Ok(Some(v.to_string())),
        ScalarValue::Float(f) if !f.is_finite() => return Ok(None),
        ScalarValue::Double(f) if !f.is_finite() => return Ok(None),
        ScalarValue::Double(f) if canonical => {
            return Ok(Some(
                Decimal::from_f64(*f).map_or_else(|| f.to_string(), |d| d.to_text()),
            ))
        }
        ScalarValue::Float(f) if canonical => {
            return Ok(Some(
                Decimal::from_f32(*f).map_or_else(|| f.to_string(), |d| d.to_text()),
            ))
        }
        ScalarValue::Number(text) if !canonical => return Ok(Some(text.to_string())),
        other => other.to_text()?,
    };
    if text.ends_with("Infinity") || text == "NaN" {
        return Ok(None);
    }
    if canonical {
        if let Some(decimal) = Decimal::parse(&text) {
            return Ok(Some(decimal.to_text()));
        }
    }
    Ok(Some(text))
}

/// Writes one scalar. Numeric kinds print as JSON numbers (NaN and the
/// infinities as quoted strings); strings are escaped; every other kind
/// prints as the quoted canonical text.
pub(crate) fn write_scalar(
    writer: &mut Writer,
    value: &ScalarValue<'_>,
    ascii: bool,
    canonical: bool,
) -> Result<()> {
    match value {
        ScalarValue::Null => writer.buf(b"null"),
        ScalarValue::Bool(true) => writer.buf(b"true"),
        ScalarValue::Bool(false) => writer.buf(b"false"),
        ScalarValue::String(s) => write_str(writer, s, ascii),
        v if v.kind().is_numeric() => match number_text(v, canonical)? {
            Some(text) => writer.ascii(&text),
            None => write_str(writer, &v.to_text()?, ascii),
        },
        v => write_str(writer, &v.to_text()?, ascii),
    }
    Ok(())
}
