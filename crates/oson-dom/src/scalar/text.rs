use std::fmt::Write as _;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::dec128::{self, Dec128};
use super::oranum::{self, OraNumber};
use super::temporal;
use super::ScalarValue;
use crate::{DomError, Result};

pub(crate) fn format_double(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        (if f > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else if f == 0.0 {
        // Keeps the sign of negative zero.
        format!("{f}")
    } else if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else if (1e-7..1e21).contains(&f.abs()) {
        format!("{f}")
    } else {
        format!("{f:e}")
    }
}

pub(crate) fn format_float(f: f32) -> String {
    if !f.is_finite() {
        format_double(f as f64)
    } else if f == 0.0 {
        format!("{f}")
    } else if f.fract() == 0.0 && f.abs() < 1e7 {
        format!("{}", f as i64)
    } else if (1e-7..1e21).contains(&f.abs()) {
        format!("{f}")
    } else {
        format!("{f:e}")
    }
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

fn infinity(negative: bool) -> String {
    (if negative { "-Infinity" } else { "Infinity" }).to_string()
}

impl ScalarValue<'_> {
    /// Canonical text of the value: JSON literal text for null, booleans and
    /// numbers, the raw string for strings, ISO 8601 for datetimes and
    /// intervals, base64 for binary, hex for OIDs and ids.
    pub fn to_text(&self) -> Result<String> {
        Ok(match self {
            ScalarValue::Null => "null".to_string(),
            ScalarValue::Bool(true) => "true".to_string(),
            ScalarValue::Bool(false) => "false".to_string(),
            ScalarValue::String(s) | ScalarValue::Number(s) => s.to_string(),
            ScalarValue::Int32(v) => v.to_string(),
            ScalarValue::Int64(v) => v.to_string(),
            ScalarValue::UInt32(v) => v.to_string(),
            ScalarValue::UInt64(v) => v.to_string(),
            ScalarValue::Float(v) => format_float(*v),
            ScalarValue::Double(v) => format_double(*v),
            ScalarValue::Binary(b) => STANDARD.encode(b),
            ScalarValue::Timestamp(t) => format!("{}Z", temporal::naive_to_iso(t)),
            ScalarValue::Oid(b) => hex(b),
            ScalarValue::Uuid(u) => u.hyphenated().to_string(),
            ScalarValue::Id(b) => hex(b),
            ScalarValue::Decimal128(b) => match dec128::decode(b) {
                Dec128::Finite(d) => d.to_text(),
                Dec128::Infinity { negative } => infinity(negative),
                Dec128::NaN => "NaN".to_string(),
            },
            ScalarValue::OraNumber(i)
            | ScalarValue::Int32OraNum(i)
            | ScalarValue::Int64OraNum(i)
            | ScalarValue::Dec128OraNum(i) => match oranum::decode(i.as_bytes())? {
                OraNumber::Finite(d) => d.to_text(),
                OraNumber::PositiveInfinity => infinity(false),
                OraNumber::NegativeInfinity => infinity(true),
            },
            ScalarValue::OraDate(i) => temporal::naive_to_iso(&temporal::decode_date(i.as_bytes())?),
            ScalarValue::OraTimestamp(i) => {
                temporal::naive_to_iso(&temporal::decode_timestamp(i.as_bytes())?)
            }
            ScalarValue::OraTimestampTz(i) => {
                temporal::offset_to_iso(&temporal::decode_timestamp_tz(i.as_bytes())?)
            }
            ScalarValue::OraTime(i) => temporal::time_to_iso(&temporal::decode_time(i.as_bytes())?),
            ScalarValue::OraYearMonth(i) => temporal::decode_year_month(i.as_bytes())?.to_iso(),
            ScalarValue::OraDaySecond(i) => temporal::decode_day_second(i.as_bytes())?.to_iso(),
        })
    }
}

/// Writes the canonical text of `value` into `out` and returns the number
/// of bytes written. A short buffer yields `BufferTooSmall` carrying the
/// exact size needed; nothing is written in that case.
pub fn scalar_to_string(value: &ScalarValue<'_>, out: &mut [u8]) -> Result<usize> {
    let text = value.to_text()?;
    let bytes = text.as_bytes();
    if bytes.len() > out.len() {
        return Err(DomError::BufferTooSmall {
            required: bytes.len(),
        });
    }
    out[..bytes.len()].copy_from_slice(bytes);
    Ok(bytes.len())
}

/// Size in bytes of the value's binary payload.
pub fn scalar_length(value: &ScalarValue<'_>) -> u32 {
    let len = match value {
        ScalarValue::Null | ScalarValue::Bool(_) => 0,
        ScalarValue::String(s) | ScalarValue::Number(s) => s.len(),
        ScalarValue::Int32(_) | ScalarValue::UInt32(_) | ScalarValue::Float(_) => 4,
        ScalarValue::Int64(_) | ScalarValue::UInt64(_) | ScalarValue::Double(_) => 8,
        ScalarValue::Binary(b) | ScalarValue::Id(b) => b.len(),
        ScalarValue::Timestamp(_) => temporal::TIMESTAMP_LEN,
        ScalarValue::Oid(b) => b.len(),
        ScalarValue::Uuid(_) | ScalarValue::Decimal128(_) => 16,
        ScalarValue::OraNumber(i)
        | ScalarValue::OraDate(i)
        | ScalarValue::OraTimestamp(i)
        | ScalarValue::OraTimestampTz(i)
        | ScalarValue::OraYearMonth(i)
        | ScalarValue::OraDaySecond(i)
        | ScalarValue::OraTime(i)
        | ScalarValue::Int32OraNum(i)
        | ScalarValue::Int64OraNum(i)
        | ScalarValue::Dec128OraNum(i) => i.len(),
    };
    u32::try_from(len).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::decimal::Decimal;
    use crate::scalar::Image;
    use chrono::NaiveDate;
    use std::borrow::Cow;

    #[test]
    fn literal_text() {
        assert_eq!(ScalarValue::Null.to_text().unwrap(), "null");
        assert_eq!(ScalarValue::Bool(false).to_text().unwrap(), "false");
        assert_eq!(ScalarValue::Int64(-7).to_text().unwrap(), "-7");
        assert_eq!(ScalarValue::Double(2.0).to_text().unwrap(), "2");
        assert_eq!(ScalarValue::Double(0.25).to_text().unwrap(), "0.25");
        assert_eq!(ScalarValue::Double(1e300).to_text().unwrap(), "1e300");
        assert_eq!(ScalarValue::Float(1.5).to_text().unwrap(), "1.5");
        assert_eq!(ScalarValue::Double(f64::NEG_INFINITY).to_text().unwrap(), "-Infinity");
        assert_eq!(ScalarValue::Double(-0.0).to_text().unwrap(), "-0");
        assert_eq!(ScalarValue::Double(0.0).to_text().unwrap(), "0");
        assert_eq!(ScalarValue::Float(-0.0).to_text().unwrap(), "-0");
    }

    #[test]
    fn extended_text() {
        let ts = NaiveDate::from_ymd_opt(2021, 3, 4)
            .unwrap()
            .and_hms_opt(5, 6, 7)
            .unwrap();
        assert_eq!(
            ScalarValue::Timestamp(ts).to_text().unwrap(),
            "2021-03-04T05:06:07Z"
        );
        assert_eq!(
            ScalarValue::ora_date(&ts).to_text().unwrap(),
            "2021-03-04T05:06:07"
        );
        assert_eq!(
            ScalarValue::Binary(Cow::Borrowed(&b"hi"[..])).to_text().unwrap(),
            "aGk="
        );
        assert_eq!(ScalarValue::Oid([0xab; 12]).to_text().unwrap(), "ab".repeat(12));
        let ora = ScalarValue::ora_number(&Decimal::parse("-12.5").unwrap()).unwrap();
        assert_eq!(ora.to_text().unwrap(), "-12.5");
    }

    #[test]
    fn malformed_image_is_an_error() {
        let bad = ScalarValue::OraNumber(Image::owned(vec![0xC1, 0xFF]));
        assert!(bad.to_text().is_err());
    }

    #[test]
    fn to_string_reports_required_size() {
        let value = ScalarValue::string("hello");
        let mut small = [0u8; 3];
        assert_eq!(
            scalar_to_string(&value, &mut small),
            Err(DomError::BufferTooSmall { required: 5 })
        );
        let mut big = [0u8; 8];
        assert_eq!(scalar_to_string(&value, &mut big).unwrap(), 5);
        assert_eq!(&big[..5], b"hello");
    }

    #[test]
    fn lengths() {
        assert_eq!(scalar_length(&ScalarValue::string("abc")), 3);
        assert_eq!(scalar_length(&ScalarValue::Int32(1)), 4);
        assert_eq!(scalar_length(&ScalarValue::Double(1.0)), 8);
        assert_eq!(scalar_length(&ScalarValue::Null), 0);
        assert_eq!(
            scalar_length(&ScalarValue::OraNumber(Image::owned(vec![0xC1, 2]))),
            2
        );
    }
}
