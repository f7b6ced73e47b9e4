//! Scalar values: the JSON core types plus the extended binary types an
//! OSON image can carry.

mod equals;
mod text;

pub mod dec128;
pub mod decimal;
pub mod oranum;
pub mod temporal;

use std::borrow::Cow;
use std::fmt;

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::config::NumberEncoding;
use crate::{DomError, Result};

pub use decimal::Decimal;
pub use equals::scalar_equals;
pub use text::{scalar_length, scalar_to_string};

/// Largest payload kept inside an [`Image`] without a heap allocation.
pub const INLINE_MAX: usize = 15;
pub const OID_LEN: usize = 12;
pub const ID_MAX: usize = 127;

/// Type tag of a scalar. The discriminants double as the OSON scalar codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ScalarKind {
    Null = 2,
    String = 3,
    Number = 4,
    False = 5,
    True = 6,
    Int32 = 7,
    Int64 = 8,
    UInt32 = 9,
    UInt64 = 10,
    Float = 11,
    Double = 12,
    Binary = 13,
    Timestamp = 14,
    Oid = 15,
    Uuid = 16,
    OraNumber = 17,
    OraDate = 18,
    OraTimestamp = 19,
    OraTimestampTz = 20,
    OraYearMonth = 21,
    OraDaySecond = 22,
    OraTime = 26,
    Decimal128 = 27,
    Int32OraNum = 28,
    Int64OraNum = 29,
    Dec128OraNum = 30,
    Id = 31,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 27] = [
        ScalarKind::Null,
        ScalarKind::String,
        ScalarKind::Number,
        ScalarKind::False,
        ScalarKind::True,
        ScalarKind::Int32,
        ScalarKind::Int64,
        ScalarKind::UInt32,
        ScalarKind::UInt64,
        ScalarKind::Float,
        ScalarKind::Double,
        ScalarKind::Binary,
        ScalarKind::Timestamp,
        ScalarKind::Oid,
        ScalarKind::Uuid,
        ScalarKind::OraNumber,
        ScalarKind::OraDate,
        ScalarKind::OraTimestamp,
        ScalarKind::OraTimestampTz,
        ScalarKind::OraYearMonth,
        ScalarKind::OraDaySecond,
        ScalarKind::OraTime,
        ScalarKind::Decimal128,
        ScalarKind::Int32OraNum,
        ScalarKind::Int64OraNum,
        ScalarKind::Dec128OraNum,
        ScalarKind::Id,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        ScalarKind::ALL.iter().copied().find(|k| k.code() == code)
    }

    /// Kinds whose value is a number of some encoding.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ScalarKind::Number
                | ScalarKind::Int32
                | ScalarKind::Int64
                | ScalarKind::UInt32
                | ScalarKind::UInt64
                | ScalarKind::Float
                | ScalarKind::Double
                | ScalarKind::OraNumber
                | ScalarKind::Decimal128
                | ScalarKind::Int32OraNum
                | ScalarKind::Int64OraNum
                | ScalarKind::Dec128OraNum
        )
    }

    /// Kinds plain JSON text can express without a type annotation.
    pub fn is_json(self) -> bool {
        matches!(
            self,
            ScalarKind::Null
                | ScalarKind::True
                | ScalarKind::False
                | ScalarKind::String
                | ScalarKind::Number
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Null => "null",
            ScalarKind::String => "string",
            ScalarKind::Number => "number",
            ScalarKind::False => "false",
            ScalarKind::True => "true",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::UInt32 => "uint32",
            ScalarKind::UInt64 => "uint64",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
            ScalarKind::Binary => "binary",
            ScalarKind::Timestamp => "timestamp",
            ScalarKind::Oid => "oid",
            ScalarKind::Uuid => "uuid",
            ScalarKind::OraNumber => "oranumber",
            ScalarKind::OraDate => "date",
            ScalarKind::OraTimestamp => "oratimestamp",
            ScalarKind::OraTimestampTz => "timestamptz",
            ScalarKind::OraYearMonth => "yearmonth",
            ScalarKind::OraDaySecond => "daysecond",
            ScalarKind::OraTime => "time",
            ScalarKind::Decimal128 => "decimal128",
            ScalarKind::Int32OraNum => "int32oranum",
            ScalarKind::Int64OraNum => "int64oranum",
            ScalarKind::Dec128OraNum => "dec128oranum",
            ScalarKind::Id => "id",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Byte payload of an Oracle-format scalar. Short images are held inline.
#[derive(Clone)]
pub enum Image<'a> {
    Inline { len: u8, buf: [u8; INLINE_MAX] },
    Shared(Cow<'a, [u8]>),
}

impl<'a> Image<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        match Self::inline(bytes) {
            Some(image) => image,
            None => Image::Shared(Cow::Borrowed(bytes)),
        }
    }

    pub fn owned(bytes: Vec<u8>) -> Image<'static> {
        match Image::inline(&bytes) {
            Some(image) => image,
            None => Image::Shared(Cow::Owned(bytes)),
        }
    }

    fn inline(bytes: &[u8]) -> Option<Image<'static>> {
        if bytes.len() > INLINE_MAX {
            return None;
        }
        let mut buf = [0u8; INLINE_MAX];
        buf[..bytes.len()].copy_from_slice(bytes);
        Some(Image::Inline {
            len: bytes.len() as u8,
            buf,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Image::Inline { len, buf } => &buf[..*len as usize],
            Image::Shared(bytes) => bytes.as_ref(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Image::Inline { .. })
    }

    pub fn into_owned(self) -> Image<'static> {
        match self {
            Image::Inline { len, buf } => Image::Inline { len, buf },
            Image::Shared(bytes) => Image::Shared(Cow::Owned(bytes.into_owned())),
        }
    }

    pub fn borrowed(&self) -> Image<'_> {
        match self {
            Image::Inline { len, buf } => Image::Inline {
                len: *len,
                buf: *buf,
            },
            Image::Shared(bytes) => Image::Shared(Cow::Borrowed(bytes)),
        }
    }
}

impl PartialEq for Image<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl fmt::Debug for Image<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Image({:02x?})", self.as_bytes())
    }
}

/// A typed scalar. Borrowed variants point into the document or image
/// they came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue<'a> {
    Null,
    Bool(bool),
    String(Cow<'a, str>),
    /// Decimal number kept as its source text.
    Number(Cow<'a, str>),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    Binary(Cow<'a, [u8]>),
    /// UTC instant.
    Timestamp(NaiveDateTime),
    Oid([u8; OID_LEN]),
    Uuid(Uuid),
    Id(Cow<'a, [u8]>),
    /// BID decimal128, big-endian.
    Decimal128([u8; 16]),
    OraNumber(Image<'a>),
    OraDate(Image<'a>),
    OraTimestamp(Image<'a>),
    OraTimestampTz(Image<'a>),
    OraYearMonth(Image<'a>),
    OraDaySecond(Image<'a>),
    OraTime(Image<'a>),
    Int32OraNum(Image<'a>),
    Int64OraNum(Image<'a>),
    Dec128OraNum(Image<'a>),
}

impl<'a> ScalarValue<'a> {
    pub fn kind(&self) -> ScalarKind {
        match self {
            ScalarValue::Null => ScalarKind::Null,
            ScalarValue::Bool(true) => ScalarKind::True,
            ScalarValue::Bool(false) => ScalarKind::False,
            ScalarValue::String(_) => ScalarKind::String,
            ScalarValue::Number(_) => ScalarKind::Number,
            ScalarValue::Int32(_) => ScalarKind::Int32,
            ScalarValue::Int64(_) => ScalarKind::Int64,
            ScalarValue::UInt32(_) => ScalarKind::UInt32,
            ScalarValue::UInt64(_) => ScalarKind::UInt64,
            ScalarValue::Float(_) => ScalarKind::Float,
            ScalarValue::Double(_) => ScalarKind::Double,
            ScalarValue::Binary(_) => ScalarKind::Binary,
            ScalarValue::Timestamp(_) => ScalarKind::Timestamp,
            ScalarValue::Oid(_) => ScalarKind::Oid,
            ScalarValue::Uuid(_) => ScalarKind::Uuid,
            ScalarValue::Id(_) => ScalarKind::Id,
            ScalarValue::Decimal128(_) => ScalarKind::Decimal128,
            ScalarValue::OraNumber(_) => ScalarKind::OraNumber,
            ScalarValue::OraDate(_) => ScalarKind::OraDate,
            ScalarValue::OraTimestamp(_) => ScalarKind::OraTimestamp,
            ScalarValue::OraTimestampTz(_) => ScalarKind::OraTimestampTz,
            ScalarValue::OraYearMonth(_) => ScalarKind::OraYearMonth,
            ScalarValue::OraDaySecond(_) => ScalarKind::OraDaySecond,
            ScalarValue::OraTime(_) => ScalarKind::OraTime,
            ScalarValue::Int32OraNum(_) => ScalarKind::Int32OraNum,
            ScalarValue::Int64OraNum(_) => ScalarKind::Int64OraNum,
            ScalarValue::Dec128OraNum(_) => ScalarKind::Dec128OraNum,
        }
    }

    pub fn string(s: impl Into<Cow<'a, str>>) -> Self {
        ScalarValue::String(s.into())
    }

    /// A decimal number held as text. The text must parse as a number.
    pub fn number(text: impl Into<Cow<'a, str>>) -> Result<Self> {
        let text = text.into();
        if Decimal::parse(&text).is_none() {
            return Err(DomError::malformed(0, format!("not a number: {text:?}")));
        }
        Ok(ScalarValue::Number(text))
    }

    /// Wraps an Oracle-format image after checking its length for `kind`.
    pub fn from_image(kind: ScalarKind, bytes: &'a [u8]) -> Result<Self> {
        check_image_len(kind, bytes.len())?;
        let image = Image::new(bytes);
        Ok(match kind {
            ScalarKind::OraNumber => ScalarValue::OraNumber(image),
            ScalarKind::OraDate => ScalarValue::OraDate(image),
            ScalarKind::OraTimestamp => ScalarValue::OraTimestamp(image),
            ScalarKind::OraTimestampTz => ScalarValue::OraTimestampTz(image),
            ScalarKind::OraYearMonth => ScalarValue::OraYearMonth(image),
            ScalarKind::OraDaySecond => ScalarValue::OraDaySecond(image),
            ScalarKind::OraTime => ScalarValue::OraTime(image),
            ScalarKind::Int32OraNum => ScalarValue::Int32OraNum(image),
            ScalarKind::Int64OraNum => ScalarValue::Int64OraNum(image),
            ScalarKind::Dec128OraNum => ScalarValue::Dec128OraNum(image),
            other => {
                return Err(DomError::invalid_state(format!(
                    "{other} is not an image-backed kind"
                )))
            }
        })
    }

    /// Oracle NUMBER image of an exact decimal.
    pub fn ora_number(value: &Decimal) -> Option<ScalarValue<'static>> {
        oranum::encode(value).map(|image| ScalarValue::OraNumber(Image::owned(image)))
    }

    pub fn ora_date(dt: &NaiveDateTime) -> ScalarValue<'static> {
        ScalarValue::OraDate(Image::owned(temporal::encode_date(dt).to_vec()))
    }

    pub fn ora_timestamp(dt: &NaiveDateTime) -> ScalarValue<'static> {
        ScalarValue::OraTimestamp(Image::owned(temporal::encode_timestamp(dt).to_vec()))
    }

    pub fn ora_timestamp_tz(dt: &chrono::DateTime<chrono::FixedOffset>) -> ScalarValue<'static> {
        ScalarValue::OraTimestampTz(Image::owned(temporal::encode_timestamp_tz(dt).to_vec()))
    }

    pub fn ora_time(t: &chrono::NaiveTime) -> ScalarValue<'static> {
        ScalarValue::OraTime(Image::owned(temporal::encode_time(t).to_vec()))
    }

    pub fn year_month(v: &temporal::YearMonth) -> ScalarValue<'static> {
        ScalarValue::OraYearMonth(Image::owned(temporal::encode_year_month(v).to_vec()))
    }

    pub fn day_second(v: &temporal::DaySecond) -> ScalarValue<'static> {
        ScalarValue::OraDaySecond(Image::owned(temporal::encode_day_second(v).to_vec()))
    }

    pub fn id(bytes: impl Into<Cow<'a, [u8]>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() > ID_MAX {
            return Err(DomError::malformed(
                0,
                format!("id of {} bytes exceeds {ID_MAX}", bytes.len()),
            ));
        }
        Ok(ScalarValue::Id(bytes))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::String(s) | ScalarValue::Number(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScalarValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Raw payload for the byte-backed kinds.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ScalarValue::Binary(b) | ScalarValue::Id(b) => Some(b.as_ref()),
            ScalarValue::Oid(b) => Some(&b[..]),
            ScalarValue::Uuid(u) => Some(&u.as_bytes()[..]),
            ScalarValue::Decimal128(b) => Some(&b[..]),
            ScalarValue::OraNumber(i)
            | ScalarValue::OraDate(i)
            | ScalarValue::OraTimestamp(i)
            | ScalarValue::OraTimestampTz(i)
            | ScalarValue::OraYearMonth(i)
            | ScalarValue::OraDaySecond(i)
            | ScalarValue::OraTime(i)
            | ScalarValue::Int32OraNum(i)
            | ScalarValue::Int64OraNum(i)
            | ScalarValue::Dec128OraNum(i) => Some(i.as_bytes()),
            _ => None,
        }
    }

    /// Exact decimal value of any finite numeric kind.
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            ScalarValue::Number(s) => Decimal::parse(s),
            ScalarValue::Int32(v) => Some(Decimal::from_i128(*v as i128)),
            ScalarValue::Int64(v) => Some(Decimal::from_i128(*v as i128)),
            ScalarValue::UInt32(v) => Some(Decimal::from_u128(*v as u128)),
            ScalarValue::UInt64(v) => Some(Decimal::from_u128(*v as u128)),
            ScalarValue::Float(v) => Decimal::from_f32(*v),
            ScalarValue::Double(v) => Decimal::from_f64(*v),
            ScalarValue::Decimal128(b) => match dec128::decode(b) {
                dec128::Dec128::Finite(d) => Some(d),
                _ => None,
            },
            ScalarValue::OraNumber(i)
            | ScalarValue::Int32OraNum(i)
            | ScalarValue::Int64OraNum(i)
            | ScalarValue::Dec128OraNum(i) => oranum::decode_finite(i.as_bytes()).ok(),
            _ => None,
        }
    }

    pub fn into_owned(self) -> ScalarValue<'static> {
        match self {
            ScalarValue::Null => ScalarValue::Null,
            ScalarValue::Bool(b) => ScalarValue::Bool(b),
            ScalarValue::String(s) => ScalarValue::String(Cow::Owned(s.into_owned())),
            ScalarValue::Number(s) => ScalarValue::Number(Cow::Owned(s.into_owned())),
            ScalarValue::Int32(v) => ScalarValue::Int32(v),
            ScalarValue::Int64(v) => ScalarValue::Int64(v),
            ScalarValue::UInt32(v) => ScalarValue::UInt32(v),
            ScalarValue::UInt64(v) => ScalarValue::UInt64(v),
            ScalarValue::Float(v) => ScalarValue::Float(v),
            ScalarValue::Double(v) => ScalarValue::Double(v),
            ScalarValue::Binary(b) => ScalarValue::Binary(Cow::Owned(b.into_owned())),
            ScalarValue::Timestamp(t) => ScalarValue::Timestamp(t),
            ScalarValue::Oid(b) => ScalarValue::Oid(b),
            ScalarValue::Uuid(u) => ScalarValue::Uuid(u),
            ScalarValue::Id(b) => ScalarValue::Id(Cow::Owned(b.into_owned())),
            ScalarValue::Decimal128(b) => ScalarValue::Decimal128(b),
            ScalarValue::OraNumber(i) => ScalarValue::OraNumber(i.into_owned()),
            ScalarValue::OraDate(i) => ScalarValue::OraDate(i.into_owned()),
            ScalarValue::OraTimestamp(i) => ScalarValue::OraTimestamp(i.into_owned()),
            ScalarValue::OraTimestampTz(i) => ScalarValue::OraTimestampTz(i.into_owned()),
            ScalarValue::OraYearMonth(i) => ScalarValue::OraYearMonth(i.into_owned()),
            ScalarValue::OraDaySecond(i) => ScalarValue::OraDaySecond(i.into_owned()),
            ScalarValue::OraTime(i) => ScalarValue::OraTime(i.into_owned()),
            ScalarValue::Int32OraNum(i) => ScalarValue::Int32OraNum(i.into_owned()),
            ScalarValue::Int64OraNum(i) => ScalarValue::Int64OraNum(i.into_owned()),
            ScalarValue::Dec128OraNum(i) => ScalarValue::Dec128OraNum(i.into_owned()),
        }
    }

    /// A view of `self` that borrows its payload instead of owning it.
    pub fn borrowed(&self) -> ScalarValue<'_> {
        match self {
            ScalarValue::String(s) => ScalarValue::String(Cow::Borrowed(s)),
            ScalarValue::Number(s) => ScalarValue::Number(Cow::Borrowed(s)),
            ScalarValue::Binary(b) => ScalarValue::Binary(Cow::Borrowed(b)),
            ScalarValue::Id(b) => ScalarValue::Id(Cow::Borrowed(b)),
            ScalarValue::OraNumber(i) => ScalarValue::OraNumber(i.borrowed()),
            ScalarValue::OraDate(i) => ScalarValue::OraDate(i.borrowed()),
            ScalarValue::OraTimestamp(i) => ScalarValue::OraTimestamp(i.borrowed()),
            ScalarValue::OraTimestampTz(i) => ScalarValue::OraTimestampTz(i.borrowed()),
            ScalarValue::OraYearMonth(i) => ScalarValue::OraYearMonth(i.borrowed()),
            ScalarValue::OraDaySecond(i) => ScalarValue::OraDaySecond(i.borrowed()),
            ScalarValue::OraTime(i) => ScalarValue::OraTime(i.borrowed()),
            ScalarValue::Int32OraNum(i) => ScalarValue::Int32OraNum(i.borrowed()),
            ScalarValue::Int64OraNum(i) => ScalarValue::Int64OraNum(i.borrowed()),
            ScalarValue::Dec128OraNum(i) => ScalarValue::Dec128OraNum(i.borrowed()),
            ScalarValue::Null => ScalarValue::Null,
            ScalarValue::Bool(b) => ScalarValue::Bool(*b),
            ScalarValue::Int32(v) => ScalarValue::Int32(*v),
            ScalarValue::Int64(v) => ScalarValue::Int64(*v),
            ScalarValue::UInt32(v) => ScalarValue::UInt32(*v),
            ScalarValue::UInt64(v) => ScalarValue::UInt64(*v),
            ScalarValue::Float(v) => ScalarValue::Float(*v),
            ScalarValue::Double(v) => ScalarValue::Double(*v),
            ScalarValue::Timestamp(t) => ScalarValue::Timestamp(*t),
            ScalarValue::Oid(b) => ScalarValue::Oid(*b),
            ScalarValue::Uuid(u) => ScalarValue::Uuid(*u),
            ScalarValue::Decimal128(b) => ScalarValue::Decimal128(*b),
        }
    }

    /// Re-encodes a textual `Number` under the given policy. Numbers that do
    /// not fit the target encoding, and every other kind, pass through.
    pub fn with_number_encoding(self, encoding: NumberEncoding) -> ScalarValue<'a> {
        let text = match &self {
            ScalarValue::Number(text) => text,
            _ => return self,
        };
        let converted = match encoding {
            NumberEncoding::Text => None,
            NumberEncoding::Native => native_number(text),
            NumberEncoding::Oracle => Decimal::parse(text).and_then(|d| ScalarValue::ora_number(&d)),
        };
        match converted {
            Some(value) => value,
            None => self,
        }
    }
}

/// Integral text becomes `Int64` or `UInt64`; anything else becomes `Double`.
fn native_number(text: &str) -> Option<ScalarValue<'static>> {
    let integral = !text.contains(['.', 'e', 'E']);
    if integral {
        if let Ok(v) = text.parse::<i64>() {
            return Some(ScalarValue::Int64(v));
        }
        if let Ok(v) = text.parse::<u64>() {
            return Some(ScalarValue::UInt64(v));
        }
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(ScalarValue::Double)
}

pub(crate) fn check_image_len(kind: ScalarKind, len: usize) -> Result<()> {
    let ok = match kind {
        ScalarKind::OraNumber
        | ScalarKind::Int32OraNum
        | ScalarKind::Int64OraNum
        | ScalarKind::Dec128OraNum => (1..=oranum::MAX_LEN).contains(&len),
        ScalarKind::OraDate => len == temporal::DATE_LEN,
        ScalarKind::OraTimestamp => {
            len == temporal::TIMESTAMP_LEN || len == temporal::DATE_LEN
        }
        ScalarKind::OraTimestampTz => len == temporal::TIMESTAMP_TZ_LEN,
        ScalarKind::OraYearMonth => len == temporal::YEAR_MONTH_LEN,
        ScalarKind::OraDaySecond => len == temporal::DAY_SECOND_LEN,
        ScalarKind::OraTime => len == temporal::TIME_LEN,
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(DomError::malformed(
            0,
            format!("{len}-byte image is not a valid {kind}"),
        ))
    }
}

impl From<bool> for ScalarValue<'_> {
    fn from(v: bool) -> Self {
        ScalarValue::Bool(v)
    }
}

impl From<i32> for ScalarValue<'_> {
    fn from(v: i32) -> Self {
        ScalarValue::Int32(v)
    }
}

impl From<i64> for ScalarValue<'_> {
    fn from(v: i64) -> Self {
        ScalarValue::Int64(v)
    }
}

impl From<u32> for ScalarValue<'_> {
    fn from(v: u32) -> Self {
        ScalarValue::UInt32(v)
    }
}

impl From<u64> for ScalarValue<'_> {
    fn from(v: u64) -> Self {
        ScalarValue::UInt64(v)
    }
}

impl From<f32> for ScalarValue<'_> {
    fn from(v: f32) -> Self {
        ScalarValue::Float(v)
    }
}

impl From<f64> for ScalarValue<'_> {
    fn from(v: f64) -> Self {
        ScalarValue::Double(v)
    }
}

impl<'a> From<&'a str> for ScalarValue<'a> {
    fn from(v: &'a str) -> Self {
        ScalarValue::String(Cow::Borrowed(v))
    }
}

impl From<String> for ScalarValue<'_> {
    fn from(v: String) -> Self {
        ScalarValue::String(Cow::Owned(v))
    }
}

impl From<Uuid> for ScalarValue<'_> {
    fn from(v: Uuid) -> Self {
        ScalarValue::Uuid(v)
    }
}

impl From<NaiveDateTime> for ScalarValue<'_> {
    fn from(v: NaiveDateTime) -> Self {
        ScalarValue::Timestamp(v)
    }
}
