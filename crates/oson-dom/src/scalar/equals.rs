use chrono::{NaiveDateTime, NaiveTime};

use super::dec128::{self, Dec128};
use super::decimal::Decimal;
use super::oranum::{self, OraNumber};
use super::temporal;
use super::ScalarValue;

/// Encoding-independent form of a scalar. Two scalars are equal when their
/// canonical forms are equal.
#[derive(Debug, PartialEq)]
enum Canonical<'v> {
    Null,
    Bool(bool),
    Number(Decimal),
    NaN,
    Infinity { negative: bool },
    Text(&'v str),
    Binary(&'v [u8]),
    Id(&'v [u8]),
    Oid(&'v [u8]),
    Uuid(&'v [u8]),
    Instant(NaiveDateTime),
    Time(NaiveTime),
    Months(i64),
    Nanos(i128),
}

fn float(value: f64) -> Canonical<'static> {
    if value.is_nan() {
        Canonical::NaN
    } else if value.is_infinite() {
        Canonical::Infinity {
            negative: value < 0.0,
        }
    } else {
        // from_f64 only fails for non-finite input.
        Canonical::Number(Decimal::from_f64(value).unwrap_or_default())
    }
}

fn canonical<'v>(value: &'v ScalarValue<'_>) -> Option<Canonical<'v>> {
    Some(match value {
        ScalarValue::Null => Canonical::Null,
        ScalarValue::Bool(b) => Canonical::Bool(*b),
        ScalarValue::String(s) => Canonical::Text(s.as_ref()),
        ScalarValue::Number(s) => Canonical::Number(Decimal::parse(s)?),
        ScalarValue::Int32(_)
        | ScalarValue::Int64(_)
        | ScalarValue::UInt32(_)
        | ScalarValue::UInt64(_) => Canonical::Number(value.to_decimal()?),
        ScalarValue::Float(f) => match Decimal::from_f32(*f) {
            Some(d) => Canonical::Number(d),
            None => float(*f as f64),
        },
        ScalarValue::Double(f) => float(*f),
        ScalarValue::Decimal128(bytes) => match dec128::decode(bytes) {
            Dec128::Finite(d) => Canonical::Number(d),
            Dec128::Infinity { negative } => Canonical::Infinity { negative },
            Dec128::NaN => Canonical::NaN,
        },
        ScalarValue::OraNumber(i)
        | ScalarValue::Int32OraNum(i)
        | ScalarValue::Int64OraNum(i)
        | ScalarValue::Dec128OraNum(i) => match oranum::decode(i.as_bytes()).ok()? {
            OraNumber::Finite(d) => Canonical::Number(d),
            OraNumber::PositiveInfinity => Canonical::Infinity { negative: false },
            OraNumber::NegativeInfinity => Canonical::Infinity { negative: true },
        },
        ScalarValue::Binary(b) => Canonical::Binary(b.as_ref()),
        ScalarValue::Id(b) => Canonical::Id(b.as_ref()),
        ScalarValue::Oid(b) => Canonical::Oid(&b[..]),
        ScalarValue::Uuid(u) => Canonical::Uuid(&u.as_bytes()[..]),
        ScalarValue::Timestamp(t) => Canonical::Instant(*t),
        ScalarValue::OraDate(i) => Canonical::Instant(temporal::decode_date(i.as_bytes()).ok()?),
        ScalarValue::OraTimestamp(i) => {
            Canonical::Instant(temporal::decode_timestamp(i.as_bytes()).ok()?)
        }
        ScalarValue::OraTimestampTz(i) => Canonical::Instant(
            temporal::decode_timestamp_tz(i.as_bytes())
                .ok()?
                .naive_utc(),
        ),
        ScalarValue::OraTime(i) => Canonical::Time(temporal::decode_time(i.as_bytes()).ok()?),
        ScalarValue::OraYearMonth(i) => {
            Canonical::Months(temporal::decode_year_month(i.as_bytes()).ok()?.total_months())
        }
        ScalarValue::OraDaySecond(i) => {
            Canonical::Nanos(temporal::decode_day_second(i.as_bytes()).ok()?.total_nanos())
        }
    })
}

/// Logical equality across encodings: numbers compare by exact value
/// (`Int32(1)`, `"1.0"` as a Number and an Oracle NUMBER image of one are
/// all equal), strings byte-wise, datetimes as UTC instants. Binary, id,
/// OID and UUID values only equal values of the same kind.
///
/// Scalars that fail to decode are never equal to anything.
pub fn scalar_equals(a: &ScalarValue<'_>, b: &ScalarValue<'_>) -> bool {
    match (canonical(a), canonical(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::{Image, OID_LEN};
    use std::borrow::Cow;
    use uuid::Uuid;
    use chrono::{FixedOffset, NaiveDate, TimeZone};

    #[test]
    fn numbers_compare_by_value() {
        let one = ScalarValue::Int32(1);
        let text = ScalarValue::number("1.0").unwrap();
        let ora = ScalarValue::OraNumber(Image::owned(vec![0xC1, 0x02]));
        let double = ScalarValue::Double(1.0);
        let dec = ScalarValue::Decimal128(
            dec128::encode(&Decimal::parse("10e-1").unwrap()).unwrap(),
        );
        for other in [&text, &ora, &double, &dec] {
            assert!(scalar_equals(&one, other), "{other:?}");
        }
        assert!(!scalar_equals(&one, &ScalarValue::Int64(2)));
    }

    #[test]
    fn number_is_not_string() {
        assert!(!scalar_equals(
            &ScalarValue::number("1").unwrap(),
            &ScalarValue::string("1")
        ));
    }

    #[test]
    fn float_precision_is_respected() {
        assert!(scalar_equals(
            &ScalarValue::Float(0.5),
            &ScalarValue::Double(0.5)
        ));
        assert!(scalar_equals(
            &ScalarValue::Float(0.1),
            &ScalarValue::number("0.1").unwrap()
        ));
        assert!(!scalar_equals(
            &ScalarValue::Double(0.1f32 as f64),
            &ScalarValue::number("0.1").unwrap()
        ));
    }

    #[test]
    fn instants_compare_in_utc() {
        let utc = NaiveDate::from_ymd_opt(2020, 5, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let local = plus_two.from_utc_datetime(&utc);
        assert!(scalar_equals(
            &ScalarValue::Timestamp(utc),
            &ScalarValue::ora_timestamp_tz(&local)
        ));
        assert!(scalar_equals(
            &ScalarValue::Timestamp(utc),
            &ScalarValue::ora_date(&utc)
        ));
    }

    #[test]
    fn nan_equals_itself_only() {
        assert!(scalar_equals(
            &ScalarValue::Double(f64::NAN),
            &ScalarValue::Double(f64::NAN)
        ));
        assert!(!scalar_equals(
            &ScalarValue::Double(f64::NAN),
            &ScalarValue::Double(f64::INFINITY)
        ));
    }

    #[test]
    fn malformed_images_are_never_equal() {
        let broken = ScalarValue::OraDate(Image::owned(vec![0; 7]));
        assert!(!scalar_equals(&broken, &broken));
    }

    #[test]
    fn bytes_compare_by_content() {
        let a = ScalarValue::Binary(Cow::Owned(vec![1, 2, 3]));
        let b = ScalarValue::Binary(Cow::Borrowed(&[1u8, 2, 3][..]));
        assert!(scalar_equals(&a, &b));
        assert!(!scalar_equals(&a, &ScalarValue::string("\u{1}\u{2}\u{3}")));
    }

    #[test]
    fn byte_kinds_do_not_mix() {
        let raw = ScalarValue::Binary(Cow::Owned(vec![7; 16]));
        let uuid = ScalarValue::Uuid(Uuid::from_bytes([7; 16]));
        let id = ScalarValue::Id(Cow::Owned(vec![7; 16]));
        assert!(!scalar_equals(&raw, &uuid));
        assert!(!scalar_equals(&raw, &id));
        assert!(!scalar_equals(&id, &uuid));
        assert!(scalar_equals(&uuid, &ScalarValue::Uuid(Uuid::from_bytes([7; 16]))));

        let oid = ScalarValue::Oid([7; OID_LEN]);
        let same_bytes = ScalarValue::Binary(Cow::Owned(vec![7; OID_LEN]));
        assert!(!scalar_equals(&oid, &same_bytes));
        assert!(scalar_equals(&oid, &ScalarValue::Oid([7; OID_LEN])));
    }
}
