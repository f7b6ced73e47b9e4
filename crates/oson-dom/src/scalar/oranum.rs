//! Oracle NUMBER images: one exponent byte followed by up to twenty
//! base-100 mantissa digits.
//!
//! Positive values store `digit + 1` with exponent byte `0xC1 + e`;
//! negative values store `101 - digit` with exponent byte `0x3E - e` and a
//! trailing `102` terminator when the mantissa is shorter than twenty digits.

use super::decimal::Decimal;
use crate::{DomError, Result};

pub const MAX_LEN: usize = 22;
const MAX_MANTISSA: usize = 20;
const ZERO: u8 = 0x80;
const POSITIVE_BIAS: i32 = 0xC1;
const NEGATIVE_BIAS: i32 = 0x3E;
const NEGATIVE_TERMINATOR: u8 = 102;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OraNumber {
    Finite(Decimal),
    PositiveInfinity,
    NegativeInfinity,
}

/// Encodes `value`, or `None` when it needs more than forty significant
/// digits or its exponent is out of range.
pub fn encode(value: &Decimal) -> Option<Vec<u8>> {
    if value.is_zero() {
        return Some(vec![ZERO]);
    }
    let digits = value.digits();
    let low = value.exponent();
    let high = value.adjusted_exponent();
    let e = high.div_euclid(2);
    let top = 2 * e + 1;
    let bottom = if low.rem_euclid(2) == 0 { low } else { low - 1 };
    let mut mantissa = Vec::with_capacity(MAX_MANTISSA);
    let mut pos = top;
    while pos > bottom {
        let hi = digit_at(digits, high, pos);
        let lo = digit_at(digits, high, pos - 1);
        mantissa.push(hi * 10 + lo);
        pos -= 2;
    }
    while let Some(&0) = mantissa.last() {
        mantissa.pop();
    }
    if mantissa.len() > MAX_MANTISSA {
        return None;
    }
    let mut out = Vec::with_capacity(mantissa.len() + 2);
    if value.is_negative() {
        let byte = NEGATIVE_BIAS - e;
        if !(0..=0x7F).contains(&byte) || byte == 0 {
            return None;
        }
        out.push(byte as u8);
        out.extend(mantissa.iter().map(|&d| 101 - d));
        if mantissa.len() < MAX_MANTISSA {
            out.push(NEGATIVE_TERMINATOR);
        }
    } else {
        let byte = POSITIVE_BIAS + e;
        if !(0x81..=0xFF).contains(&byte) {
            return None;
        }
        out.push(byte as u8);
        out.extend(mantissa.iter().map(|&d| d + 1));
    }
    Some(out)
}

fn digit_at(digits: &[u8], high: i32, pos: i32) -> u8 {
    let idx = high - pos;
    if idx < 0 {
        return 0;
    }
    digits.get(idx as usize).copied().unwrap_or(0)
}

pub fn decode(image: &[u8]) -> Result<OraNumber> {
    let bad = |msg: &str| DomError::malformed(0, format!("invalid NUMBER image: {msg}"));
    let (&head, rest) = image.split_first().ok_or_else(|| bad("empty"))?;
    if image.len() > MAX_LEN {
        return Err(bad("too long"));
    }
    if head == ZERO && rest.is_empty() {
        return Ok(OraNumber::Finite(Decimal::zero()));
    }
    if head == 0x00 && rest.is_empty() {
        return Ok(OraNumber::NegativeInfinity);
    }
    if head == 0xFF && rest == [101] {
        return Ok(OraNumber::PositiveInfinity);
    }
    let negative = head & 0x80 == 0;
    let (e, mantissa): (i32, Vec<u8>) = if negative {
        let body = match rest.last() {
            Some(&NEGATIVE_TERMINATOR) => &rest[..rest.len() - 1],
            _ => rest,
        };
        let mut out = Vec::with_capacity(body.len());
        for &b in body {
            if !(2..=101).contains(&b) {
                return Err(bad("mantissa byte out of range"));
            }
            out.push(101 - b);
        }
        (NEGATIVE_BIAS - head as i32, out)
    } else {
        let mut out = Vec::with_capacity(rest.len());
        for &b in rest {
            if !(1..=100).contains(&b) {
                return Err(bad("mantissa byte out of range"));
            }
            out.push(b - 1);
        }
        (head as i32 - POSITIVE_BIAS, out)
    };
    if mantissa.is_empty() {
        return Err(bad("missing mantissa"));
    }
    let mut digits = Vec::with_capacity(mantissa.len() * 2);
    for d in &mantissa {
        digits.push(d / 10);
        digits.push(d % 10);
    }
    let exponent = 2 * (e - mantissa.len() as i32 + 1);
    Ok(OraNumber::Finite(Decimal::from_digits(
        negative, digits, exponent,
    )))
}

/// Decodes a finite image straight to a decimal.
pub fn decode_finite(image: &[u8]) -> Result<Decimal> {
    match decode(image)? {
        OraNumber::Finite(d) => Ok(d),
        _ => Err(DomError::malformed(0, "NUMBER image is infinite")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(text: &str) -> Vec<u8> {
        encode(&Decimal::parse(text).unwrap()).unwrap()
    }

    #[test]
    fn known_images() {
        assert_eq!(enc("0"), [0x80]);
        assert_eq!(enc("1"), [0xC1, 0x02]);
        assert_eq!(enc("100"), [0xC2, 0x02]);
        assert_eq!(enc("0.5"), [0xC0, 0x33]);
        assert_eq!(enc("-1"), [0x3E, 0x64, 0x66]);
        assert_eq!(enc("123.45"), [0xC2, 0x02, 0x18, 0x2E]);
    }

    #[test]
    fn decode_inverts_encode() {
        for text in ["1", "-1", "0.5", "123.45", "-987654.321", "1e50", "-3e-40", "99"] {
            let value = Decimal::parse(text).unwrap();
            let image = encode(&value).unwrap();
            assert_eq!(decode_finite(&image).unwrap(), value, "{text}");
        }
    }

    #[test]
    fn infinities() {
        assert_eq!(decode(&[0xFF, 101]).unwrap(), OraNumber::PositiveInfinity);
        assert_eq!(decode(&[0x00]).unwrap(), OraNumber::NegativeInfinity);
    }

    #[test]
    fn too_many_digits() {
        let long = "1".repeat(41);
        assert!(encode(&Decimal::parse(&long).unwrap()).is_none());
        assert!(encode(&Decimal::parse(&"1".repeat(40)).unwrap()).is_some());
    }

    #[test]
    fn rejects_bad_mantissa() {
        assert!(decode(&[0xC1, 0]).is_err());
        assert!(decode(&[]).is_err());
        assert!(decode(&[0xC1]).is_err());
    }
}
