//! IEEE 754-2008 decimal128 in binary integer decimal (BID) form, stored
//! as sixteen big-endian bytes.

use super::decimal::Decimal;

const BIAS: i32 = 6176;
const MAX_BIASED: i32 = 12287;
const MAX_DIGITS: usize = 34;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dec128 {
    Finite(Decimal),
    Infinity { negative: bool },
    NaN,
}

pub fn decode(bytes: &[u8; 16]) -> Dec128 {
    let bits = u128::from_be_bytes(*bytes);
    let negative = bits >> 127 == 1;
    let combination = (bits >> 122) & 0x1F;
    if combination == 0x1F {
        return Dec128::NaN;
    }
    if combination == 0x1E {
        return Dec128::Infinity { negative };
    }
    let (biased, coefficient) = if (bits >> 125) & 0x3 == 0x3 {
        // Large-coefficient form; always exceeds 10^34 - 1, so non-canonical zero.
        (((bits >> 111) & 0x3FFF) as i32, 0u128)
    } else {
        (((bits >> 113) & 0x3FFF) as i32, bits & ((1u128 << 113) - 1))
    };
    let coefficient = if coefficient >= 10u128.pow(MAX_DIGITS as u32) {
        0
    } else {
        coefficient
    };
    let digits = coefficient.to_string().bytes().map(|b| b - b'0').collect();
    Dec128::Finite(Decimal::from_digits(negative, digits, biased - BIAS))
}

/// Encodes an exact decimal; `None` when it needs more than 34 digits or
/// the exponent is out of range.
pub fn encode(value: &Decimal) -> Option<[u8; 16]> {
    if value.digits().len() > MAX_DIGITS {
        return None;
    }
    let biased = value.exponent() + BIAS;
    if !(0..=MAX_BIASED).contains(&biased) {
        return None;
    }
    let mut coefficient: u128 = 0;
    for &d in value.digits() {
        coefficient = coefficient * 10 + d as u128;
    }
    let mut bits = coefficient | ((biased as u128) << 113);
    if value.is_negative() {
        bits |= 1u128 << 127;
    }
    Some(bits.to_be_bytes())
}
