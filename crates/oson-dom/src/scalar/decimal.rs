//! Exact decimal representation used to compare and render numbers of
//! every encoding on a common footing.

/// `(-1)^negative * digits * 10^exponent`, with `digits` free of leading
/// and trailing zeros. Zero has no digits and is never negative.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Decimal {
    negative: bool,
    digits: Vec<u8>,
    exponent: i32,
}

/// Values whose adjusted exponent falls outside this window print in
/// scientific notation.
const PLAIN_MIN_EXP: i32 = -20;
const PLAIN_MAX_EXP: i32 = 40;

impl Decimal {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Builds a normalized decimal from raw base-10 digits.
    pub fn from_digits(negative: bool, digits: Vec<u8>, exponent: i32) -> Self {
        let mut d = Self {
            negative,
            digits,
            exponent,
        };
        d.normalize();
        d
    }

    fn normalize(&mut self) {
        let lead = self.digits.iter().take_while(|&&d| d == 0).count();
        self.digits.drain(..lead);
        while let Some(&0) = self.digits.last() {
            self.digits.pop();
            self.exponent += 1;
        }
        if self.digits.is_empty() {
            self.negative = false;
            self.exponent = 0;
        }
    }

    pub fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn digits(&self) -> &[u8] {
        &self.digits
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// Exponent of the most significant digit.
    pub fn adjusted_exponent(&self) -> i32 {
        self.exponent + self.digits.len() as i32 - 1
    }

    /// Parses JSON-style number text, also accepting a leading `+` and a
    /// bare leading or trailing decimal point.
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        let mut i = 0;
        let mut negative = false;
        match bytes.first() {
            Some(b'-') => {
                negative = true;
                i += 1;
            }
            Some(b'+') => i += 1,
            _ => {}
        }
        let mut digits = Vec::with_capacity(bytes.len());
        let mut exponent: i64 = 0;
        let mut seen_digit = false;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            digits.push(bytes[i] - b'0');
            seen_digit = true;
            i += 1;
        }
        if i < bytes.len() && bytes[i] == b'.' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                digits.push(bytes[i] - b'0');
                exponent -= 1;
                seen_digit = true;
                i += 1;
            }
        }
        if !seen_digit {
            return None;
        }
        if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
            i += 1;
            let mut exp_negative = false;
            match bytes.get(i) {
                Some(b'-') => {
                    exp_negative = true;
                    i += 1;
                }
                Some(b'+') => i += 1,
                _ => {}
            }
            let start = i;
            let mut value: i64 = 0;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                value = value.saturating_mul(10).saturating_add((bytes[i] - b'0') as i64);
                i += 1;
            }
            if start == i {
                return None;
            }
            exponent += if exp_negative { -value } else { value };
        }
        if i != bytes.len() {
            return None;
        }
        let exponent = i32::try_from(exponent).ok()?;
        Some(Self::from_digits(negative, digits, exponent))
    }

    pub fn from_i128(value: i128) -> Self {
        let negative = value < 0;
        let digits = value
            .unsigned_abs()
            .to_string()
            .bytes()
            .map(|b| b - b'0')
            .collect();
        Self::from_digits(negative, digits, 0)
    }

    pub fn from_u128(value: u128) -> Self {
        let digits = value.to_string().bytes().map(|b| b - b'0').collect();
        Self::from_digits(false, digits, 0)
    }

    /// Shortest round-trip rendering of `value`; `None` for NaN or infinity.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Self::parse(&format!("{value:e}"))
    }

    pub fn from_f32(value: f32) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Self::parse(&format!("{value:e}"))
    }

    /// Integer value when the decimal is integral and fits in 128 bits.
    pub fn to_i128(&self) -> Option<i128> {
        if self.exponent < 0 {
            return None;
        }
        let mut value: i128 = 0;
        for &d in &self.digits {
            value = value.checked_mul(10)?.checked_add(d as i128)?;
        }
        for _ in 0..self.exponent {
            value = value.checked_mul(10)?;
        }
        Some(if self.negative { -value } else { value })
    }

    /// Canonical text: plain notation within a sane exponent window,
    /// `d.dddE+x` otherwise.
    pub fn to_text(&self) -> String {
        if self.is_zero() {
            return "0".to_string();
        }
        let adjusted = self.adjusted_exponent();
        if (PLAIN_MIN_EXP..=PLAIN_MAX_EXP).contains(&adjusted) {
            self.to_plain()
        } else {
            self.to_scientific()
        }
    }

    fn to_plain(&self) -> String {
        let mut out = String::with_capacity(self.digits.len() + 8);
        if self.negative {
            out.push('-');
        }
        let len = self.digits.len() as i32;
        if self.exponent >= 0 {
            out.extend(self.digits.iter().map(|&d| (b'0' + d) as char));
            out.extend(std::iter::repeat('0').take(self.exponent as usize));
        } else if -self.exponent < len {
            let split = (len + self.exponent) as usize;
            out.extend(self.digits[..split].iter().map(|&d| (b'0' + d) as char));
            out.push('.');
            out.extend(self.digits[split..].iter().map(|&d| (b'0' + d) as char));
        } else {
            out.push_str("0.");
            out.extend(std::iter::repeat('0').take((-self.exponent - len) as usize));
            out.extend(self.digits.iter().map(|&d| (b'0' + d) as char));
        }
        out
    }

    fn to_scientific(&self) -> String {
        if self.is_zero() {
            return "0".to_string();
        }
        let mut out = String::with_capacity(self.digits.len() + 8);
        if self.negative {
            out.push('-');
        }
        out.push((b'0' + self.digits[0]) as char);
        if self.digits.len() > 1 {
            out.push('.');
            out.extend(self.digits[1..].iter().map(|&d| (b'0' + d) as char));
        }
        let adjusted = self.adjusted_exponent();
        out.push('E');
        if adjusted >= 0 {
            out.push('+');
        }
        out.push_str(&adjusted.to_string());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_zeros_are_folded_into_the_exponent() {
        let a = Decimal::parse("100").unwrap();
        let b = Decimal::parse("1E2").unwrap();
        let c = Decimal::parse("100.000").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.digits(), &[1]);
        assert_eq!(a.exponent(), 2);
    }

    #[test]
    fn negative_zero_is_zero() {
        assert_eq!(Decimal::parse("-0.0").unwrap(), Decimal::zero());
    }

    #[test]
    fn rejects_garbage() {
        for text in ["", "-", "1e", "1.2.3", "abc", "1x", "e5"] {
            assert!(Decimal::parse(text).is_none(), "{text}");
        }
    }

    #[test]
    fn plain_rendering() {
        assert_eq!(Decimal::parse("1.50").unwrap().to_text(), "1.5");
        assert_eq!(Decimal::parse("-0.00025").unwrap().to_text(), "-0.00025");
        assert_eq!(Decimal::parse("12e3").unwrap().to_text(), "12000");
        assert_eq!(Decimal::parse("1e100").unwrap().to_text(), "1E+100");
        assert_eq!(Decimal::parse("-2.5e-30").unwrap().to_text(), "-2.5E-30");
    }

    #[test]
    fn floats_use_shortest_digits() {
        assert_eq!(Decimal::from_f64(0.1).unwrap(), Decimal::parse("0.1").unwrap());
        assert_eq!(Decimal::from_f32(0.1).unwrap(), Decimal::parse("0.1").unwrap());
        assert!(Decimal::from_f64(f64::NAN).is_none());
    }

    #[test]
    fn integer_conversion() {
        assert_eq!(Decimal::parse("1.2e3").unwrap().to_i128(), Some(1200));
        assert_eq!(Decimal::parse("1.5").unwrap().to_i128(), None);
        assert_eq!(Decimal::from_i128(-42).to_text(), "-42");
        assert_eq!(Decimal::from_u128(u64::MAX as u128).to_i128(), Some(u64::MAX as i128));
    }
}
