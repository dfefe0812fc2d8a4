use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::ValueParseError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumberSearchValue {
    pub value: Decimal,
}

impl NumberSearchValue {
    pub fn parse(s: &str) -> Result<Self, ValueParseError> {
        parse_decimal(s)
            .map(|value| Self { value })
            .ok_or_else(|| ValueParseError::Number(s.to_string()))
    }

    /// Range implied by the significant digits of the literal:
    /// `100` -> `[99.5, 100.5]`, `100.00` -> `[99.995, 100.005]`.
    /// `None` when a bound falls outside the representable range.
    pub fn implicit_range(&self) -> Option<(Decimal, Decimal)> {
        let scale = self.value.scale();
        if scale >= 28 {
            return Some((self.value, self.value));
        }
        let half = Decimal::new(5, scale + 1);
        Some((self.value.checked_sub(half)?, self.value.checked_add(half)?))
    }
}

/// Plain or scientific decimal notation.
pub(crate) fn parse_decimal(s: &str) -> Option<Decimal> {
    let looks_numeric = !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'));
    if !looks_numeric {
        return None;
    }

    if s.contains(['e', 'E']) {
        Decimal::from_scientific(s).ok()
    } else {
        Decimal::from_str(s).ok()
    }
}

impl fmt::Display for NumberSearchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
