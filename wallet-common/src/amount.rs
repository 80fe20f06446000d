use std::fmt;
use std::ops::{Add, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Fixed-point money value stored as signed minor units (cents for a
/// 2-decimal currency, micro-units for a 6-decimal stablecoin — the decimal
/// count lives on `Currency`, not here).
///
/// All monetary math in the core MUST go through this type; floating-point
/// dollars are only accepted at ingress (`from_dollars`) and egress
/// (`to_decimal_string`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_minor_units(units: i64) -> Self {
        Amount(units)
    }

    /// Alias kept for call sites that think in cents (2-decimal currencies).
    pub fn from_cents(cents: i64) -> Self {
        Amount(cents)
    }

    /// Rounds a floating-point dollar amount to whole cents (half-to-even).
    pub fn from_dollars(dollars: f64) -> Self {
        Amount(round_half_to_even(dollars * 100.0))
    }

    /// Parses a decimal string ("12.3456") at the given currency precision.
    /// Excess fractional digits are truncated toward zero, not rounded.
    pub fn from_decimal_str(input: &str, decimals: u8) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CoreError::Validation("empty amount string".to_string()));
        }

        let negative = input.starts_with('-');
        let unsigned = input.trim_start_matches(['+', '-']);

        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((i, f)) => (i, f),
            None => (unsigned, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(CoreError::Validation(format!("malformed amount: {input}")));
        }
        if !int_part.chars().all(|c| c.is_ascii_digit()) && !int_part.is_empty() {
            return Err(CoreError::Validation(format!("malformed amount: {input}")));
        }
        if !frac_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(CoreError::Validation(format!("malformed amount: {input}")));
        }

        let int_value: i64 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| CoreError::Validation(format!("malformed amount: {input}")))?
        };

        let scale = decimals as usize;
        let mut frac_digits: String = frac_part.chars().take(scale).collect();
        while frac_digits.len() < scale {
            frac_digits.push('0');
        }
        let frac_value: i64 = if frac_digits.is_empty() {
            0
        } else {
            frac_digits
                .parse()
                .map_err(|_| CoreError::Validation(format!("malformed amount: {input}")))?
        };

        let scale_factor = 10i64.pow(decimals as u32);
        let magnitude = int_value
            .checked_mul(scale_factor)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(|| CoreError::Validation(format!("amount overflow: {input}")))?;

        Ok(Amount(if negative { -magnitude } else { magnitude }))
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn abs(&self) -> Amount {
        Amount(self.0.abs())
    }

    pub fn checked_add(&self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(&self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Multiplies by an integer factor (e.g. "this line item times quantity").
    pub fn multiply(&self, factor: i64) -> Amount {
        Amount(self.0 * factor)
    }

    /// Divides by an integer divisor, rounding half-to-even. A zero divisor
    /// returns a zero amount by documented convention rather than erroring.
    pub fn divide(&self, divisor: i64) -> Amount {
        if divisor == 0 {
            return Amount::ZERO;
        }
        Amount(round_half_to_even(self.0 as f64 / divisor as f64))
    }

    /// Computes `self * pct` where `pct` is e.g. `0.05` for 5%, rounding
    /// half-to-even to the nearest minor unit.
    pub fn percentage(&self, pct: f64) -> Amount {
        Amount(round_half_to_even(self.0 as f64 * pct))
    }

    /// Renders the amount as a fixed-point decimal string at the given
    /// currency precision, e.g. `to_decimal_string(2)` -> `"12.30"`.
    pub fn to_decimal_string(&self, decimals: u8) -> String {
        let scale = 10i64.pow(decimals as u32);
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs() as i64;
        let int_part = magnitude / scale;
        let frac_part = magnitude % scale;
        if decimals == 0 {
            format!("{sign}{int_part}")
        } else {
            format!("{sign}{int_part}.{frac_part:0width$}", width = decimals as usize)
        }
    }
}

impl Default for Amount {
    fn default() -> Self {
        Amount::ZERO
    }
}

impl Add for Amount {
    type Output = Amount;
    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Amount;
    fn sub(self, rhs: Self) -> Self::Output {
        Amount(self.0 - rhs.0)
    }
}

impl Neg for Amount {
    type Output = Amount;
    fn neg(self) -> Self::Output {
        Amount(-self.0)
    }
}

/// Default `Display` assumes 2-decimal (USD-style) rendering, matching the
/// spec's "serializes as a fixed-2-decimal string". Callers working with
/// stablecoin precision should use `to_decimal_string` explicitly.
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal_string(2))
    }
}

fn round_half_to_even(value: f64) -> i64 {
    let floor = value.floor();
    let diff = value - floor;
    let floor_i = floor as i64;
    if diff < 0.5 {
        floor_i
    } else if diff > 0.5 {
        floor_i + 1
    } else if floor_i % 2 == 0 {
        floor_i
    } else {
        floor_i + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_dollars_rounds_to_cents() {
        assert_eq!(Amount::from_dollars(19.999).minor_units(), 2000);
        assert_eq!(Amount::from_dollars(19.994).minor_units(), 1999);
    }

    #[test]
    fn decimal_string_roundtrip_usd() {
        let a = Amount::from_cents(12345);
        assert_eq!(a.to_decimal_string(2), "123.45");
        assert_eq!(Amount::from_decimal_str("123.45", 2).unwrap(), a);
    }

    #[test]
    fn decimal_string_roundtrip_stablecoin() {
        let a = Amount::from_decimal_str("1.500000", 6).unwrap();
        assert_eq!(a.minor_units(), 1_500_000);
        assert_eq!(a.to_decimal_string(6), "1.500000");
    }

    #[test]
    fn excess_precision_truncates_toward_zero() {
        let a = Amount::from_decimal_str("1.239", 2).unwrap();
        assert_eq!(a.minor_units(), 123);
    }

    #[test]
    fn division_by_zero_is_zero_by_convention() {
        assert_eq!(Amount::from_cents(500).divide(0), Amount::ZERO);
    }

    #[test]
    fn division_rounds_half_to_even() {
        assert_eq!(Amount::from_cents(5).divide(2).minor_units(), 2);
        assert_eq!(Amount::from_cents(15).divide(10).minor_units(), 2);
    }

    #[test]
    fn ordering_is_strict_on_cents() {
        assert!(Amount::from_cents(100) < Amount::from_cents(101));
        assert_eq!(Amount::from_cents(100), Amount::from_cents(100));
    }

    #[test]
    fn malformed_string_is_validation_error() {
        assert!(Amount::from_decimal_str("abc", 2).is_err());
        assert!(Amount::from_decimal_str("", 2).is_err());
    }
}
