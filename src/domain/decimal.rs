//! Lossless decimal numeric type backed by rust_decimal.
//!
//! Provides canonical parsing from strings, formatting without exponent notation,
//! and the currency rounding used by brokerage statements.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal as RustDecimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lossless decimal numeric type for financial calculations.
///
/// Backed by rust_decimal to avoid floating-point drift. Serializes to a JSON
/// string so that persisted cost bases survive a save/load cycle bit-for-bit;
/// deserializes from either a string or a JSON number.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(RustDecimal);

impl Decimal {
    /// Create a Decimal from a RustDecimal.
    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s.trim()).map(Decimal)
    }

    /// Format the Decimal as a canonical string (no exponent notation).
    pub fn to_canonical_string(&self) -> String {
        let normalized = self.0.normalize();
        format!("{}", normalized)
    }

    /// Get the underlying RustDecimal.
    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    /// The multiplicative identity (1).
    pub fn one() -> Self {
        Decimal(RustDecimal::ONE)
    }

    /// Returns the value 100.
    pub fn hundred() -> Self {
        Decimal(RustDecimal::ONE_HUNDRED)
    }

    /// Lift a whole share count into a Decimal.
    pub fn from_i64(n: i64) -> Self {
        Decimal(RustDecimal::from(n))
    }

    /// Returns true if the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// Absolute value.
    pub fn abs(&self) -> Self {
        Decimal(self.0.abs())
    }

    /// Round to the nearest whole currency unit, halves away from zero.
    ///
    /// For the non-negative amounts fees and taxes produce this is the same
    /// as JavaScript's `Math.round`, which brokerage statements follow.
    pub fn round_currency(&self) -> Self {
        Decimal(
            self.0
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Round to `dp` decimal places, halves away from zero.
    pub fn round_dp(&self, dp: u32) -> Self {
        Decimal(
            self.0
                .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Largest whole number not greater than the value.
    pub fn floor(&self) -> Self {
        Decimal(self.0.floor())
    }

    /// Convert to i64, truncating any fraction. Returns None on overflow.
    pub fn to_i64(&self) -> Option<i64> {
        self.0.trunc().to_i64()
    }

    /// Checked division; None when dividing by zero or on overflow.
    pub fn checked_div(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_div(rhs.0).map(Decimal)
    }

    /// Checked multiplication; None when the product exceeds 96 bits.
    pub fn checked_mul(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_mul(rhs.0).map(Decimal)
    }

    pub fn checked_add(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_add(rhs.0).map(Decimal)
    }

    pub fn checked_sub(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_sub(rhs.0).map(Decimal)
    }

    /// Value of `shares` units at `price`; None on overflow.
    pub fn lot_value(shares: i64, price: Decimal) -> Option<Decimal> {
        Decimal::from_i64(shares).checked_mul(price)
    }

    /// Convert a percentage (e.g. `0.1425`) into a fraction (`0.001425`).
    pub fn percent(&self) -> Self {
        Decimal(self.0 / RustDecimal::ONE_HUNDRED)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal::from_i64(value)
    }
}

// Arithmetic operations
impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Decimal) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

impl std::ops::Div for Decimal {
    type Output = Decimal;

    fn div(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 / rhs.0)
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_decimal_canonical_strips_trailing_zeros() {
        assert_eq!(d("45.4500").to_canonical_string(), "45.45");
        assert_eq!(d("100143.000").to_canonical_string(), "100143");
        assert!(!d("0.0001").to_canonical_string().contains('e'));
    }

    #[test]
    fn test_round_currency_half_away_from_zero() {
        assert_eq!(d("142.5").round_currency(), d("143"));
        assert_eq!(d("142.4999").round_currency(), d("142"));
        assert_eq!(d("0.5").round_currency(), d("1"));
        assert_eq!(d("85.5").round_currency(), d("86"));
    }

    #[test]
    fn test_floor_and_to_i64() {
        assert_eq!(d("1099.9").floor(), d("1099"));
        assert_eq!(d("1100").to_i64(), Some(1100));
        assert_eq!(d("12.7").to_i64(), Some(12));
    }

    #[test]
    fn test_checked_div_by_zero() {
        assert_eq!(d("10").checked_div(Decimal::zero()), None);
        assert_eq!(d("10").checked_div(d("4")), Some(d("2.5")));
    }

    #[test]
    fn test_checked_arithmetic_reports_overflow() {
        assert_eq!(Decimal::lot_value(1000, d("50")), Some(d("50000")));
        assert_eq!(Decimal::lot_value(i64::MAX, d("100000000000")), None);
        let max = Decimal::new(RustDecimal::MAX);
        assert_eq!(max.checked_add(Decimal::one()), None);
        assert_eq!((-max).checked_sub(Decimal::one()), None);
        assert_eq!(d("2").checked_add(d("3")), Some(d("5")));
    }

    #[test]
    fn test_percent() {
        assert_eq!(d("0.1425").percent(), d("0.001425"));
        assert_eq!(d("0.3").percent(), d("0.003"));
    }

    #[test]
    fn test_decimal_json_serialization_is_lossless_string() {
        let value = d("50000") / d("1100");
        let json = serde_json::to_value(value).unwrap();
        assert!(json.is_string());
        let back: Decimal = serde_json::from_value(json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_decimal_deserializes_from_number() {
        let value: Decimal = serde_json::from_str("45.45").unwrap();
        assert_eq!(value, d("45.45"));
    }

    #[test]
    fn test_decimal_ordering() {
        assert!(d("10") < d("20"));
        assert!(d("-1").is_negative());
        assert!(d("0.01").is_positive());
        assert!(!Decimal::zero().is_positive());
    }
}
