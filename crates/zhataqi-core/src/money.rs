//! # Money Module
//!
//! Provides the `Money` type for per-root prices and their totals.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Channel price for grade 2200-2500 is ¥45.5 per root.                  │
//! │    1234 roots × 45.5 in f64 is fine, but summing dozens of such        │
//! │    line totals drifts in the last digits.                              │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Fen                                              │
//! │    ¥45.5 = 4550 fen                                                     │
//! │    1234 roots × 4550 fen = 5614700 fen = ¥56147 exactly                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Catalog and history documents carry prices as plain JSON numbers in yuan
//! (`300`, `45.5`). `Money` reads and writes that form directly, so the
//! integer representation never leaks into exported files.
//!
//! ## Usage
//! ```rust
//! use zhataqi_core::money::Money;
//!
//! let retail = Money::from_yuan(300);
//! let total = retail.multiply_quantity(30);
//! assert_eq!(total, Money::from_yuan(9000));
//! assert_eq!(total.to_yuan_string(), "9000");
//! ```

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};

/// Fen per yuan.
const FEN_PER_YUAN: i64 = 100;

// =============================================================================
// Money Type
// =============================================================================

/// A currency amount held in fen (1/100 yuan).
///
/// ## Design Decisions
/// - **i64 (signed)**: totals of large orders stay far from overflow
/// - **Single field tuple struct**: zero-cost wrapper over i64
/// - **Custom serde**: JSON numbers in yuan, matching the catalog format
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from fen.
    #[inline]
    pub const fn from_fen(fen: i64) -> Self {
        Money(fen)
    }

    /// Creates a Money value from whole yuan.
    ///
    /// ## Example
    /// ```rust
    /// use zhataqi_core::money::Money;
    ///
    /// assert_eq!(Money::from_yuan(137).fen(), 13700);
    /// ```
    #[inline]
    pub const fn from_yuan(yuan: i64) -> Self {
        Money(yuan * FEN_PER_YUAN)
    }

    /// Resolves a decimal yuan amount to the nearest fen.
    ///
    /// Returns `None` for NaN, infinities, and amounts outside the i64 fen
    /// range. Halves round away from zero.
    ///
    /// ## Example
    /// ```rust
    /// use zhataqi_core::money::Money;
    ///
    /// assert_eq!(Money::from_yuan_f64(45.5), Some(Money::from_fen(4550)));
    /// assert_eq!(Money::from_yuan_f64(f64::NAN), None);
    /// ```
    pub fn from_yuan_f64(yuan: f64) -> Option<Self> {
        if !yuan.is_finite() {
            return None;
        }
        let fen = (yuan * FEN_PER_YUAN as f64).round();
        if fen.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Money(fen as i64))
    }

    /// Converts a decimal yuan amount that is a whole number of fen.
    ///
    /// Returns `None` when the amount would need rounding (`0.125`), is not
    /// finite, or is out of range. Catalog prices go through this so the
    /// value read back always equals the value written.
    ///
    /// ## Example
    /// ```rust
    /// use zhataqi_core::money::Money;
    ///
    /// assert_eq!(Money::from_yuan_exact(45.5), Some(Money::from_fen(4550)));
    /// assert_eq!(Money::from_yuan_exact(0.125), None);
    /// ```
    pub fn from_yuan_exact(yuan: f64) -> Option<Self> {
        let money = Money::from_yuan_f64(yuan)?;
        // The f64 division is correctly rounded, so it reproduces the parsed
        // literal only when the literal named a whole fen amount.
        (money.as_yuan() == yuan).then_some(money)
    }

    /// Returns the amount in fen.
    #[inline]
    pub const fn fen(&self) -> i64 {
        self.0
    }

    /// Returns the whole-yuan portion (truncated toward zero).
    #[inline]
    pub const fn yuan(&self) -> i64 {
        self.0 / FEN_PER_YUAN
    }

    /// Returns the fen portion (always 0-99).
    #[inline]
    pub const fn fen_part(&self) -> i64 {
        (self.0 % FEN_PER_YUAN).abs()
    }

    /// Returns the amount in yuan as a float (display and JSON only).
    #[inline]
    pub fn as_yuan(&self) -> f64 {
        self.0 as f64 / FEN_PER_YUAN as f64
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a per-root price by a root count.
    ///
    /// ## Example
    /// ```rust
    /// use zhataqi_core::money::Money;
    ///
    /// let channel = Money::from_yuan(195);
    /// assert_eq!(channel.multiply_quantity(400), Money::from_yuan(78000));
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Overflow-checked variant of [`Money::multiply_quantity`].
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(fen) => Some(Money(fen)),
            None => None,
        }
    }

    /// Overflow-checked addition.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(fen) => Some(Money(fen)),
            None => None,
        }
    }

    /// Returns true when `self >= reference × numerator / denominator`.
    ///
    /// Evaluated as `self × denominator >= reference × numerator` in i128, so
    /// the comparison is exact.
    ///
    /// ## Example
    /// ```rust
    /// use zhataqi_core::money::Money;
    ///
    /// let retail = Money::from_yuan(100);
    /// assert!(Money::from_yuan(80).meets_floor(retail, 8, 10));
    /// assert!(!Money::from_yuan(50).meets_floor(retail, 8, 10));
    /// ```
    pub const fn meets_floor(&self, reference: Money, numerator: i64, denominator: i64) -> bool {
        (self.0 as i128) * (denominator as i128) >= (reference.0 as i128) * (numerator as i128)
    }

    /// Formats the amount in yuan with no trailing zeros: `9000`, `45.5`, `0.05`.
    pub fn to_yuan_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let whole = self.yuan().abs();
        let part = self.fen_part();
        if part == 0 {
            format!("{}{}", sign, whole)
        } else if part % 10 == 0 {
            format!("{}{}.{}", sign, whole, part / 10)
        } else {
            format!("{}{}.{:02}", sign, whole, part)
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Human-readable form, e.g. `¥45.5`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "¥{}", self.to_yuan_string())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Whole amounts are written as JSON integers (`9000`), others as decimals (`45.5`).
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.fen_part() == 0 {
            serializer.serialize_i64(self.yuan())
        } else {
            serializer.serialize_f64(self.as_yuan())
        }
    }
}

/// Lenient: rounds to the nearest fen. History items may carry float noise
/// from line totals; catalog prices use [`deserialize_exact`] instead.
impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let yuan = f64::deserialize(deserializer)?;
        Money::from_yuan_f64(yuan)
            .ok_or_else(|| D::Error::custom(format!("amount out of range: {}", yuan)))
    }
}

/// Strict deserializer for catalog prices.
///
/// Use with `#[serde(deserialize_with = "crate::money::deserialize_exact")]`.
/// Amounts finer than one fen are refused instead of rounded.
pub fn deserialize_exact<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
    let yuan = f64::deserialize(deserializer)?;
    Money::from_yuan_exact(yuan).ok_or_else(|| {
        D::Error::custom(format!("price {} is not a whole number of fen", yuan))
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yuan_and_parts() {
        let money = Money::from_fen(4550);
        assert_eq!(money.yuan(), 45);
        assert_eq!(money.fen_part(), 50);
        assert_eq!(Money::from_yuan(300).fen(), 30000);
    }

    #[test]
    fn test_from_yuan_f64_rounds_to_fen() {
        assert_eq!(Money::from_yuan_f64(45.5).unwrap().fen(), 4550);
        assert_eq!(Money::from_yuan_f64(0.125).unwrap().fen(), 13);
        assert_eq!(Money::from_yuan_f64(-0.125).unwrap().fen(), -13);
        assert!(Money::from_yuan_f64(f64::INFINITY).is_none());
        assert!(Money::from_yuan_f64(1e30).is_none());
    }

    #[test]
    fn test_from_yuan_exact_refuses_sub_fen() {
        assert_eq!(Money::from_yuan_exact(45.5), Some(Money::from_fen(4550)));
        assert_eq!(Money::from_yuan_exact(0.07), Some(Money::from_fen(7)));
        assert_eq!(Money::from_yuan_exact(300.0), Some(Money::from_yuan(300)));
        assert_eq!(Money::from_yuan_exact(0.125), None);
        assert_eq!(Money::from_yuan_exact(45.555), None);
        assert_eq!(Money::from_yuan_exact(f64::NAN), None);
    }

    #[test]
    fn test_deserialize_exact() {
        #[derive(Deserialize)]
        struct Price {
            #[serde(deserialize_with = "deserialize_exact")]
            value: Money,
        }

        let price: Price = serde_json::from_str(r#"{"value": 45.5}"#).unwrap();
        assert_eq!(price.value.fen(), 4550);

        let err = serde_json::from_str::<Price>(r#"{"value": 0.125}"#)
            .err()
            .unwrap();
        assert!(err.to_string().contains("not a whole number of fen"));
    }

    #[test]
    fn test_checked_add() {
        assert_eq!(
            Money::from_yuan(1).checked_add(Money::from_fen(50)),
            Some(Money::from_fen(150))
        );
        assert!(Money::from_fen(i64::MAX).checked_add(Money::from_fen(1)).is_none());
    }

    #[test]
    fn test_yuan_string() {
        assert_eq!(Money::from_yuan(9000).to_yuan_string(), "9000");
        assert_eq!(Money::from_fen(4550).to_yuan_string(), "45.5");
        assert_eq!(Money::from_fen(5).to_yuan_string(), "0.05");
        assert_eq!(Money::from_fen(-4550).to_yuan_string(), "-45.5");
        assert_eq!(format!("{}", Money::from_yuan(300)), "¥300");
    }

    #[test]
    fn test_multiply_and_sum() {
        let channel = Money::from_fen(4550);
        assert_eq!(channel.multiply_quantity(2).fen(), 9100);
        assert_eq!((channel * 3).fen(), 13650);

        let total: Money = [Money::from_yuan(1), Money::from_fen(50)].iter().sum();
        assert_eq!(total.fen(), 150);
        assert!(Money::from_fen(i64::MAX).checked_multiply_quantity(2).is_none());
    }

    #[test]
    fn test_meets_floor_is_exact() {
        let retail = Money::from_yuan(100);
        assert!(Money::from_yuan(80).meets_floor(retail, 8, 10));
        assert!(Money::from_yuan(85).meets_floor(retail, 8, 10));
        assert!(!Money::from_fen(7999).meets_floor(retail, 8, 10));
    }

    #[test]
    fn test_json_number_format() {
        assert_eq!(serde_json::to_string(&Money::from_yuan(9000)).unwrap(), "9000");
        assert_eq!(serde_json::to_string(&Money::from_fen(4550)).unwrap(), "45.5");

        let parsed: Money = serde_json::from_str("195").unwrap();
        assert_eq!(parsed, Money::from_yuan(195));
        let parsed: Money = serde_json::from_str("45.5").unwrap();
        assert_eq!(parsed.fen(), 4550);
        assert!(serde_json::from_str::<Money>("\"12\"").is_err());
    }
}
