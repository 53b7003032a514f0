//! # Money Module
//!
//! Monetary values in integer minor units ("cents").
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                         │
//! │                                                                     │
//! │  In floating point:                                                 │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                       │
//! │                                                                     │
//! │  A 20% promo on a 99.99 pack must discount exactly 20.00 — not     │
//! │  19.998000000000001. The ledger, the buyer's receipt, and the      │
//! │  establishment's payout all have to agree to the cent.              │
//! │                                                                     │
//! │  OUR SOLUTION: integer cents end to end. The database, the promo   │
//! │  validator, the commission calculator and the API all speak cents;  │
//! │  only the UI formats for display.                                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use packline_core::money::Money;
//!
//! let price = Money::from_cents(10_000); // 100.00
//!
//! // 20% promo, expressed in basis points (2000 bps = 20%)
//! let discount = price.percentage_bps(2000);
//! assert_eq!(discount.cents(), 2000);
//!
//! // 15% commission on the amount collected
//! let commission = (price - discount).commission_at_percent(15);
//! assert_eq!(commission.cents(), 1200);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::BPS_SCALE;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: refunds and ledger reversals are negative amounts
/// - **Single-field tuple struct**: zero-cost abstraction over i64
/// - **Half-up rounding**: `(n * rate + half) / scale` — matches what the
///   buyer sees on the receipt for every percentage computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is strictly positive.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a quantity (line totals: unit price × units bought).
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Computes a basis-point share of this amount, rounded half-up.
    ///
    /// This is the percentage-promo formula: a 2000 bps (20%) promo on a
    /// 10000-cent pack yields exactly 2000 cents.
    ///
    /// ## Implementation
    /// Integer math in i128 to avoid overflow: `(amount * bps + 5000) / 10000`.
    ///
    /// ## Example
    /// ```rust
    /// use packline_core::money::Money;
    ///
    /// let price = Money::from_cents(10_000);
    /// assert_eq!(price.percentage_bps(2000).cents(), 2000); // 20%
    /// assert_eq!(Money::from_cents(999).percentage_bps(2500).cents(), 250); // 249.75 → 250
    /// ```
    pub fn percentage_bps(&self, bps: i64) -> Money {
        let share = (self.0 as i128 * bps as i128 + (BPS_SCALE as i128 / 2)) / BPS_SCALE as i128;
        Money(share as i64)
    }

    /// Computes a whole-percent commission on this amount, rounded half-up.
    ///
    /// Commission rates are integer percentages (platform default 15), so the
    /// formula is `round(amount * rate / 100)` = `(amount * rate + 50) / 100`.
    ///
    /// ## Example
    /// ```rust
    /// use packline_core::money::Money;
    ///
    /// let gross = Money::from_cents(8000);
    /// assert_eq!(gross.commission_at_percent(15).cents(), 1200);
    /// ```
    pub fn commission_at_percent(&self, rate_percent: i64) -> Money {
        let cut = (self.0 as i128 * rate_percent as i128 + 50) / 100;
        Money(cut as i64)
    }

    /// Subtracts, flooring at zero.
    ///
    /// A fixed-amount promo larger than the pack price must never drive the
    /// total negative: the buyer pays zero, not a refund.
    ///
    /// ## Example
    /// ```rust
    /// use packline_core::money::Money;
    ///
    /// let price = Money::from_cents(10_000);
    /// let promo = Money::from_cents(15_000);
    /// assert_eq!(price.saturating_sub(promo).cents(), 0);
    /// ```
    #[inline]
    pub const fn saturating_sub(&self, other: Money) -> Money {
        let diff = self.0 - other.0;
        if diff < 0 {
            Money(0)
        } else {
            Money(diff)
        }
    }

    /// Returns the smaller of two amounts (fixed-discount capping).
    #[inline]
    pub const fn min(self, other: Money) -> Money {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly display. UI formatting (currency symbol, locale) happens
/// in the frontend, not here.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, (self.0 / 100).abs(), (self.0 % 100).abs())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
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

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "10.99");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
    }

    #[test]
    fn test_percentage_bps_exact() {
        // 20% of 10000 = 2000, no rounding needed
        let price = Money::from_cents(10_000);
        assert_eq!(price.percentage_bps(2000).cents(), 2000);
    }

    #[test]
    fn test_percentage_bps_rounds_half_up() {
        // 25% of 999 = 249.75 → 250
        assert_eq!(Money::from_cents(999).percentage_bps(2500).cents(), 250);
        // 10% of 5 = 0.5 → 1
        assert_eq!(Money::from_cents(5).percentage_bps(1000).cents(), 1);
    }

    #[test]
    fn test_commission_at_percent() {
        assert_eq!(Money::from_cents(10_000).commission_at_percent(15).cents(), 1500);
        assert_eq!(Money::from_cents(8000).commission_at_percent(15).cents(), 1200);
        // 15% of 333 = 49.95 → 50
        assert_eq!(Money::from_cents(333).commission_at_percent(15).cents(), 50);
    }

    #[test]
    fn test_saturating_sub_floors_at_zero() {
        let price = Money::from_cents(10_000);
        let big_promo = Money::from_cents(15_000);
        assert_eq!(price.saturating_sub(big_promo).cents(), 0);
        assert_eq!(price.saturating_sub(Money::from_cents(2000)).cents(), 8000);
    }

    #[test]
    fn test_min() {
        let a = Money::from_cents(100);
        let b = Money::from_cents(200);
        assert_eq!(a.min(b).cents(), 100);
        assert_eq!(b.min(a).cents(), 100);
    }

    #[test]
    fn test_multiply_quantity() {
        let unit = Money::from_cents(2500);
        assert_eq!(unit.multiply_quantity(3).cents(), 7500);
    }

    #[test]
    fn test_no_overflow_on_large_amounts() {
        // A pathological price still computes without overflow thanks to i128
        let huge = Money::from_cents(i64::MAX / 20_000);
        let _ = huge.percentage_bps(9999);
        let _ = huge.commission_at_percent(99);
    }
}
