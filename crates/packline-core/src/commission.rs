//! # Commission Math
//!
//! Pure commission computation. Rate *resolution* (the 3-tier lookup) is an
//! I/O concern and lives in packline-service; this module only knows what to
//! do with a resolved rate.
//!
//! ## The Asymmetric Commission Base
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Who funds the promo decides what the commission is computed on     │
//! │                                                                     │
//! │  Platform-funded promo ("RAMADAN20" run by the marketplace):        │
//! │     commission = rate × GROSS (pre-discount)                        │
//! │     → the house absorbs the discount, the establishment's           │
//! │       commission is untouched by a promo it never agreed to fund    │
//! │                                                                     │
//! │  Pro-funded promo (run by the establishment itself):                │
//! │     commission = rate × NET (amount actually collected)             │
//! │     → the establishment funds its own discount, and the platform    │
//! │       takes its cut of what actually changed hands                  │
//! │                                                                     │
//! │  No promo: gross == net, the distinction vanishes.                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//! This asymmetry is a deliberate business rule; do not "simplify" it.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::PromoOrigin;

/// Which amount the commission rate applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionBase {
    /// Pre-discount amount.
    Gross,
    /// Post-discount amount actually collected.
    Net,
}

/// A computed commission: the rate that was applied and the resulting cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commission {
    /// Whole-percent rate that was applied.
    pub rate_percent: i64,

    /// The platform's cut.
    pub amount: Money,
}

/// Picks the commission base from the promo's funding origin.
///
/// No promo, or a platform-funded one, commissions the gross; only a
/// pro-funded promo moves the base to the net.
pub fn commission_base(promo_origin: Option<PromoOrigin>) -> CommissionBase {
    match promo_origin {
        Some(PromoOrigin::Pro) => CommissionBase::Net,
        Some(PromoOrigin::Platform) | None => CommissionBase::Gross,
    }
}

/// Computes the commission for a sale.
///
/// ## Arguments
/// * `gross` - pre-discount amount (`unit_price × quantity`)
/// * `net` - post-discount amount actually charged
/// * `promo_origin` - who funded the promo, if one applied
/// * `rate_percent` - resolved whole-percent rate
pub fn compute(
    gross: Money,
    net: Money,
    promo_origin: Option<PromoOrigin>,
    rate_percent: i64,
) -> Commission {
    let base = match commission_base(promo_origin) {
        CommissionBase::Gross => gross,
        CommissionBase::Net => net,
    };

    Commission {
        rate_percent,
        amount: base.commission_at_percent(rate_percent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_promo_commissions_gross() {
        let c = compute(Money::from_cents(10_000), Money::from_cents(10_000), None, 15);
        assert_eq!(c.rate_percent, 15);
        assert_eq!(c.amount.cents(), 1500);
    }

    #[test]
    fn test_platform_promo_commissions_pre_discount_gross() {
        // 20% platform promo on 10000: buyer pays 8000, but commission is
        // still 15% of 10000 = 1500 — the house eats the discount
        let c = compute(
            Money::from_cents(10_000),
            Money::from_cents(8_000),
            Some(PromoOrigin::Platform),
            15,
        );
        assert_eq!(c.amount.cents(), 1500);
    }

    #[test]
    fn test_pro_promo_commissions_collected_net() {
        // Same numbers, pro-funded: commission is 15% of 8000 = 1200
        let c = compute(
            Money::from_cents(10_000),
            Money::from_cents(8_000),
            Some(PromoOrigin::Pro),
            15,
        );
        assert_eq!(c.amount.cents(), 1200);
    }

    #[test]
    fn test_base_selection() {
        assert_eq!(commission_base(None), CommissionBase::Gross);
        assert_eq!(commission_base(Some(PromoOrigin::Platform)), CommissionBase::Gross);
        assert_eq!(commission_base(Some(PromoOrigin::Pro)), CommissionBase::Net);
    }

    #[test]
    fn test_rounding_half_up() {
        // 15% of 333 = 49.95 → 50
        let c = compute(Money::from_cents(333), Money::from_cents(333), None, 15);
        assert_eq!(c.amount.cents(), 50);
    }
}
