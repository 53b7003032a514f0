//! # Promo Validator
//!
//! Eligibility checks and discount computation for promo codes.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Promo Validation Pipeline                        │
//! │                                                                     │
//! │  validate_promo(promo, ctx, now, prior_user_uses)                   │
//! │       │                                                             │
//! │       ├── 1. active?          ──► Inactive                          │
//! │       ├── 2. window open?     ──► NotYetActive / Expired            │
//! │       ├── 3. scope matches?   ──► WrongPack / WrongEstablishment    │
//! │       ├── 4. global cap left? ──► GlobalCapReached                  │
//! │       ├── 5. user cap left?   ──► UserCapReached                    │
//! │       │                                                             │
//! │       └── OK ──► PromoDiscount { discount, promo_code_id, origin }  │
//! │                                                                     │
//! │  Checks short-circuit: the FIRST failing gate is reported.          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Purity
//! This module only reads and computes. `now` and the caller's prior-use
//! count are parameters; the function cannot touch a clock or a database.
//! Same promo state + same instant = same answer, always. Incrementing
//! usage counters is the purchase flow's job, *after* the sale commits.

use chrono::{DateTime, Utc};

use crate::error::PromoError;
use crate::money::Money;
use crate::types::{DiscountType, PromoCode, PromoOrigin, PromoScope};

// =============================================================================
// Context & Result
// =============================================================================

/// What the purchase being validated looks like.
#[derive(Debug, Clone)]
pub struct PromoContext<'a> {
    /// Pack the buyer is purchasing.
    pub pack_id: &'a str,

    /// Establishment that owns the pack.
    pub establishment_id: &'a str,

    /// Unit price of the pack.
    pub pack_price: Money,
}

/// A successfully computed discount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromoDiscount {
    /// The promo that granted it.
    pub promo_code_id: String,

    /// Discount amount. For fixed-amount codes this is already capped at
    /// the pack price — a discount never exceeds the priced amount.
    pub discount: Money,

    /// How the discount was expressed.
    pub discount_type: DiscountType,

    /// Who funds the discount; the orchestrator uses this to pick the
    /// commission base.
    pub origin: PromoOrigin,
}

// =============================================================================
// Validation
// =============================================================================

/// Validates a promo code against a purchase context and computes the
/// discount.
///
/// ## Arguments
/// * `promo` - the code as currently stored (already looked up, case-insensitively)
/// * `ctx` - the pack/establishment/price being purchased
/// * `now` - the validation instant (passed in; this function owns no clock)
/// * `prior_user_uses` - how many completed purchases of the caller already
///   carry this promo id
///
/// ## Ordering
/// Gates run in a fixed order and short-circuit on the first failure, so a
/// disabled *and* expired code reports `Inactive`, not `Expired`.
pub fn validate_promo(
    promo: &PromoCode,
    ctx: &PromoContext<'_>,
    now: DateTime<Utc>,
    prior_user_uses: i64,
) -> Result<PromoDiscount, PromoError> {
    // 1. Kill switch
    if !promo.is_active {
        return Err(PromoError::Inactive);
    }

    // 2. Temporal window (either bound may be absent)
    if let Some(starts) = promo.starts_at {
        if now < starts {
            return Err(PromoError::NotYetActive);
        }
    }
    if let Some(ends) = promo.ends_at {
        if now > ends {
            return Err(PromoError::Expired);
        }
    }

    // 3. Scope
    match promo.scope {
        PromoScope::All => {}
        PromoScope::SpecificPack => {
            if promo.pack_id.as_deref() != Some(ctx.pack_id) {
                return Err(PromoError::WrongPack);
            }
        }
        PromoScope::AllEstablishmentPacks => {
            if promo.establishment_id.as_deref() != Some(ctx.establishment_id) {
                return Err(PromoError::WrongEstablishment);
            }
        }
    }

    // 4. Global usage cap
    if let Some(max_total) = promo.max_total_uses {
        if promo.current_uses >= max_total {
            return Err(PromoError::GlobalCapReached);
        }
    }

    // 5. Per-user cap (0 = unlimited)
    if promo.max_uses_per_user > 0 && prior_user_uses >= promo.max_uses_per_user {
        return Err(PromoError::UserCapReached);
    }

    Ok(PromoDiscount {
        promo_code_id: promo.id.clone(),
        discount: compute_discount(promo, ctx.pack_price),
        discount_type: promo.discount_type,
        origin: promo.origin,
    })
}

/// Discount arithmetic.
///
/// - Percentage: `round(price * bps / 10000)` (half-up)
/// - Fixed amount: `min(value, price)` — the discount never exceeds the
///   priced amount
fn compute_discount(promo: &PromoCode, pack_price: Money) -> Money {
    match promo.discount_type {
        DiscountType::Percentage => pack_price.percentage_bps(promo.discount_value),
        DiscountType::FixedAmount => Money::from_cents(promo.discount_value).min(pack_price),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
