//! # packline-core: Pure Business Logic for Packline
//!
//! Packline sells discounted prepaid vouchers ("Packs") on behalf of
//! establishments; buyers redeem them in person via a QR-scanned token.
//! This crate is the pure heart of that system: every rule that decides
//! whether a promo applies, what a discount is worth, or what the platform's
//! cut of a sale is, lives here as a deterministic function.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Packline Architecture                          │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │                 packline-service (workflows)                  │  │
//! │  │   confirm_purchase ──► consume ──► request_refund             │  │
//! │  └──────────────────────────────┬────────────────────────────────┘  │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐  │
//! │  │              ★ packline-core (THIS CRATE) ★                   │  │
//! │  │                                                               │  │
//! │  │  ┌─────────┐ ┌─────────┐ ┌────────────┐ ┌────────────────┐    │  │
//! │  │  │  types  │ │  money  │ │   promo    │ │  commission    │    │  │
//! │  │  │  Pack   │ │  Money  │ │ eligibility│ │  3-tier rate   │    │  │
//! │  │  │Purchase │ │ bps math│ │  discount  │ │  base select   │    │  │
//! │  │  └─────────┘ └─────────┘ └────────────┘ └────────────────┘    │  │
//! │  │                                                               │  │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS            │  │
//! │  └──────────────────────────────┬────────────────────────────────┘  │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐  │
//! │  │                 packline-db (Database Layer)                  │  │
//! │  │          SQLite queries, migrations, repositories             │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Pack, PromoCode, PackPurchase, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`promo`] - Promo code eligibility and discount computation
//! - [`commission`] - Commission math and the asymmetric commission base
//! - [`error`] - Domain error types with stable machine-readable codes
//! - [`validation`] - Input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: `now` is always a parameter, never read from a clock
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are minor units (i64 cents)
//! 4. **Explicit Errors**: rejections are typed values, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod commission;
pub mod error;
pub mod money;
pub mod promo;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use commission::{commission_base, Commission, CommissionBase};
pub use error::{DomainError, PromoError, ValidationError};
pub use money::Money;
pub use promo::{validate_promo, PromoContext, PromoDiscount};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Platform default commission, in whole percent.
///
/// Applied when neither an establishment-specific override nor a category
/// default exists, and whenever the rate lookup itself fails (availability
/// over strictness: a rate-source outage must never block a sale).
pub const DEFAULT_COMMISSION_PERCENT: i64 = 15;

/// Window of the anti-fraud duplicate-purchase guard, in seconds.
///
/// A buyer who completed a purchase of the same pack within this window is
/// rejected with `duplicate_purchase`. Defends against double-submit and
/// naive replay; it is a temporal heuristic, not a uniqueness guarantee.
pub const DUPLICATE_PURCHASE_WINDOW_SECS: i64 = 120;

/// Maximum units of a single pack in one purchase.
///
/// Prevents accidental over-ordering (e.g. typing 100 instead of 10).
/// Per-pack `limit_per_client` caps are enforced separately.
pub const MAX_PURCHASE_QUANTITY: i64 = 50;

/// Scale of percentage discounts: basis points out of 10000.
pub const BPS_SCALE: i64 = 10_000;
