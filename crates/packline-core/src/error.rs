//! # Error Types
//!
//! Domain error types for packline-core.
//!
//! ## Two Error Tiers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Tiers                                 │
//! │                                                                     │
//! │  Tier 1: DOMAIN ERRORS (this file)                                  │
//! │  ├── Expected business rejections ("out of stock", "expired")       │
//! │  ├── Always returned as structured results, never panics            │
//! │  └── Carry a stable machine-readable code for the client            │
//! │                                                                     │
//! │  Tier 2: INFRASTRUCTURE ERRORS (packline-db::DbError)               │
//! │  ├── Data store unavailability, network faults                      │
//! │  ├── Propagate on the primary write path (purchase/redemption)      │
//! │  └── Swallowed-and-logged on the best-effort tail                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. `thiserror` derives, not manual impls
//! 2. Every domain rejection has a `code()` that never changes — clients
//!    switch on it, the message is for humans
//! 3. Errors are enum variants, never bare strings

use thiserror::Error;

// =============================================================================
// Domain Error
// =============================================================================

/// Expected, user-facing business rejections.
///
/// Every variant maps to one stable machine-readable code via [`DomainError::code`].
/// These are *values* returned to the caller; only infrastructure faults
/// propagate as a different error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Pack or purchase does not exist (or is invisible to the caller).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Pack exists but is not purchasable (draft, suspended, sale closed).
    #[error("Pack {pack_id} is not open for sale")]
    NotActive { pack_id: String },

    /// Capacity-limited pack has fewer units left than requested.
    #[error("Pack {pack_id} has only {available} unit(s) left, requested {requested}")]
    OutOfStock {
        pack_id: String,
        available: i64,
        requested: i64,
    },

    /// Same buyer completed a purchase of the same pack moments ago.
    #[error("A purchase of this pack was completed seconds ago; not charging again")]
    DuplicatePurchase,

    /// Buyer's email address has not been confirmed.
    #[error("Email address must be verified before purchasing")]
    EmailNotVerified,

    /// Adding `requested` would exceed the pack's per-client lifetime cap.
    #[error("Purchase limit reached for this pack: {limit} per client, already own {owned}")]
    LimitReached { limit: i64, owned: i64, requested: i64 },

    /// The supplied promo code was rejected; the inner reason says why.
    #[error("Promo code rejected: {0}")]
    PromoInvalid(#[from] PromoError),

    /// Voucher's payment was never captured.
    #[error("Purchase {purchase_id} has no completed payment")]
    NotPaid { purchase_id: String },

    /// Voucher is in a terminal, non-redeemable state.
    #[error("Purchase {purchase_id} is {status}, not redeemable")]
    InvalidStatus {
        purchase_id: String,
        status: &'static str,
    },

    /// Voucher's validity window has passed.
    #[error("Purchase {purchase_id} expired")]
    Expired { purchase_id: String },

    /// Multi-use voucher has no uses left.
    #[error("Purchase {purchase_id} has no uses remaining")]
    NoUsesLeft { purchase_id: String },

    /// Input validation failure (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl DomainError {
    /// Stable machine-readable code. Clients switch on this, never on the
    /// message text.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::NotFound { .. } => "not_found",
            DomainError::NotActive { .. } => "not_active",
            DomainError::OutOfStock { .. } => "out_of_stock",
            DomainError::DuplicatePurchase => "duplicate_purchase",
            DomainError::EmailNotVerified => "email_not_verified",
            DomainError::LimitReached { .. } => "limit_reached",
            DomainError::PromoInvalid(_) => "promo_invalid",
            DomainError::NotPaid { .. } => "not_paid",
            DomainError::InvalidStatus { .. } => "invalid_status",
            DomainError::Expired { .. } => "expired",
            DomainError::NoUsesLeft { .. } => "no_uses_left",
            DomainError::Validation(_) => "validation_error",
        }
    }
}

// =============================================================================
// Promo Error
// =============================================================================

/// Why a promo code failed validation.
///
/// Checks short-circuit in this order, so the first failing gate is the one
/// reported. All of them surface as `promo_invalid` at the purchase boundary
/// while keeping the specific reason in the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromoError {
    /// No promo with this code exists.
    #[error("code does not exist")]
    NotFound,

    /// Code exists but was switched off.
    #[error("code is disabled")]
    Inactive,

    /// `starts_at` is in the future.
    #[error("code is not active yet")]
    NotYetActive,

    /// `ends_at` is in the past.
    #[error("code has expired")]
    Expired,

    /// `scope = SpecificPack` and the purchase targets another pack.
    #[error("code does not apply to this pack")]
    WrongPack,

    /// `scope = AllEstablishmentPacks` and the pack belongs elsewhere.
    #[error("code does not apply to this establishment")]
    WrongEstablishment,

    /// Global usage counter reached `max_total_uses`.
    #[error("code has been fully redeemed")]
    GlobalCapReached,

    /// Caller already used this code `max_uses_per_user` times.
    #[error("you have already used this code the maximum number of times")]
    UserCapReached,
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation failures, caught before any business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: &'static str, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: &'static str },

    /// Invalid format (e.g. malformed UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: &'static str, reason: &'static str },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience alias for Results carrying a DomainError.
pub type DomainResult<T> = Result<T, DomainError>;

// =============================================================================
// Unit Tests
// =============================================================================
