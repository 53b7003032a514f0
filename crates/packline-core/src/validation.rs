//! # Validation Module
//!
//! Input validation for purchase and redemption requests. Runs before any
//! business logic; the database's NOT NULL / UNIQUE / FK constraints are the
//! last line of defense behind it.

use crate::error::ValidationError;
use crate::MAX_PURCHASE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a purchase quantity.
///
/// Must be positive and at most [`MAX_PURCHASE_QUANTITY`] — per-pack
/// `limit_per_client` caps are enforced later by the orchestrator.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive { field: "quantity" });
    }

    if qty > MAX_PURCHASE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity",
            min: 1,
            max: MAX_PURCHASE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (fully discounted packs).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price",
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates the user-entered shape of a promo code.
///
/// Cheap shape check only; existence and eligibility are the promo
/// validator's job.
pub fn validate_promo_code_shape(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required { field: "promo_code" });
    }

    if code.len() > 64 {
        return Err(ValidationError::OutOfRange {
            field: "promo_code",
            min: 1,
            max: 64,
        });
    }

    Ok(())
}

/// Validates a UUID string (entity ids, redemption tokens).
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required { field: "id" });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id",
        reason: "must be a valid UUID",
    })?;

    Ok(())
}
