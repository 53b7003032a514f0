//! # Service Error
//!
//! The tagged union every public workflow returns. `Domain` is an expected
//! business rejection the client switches on via its stable `code()`;
//! `Db`/`Collaborator` are infrastructure faults that genuinely propagate.

use thiserror::Error;

use crate::collaborators::CollaboratorError;
use packline_core::{DomainError, PromoError, ValidationError};
use packline_db::DbError;

/// Error type returned by all workflow operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Expected business rejection. Carries a stable machine-readable code.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Data store failure on the primary path.
    #[error("database error: {0}")]
    Db(#[from] DbError),

    /// A blocking collaborator call failed (identity lookup).
    ///
    /// Fire-and-forget collaborators never surface here; their failures are
    /// recorded on the outbox entry instead.
    #[error("collaborator call failed: {0}")]
    Collaborator(#[from] CollaboratorError),
}

impl ServiceError {
    /// Machine-readable code for the client. Infrastructure faults collapse
    /// to `internal_error`; everything the buyer can act on keeps its
    /// domain code.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Domain(e) => e.code(),
            ServiceError::Db(_) | ServiceError::Collaborator(_) => "internal_error",
        }
    }
}

impl From<PromoError> for ServiceError {
    fn from(err: PromoError) -> Self {
        ServiceError::Domain(DomainError::PromoInvalid(err))
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Domain(DomainError::Validation(err))
    }
}

/// Convenience alias for Results carrying a ServiceError.
pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// Unit Tests
// =============================================================================
