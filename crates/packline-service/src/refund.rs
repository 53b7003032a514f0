//! # Refund Workflow
//!
//! Reverses an active purchase: conditional status transition, append-only
//! refund record, establishment notification through the outbox. `refunded`
//! is terminal; the redemption engine treats it like `used` and `cancelled`.
//!
//! Partially-used multi-use purchases still qualify: the status stays
//! `active` until the last use goes, and `active` is the only requirement.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::effects::EstablishmentNotePayload;
use crate::error::ServiceResult;
use packline_core::{DomainError, EffectKind, PurchaseStatus, Refund};
use packline_db::Database;

/// Result of an accepted refund request.
#[derive(Debug, Clone, Serialize)]
pub struct RefundReceipt {
    pub refund_id: String,
    pub amount_cents: i64,
}

/// Orchestrates the refund workflow.
#[derive(Debug, Clone)]
pub struct RefundService {
    db: Database,
}

impl RefundService {
    /// Creates the service over a database handle.
    pub fn new(db: Database) -> Self {
        RefundService { db }
    }

    /// Requests a refund of a purchase the caller owns.
    pub async fn request_refund(
        &self,
        purchase_id: &str,
        user_id: &str,
        reason: &str,
        prefer_credit: bool,
    ) -> ServiceResult<RefundReceipt> {
        let now = Utc::now();

        // Ownership scoping: someone else's purchase looks nonexistent.
        let purchase = self
            .db
            .purchases()
            .get_by_id(purchase_id)
            .await?
            .filter(|p| p.user_id == user_id)
            .ok_or_else(|| DomainError::NotFound {
                entity: "Purchase",
                id: purchase_id.to_string(),
            })?;

        if purchase.status != PurchaseStatus::Active {
            return Err(DomainError::InvalidStatus {
                purchase_id: purchase.id.clone(),
                status: purchase.status.as_str(),
            }
            .into());
        }

        // Conditional transition; false means the row left `active` between
        // the read and this write (a concurrent scan or a second refund).
        if !self.db.purchases().mark_refunded(&purchase.id).await? {
            return Err(DomainError::InvalidStatus {
                purchase_id: purchase.id.clone(),
                status: "refunded",
            }
            .into());
        }

        let refund = Refund {
            id: Uuid::new_v4().to_string(),
            purchase_id: purchase.id.clone(),
            user_id: user_id.to_string(),
            reason: reason.to_string(),
            prefer_credit,
            amount_cents: purchase.total_price_cents,
            created_at: now,
        };
        self.db.refunds().insert(&refund).await?;

        info!(
            purchase_id = %purchase.id,
            refund_id = %refund.id,
            amount = refund.amount_cents,
            prefer_credit,
            "Refund recorded"
        );

        // Best-effort notification; a queue failure never unwinds the refund
        let payload = EstablishmentNotePayload {
            title: "Pack purchase refunded".to_string(),
            body: format!(
                "{} refunded ({} cents)",
                purchase.pack_title_snapshot, purchase.total_price_cents
            ),
        };
        let payload = serde_json::to_string(&payload)
            .unwrap_or_else(|_| json!({}).to_string());
        if let Err(err) = self
            .db
            .outbox()
            .queue(EffectKind::NotifyEstablishment, &purchase.establishment_id, &payload)
            .await
        {
            warn!(
                purchase_id = %purchase.id,
                error = %err,
                "Failed to queue refund notification"
            );
        }

        Ok(RefundReceipt {
            refund_id: refund.id,
            amount_cents: refund.amount_cents,
        })
    }
}
