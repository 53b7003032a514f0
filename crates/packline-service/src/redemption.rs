//! # Redemption Engine
//!
//! Voucher scanning: listing a buyer's redeemable purchases at an
//! establishment and consuming one use.
//!
//! ## Consume State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  consume(purchase_id, establishment_id, scanned_by)                 │
//! │                                                                     │
//! │   row exists at this establishment?  ─► not_found                   │
//! │   payment_status = completed?        ─► not_paid                    │
//! │   uses_remaining > 0?                ─► no_uses_left                │
//! │   status = active?                   ─► invalid_status              │
//! │   not expired?                       ─► expired                     │
//! │        │                                                            │
//! │        ▼                                                            │
//! │   guarded conditional decrement (the one true atomicity point)      │
//! │        │ guard lost (concurrent scan) ─► no_uses_left               │
//! │        ▼                                                            │
//! │   append PackConsumption, return new balance                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The Rust-side checks give precise error codes; the decrement's WHERE
//! clause is what actually prevents a double spend.

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::ServiceResult;
use packline_core::{DomainError, PackConsumption, PackPurchase, PaymentStatus};
use packline_db::Database;

/// Result of a successful consumption.
#[derive(Debug, Clone, Serialize)]
pub struct ConsumeOutcome {
    pub consumption_id: String,

    /// Balance after this scan, for immediate display on the staff device.
    pub uses_remaining: i64,
}

/// Orchestrates voucher redemption.
#[derive(Debug, Clone)]
pub struct RedemptionService {
    db: Database,
}

impl RedemptionService {
    /// Creates the service over a database handle.
    pub fn new(db: Database) -> Self {
        RedemptionService { db }
    }

    /// A buyer's still-redeemable purchases at one establishment.
    ///
    /// Status filtering happens in SQL; expiry and remaining-use filtering
    /// happen here, against this call's clock.
    pub async fn get_active_packs(
        &self,
        user_id: &str,
        establishment_id: &str,
    ) -> ServiceResult<Vec<PackPurchase>> {
        let now = Utc::now();

        let purchases = self
            .db
            .purchases()
            .list_active_at_establishment(user_id, establishment_id)
            .await?;

        Ok(purchases
            .into_iter()
            .filter(|p| !p.is_expired(now) && p.uses_remaining > 0)
            .collect())
    }

    /// Consumes one use of a voucher.
    pub async fn consume(
        &self,
        purchase_id: &str,
        establishment_id: &str,
        scanned_by_user_id: &str,
    ) -> ServiceResult<ConsumeOutcome> {
        let now = Utc::now();

        // Scoped to the scanning establishment: a voucher for another shop
        // is indistinguishable from a nonexistent one.
        let purchase = self
            .db
            .purchases()
            .get_by_id(purchase_id)
            .await?
            .filter(|p| p.establishment_id == establishment_id)
            .ok_or_else(|| DomainError::NotFound {
                entity: "Purchase",
                id: purchase_id.to_string(),
            })?;

        if purchase.payment_status != PaymentStatus::Completed {
            return Err(DomainError::NotPaid {
                purchase_id: purchase.id.clone(),
            }
            .into());
        }

        // Exhaustion wins over status: a fully-consumed voucher (which is
        // also in the terminal `used` state) reports no_uses_left forever,
        // so staff see "no uses left" rather than a generic status error.
        if purchase.uses_remaining <= 0 {
            return Err(DomainError::NoUsesLeft {
                purchase_id: purchase.id.clone(),
            }
            .into());
        }

        if !purchase.status.is_redeemable() {
            return Err(DomainError::InvalidStatus {
                purchase_id: purchase.id.clone(),
                status: purchase.status.as_str(),
            }
            .into());
        }

        if purchase.is_expired(now) {
            return Err(DomainError::Expired {
                purchase_id: purchase.id.clone(),
            }
            .into());
        }

        // The guarded decrement. A None here means the row state changed
        // between the read above and this write — most likely a concurrent
        // scan took the last use.
        let new_remaining = self
            .db
            .purchases()
            .consume_use(&purchase.id)
            .await?
            .ok_or_else(|| DomainError::NoUsesLeft {
                purchase_id: purchase.id.clone(),
            })?;

        let consumption = PackConsumption {
            id: Uuid::new_v4().to_string(),
            purchase_id: purchase.id.clone(),
            use_number: purchase.uses_total - new_remaining,
            scanned_by_user_id: scanned_by_user_id.to_string(),
            consumed_at: now,
        };
        self.db.consumptions().insert(&consumption).await?;

        info!(
            purchase_id = %purchase.id,
            use_number = consumption.use_number,
            uses_remaining = new_remaining,
            scanned_by = %scanned_by_user_id,
            "Voucher use consumed"
        );

        Ok(ConsumeOutcome {
            consumption_id: consumption.id,
            uses_remaining: new_remaining,
        })
    }
}
