//! # Side-Effect Processor
//!
//! Drains the outbox written by the purchase and refund flows. Every entry
//! is dispatched to the matching repository write or collaborator call;
//! failures are recorded on the entry (`attempts`, `last_error`) and the
//! entry stays pending for the next drain. Nothing here can reach back and
//! fail a sale that already happened.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::collaborators::{CollaboratorError, NotificationService, ReceiptService};
use crate::error::ServiceResult;
use packline_core::{EffectKind, LedgerTransaction, SideEffectEntry};
use packline_db::{Database, DbError};

// =============================================================================
// Outbox Payloads
// =============================================================================

/// Payload of an `increment_sold_count` entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct SoldCountPayload {
    pub quantity: i64,
}

/// Payload of a `notify_buyer` entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct BuyerEmailPayload {
    pub to: String,
    pub template_key: String,
    pub variables: serde_json::Value,
}

/// Payload of a `notify_establishment` entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct EstablishmentNotePayload {
    pub title: String,
    pub body: String,
}

// =============================================================================
// Processor
// =============================================================================

/// Counts from one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutboxReport {
    pub processed: usize,
    pub failed: usize,
}

/// Why one entry's dispatch failed. Stored as `last_error` text.
#[derive(Debug, Error)]
enum EffectFailure {
    #[error("{0}")]
    Db(#[from] DbError),

    #[error("{0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("entity no longer exists: {0}")]
    Gone(String),
}

/// Drains the side-effect outbox.
#[derive(Clone)]
pub struct SideEffectProcessor {
    db: Database,
    notifications: Arc<dyn NotificationService>,
    receipts: Arc<dyn ReceiptService>,
}

impl SideEffectProcessor {
    /// Creates the processor over the database and the fire-and-forget
    /// collaborators.
    pub fn new(
        db: Database,
        notifications: Arc<dyn NotificationService>,
        receipts: Arc<dyn ReceiptService>,
    ) -> Self {
        SideEffectProcessor {
            db,
            notifications,
            receipts,
        }
    }

    /// Processes up to `limit` pending entries, oldest first.
    ///
    /// Per-entry failures are recorded and do not stop the drain; only a
    /// fault of the queue itself propagates.
    pub async fn process_pending(&self, limit: i64) -> ServiceResult<OutboxReport> {
        let entries = self.db.outbox().get_pending(limit).await?;
        let mut report = OutboxReport::default();

        for entry in entries {
            match self.dispatch(&entry).await {
                Ok(()) => {
                    self.db.outbox().mark_processed(&entry.id).await?;
                    report.processed += 1;
                }
                Err(err) => {
                    warn!(
                        entry_id = %entry.id,
                        kind = ?entry.kind,
                        entity_id = %entry.entity_id,
                        attempt = entry.attempts + 1,
                        error = %err,
                        "Side effect failed, will retry on next drain"
                    );
                    self.db.outbox().mark_failed(&entry.id, &err.to_string()).await?;
                    report.failed += 1;
                }
            }
        }

        if report.processed > 0 || report.failed > 0 {
            info!(
                processed = report.processed,
                failed = report.failed,
                "Outbox drain pass complete"
            );
        }

        Ok(report)
    }

    async fn dispatch(&self, entry: &SideEffectEntry) -> Result<(), EffectFailure> {
        debug!(entry_id = %entry.id, kind = ?entry.kind, "Dispatching side effect");

        match entry.kind {
            EffectKind::PostLedger => {
                let tx: LedgerTransaction = serde_json::from_str(&entry.payload)?;
                match self.db.ledger().insert(&tx).await {
                    Ok(()) => Ok(()),
                    // Already posted: a retried entry after a crash between
                    // the insert and mark_processed. The UNIQUE(purchase_id)
                    // constraint makes the retry a no-op.
                    Err(DbError::UniqueViolation { .. }) => Ok(()),
                    Err(err) => Err(err.into()),
                }
            }

            EffectKind::IncrementSoldCount => {
                let payload: SoldCountPayload = serde_json::from_str(&entry.payload)?;
                if let Err(err) = self
                    .db
                    .packs()
                    .increment_sold_count(&entry.entity_id, payload.quantity)
                    .await
                {
                    warn!(
                        pack_id = %entry.entity_id,
                        error = %err,
                        "Atomic sold_count increment failed, trying manual update"
                    );
                    let pack = self
                        .db
                        .packs()
                        .get_by_id(&entry.entity_id)
                        .await?
                        .ok_or_else(|| EffectFailure::Gone(entry.entity_id.clone()))?;
                    self.db
                        .packs()
                        .set_sold_count(&entry.entity_id, pack.sold_count + payload.quantity)
                        .await?;
                }
                Ok(())
            }

            EffectKind::IncrementPromoUses => {
                self.db.promos().increment_usage(&entry.entity_id).await?;
                Ok(())
            }

            EffectKind::SoldOutCheck => {
                self.db.packs().check_and_mark_sold_out(&entry.entity_id).await?;
                Ok(())
            }

            EffectKind::GenerateReceipt => {
                self.receipts.generate_receipt(&entry.entity_id).await?;
                Ok(())
            }

            EffectKind::NotifyBuyer => {
                let payload: BuyerEmailPayload = serde_json::from_str(&entry.payload)?;
                self.notifications
                    .send_template_email(&payload.to, &payload.template_key, payload.variables)
                    .await?;
                Ok(())
            }

            EffectKind::NotifyEstablishment => {
                let payload: EstablishmentNotePayload = serde_json::from_str(&entry.payload)?;
                self.notifications
                    .notify_establishment(&entry.entity_id, &payload.title, &payload.body)
                    .await?;
                Ok(())
            }
        }
    }
}
