//! # Ledger Repository
//!
//! Append-only financial records, one per purchase (`purchase_id UNIQUE`).
//! The ledger is written by the side-effect processor, never on the purchase
//! hot path; the unique constraint makes a retried `post_ledger` effect
//! idempotent at the storage layer.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use packline_core::LedgerTransaction;

const LEDGER_COLUMNS: &str = "id, purchase_id, establishment_id, gross_cents, \
     commission_percent, commission_cents, net_cents, discount_cents, \
     discount_absorbed_by, billing_period, created_at";

/// Repository for ledger transaction records.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Appends a ledger transaction.
    pub async fn insert(&self, tx: &LedgerTransaction) -> DbResult<()> {
        debug!(
            purchase_id = %tx.purchase_id,
            gross = tx.gross_cents,
            commission = tx.commission_cents,
            "Posting ledger transaction"
        );

        sqlx::query(
            r#"
            INSERT INTO ledger_transactions (
                id, purchase_id, establishment_id, gross_cents,
                commission_percent, commission_cents, net_cents,
                discount_cents, discount_absorbed_by, billing_period, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&tx.id)
        .bind(&tx.purchase_id)
        .bind(&tx.establishment_id)
        .bind(tx.gross_cents)
        .bind(tx.commission_percent)
        .bind(tx.commission_cents)
        .bind(tx.net_cents)
        .bind(tx.discount_cents)
        .bind(tx.discount_absorbed_by)
        .bind(&tx.billing_period)
        .bind(tx.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The ledger row for a purchase, if posted yet.
    pub async fn get_by_purchase(&self, purchase_id: &str) -> DbResult<Option<LedgerTransaction>> {
        let sql = format!("SELECT {LEDGER_COLUMNS} FROM ledger_transactions WHERE purchase_id = ?1");
        let tx = sqlx::query_as::<_, LedgerTransaction>(&sql)
            .bind(purchase_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tx)
    }

    /// All ledger rows of one establishment in one billing period.
    pub async fn list_for_period(
        &self,
        establishment_id: &str,
        billing_period: &str,
    ) -> DbResult<Vec<LedgerTransaction>> {
        let sql = format!(
            r#"
            SELECT {LEDGER_COLUMNS}
            FROM ledger_transactions
            WHERE establishment_id = ?1
              AND billing_period = ?2
            ORDER BY created_at ASC
            "#
        );
        let rows = sqlx::query_as::<_, LedgerTransaction>(&sql)
            .bind(establishment_id)
            .bind(billing_period)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
