//! # Side-Effect Outbox Repository
//!
//! Storage for the fire-and-forget tail of purchases and refunds.
//!
//! ## Queue Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  purchase flow ──► queue() ──► side_effect_outbox ──► processor     │
//! │                                                                     │
//! │  * queue() only INSERTs; the buyer's response never waits on a      │
//! │    ledger post, an email, or a counter bump                         │
//! │  * get_pending() returns unprocessed entries oldest-first           │
//! │  * mark_processed() stamps processed_at (entry leaves the queue)    │
//! │  * mark_failed() bumps attempts and records the error; the entry    │
//! │    stays pending and is retried on the next drain                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use packline_core::{EffectKind, SideEffectEntry};

const OUTBOX_COLUMNS: &str =
    "id, kind, entity_id, payload, attempts, last_error, created_at, attempted_at, processed_at";

/// Repository for the side-effect outbox.
#[derive(Debug, Clone)]
pub struct OutboxRepository {
    pool: SqlitePool,
}

impl OutboxRepository {
    /// Creates a new OutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OutboxRepository { pool }
    }

    /// Queues a side effect. Returns the generated entry id.
    pub async fn queue(&self, kind: EffectKind, entity_id: &str, payload: &str) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, ?kind, entity_id = %entity_id, "Queueing side effect");

        sqlx::query(
            r#"
            INSERT INTO side_effect_outbox (
                id, kind, entity_id, payload, attempts, created_at
            ) VALUES (?1, ?2, ?3, ?4, 0, ?5)
            "#,
        )
        .bind(&id)
        .bind(kind)
        .bind(entity_id)
        .bind(payload)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Unprocessed entries, oldest first. Failed entries reappear here until
    /// they succeed.
    pub async fn get_pending(&self, limit: i64) -> DbResult<Vec<SideEffectEntry>> {
        let sql = format!(
            r#"
            SELECT {OUTBOX_COLUMNS}
            FROM side_effect_outbox
            WHERE processed_at IS NULL
            ORDER BY created_at ASC, rowid ASC
            LIMIT ?1
            "#
        );
        let entries = sqlx::query_as::<_, SideEffectEntry>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Stamps an entry processed.
    pub async fn mark_processed(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE side_effect_outbox SET
                attempts = attempts + 1,
                attempted_at = ?2,
                processed_at = ?2,
                last_error = NULL
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SideEffectEntry", id));
        }

        Ok(())
    }

    /// Records a failed attempt; the entry stays pending.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE side_effect_outbox SET
                attempts = attempts + 1,
                attempted_at = ?2,
                last_error = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SideEffectEntry", id));
        }

        Ok(())
    }

    /// Pending entry count, for drain loops and health reporting.
    pub async fn pending_count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM side_effect_outbox WHERE processed_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
