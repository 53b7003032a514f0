//! # Consumption Repository
//!
//! Append-only redemption events. A row is written once per successful scan
//! and never updated or deleted; `UNIQUE (purchase_id, use_number)` makes a
//! duplicated sequence number a hard constraint error instead of silent
//! double counting.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use packline_core::PackConsumption;

/// Repository for redemption event records.
#[derive(Debug, Clone)]
pub struct ConsumptionRepository {
    pool: SqlitePool,
}

impl ConsumptionRepository {
    /// Creates a new ConsumptionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ConsumptionRepository { pool }
    }

    /// Appends a consumption event.
    pub async fn insert(&self, consumption: &PackConsumption) -> DbResult<()> {
        debug!(
            purchase_id = %consumption.purchase_id,
            use_number = consumption.use_number,
            "Recording consumption"
        );

        sqlx::query(
            r#"
            INSERT INTO pack_consumptions (
                id, purchase_id, use_number, scanned_by_user_id, consumed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&consumption.id)
        .bind(&consumption.purchase_id)
        .bind(consumption.use_number)
        .bind(&consumption.scanned_by_user_id)
        .bind(consumption.consumed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Full redemption history of one purchase, in use order.
    pub async fn list_for_purchase(&self, purchase_id: &str) -> DbResult<Vec<PackConsumption>> {
        let consumptions = sqlx::query_as::<_, PackConsumption>(
            r#"
            SELECT id, purchase_id, use_number, scanned_by_user_id, consumed_at
            FROM pack_consumptions
            WHERE purchase_id = ?1
            ORDER BY use_number ASC
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(consumptions)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
