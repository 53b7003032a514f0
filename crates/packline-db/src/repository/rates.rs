//! # Commission Rate Repository
//!
//! The authoritative rate source. Resolution walks three tiers in one query:
//!
//! ```text
//! establishment override  >  category default  >  platform default
//! ```
//!
//! Missing rows here are not an error; the resolver in packline-service
//! falls back to the platform default constant so a rate gap never blocks
//! a sale.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use packline_core::CommissionRate;

/// Repository for commission rate rows.
#[derive(Debug, Clone)]
pub struct CommissionRateRepository {
    pool: SqlitePool,
}

impl CommissionRateRepository {
    /// Creates a new CommissionRateRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CommissionRateRepository { pool }
    }

    /// Inserts a rate row. Authored by the back office; also backs tests.
    pub async fn insert(&self, rate: &CommissionRate) -> DbResult<()> {
        debug!(
            commission_type = %rate.commission_type,
            establishment_id = ?rate.establishment_id,
            category = ?rate.category,
            rate = rate.rate_percent,
            "Inserting commission rate"
        );

        sqlx::query(
            r#"
            INSERT INTO commission_rates (
                id, commission_type, establishment_id, category, rate_percent
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&rate.id)
        .bind(&rate.commission_type)
        .bind(&rate.establishment_id)
        .bind(&rate.category)
        .bind(rate.rate_percent)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Resolves the most specific matching rate.
    ///
    /// One query: candidate rows match on establishment, category or neither,
    /// and ordering puts the establishment override first, then the category
    /// default, then the platform-wide row. `None` means no row matched at
    /// any tier.
    pub async fn resolve(
        &self,
        commission_type: &str,
        establishment_id: &str,
        category: Option<&str>,
    ) -> DbResult<Option<i64>> {
        let rate: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT rate_percent
            FROM commission_rates
            WHERE commission_type = ?1
              AND (
                    establishment_id = ?2
                 OR (establishment_id IS NULL AND category = ?3)
                 OR (establishment_id IS NULL AND category IS NULL)
              )
            ORDER BY (establishment_id IS NOT NULL) DESC,
                     (category IS NOT NULL) DESC
            LIMIT 1
            "#,
        )
        .bind(commission_type)
        .bind(establishment_id)
        .bind(category)
        .fetch_optional(&self.pool)
        .await?;

        Ok(rate)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
