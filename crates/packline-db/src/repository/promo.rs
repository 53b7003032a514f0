//! # Promo Code Repository
//!
//! Lookup is case-insensitive (the `code` column carries `COLLATE NOCASE`),
//! so buyers can type "ramadan20" for "RAMADAN20".
//!
//! The validator in packline-core never touches counters; `current_uses` is
//! bumped here, atomically, by the side-effect tail after a purchase commits.
//! Validation reads and the later increment are therefore not one atomic
//! unit: two near-simultaneous purchases near the cap can both pass and both
//! increment. Accepted design, see DESIGN.md.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use packline_core::PromoCode;

const PROMO_COLUMNS: &str = "id, code, is_active, starts_at, ends_at, scope, pack_id, \
     establishment_id, max_total_uses, max_uses_per_user, discount_type, \
     discount_value, current_uses, origin, created_at";

/// Repository for promo code database operations.
#[derive(Debug, Clone)]
pub struct PromoRepository {
    pool: SqlitePool,
}

impl PromoRepository {
    /// Creates a new PromoRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PromoRepository { pool }
    }

    /// Finds a promo by its human-entered code, case-insensitively.
    pub async fn find_by_code(&self, code: &str) -> DbResult<Option<PromoCode>> {
        let sql = format!("SELECT {PROMO_COLUMNS} FROM promo_codes WHERE code = ?1");
        let promo = sqlx::query_as::<_, PromoCode>(&sql)
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(promo)
    }

    /// Gets a promo by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<PromoCode>> {
        let sql = format!("SELECT {PROMO_COLUMNS} FROM promo_codes WHERE id = ?1");
        let promo = sqlx::query_as::<_, PromoCode>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(promo)
    }

    /// Inserts a promo code. Authored by the back office; also backs tests.
    pub async fn insert(&self, promo: &PromoCode) -> DbResult<()> {
        debug!(id = %promo.id, code = %promo.code, "Inserting promo code");

        sqlx::query(
            r#"
            INSERT INTO promo_codes (
                id, code, is_active, starts_at, ends_at, scope, pack_id,
                establishment_id, max_total_uses, max_uses_per_user,
                discount_type, discount_value, current_uses, origin, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15
            )
            "#,
        )
        .bind(&promo.id)
        .bind(&promo.code)
        .bind(promo.is_active)
        .bind(promo.starts_at)
        .bind(promo.ends_at)
        .bind(promo.scope)
        .bind(&promo.pack_id)
        .bind(&promo.establishment_id)
        .bind(promo.max_total_uses)
        .bind(promo.max_uses_per_user)
        .bind(promo.discount_type)
        .bind(promo.discount_value)
        .bind(promo.current_uses)
        .bind(promo.origin)
        .bind(promo.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts the caller's completed purchases carrying this promo id.
    ///
    /// Feeds the per-user cap check in the validator.
    pub async fn count_user_uses(&self, promo_id: &str, user_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM pack_purchases
            WHERE promo_code_id = ?1
              AND user_id = ?2
              AND payment_status = 'completed'
            "#,
        )
        .bind(promo_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Atomically bumps the global usage counter.
    pub async fn increment_usage(&self, promo_id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE promo_codes SET
                current_uses = current_uses + 1
            WHERE id = ?1
            "#,
        )
        .bind(promo_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PromoCode", promo_id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use packline_core::{DiscountType, PromoOrigin, PromoScope};

    fn fixture(code: &str) -> PromoCode {
        PromoCode {
            id: format!("promo-{code}"),
            code: code.to_string(),
            is_active: true,
            starts_at: None,
            ends_at: None,
            scope: PromoScope::All,
            pack_id: None,
            establishment_id: None,
            max_total_uses: None,
            max_uses_per_user: 0,
            discount_type: DiscountType::Percentage,
            discount_value: 2000,
            current_uses: 0,
            origin: PromoOrigin::Platform,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.promos();
        repo.insert(&fixture("RAMADAN20")).await.unwrap();

        let found = repo.find_by_code("ramadan20").await.unwrap().unwrap();
        assert_eq!(found.code, "RAMADAN20");

        let found = repo.find_by_code("  RaMaDaN20  ").await.unwrap().unwrap();
        assert_eq!(found.id, "promo-RAMADAN20");

        assert!(repo.find_by_code("NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected_case_insensitively() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.promos();
        repo.insert(&fixture("SUMMER")).await.unwrap();

        let mut dupe = fixture("summer");
        dupe.id = "promo-other".to_string();
        assert!(matches!(
            repo.insert(&dupe).await,
            Err(DbError::UniqueViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_increment_usage() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.promos();
        repo.insert(&fixture("X")).await.unwrap();

        repo.increment_usage("promo-X").await.unwrap();
        repo.increment_usage("promo-X").await.unwrap();

        let promo = repo.get_by_id("promo-X").await.unwrap().unwrap();
        assert_eq!(promo.current_uses, 2);

        assert!(repo.increment_usage("missing").await.is_err());
    }
}
