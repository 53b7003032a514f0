//! # Pack Repository
//!
//! Database operations for pack offers.
//!
//! ## Counter Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  sold_count is a shared mutable counter with no transaction around  │
//! │  it. Two rules keep it sane:                                        │
//! │                                                                     │
//! │  1. Increments are a single atomic statement:                       │
//! │     UPDATE packs SET sold_count = sold_count + ?  (never read-      │
//! │     then-write; concurrent purchases both land)                     │
//! │                                                                     │
//! │  2. The sold-out transition is conditional and idempotent:          │
//! │     ... SET moderation_status = 'sold_out'                          │
//! │     WHERE sold_count >= stock AND moderation_status = 'active'      │
//! │                                                                     │
//! │  The purchase-path stock check is still a point-in-time read, so a  │
//! │  rare oversell under load remains possible by design; this pair of  │
//! │  statements bounds it and makes it visible.                         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use packline_core::Pack;

const PACK_COLUMNS: &str = "id, establishment_id, title, category, price_cents, \
     original_price_cents, stock, sold_count, limit_per_client, is_multi_use, \
     total_uses, sale_ends_at, valid_until, moderation_status, created_at, updated_at";

/// Repository for pack database operations.
#[derive(Debug, Clone)]
pub struct PackRepository {
    pool: SqlitePool,
}

impl PackRepository {
    /// Creates a new PackRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PackRepository { pool }
    }

    /// Gets a pack by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Pack>> {
        let sql = format!("SELECT {PACK_COLUMNS} FROM packs WHERE id = ?1");
        let pack = sqlx::query_as::<_, Pack>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(pack)
    }

    /// Inserts a pack. Offers are authored by the establishment back office;
    /// this also backs test fixtures.
    pub async fn insert(&self, pack: &Pack) -> DbResult<()> {
        debug!(id = %pack.id, title = %pack.title, "Inserting pack");

        sqlx::query(
            r#"
            INSERT INTO packs (
                id, establishment_id, title, category, price_cents,
                original_price_cents, stock, sold_count, limit_per_client,
                is_multi_use, total_uses, sale_ends_at, valid_until,
                moderation_status, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9,
                ?10, ?11, ?12, ?13,
                ?14, ?15, ?16
            )
            "#,
        )
        .bind(&pack.id)
        .bind(&pack.establishment_id)
        .bind(&pack.title)
        .bind(&pack.category)
        .bind(pack.price_cents)
        .bind(pack.original_price_cents)
        .bind(pack.stock)
        .bind(pack.sold_count)
        .bind(pack.limit_per_client)
        .bind(pack.is_multi_use)
        .bind(pack.total_uses)
        .bind(pack.sale_ends_at)
        .bind(pack.valid_until)
        .bind(pack.moderation_status)
        .bind(pack.created_at)
        .bind(pack.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Atomically bumps `sold_count` by `quantity`.
    ///
    /// Single statement; two concurrent purchases both land without either
    /// overwriting the other's increment.
    pub async fn increment_sold_count(&self, pack_id: &str, quantity: i64) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE packs SET
                sold_count = sold_count + ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(pack_id)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Pack", pack_id));
        }

        Ok(())
    }

    /// Fallback path for the sold counter: plain read-then-write.
    ///
    /// Used only when the atomic increment errors. Loses concurrent updates,
    /// which is the accepted cost of still recording the sale.
    pub async fn set_sold_count(&self, pack_id: &str, sold_count: i64) -> DbResult<()> {
        warn!(pack_id = %pack_id, sold_count, "Manual sold_count update (fallback path)");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE packs SET
                sold_count = ?2,
                updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(pack_id)
        .bind(sold_count)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Pack", pack_id));
        }

        Ok(())
    }

    /// Flips a capacity-exhausted pack to `sold_out`.
    ///
    /// Conditional and idempotent: safe to invoke after every purchase.
    /// Returns whether the transition happened on this call.
    pub async fn check_and_mark_sold_out(&self, pack_id: &str) -> DbResult<bool> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE packs SET
                moderation_status = 'sold_out',
                updated_at = ?2
            WHERE id = ?1
              AND stock IS NOT NULL
              AND sold_count >= stock
              AND moderation_status = 'active'
            "#,
        )
        .bind(pack_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let transitioned = result.rows_affected() > 0;
        if transitioned {
            debug!(pack_id = %pack_id, "Pack marked sold_out");
        }

        Ok(transitioned)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use packline_core::ModerationStatus;

    fn fixture(id: &str, stock: Option<i64>) -> Pack {
        let now = Utc::now();
        Pack {
            id: id.to_string(),
            establishment_id: "est-1".to_string(),
            title: "Brunch for two".to_string(),
            category: Some("food".to_string()),
            price_cents: 10_000,
            original_price_cents: 14_000,
            stock,
            sold_count: 0,
            limit_per_client: 0,
            is_multi_use: false,
            total_uses: 1,
            sale_ends_at: None,
            valid_until: None,
            moderation_status: ModerationStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.packs();

        repo.insert(&fixture("pack-1", Some(5))).await.unwrap();

        let loaded = repo.get_by_id("pack-1").await.unwrap().unwrap();
        assert_eq!(loaded.title, "Brunch for two");
        assert_eq!(loaded.stock, Some(5));
        assert_eq!(loaded.moderation_status, ModerationStatus::Active);

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_increment_sold_count() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.packs();
        repo.insert(&fixture("pack-1", Some(5))).await.unwrap();

        repo.increment_sold_count("pack-1", 2).await.unwrap();
        repo.increment_sold_count("pack-1", 1).await.unwrap();

        let pack = repo.get_by_id("pack-1").await.unwrap().unwrap();
        assert_eq!(pack.sold_count, 3);

        assert!(repo.increment_sold_count("missing", 1).await.is_err());
    }

    #[tokio::test]
    async fn test_sold_out_transition_is_conditional_and_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.packs();
        repo.insert(&fixture("pack-1", Some(2))).await.unwrap();

        // Capacity not exhausted: no transition
        repo.increment_sold_count("pack-1", 1).await.unwrap();
        assert!(!repo.check_and_mark_sold_out("pack-1").await.unwrap());

        // Exhausted: transitions exactly once
        repo.increment_sold_count("pack-1", 1).await.unwrap();
        assert!(repo.check_and_mark_sold_out("pack-1").await.unwrap());
        assert!(!repo.check_and_mark_sold_out("pack-1").await.unwrap());

        let pack = repo.get_by_id("pack-1").await.unwrap().unwrap();
        assert_eq!(pack.moderation_status, ModerationStatus::SoldOut);
    }

    #[tokio::test]
    async fn test_unlimited_stock_never_sells_out() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.packs();
        repo.insert(&fixture("pack-1", None)).await.unwrap();

        repo.increment_sold_count("pack-1", 1000).await.unwrap();
        assert!(!repo.check_and_mark_sold_out("pack-1").await.unwrap());
    }
}
