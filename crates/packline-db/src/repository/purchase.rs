//! # Purchase Repository
//!
//! Database operations for pack purchases.
//!
//! ## The One True Atomicity Point
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Two staff devices scan the same multi-use voucher with one use     │
//! │  left. Both pass the Rust-side checks. Who wins?                    │
//! │                                                                     │
//! │  UPDATE pack_purchases                                              │
//! │     SET uses_remaining = uses_remaining - 1, ...                    │
//! │   WHERE id = ? AND uses_remaining > 0                               │
//! │   RETURNING uses_remaining                                          │
//! │                                                                     │
//! │  Device A: row matched  → RETURNING 0  → consumption recorded       │
//! │  Device B: row NOT matched (guard failed) → no_uses_left            │
//! │                                                                     │
//! │  One conditional statement. No transaction needed, no double spend. │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use packline_core::PackPurchase;

const PURCHASE_COLUMNS: &str = "id, pack_id, user_id, establishment_id, quantity, \
     unit_price_cents, total_price_cents, currency, promo_code_id, discount_cents, \
     payment_method, payment_reference, payment_status, status, is_multi_use, \
     uses_total, uses_remaining, redemption_token, expires_at, \
     buyer_email_snapshot, pack_title_snapshot, created_at, paid_at, updated_at";

/// Repository for purchase database operations.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    /// Creates a new PurchaseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// Gets a purchase by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<PackPurchase>> {
        let sql = format!("SELECT {PURCHASE_COLUMNS} FROM pack_purchases WHERE id = ?1");
        let purchase = sqlx::query_as::<_, PackPurchase>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(purchase)
    }

    /// Gets a purchase by its redemption token (the QR payload).
    pub async fn get_by_token(&self, token: &str) -> DbResult<Option<PackPurchase>> {
        let sql =
            format!("SELECT {PURCHASE_COLUMNS} FROM pack_purchases WHERE redemption_token = ?1");
        let purchase = sqlx::query_as::<_, PackPurchase>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(purchase)
    }

    /// Inserts a purchase row.
    ///
    /// ## Snapshot Pattern
    /// Buyer email and pack title are denormalized onto the row so the
    /// record stays auditable after pack edits or account changes.
    pub async fn insert(&self, purchase: &PackPurchase) -> DbResult<()> {
        debug!(
            id = %purchase.id,
            pack_id = %purchase.pack_id,
            total = purchase.total_price_cents,
            "Inserting purchase"
        );

        sqlx::query(
            r#"
            INSERT INTO pack_purchases (
                id, pack_id, user_id, establishment_id, quantity,
                unit_price_cents, total_price_cents, currency, promo_code_id,
                discount_cents, payment_method, payment_reference,
                payment_status, status, is_multi_use, uses_total,
                uses_remaining, redemption_token, expires_at,
                buyer_email_snapshot, pack_title_snapshot,
                created_at, paid_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9,
                ?10, ?11, ?12,
                ?13, ?14, ?15, ?16,
                ?17, ?18, ?19,
                ?20, ?21,
                ?22, ?23, ?24
            )
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.pack_id)
        .bind(&purchase.user_id)
        .bind(&purchase.establishment_id)
        .bind(purchase.quantity)
        .bind(purchase.unit_price_cents)
        .bind(purchase.total_price_cents)
        .bind(&purchase.currency)
        .bind(&purchase.promo_code_id)
        .bind(purchase.discount_cents)
        .bind(purchase.payment_method)
        .bind(&purchase.payment_reference)
        .bind(purchase.payment_status)
        .bind(purchase.status)
        .bind(purchase.is_multi_use)
        .bind(purchase.uses_total)
        .bind(purchase.uses_remaining)
        .bind(&purchase.redemption_token)
        .bind(purchase.expires_at)
        .bind(&purchase.buyer_email_snapshot)
        .bind(&purchase.pack_title_snapshot)
        .bind(purchase.created_at)
        .bind(purchase.paid_at)
        .bind(purchase.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Instant of the buyer's most recent completed purchase of this pack.
    ///
    /// Feeds the duplicate-purchase guard; the window comparison happens in
    /// the orchestrator.
    pub async fn latest_completed_at(
        &self,
        user_id: &str,
        pack_id: &str,
    ) -> DbResult<Option<DateTime<Utc>>> {
        let at: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            SELECT created_at
            FROM pack_purchases
            WHERE user_id = ?1
              AND pack_id = ?2
              AND payment_status = 'completed'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(pack_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(at)
    }

    /// Total units of this pack the buyer has already completed payment for.
    ///
    /// Feeds the per-client lifetime cap. Refunded purchases still count:
    /// the cap is about acquisition, not current holdings.
    pub async fn count_completed_units(&self, user_id: &str, pack_id: &str) -> DbResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(quantity)
            FROM pack_purchases
            WHERE user_id = ?1
              AND pack_id = ?2
              AND payment_status = 'completed'
            "#,
        )
        .bind(user_id)
        .bind(pack_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0))
    }

    /// A user's candidate-redeemable purchases at one establishment.
    ///
    /// SQL filters status and payment; expiry and remaining-use filtering is
    /// the redemption engine's job (it owns the clock).
    pub async fn list_active_at_establishment(
        &self,
        user_id: &str,
        establishment_id: &str,
    ) -> DbResult<Vec<PackPurchase>> {
        let sql = format!(
            r#"
            SELECT {PURCHASE_COLUMNS}
            FROM pack_purchases
            WHERE user_id = ?1
              AND establishment_id = ?2
              AND status = 'active'
              AND payment_status = 'completed'
            ORDER BY created_at DESC
            "#
        );
        let purchases = sqlx::query_as::<_, PackPurchase>(&sql)
            .bind(user_id)
            .bind(establishment_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(purchases)
    }

    /// Consumes one use: the single guarded conditional decrement.
    ///
    /// Transitions the purchase to `used` in the same statement when the
    /// last use goes. Returns the new `uses_remaining`, or `None` when the
    /// guard failed — meaning a concurrent scan (or a state change) got
    /// there first.
    pub async fn consume_use(&self, purchase_id: &str) -> DbResult<Option<i64>> {
        let now = Utc::now();

        let remaining: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE pack_purchases SET
                uses_remaining = uses_remaining - 1,
                status = CASE WHEN uses_remaining = 1 THEN 'used' ELSE status END,
                updated_at = ?2
            WHERE id = ?1
              AND status = 'active'
              AND payment_status = 'completed'
              AND uses_remaining > 0
            RETURNING uses_remaining
            "#,
        )
        .bind(purchase_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(remaining) = remaining {
            debug!(purchase_id = %purchase_id, remaining, "Use consumed");
        }

        Ok(remaining)
    }

    /// Transitions an active purchase to `refunded`.
    ///
    /// Conditional on `status = 'active'`: terminal states stay terminal.
    /// Returns whether the transition happened.
    pub async fn mark_refunded(&self, purchase_id: &str) -> DbResult<bool> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE pack_purchases SET
                status = 'refunded',
                updated_at = ?2
            WHERE id = ?1
              AND status = 'active'
            "#,
        )
        .bind(purchase_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
