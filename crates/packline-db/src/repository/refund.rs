//! # Refund Repository
//!
//! Append-only reversal records. The status transition itself lives on the
//! purchase row (`PurchaseRepository::mark_refunded`); a row here is the
//! audit trail of who asked, why, and for how much.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use packline_core::Refund;

/// Repository for refund records.
#[derive(Debug, Clone)]
pub struct RefundRepository {
    pool: SqlitePool,
}

impl RefundRepository {
    /// Creates a new RefundRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RefundRepository { pool }
    }

    /// Appends a refund record.
    pub async fn insert(&self, refund: &Refund) -> DbResult<()> {
        debug!(
            purchase_id = %refund.purchase_id,
            amount = refund.amount_cents,
            prefer_credit = refund.prefer_credit,
            "Recording refund"
        );

        sqlx::query(
            r#"
            INSERT INTO refunds (
                id, purchase_id, user_id, reason, prefer_credit,
                amount_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&refund.id)
        .bind(&refund.purchase_id)
        .bind(&refund.user_id)
        .bind(&refund.reason)
        .bind(refund.prefer_credit)
        .bind(refund.amount_cents)
        .bind(refund.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The refund record for a purchase, if one exists.
    pub async fn get_by_purchase(&self, purchase_id: &str) -> DbResult<Option<Refund>> {
        let refund = sqlx::query_as::<_, Refund>(
            r#"
            SELECT id, purchase_id, user_id, reason, prefer_credit,
                   amount_cents, created_at
            FROM refunds
            WHERE purchase_id = ?1
            "#,
        )
        .bind(purchase_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(refund)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;
    use packline_core::{
        ModerationStatus, Pack, PackPurchase, PaymentMethod, PaymentStatus, PurchaseStatus,
    };

    async fn seed_purchase(db: &Database) {
        let now = Utc::now();
        db.packs()
            .insert(&Pack {
                id: "pack-1".to_string(),
                establishment_id: "est-1".to_string(),
                title: "Massage".to_string(),
                category: None,
                price_cents: 7000,
                original_price_cents: 9000,
                stock: None,
                sold_count: 0,
                limit_per_client: 0,
                is_multi_use: false,
                total_uses: 1,
                sale_ends_at: None,
                valid_until: None,
                moderation_status: ModerationStatus::Active,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        db.purchases()
            .insert(&PackPurchase {
                id: "p-1".to_string(),
                pack_id: "pack-1".to_string(),
                user_id: "user-1".to_string(),
                establishment_id: "est-1".to_string(),
                quantity: 1,
                unit_price_cents: 7000,
                total_price_cents: 7000,
                currency: "EUR".to_string(),
                promo_code_id: None,
                discount_cents: 0,
                payment_method: PaymentMethod::Card,
                payment_reference: None,
                payment_status: PaymentStatus::Completed,
                status: PurchaseStatus::Active,
                is_multi_use: false,
                uses_total: 1,
                uses_remaining: 1,
                redemption_token: "tok-1".to_string(),
                expires_at: None,
                buyer_email_snapshot: "buyer@example.com".to_string(),
                pack_title_snapshot: "Massage".to_string(),
                created_at: now,
                paid_at: Some(now),
                updated_at: now,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_purchase(&db).await;
        let repo = db.refunds();

        repo.insert(&Refund {
            id: "r-1".to_string(),
            purchase_id: "p-1".to_string(),
            user_id: "user-1".to_string(),
            reason: "changed my mind".to_string(),
            prefer_credit: true,
            amount_cents: 7000,
            created_at: Utc::now(),
        })
        .await
        .unwrap();

        let refund = repo.get_by_purchase("p-1").await.unwrap().unwrap();
        assert_eq!(refund.amount_cents, 7000);
        assert!(refund.prefer_credit);

        assert!(repo.get_by_purchase("p-2").await.unwrap().is_none());
    }
}
