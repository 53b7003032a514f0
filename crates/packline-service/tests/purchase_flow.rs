//! End-to-end purchase flow: the gate chain, promo and commission math,
//! and the outbox tail.

mod support;

use packline_core::{
    DiscountType, ModerationStatus, PaymentMethod, PromoOrigin, PurchaseStatus,
};
use packline_service::ConfirmPurchaseRequest;
use support::{pack, percent_promo, unverified_user, verified_user, Harness};

fn request(user_id: &str, pack_id: &str) -> ConfirmPurchaseRequest {
    ConfirmPurchaseRequest {
        user_id: user_id.to_string(),
        pack_id: pack_id.to_string(),
        quantity: 1,
        promo_code: None,
        payment_method: PaymentMethod::Card,
        payment_reference: None,
    }
}

// =============================================================================
// Promo & commission math
// =============================================================================

#[tokio::test]
async fn scenario_a_twenty_percent_promo() {
    let h = Harness::new(vec![verified_user("user-1", "amira@example.com")]).await;
    h.db.packs().insert(&pack("pack-1")).await.unwrap();
    h.db.promos().insert(&percent_promo("RAMADAN20", 2000)).await.unwrap();

    let mut req = request("user-1", "pack-1");
    req.promo_code = Some("ramadan20".to_string()); // case-insensitive
    let confirmation = h.purchases.confirm_purchase(req).await.unwrap();

    assert_eq!(confirmation.discount_cents, 2000);
    assert_eq!(confirmation.total_price_cents, 8000);
    // Platform-funded promo: commission is the default 15% of the
    // pre-discount gross, not of the 8000 actually collected
    assert_eq!(confirmation.commission_cents, 1500);

    let purchase = h
        .db
        .purchases()
        .get_by_id(&confirmation.purchase_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(purchase.status, PurchaseStatus::Active);
    assert_eq!(purchase.total_price_cents, 8000);
    assert_eq!(purchase.redemption_token, confirmation.redemption_token);
    assert_eq!(purchase.buyer_email_snapshot, "amira@example.com");
    assert_eq!(purchase.promo_code_id.as_deref(), Some("promo-RAMADAN20"));
}

#[tokio::test]
async fn pro_funded_promo_commissions_collected_net() {
    let h = Harness::new(vec![verified_user("user-1", "a@b.c")]).await;
    h.db.packs().insert(&pack("pack-1")).await.unwrap();

    let mut promo = percent_promo("HOUSE20", 2000);
    promo.origin = PromoOrigin::Pro;
    h.db.promos().insert(&promo).await.unwrap();

    let mut req = request("user-1", "pack-1");
    req.promo_code = Some("HOUSE20".to_string());
    let confirmation = h.purchases.confirm_purchase(req).await.unwrap();

    assert_eq!(confirmation.total_price_cents, 8000);
    // Pro-funded: 15% of the 8000 collected
    assert_eq!(confirmation.commission_cents, 1200);
}

#[tokio::test]
async fn fixed_promo_never_exceeds_price() {
    let h = Harness::new(vec![verified_user("user-1", "a@b.c")]).await;
    h.db.packs().insert(&pack("pack-1")).await.unwrap();

    let mut promo = percent_promo("BIGFIX", 0);
    promo.discount_type = DiscountType::FixedAmount;
    promo.discount_value = 15_000;
    h.db.promos().insert(&promo).await.unwrap();

    let mut req = request("user-1", "pack-1");
    req.promo_code = Some("BIGFIX".to_string());
    let confirmation = h.purchases.confirm_purchase(req).await.unwrap();

    assert_eq!(confirmation.discount_cents, 10_000);
    assert_eq!(confirmation.total_price_cents, 0);
}

#[tokio::test]
async fn establishment_commission_override_wins() {
    let h = Harness::new(vec![verified_user("user-1", "a@b.c")]).await;
    h.db.packs().insert(&pack("pack-1")).await.unwrap();
    h.db.commission_rates()
        .insert(&packline_core::CommissionRate {
            id: "r-1".to_string(),
            commission_type: "pack_sale".to_string(),
            establishment_id: Some("est-1".to_string()),
            category: None,
            rate_percent: 10,
        })
        .await
        .unwrap();

    let confirmation = h.purchases.confirm_purchase(request("user-1", "pack-1")).await.unwrap();
    assert_eq!(confirmation.commission_cents, 1000);
}

#[tokio::test]
async fn expired_promo_rejected_with_promo_invalid() {
    let h = Harness::new(vec![verified_user("user-1", "a@b.c")]).await;
    h.db.packs().insert(&pack("pack-1")).await.unwrap();

    let mut promo = percent_promo("OLD", 1000);
    promo.ends_at = Some(chrono::Utc::now() - chrono::Duration::days(1));
    h.db.promos().insert(&promo).await.unwrap();

    let mut req = request("user-1", "pack-1");
    req.promo_code = Some("OLD".to_string());
    let err = h.purchases.confirm_purchase(req).await.unwrap_err();
    assert_eq!(err.code(), "promo_invalid");
}

// =============================================================================
// Gate chain
// =============================================================================

#[tokio::test]
async fn unknown_pack_and_inactive_pack() {
    let h = Harness::new(vec![verified_user("user-1", "a@b.c")]).await;

    let err = h.purchases.confirm_purchase(request("user-1", "missing")).await.unwrap_err();
    assert_eq!(err.code(), "not_found");

    let mut draft = pack("pack-draft");
    draft.moderation_status = ModerationStatus::Draft;
    h.db.packs().insert(&draft).await.unwrap();

    let err = h.purchases.confirm_purchase(request("user-1", "pack-draft")).await.unwrap_err();
    assert_eq!(err.code(), "not_active");
}

#[tokio::test]
async fn closed_sale_window_is_not_active() {
    let h = Harness::new(vec![verified_user("user-1", "a@b.c")]).await;

    let mut closed = pack("pack-1");
    closed.sale_ends_at = Some(chrono::Utc::now() - chrono::Duration::hours(1));
    h.db.packs().insert(&closed).await.unwrap();

    let err = h.purchases.confirm_purchase(request("user-1", "pack-1")).await.unwrap_err();
    assert_eq!(err.code(), "not_active");
}

#[tokio::test]
async fn insufficient_stock_rejected() {
    let h = Harness::new(vec![verified_user("user-1", "a@b.c")]).await;

    let mut limited = pack("pack-1");
    limited.stock = Some(1);
    h.db.packs().insert(&limited).await.unwrap();

    let mut req = request("user-1", "pack-1");
    req.quantity = 2;
    let err = h.purchases.confirm_purchase(req).await.unwrap_err();
    assert_eq!(err.code(), "out_of_stock");
}

#[tokio::test]
async fn duplicate_purchase_within_window_rejected() {
    let h = Harness::new(vec![verified_user("user-1", "a@b.c")]).await;
    h.db.packs().insert(&pack("pack-1")).await.unwrap();

    h.purchases.confirm_purchase(request("user-1", "pack-1")).await.unwrap();

    let err = h.purchases.confirm_purchase(request("user-1", "pack-1")).await.unwrap_err();
    assert_eq!(err.code(), "duplicate_purchase");
}

#[tokio::test]
async fn unverified_email_and_unknown_user() {
    let h = Harness::new(vec![unverified_user("user-1", "a@b.c")]).await;
    h.db.packs().insert(&pack("pack-1")).await.unwrap();

    let err = h.purchases.confirm_purchase(request("user-1", "pack-1")).await.unwrap_err();
    assert_eq!(err.code(), "email_not_verified");

    let err = h.purchases.confirm_purchase(request("ghost", "pack-1")).await.unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[tokio::test]
async fn lifetime_limit_counts_quantities() {
    let h = Harness::new(vec![verified_user("user-1", "a@b.c")]).await;

    let mut capped = pack("pack-1");
    capped.limit_per_client = 2;
    h.db.packs().insert(&capped).await.unwrap();

    let mut req = request("user-1", "pack-1");
    req.quantity = 2;
    h.purchases.confirm_purchase(req).await.unwrap();

    // Owns 2 of 2: even one more unit busts the cap. The duplicate guard
    // fires first on an immediate retry, so backdate the first purchase.
    sqlx::query("UPDATE pack_purchases SET created_at = datetime('now', '-1 hour')")
        .execute(h.db.pool())
        .await
        .unwrap();

    let err = h.purchases.confirm_purchase(request("user-1", "pack-1")).await.unwrap_err();
    assert_eq!(err.code(), "limit_reached");
}

#[tokio::test]
async fn quantity_bounds_enforced() {
    let h = Harness::new(vec![verified_user("user-1", "a@b.c")]).await;
    h.db.packs().insert(&pack("pack-1")).await.unwrap();

    let mut req = request("user-1", "pack-1");
    req.quantity = 0;
    assert_eq!(
        h.purchases.confirm_purchase(req).await.unwrap_err().code(),
        "validation_error"
    );

    let mut req = request("user-1", "pack-1");
    req.quantity = 51;
    assert_eq!(
        h.purchases.confirm_purchase(req).await.unwrap_err().code(),
        "validation_error"
    );
}

// =============================================================================
// Outbox tail
// =============================================================================

#[tokio::test]
async fn tail_effects_settle_counters_and_ledger() {
    let h = Harness::new(vec![verified_user("user-1", "amira@example.com")]).await;

    let mut limited = pack("pack-1");
    limited.stock = Some(1);
    h.db.packs().insert(&limited).await.unwrap();
    h.db.promos().insert(&percent_promo("RAMADAN20", 2000)).await.unwrap();

    let mut req = request("user-1", "pack-1");
    req.promo_code = Some("RAMADAN20".to_string());
    let confirmation = h.purchases.confirm_purchase(req).await.unwrap();

    // Ledger + sold count + promo uses + sold-out check + receipt + 2 notifications
    assert_eq!(h.db.outbox().pending_count().await.unwrap(), 7);

    let report = h.processor.process_pending(50).await.unwrap();
    assert_eq!(report.processed, 7);
    assert_eq!(report.failed, 0);

    // Exactly one ledger row, with the asymmetric platform-promo numbers
    let ledger = h
        .db
        .ledger()
        .get_by_purchase(&confirmation.purchase_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ledger.gross_cents, 10_000);
    assert_eq!(ledger.commission_percent, 15);
    assert_eq!(ledger.commission_cents, 1500);
    assert_eq!(ledger.net_cents, 8500);
    assert_eq!(ledger.discount_cents, 2000);

    // Counters landed and the last unit flipped the pack to sold_out
    let pack_row = h.db.packs().get_by_id("pack-1").await.unwrap().unwrap();
    assert_eq!(pack_row.sold_count, 1);
    assert_eq!(pack_row.moderation_status, ModerationStatus::SoldOut);

    let promo_row = h.db.promos().get_by_id("promo-RAMADAN20").await.unwrap().unwrap();
    assert_eq!(promo_row.current_uses, 1);

    // Collaborators were reached
    assert_eq!(
        *h.receipts.generated.lock().unwrap(),
        vec![confirmation.purchase_id.clone()]
    );
    let emails = h.notifications.emails.lock().unwrap();
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].0, "amira@example.com");
    let notes = h.notifications.staff_notes.lock().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].0, "est-1");

    // Nothing left, and a second drain is a no-op
    assert_eq!(h.db.outbox().pending_count().await.unwrap(), 0);
    let report = h.processor.process_pending(50).await.unwrap();
    assert_eq!(report.processed, 0);
}

#[tokio::test]
async fn tail_failure_never_unwinds_the_sale() {
    use std::sync::atomic::Ordering;

    let h = Harness::new(vec![verified_user("user-1", "a@b.c")]).await;
    h.db.packs().insert(&pack("pack-1")).await.unwrap();
    h.receipts.fail_next.store(true, Ordering::SeqCst);

    let confirmation = h.purchases.confirm_purchase(request("user-1", "pack-1")).await.unwrap();

    let report = h.processor.process_pending(50).await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.processed, 5); // everything except the receipt

    // The sale stands untouched
    let purchase = h
        .db
        .purchases()
        .get_by_id(&confirmation.purchase_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(purchase.status, PurchaseStatus::Active);

    // The failed entry stayed pending with its error recorded, and the next
    // drain retries it successfully
    let pending = h.db.outbox().get_pending(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].attempts, 1);
    assert!(pending[0].last_error.as_deref().unwrap().contains("receipt"));

    h.receipts.fail_next.store(false, Ordering::SeqCst);
    let report = h.processor.process_pending(50).await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(h.db.outbox().pending_count().await.unwrap(), 0);
}
