//! # Purchase Orchestrator
//!
//! The sequence of dependent checks and writes behind "buy this pack".
//!
//! ## The Gate Chain
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  confirm_purchase — ordered gates, each a distinct error code       │
//! │                                                                     │
//! │   0. quantity sane              ─► validation_error                 │
//! │   1. pack exists & open         ─► not_found / not_active           │
//! │   2. stock covers quantity      ─► out_of_stock                     │
//! │   3. no purchase < 2 min ago    ─► duplicate_purchase               │
//! │   4. buyer email verified       ─► email_not_verified               │
//! │   5. lifetime cap not exceeded  ─► limit_reached                    │
//! │   6. promo valid (if supplied)  ─► promo_invalid                    │
//! │   7. total = max(0, gross − discount)                               │
//! │   8. commission (base depends on promo origin)                      │
//! │   9. redemption token = UUID v4                                     │
//! │  10. INSERT pack_purchases  ◄── the monetary commitment             │
//! │  11. queue outbox effects   ◄── cannot fail the purchase            │
//! │                                                                     │
//! │  A failure at any gate aborts before step 10: partial purchases     │
//! │  cannot exist.                                                      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stock check at gate 2 is a point-in-time read: two concurrent buyers
//! of the last unit can both pass it. The conditional sold-out transition
//! bounds the oversell; see DESIGN.md.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::collaborators::{IdentityService, UserAccount};
use crate::commission::CommissionResolver;
use crate::effects::{BuyerEmailPayload, EstablishmentNotePayload, SoldCountPayload};
use crate::error::{ServiceError, ServiceResult};
use packline_core::{
    commission, validate_promo, validation, DiscountAbsorber, DomainError, EffectKind,
    LedgerTransaction, Money, PackPurchase, PaymentMethod, PaymentStatus, PromoContext,
    PromoDiscount, PromoError, PromoOrigin, PurchaseStatus, DUPLICATE_PURCHASE_WINDOW_SECS,
};
use packline_db::Database;

// =============================================================================
// Request / Response
// =============================================================================

/// Input to [`PurchaseService::confirm_purchase`].
#[derive(Debug, Clone)]
pub struct ConfirmPurchaseRequest {
    pub user_id: String,
    pub pack_id: String,
    pub quantity: i64,

    /// Promo code as the buyer typed it; matched case-insensitively.
    pub promo_code: Option<String>,

    pub payment_method: PaymentMethod,

    /// Upstream capture reference, if the gateway supplied one.
    pub payment_reference: Option<String>,
}

/// What the buyer gets back from a confirmed purchase.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseConfirmation {
    pub purchase_id: String,
    pub total_price_cents: i64,
    pub discount_cents: i64,
    pub commission_cents: i64,
    pub redemption_token: String,
}

// =============================================================================
// Purchase Service
// =============================================================================

/// Orchestrates the purchase flow.
#[derive(Clone)]
pub struct PurchaseService {
    db: Database,
    identity: Arc<dyn IdentityService>,
    resolver: CommissionResolver,
}

impl PurchaseService {
    /// Creates the service over a database handle and an identity provider.
    pub fn new(db: Database, identity: Arc<dyn IdentityService>) -> Self {
        let resolver = CommissionResolver::new(db.commission_rates());
        PurchaseService {
            db,
            identity,
            resolver,
        }
    }

    /// Confirms a purchase: runs the full gate chain, persists the purchase
    /// row, queues the side-effect tail, and returns the voucher.
    pub async fn confirm_purchase(
        &self,
        req: ConfirmPurchaseRequest,
    ) -> ServiceResult<PurchaseConfirmation> {
        let now = Utc::now();

        // Gate 0: input sanity
        validation::validate_quantity(req.quantity)?;

        // Gate 1: pack exists and is open for sale
        let pack = self
            .db
            .packs()
            .get_by_id(&req.pack_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Pack",
                id: req.pack_id.clone(),
            })?;
        if !pack.is_purchasable(now) {
            return Err(DomainError::NotActive {
                pack_id: pack.id.clone(),
            }
            .into());
        }

        // Gate 2: stock pre-read (point-in-time; see module docs)
        if !pack.has_stock_for(req.quantity) {
            let available = pack
                .stock
                .map(|s| (s - pack.sold_count).max(0))
                .unwrap_or(0);
            return Err(DomainError::OutOfStock {
                pack_id: pack.id.clone(),
                available,
                requested: req.quantity,
            }
            .into());
        }

        // Gate 3: duplicate-purchase guard, a 2-minute temporal window over
        // the buyer's most recent completed purchase of this pack
        if let Some(last) = self
            .db
            .purchases()
            .latest_completed_at(&req.user_id, &req.pack_id)
            .await?
        {
            if (now - last).num_seconds() < DUPLICATE_PURCHASE_WINDOW_SECS {
                return Err(DomainError::DuplicatePurchase.into());
            }
        }

        // Gate 4: buyer exists and has a verified email
        let user = self
            .identity
            .get_user_by_id(&req.user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "User",
                id: req.user_id.clone(),
            })?;
        if !user.is_email_verified() {
            return Err(DomainError::EmailNotVerified.into());
        }

        // Gate 5: per-client lifetime cap (0 = unlimited)
        if pack.limit_per_client > 0 {
            let owned = self
                .db
                .purchases()
                .count_completed_units(&req.user_id, &req.pack_id)
                .await?;
            if owned + req.quantity > pack.limit_per_client {
                return Err(DomainError::LimitReached {
                    limit: pack.limit_per_client,
                    owned,
                    requested: req.quantity,
                }
                .into());
            }
        }

        // Gate 6: promo validation, propagated verbatim as promo_invalid
        let promo = match &req.promo_code {
            Some(code) => Some(self.validate_promo_code(code, &pack, &req.user_id, now).await?),
            None => None,
        };

        // Step 7: totals
        let gross = pack.price().multiply_quantity(req.quantity);
        let discount = promo.as_ref().map(|p| p.discount).unwrap_or_else(Money::zero);
        let total = gross.saturating_sub(discount);

        // Step 8: commission, base picked by promo origin
        let promo_origin = promo.as_ref().map(|p| p.origin);
        let rate = self
            .resolver
            .resolve_rate(&pack.establishment_id, pack.category.as_deref())
            .await;
        let commission = commission::compute(gross, total, promo_origin, rate);

        // Step 9: the redemption credential
        let redemption_token = Uuid::new_v4().to_string();

        // Step 10: the monetary commitment
        let uses = pack.uses_per_purchase();
        let purchase = PackPurchase {
            id: Uuid::new_v4().to_string(),
            pack_id: pack.id.clone(),
            user_id: req.user_id.clone(),
            establishment_id: pack.establishment_id.clone(),
            quantity: req.quantity,
            unit_price_cents: pack.price_cents,
            total_price_cents: total.cents(),
            currency: "EUR".to_string(),
            promo_code_id: promo.as_ref().map(|p| p.promo_code_id.clone()),
            discount_cents: discount.cents(),
            payment_method: req.payment_method,
            payment_reference: req.payment_reference.clone(),
            payment_status: PaymentStatus::Completed,
            status: PurchaseStatus::Active,
            is_multi_use: pack.is_multi_use,
            uses_total: uses,
            uses_remaining: uses,
            redemption_token: redemption_token.clone(),
            expires_at: pack.purchase_expires_at(),
            buyer_email_snapshot: user.email.clone(),
            pack_title_snapshot: pack.title.clone(),
            created_at: now,
            paid_at: Some(now),
            updated_at: now,
        };
        self.db.purchases().insert(&purchase).await?;

        info!(
            purchase_id = %purchase.id,
            pack_id = %pack.id,
            user_id = %req.user_id,
            total = total.cents(),
            discount = discount.cents(),
            "Purchase confirmed"
        );

        // Step 11: the fire-and-forget tail. The confirmation below is
        // complete regardless of anything that happens in here.
        self.queue_tail_effects(&pack, &purchase, promo.as_ref(), &user, gross, commission, now)
            .await;

        Ok(PurchaseConfirmation {
            purchase_id: purchase.id,
            total_price_cents: total.cents(),
            discount_cents: discount.cents(),
            commission_cents: commission.amount.cents(),
            redemption_token,
        })
    }

    /// Looks up and validates a promo code against the pack being bought.
    async fn validate_promo_code(
        &self,
        code: &str,
        pack: &packline_core::Pack,
        user_id: &str,
        now: chrono::DateTime<Utc>,
    ) -> Result<PromoDiscount, ServiceError> {
        validation::validate_promo_code_shape(code)?;

        let promo = self
            .db
            .promos()
            .find_by_code(code)
            .await?
            .ok_or(PromoError::NotFound)?;

        let prior_uses = self.db.promos().count_user_uses(&promo.id, user_id).await?;

        let ctx = PromoContext {
            pack_id: &pack.id,
            establishment_id: &pack.establishment_id,
            pack_price: pack.price(),
        };

        Ok(validate_promo(&promo, &ctx, now, prior_uses)?)
    }

    /// Queues the post-purchase side effects. Never returns an error: a
    /// queueing failure is logged and the sale stands.
    async fn queue_tail_effects(
        &self,
        pack: &packline_core::Pack,
        purchase: &PackPurchase,
        promo: Option<&PromoDiscount>,
        user: &UserAccount,
        gross: Money,
        commission: commission::Commission,
        now: chrono::DateTime<Utc>,
    ) {
        // The establishment's payout base matches the commission base:
        // gross when the platform eats the discount, collected net when the
        // establishment funds its own promo.
        let payout_base = match promo.map(|p| p.origin) {
            Some(PromoOrigin::Pro) => Money::from_cents(purchase.total_price_cents),
            Some(PromoOrigin::Platform) | None => gross,
        };
        let ledger = LedgerTransaction {
            id: Uuid::new_v4().to_string(),
            purchase_id: purchase.id.clone(),
            establishment_id: purchase.establishment_id.clone(),
            gross_cents: gross.cents(),
            commission_percent: commission.rate_percent,
            commission_cents: commission.amount.cents(),
            net_cents: payout_base.saturating_sub(commission.amount).cents(),
            discount_cents: purchase.discount_cents,
            discount_absorbed_by: promo.map(|p| match p.origin {
                PromoOrigin::Platform => DiscountAbsorber::Platform,
                PromoOrigin::Pro => DiscountAbsorber::Pro,
            }),
            billing_period: LedgerTransaction::billing_period_for(now),
            created_at: now,
        };
        self.queue_json(EffectKind::PostLedger, &purchase.id, &ledger).await;

        self.queue_json(
            EffectKind::IncrementSoldCount,
            &pack.id,
            &SoldCountPayload {
                quantity: purchase.quantity,
            },
        )
        .await;

        if let Some(promo) = promo {
            self.queue_json(EffectKind::IncrementPromoUses, &promo.promo_code_id, &json!({}))
                .await;
        }

        self.queue_json(EffectKind::SoldOutCheck, &pack.id, &json!({})).await;
        self.queue_json(EffectKind::GenerateReceipt, &purchase.id, &json!({})).await;

        self.queue_json(
            EffectKind::NotifyBuyer,
            &purchase.id,
            &BuyerEmailPayload {
                to: user.email.clone(),
                template_key: "pack_purchase_confirmation".to_string(),
                variables: json!({
                    "pack_title": purchase.pack_title_snapshot,
                    "quantity": purchase.quantity,
                    "total_price_cents": purchase.total_price_cents,
                    "redemption_token": purchase.redemption_token,
                }),
            },
        )
        .await;

        self.queue_json(
            EffectKind::NotifyEstablishment,
            &purchase.establishment_id,
            &EstablishmentNotePayload {
                title: "New pack sale".to_string(),
                body: format!(
                    "{} × {} sold for {} cents",
                    purchase.quantity, purchase.pack_title_snapshot, purchase.total_price_cents
                ),
            },
        )
        .await;
    }

    /// Serializes and queues one effect; logs instead of failing.
    async fn queue_json<T: Serialize>(&self, kind: EffectKind, entity_id: &str, payload: &T) {
        match serde_json::to_string(payload) {
            Ok(json) => {
                if let Err(err) = self.db.outbox().queue(kind, entity_id, &json).await {
                    warn!(?kind, entity_id, error = %err, "Failed to queue side effect");
                }
            }
            Err(err) => {
                warn!(?kind, entity_id, error = %err, "Failed to encode side-effect payload");
            }
        }
    }
}
