//! # Domain Types
//!
//! Core domain types for the pack marketplace.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                               │
//! │                                                                     │
//! │  ┌──────────────┐    ┌────────────────┐    ┌──────────────────┐     │
//! │  │     Pack     │1──*│  PackPurchase  │1──*│ PackConsumption  │     │
//! │  │  ──────────  │    │  ────────────  │    │  ──────────────  │     │
//! │  │  price_cents │    │  redemption_   │    │  use_number      │     │
//! │  │  stock       │    │    token       │    │  scanned_by      │     │
//! │  │  sold_count  │    │  uses_remaining│    │  (append-only)   │     │
//! │  └──────────────┘    └───────┬────────┘    └──────────────────┘     │
//! │                              │1                                     │
//! │  ┌──────────────┐            │1                                     │
//! │  │  PromoCode   │0..1──*     ▼                                      │
//! │  │  ──────────  │    ┌────────────────┐                             │
//! │  │  scope       │    │LedgerTransaction│  (append-only)             │
//! │  │  discount    │    │ gross/commission│                            │
//! │  └──────────────┘    └────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! `PackPurchase` denormalizes buyer email and pack title at purchase time.
//! The purchase row must stay auditable even if the pack is later edited or
//! the buyer changes their address.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Enums
// =============================================================================

/// Moderation/lifecycle status of a pack offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    /// Being edited by establishment staff, not purchasable.
    Draft,
    /// Live and purchasable.
    Active,
    /// Capacity exhausted; no further purchases.
    SoldOut,
    /// Pulled by moderation.
    Suspended,
}

/// What a promo code applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PromoScope {
    /// Any pack on the platform.
    All,
    /// Exactly one pack (`promo.pack_id`).
    SpecificPack,
    /// Any pack of one establishment (`promo.establishment_id`).
    AllEstablishmentPacks,
}

/// How a promo discount is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Basis points out of 10000 (2000 = 20%).
    Percentage,
    /// Absolute cents, capped at the priced amount.
    FixedAmount,
}

/// Who funds a promo code's discount.
///
/// This drives the commission base: platform-funded promos are commissioned
/// on the pre-discount gross (the house absorbs the discount, not the
/// establishment's commission); pro-funded promos are commissioned on the
/// amount actually collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PromoOrigin {
    /// Funded by the platform.
    Platform,
    /// Funded by the establishment ("pro").
    Pro,
}

/// Payment capture status of a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// Overall lifecycle status of a purchase.
///
/// `Active` is the only redeemable state. `Used`, `Refunded` and `Cancelled`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Active,
    Used,
    Refunded,
    Cancelled,
}

impl PurchaseStatus {
    /// Whether a voucher in this status may still be scanned.
    #[inline]
    pub const fn is_redeemable(&self) -> bool {
        matches!(self, PurchaseStatus::Active)
    }

    /// Wire/storage name of the status.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Active => "active",
            PurchaseStatus::Used => "used",
            PurchaseStatus::Refunded => "refunded",
            PurchaseStatus::Cancelled => "cancelled",
        }
    }
}

/// How the buyer paid. Capture itself happens upstream; we only record it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Wallet,
}

/// Who absorbed a promo discount on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountAbsorber {
    Platform,
    Pro,
}

/// Kind of a queued fire-and-forget side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Append the LedgerTransaction carried in the payload.
    PostLedger,
    /// Atomically bump `packs.sold_count`.
    IncrementSoldCount,
    /// Atomically bump `promo_codes.current_uses`.
    IncrementPromoUses,
    /// Flip a capacity-exhausted pack to `sold_out`.
    SoldOutCheck,
    /// Ask the receipt collaborator for a PDF.
    GenerateReceipt,
    /// Template email to the buyer.
    NotifyBuyer,
    /// In-app notification to establishment staff.
    NotifyEstablishment,
}

// =============================================================================
// Pack
// =============================================================================

/// A sellable prepaid voucher offer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Pack {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Establishment that owns and honours this pack.
    pub establishment_id: String,

    /// Display title shown to buyers and on vouchers.
    pub title: String,

    /// Category used for category-level commission defaults.
    pub category: Option<String>,

    /// Discounted unit price, in cents.
    pub price_cents: i64,

    /// Pre-discount price, in cents (marketing display only).
    pub original_price_cents: i64,

    /// Stock capacity. `None` = unlimited.
    pub stock: Option<i64>,

    /// Units sold so far. Invariant: `stock.is_some() ⇒ sold_count <= stock`.
    pub sold_count: i64,

    /// Lifetime units one buyer may purchase. 0 = unlimited.
    pub limit_per_client: i64,

    /// Whether one purchase grants several redemption uses.
    pub is_multi_use: bool,

    /// Uses granted per purchase when `is_multi_use` (1 otherwise).
    pub total_uses: i64,

    /// When sales close. `None` = open-ended.
    #[ts(as = "Option<String>")]
    pub sale_ends_at: Option<DateTime<Utc>>,

    /// Last day a purchased voucher stays valid (inclusive through 23:59:59
    /// UTC). `None` = never expires.
    #[ts(as = "Option<String>")]
    pub valid_until: Option<NaiveDate>,

    /// Moderation/lifecycle status.
    pub moderation_status: ModerationStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Pack {
    /// Unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Whether the pack can be bought at all right now.
    pub fn is_purchasable(&self, now: DateTime<Utc>) -> bool {
        if self.moderation_status != ModerationStatus::Active {
            return false;
        }
        match self.sale_ends_at {
            Some(ends) => now <= ends,
            None => true,
        }
    }

    /// Whether `quantity` more units fit under the stock cap.
    ///
    /// A `None` stock is unlimited. This is a point-in-time read; the
    /// authoritative bound is the conditional sold-out transition.
    pub fn has_stock_for(&self, quantity: i64) -> bool {
        match self.stock {
            Some(stock) => stock - self.sold_count >= quantity,
            None => true,
        }
    }

    /// Redemption uses one purchase of this pack grants.
    #[inline]
    pub fn uses_per_purchase(&self) -> i64 {
        if self.is_multi_use {
            self.total_uses
        } else {
            1
        }
    }

    /// Voucher expiry derived from `valid_until`: 23:59:59 UTC of that day,
    /// inclusive. `None` = never expires.
    pub fn purchase_expires_at(&self) -> Option<DateTime<Utc>> {
        self.valid_until
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .map(|dt| dt.and_utc())
    }
}

// =============================================================================
// Promo Code
// =============================================================================

/// A discount rule redeemable at purchase time.
///
/// Lookup by `code` is case-insensitive. The validator in [`crate::promo`]
/// only reads this struct; counters are incremented by the purchase flow
/// after the sale commits.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PromoCode {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Human-entered code ("RAMADAN20"). Unique, case-insensitive.
    pub code: String,

    /// Kill switch.
    pub is_active: bool,

    /// Start of validity window. `None` = unbounded.
    #[ts(as = "Option<String>")]
    pub starts_at: Option<DateTime<Utc>>,

    /// End of validity window. `None` = unbounded.
    #[ts(as = "Option<String>")]
    pub ends_at: Option<DateTime<Utc>>,

    /// What the code applies to.
    pub scope: PromoScope,

    /// Target pack when `scope = SpecificPack`.
    pub pack_id: Option<String>,

    /// Target establishment when `scope = AllEstablishmentPacks`.
    pub establishment_id: Option<String>,

    /// Global usage cap. `None` = unlimited.
    pub max_total_uses: Option<i64>,

    /// Per-buyer usage cap. 0 = unlimited.
    pub max_uses_per_user: i64,

    /// Percentage or fixed amount.
    pub discount_type: DiscountType,

    /// Basis points (percentage) or cents (fixed amount).
    /// Invariant: `discount_type = Percentage ⇒ 0 <= discount_value <= 10000`.
    pub discount_value: i64,

    /// Global usage counter, incremented after each committed purchase.
    pub current_uses: i64,

    /// Who funds the discount; drives the commission base.
    pub origin: PromoOrigin,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Pack Purchase
// =============================================================================

/// One buyer's acquisition of N units of a pack.
///
/// Owned exclusively by the purchase flow; later mutated only by the
/// redemption engine (`uses_remaining`, `status`) and the refund workflow
/// (`status = refunded`).
///
/// Invariants: `0 <= uses_remaining <= uses_total`;
/// `status = Active ⇒ payment_status = Completed`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PackPurchase {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub pack_id: String,
    pub user_id: String,
    pub establishment_id: String,

    /// Units bought.
    pub quantity: i64,

    /// Unit price at purchase time, in cents.
    pub unit_price_cents: i64,

    /// Post-discount total actually charged, in cents.
    pub total_price_cents: i64,

    /// ISO 4217 code ("EUR").
    pub currency: String,

    /// Applied promo, if any.
    pub promo_code_id: Option<String>,

    /// Discount actually granted, in cents.
    pub discount_cents: i64,

    pub payment_method: PaymentMethod,

    /// Upstream capture reference, if the gateway supplied one.
    pub payment_reference: Option<String>,

    pub payment_status: PaymentStatus,
    pub status: PurchaseStatus,

    pub is_multi_use: bool,

    /// Total redemption uses granted by this purchase.
    pub uses_total: i64,

    /// Uses not yet consumed. Non-increasing; never negative.
    pub uses_remaining: i64,

    /// Opaque unguessable credential presented at scan time (UUID v4).
    /// Never derivable from the purchase id or timestamps.
    pub redemption_token: String,

    /// 23:59:59 UTC of the pack's validity end date. `None` = never expires.
    #[ts(as = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Buyer email at purchase time (audit snapshot).
    pub buyer_email_snapshot: String,

    /// Pack title at purchase time (audit snapshot).
    pub pack_title_snapshot: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl PackPurchase {
    /// Whether the voucher has passed its expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires) => now > expires,
            None => false,
        }
    }

    /// The sequence number the next successful consumption will carry.
    #[inline]
    pub fn next_use_number(&self) -> i64 {
        self.uses_total - self.uses_remaining + 1
    }
}

// =============================================================================
// Pack Consumption
// =============================================================================

/// An immutable redemption event. Append-only; never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PackConsumption {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub purchase_id: String,

    /// 1-based position in the purchase's use sequence.
    pub use_number: i64,

    /// Staff member who scanned the voucher.
    pub scanned_by_user_id: String,

    #[ts(as = "String")]
    pub consumed_at: DateTime<Utc>,
}

// =============================================================================
// Ledger Transaction
// =============================================================================

/// Financial record of one sale. Append-only, 1—1 with the purchase.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LedgerTransaction {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub purchase_id: String,
    pub establishment_id: String,

    /// Pre-discount amount, in cents.
    pub gross_cents: i64,

    /// Commission rate applied, whole percent.
    pub commission_percent: i64,

    /// Platform cut, in cents. Computed on gross or net depending on who
    /// funded the promo — see [`crate::commission`].
    pub commission_cents: i64,

    /// Establishment payout, in cents.
    pub net_cents: i64,

    /// Promo discount granted, in cents.
    pub discount_cents: i64,

    /// Who absorbed the discount. `None` when no promo applied.
    pub discount_absorbed_by: Option<DiscountAbsorber>,

    /// Billing period code, "YYYY-MM".
    pub billing_period: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl LedgerTransaction {
    /// Billing period code for an instant: "YYYY-MM" in UTC.
    pub fn billing_period_for(at: DateTime<Utc>) -> String {
        at.format("%Y-%m").to_string()
    }
}

// =============================================================================
// Commission Rate
// =============================================================================

/// One row of the commission rate table.
///
/// Resolution order: establishment override, then category default, then
/// platform default (both scoping columns `None`).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CommissionRate {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Rate family, e.g. "pack_sale".
    pub commission_type: String,

    /// Establishment this override applies to. `None` = not scoped.
    pub establishment_id: Option<String>,

    /// Category this default applies to. `None` = not scoped.
    pub category: Option<String>,

    /// Whole percent, 0..=100.
    pub rate_percent: i64,
}

// =============================================================================
// Refund
// =============================================================================

/// Append-only record of a purchase reversal.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Refund {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub purchase_id: String,
    pub user_id: String,

    /// Free-text reason supplied by the buyer.
    pub reason: String,

    /// Buyer asked for wallet credit instead of a gateway reversal.
    pub prefer_credit: bool,

    /// Amount reversed, in cents (the purchase's charged total).
    pub amount_cents: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Side-Effect Outbox Entry
// =============================================================================

/// A queued fire-and-forget side effect.
///
/// The purchase and refund flows only *append* entries; a processor drains
/// them later. Failures are recorded here (`attempts`, `last_error`) instead
/// of propagating to the buyer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SideEffectEntry {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub kind: EffectKind,

    /// Entity the effect concerns (purchase id, pack id, promo id).
    pub entity_id: String,

    /// JSON payload; shape depends on `kind`.
    pub payload: String,

    /// Delivery attempts so far.
    pub attempts: i64,

    /// Message of the most recent failure.
    pub last_error: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "Option<String>")]
    pub attempted_at: Option<DateTime<Utc>>,

    #[ts(as = "Option<String>")]
    pub processed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================
