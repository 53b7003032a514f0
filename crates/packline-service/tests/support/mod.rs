//! Shared test harness: in-memory database, fake collaborators that record
//! calls, and fixture builders.

// Each suite uses its own subset of the helpers.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use packline_core::{
    DiscountType, ModerationStatus, Pack, PromoCode, PromoOrigin, PromoScope,
};
use packline_service::{
    CollaboratorError, IdentityService, NotificationService, PurchaseService, ReceiptService,
    RedemptionService, RefundService, SideEffectProcessor, UserAccount,
};
use packline_db::{Database, DbConfig};

// =============================================================================
// Fake Collaborators
// =============================================================================

/// Identity provider backed by a fixed map of accounts.
pub struct FakeIdentity {
    users: HashMap<String, UserAccount>,
}

impl FakeIdentity {
    pub fn with_users(users: Vec<UserAccount>) -> Arc<Self> {
        Arc::new(FakeIdentity {
            users: users.into_iter().map(|u| (u.id.clone(), u)).collect(),
        })
    }
}

#[async_trait]
impl IdentityService for FakeIdentity {
    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<UserAccount>, CollaboratorError> {
        Ok(self.users.get(user_id).cloned())
    }
}

/// Notification sink that records every call.
#[derive(Default)]
pub struct RecordingNotifications {
    /// (to, template_key)
    pub emails: Mutex<Vec<(String, String)>>,
    /// (establishment_id, title)
    pub staff_notes: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl NotificationService for RecordingNotifications {
    async fn notify_establishment(
        &self,
        establishment_id: &str,
        title: &str,
        _body: &str,
    ) -> Result<(), CollaboratorError> {
        self.staff_notes
            .lock()
            .unwrap()
            .push((establishment_id.to_string(), title.to_string()));
        Ok(())
    }

    async fn send_template_email(
        &self,
        to: &str,
        template_key: &str,
        _variables: serde_json::Value,
    ) -> Result<(), CollaboratorError> {
        self.emails
            .lock()
            .unwrap()
            .push((to.to_string(), template_key.to_string()));
        Ok(())
    }
}

/// Receipt generator that records calls and can be told to fail.
#[derive(Default)]
pub struct RecordingReceipts {
    pub generated: Mutex<Vec<String>>,
    pub fail_next: AtomicBool,
}

#[async_trait]
impl ReceiptService for RecordingReceipts {
    async fn generate_receipt(&self, purchase_id: &str) -> Result<(), CollaboratorError> {
        if self.fail_next.load(Ordering::SeqCst) {
            return Err(CollaboratorError("receipt renderer unavailable".into()));
        }
        self.generated.lock().unwrap().push(purchase_id.to_string());
        Ok(())
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub db: Database,
    pub purchases: PurchaseService,
    pub redemption: RedemptionService,
    pub refunds: RefundService,
    pub processor: SideEffectProcessor,
    pub notifications: Arc<RecordingNotifications>,
    pub receipts: Arc<RecordingReceipts>,
}

impl Harness {
    /// In-memory database plus services wired to fakes. `users` is the set
    /// of accounts the identity provider knows about.
    pub async fn new(users: Vec<UserAccount>) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();

        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let identity = FakeIdentity::with_users(users);
        let notifications = Arc::new(RecordingNotifications::default());
        let receipts = Arc::new(RecordingReceipts::default());

        Harness {
            purchases: PurchaseService::new(db.clone(), identity),
            redemption: RedemptionService::new(db.clone()),
            refunds: RefundService::new(db.clone()),
            processor: SideEffectProcessor::new(
                db.clone(),
                notifications.clone(),
                receipts.clone(),
            ),
            db,
            notifications,
            receipts,
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn verified_user(id: &str, email: &str) -> UserAccount {
    UserAccount {
        id: id.to_string(),
        email: email.to_string(),
        email_confirmed_at: Some(Utc::now()),
    }
}

pub fn unverified_user(id: &str, email: &str) -> UserAccount {
    UserAccount {
        id: id.to_string(),
        email: email.to_string(),
        email_confirmed_at: None,
    }
}

/// Active single-use pack at 10000 cents with unlimited stock.
pub fn pack(id: &str) -> Pack {
    let now = Utc::now();
    Pack {
        id: id.to_string(),
        establishment_id: "est-1".to_string(),
        title: "Brunch for two".to_string(),
        category: Some("food".to_string()),
        price_cents: 10_000,
        original_price_cents: 14_000,
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
    }
}

/// Unrestricted 20% platform promo, like the classic RAMADAN20.
pub fn percent_promo(code: &str, bps: i64) -> PromoCode {
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
        discount_value: bps,
        current_uses: 0,
        origin: PromoOrigin::Platform,
        created_at: Utc::now(),
    }
}
