//! # Collaborator Boundaries
//!
//! External services the workflows depend on, expressed as object-safe
//! async traits so the host application wires in real implementations and
//! tests wire in fakes.
//!
//! Only the identity lookup is on a blocking path (the email-verification
//! gate). Notifications and receipts are reached exclusively through the
//! side-effect outbox and can fail without anyone but the processor noticing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A collaborator call failed. The message is for logs, not clients.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

/// What the identity provider knows about a buyer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: String,
    pub email: String,

    /// When the buyer confirmed their email address. `None` = unverified.
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

impl UserAccount {
    /// Whether the email-verification purchase gate passes.
    #[inline]
    pub fn is_email_verified(&self) -> bool {
        self.email_confirmed_at.is_some()
    }
}

/// Buyer account lookup. Blocking: a purchase cannot proceed without it.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Fetches an account by id. `Ok(None)` means the account does not exist.
    async fn get_user_by_id(&self, user_id: &str) -> Result<Option<UserAccount>, CollaboratorError>;
}

/// Notification dispatch. Fire-and-forget; called only by the side-effect
/// processor.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// In-app notification to an establishment's staff.
    async fn notify_establishment(
        &self,
        establishment_id: &str,
        title: &str,
        body: &str,
    ) -> Result<(), CollaboratorError>;

    /// Template email to a buyer.
    async fn send_template_email(
        &self,
        to: &str,
        template_key: &str,
        variables: serde_json::Value,
    ) -> Result<(), CollaboratorError>;
}

/// Receipt generation. Fire-and-forget; called only by the side-effect
/// processor.
#[async_trait]
pub trait ReceiptService: Send + Sync {
    async fn generate_receipt(&self, purchase_id: &str) -> Result<(), CollaboratorError>;
}
