//! # packline-service: Workflows for Packline
//!
//! The orchestration layer: everything that sequences reads, rules and
//! writes into the three user-facing flows.
//!
//! ## Flow Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      packline-service                               │
//! │                                                                     │
//! │  ┌─────────────────┐  ┌──────────────────┐  ┌──────────────────┐    │
//! │  │ PurchaseService │  │RedemptionService │  │  RefundService   │    │
//! │  │ confirm_purchase│  │ get_active_packs │  │  request_refund  │    │
//! │  │  (10 ordered    │  │ consume          │  │                  │    │
//! │  │   gates + tail) │  │  (guarded decr.) │  │                  │    │
//! │  └────────┬────────┘  └──────────────────┘  └────────┬─────────┘    │
//! │           │ queue()                                  │ queue()      │
//! │           ▼                                          ▼              │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │              side_effect_outbox  ──►  SideEffectProcessor     │  │
//! │  │  ledger post • counters • sold-out check • receipt • emails   │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! │                                                                     │
//! │  Collaborators (async traits, implemented by the host):             │
//! │  IdentityService • NotificationService • ReceiptService             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The One Rule
//! A buyer's purchase response is complete before any tail work runs.
//! Nothing queued in the outbox can fail, slow down, or roll back a sale.

pub mod collaborators;
pub mod commission;
pub mod effects;
pub mod error;
pub mod purchase;
pub mod redemption;
pub mod refund;

pub use collaborators::{
    CollaboratorError, IdentityService, NotificationService, ReceiptService, UserAccount,
};
pub use commission::CommissionResolver;
pub use effects::{OutboxReport, SideEffectProcessor};
pub use error::{ServiceError, ServiceResult};
pub use purchase::{ConfirmPurchaseRequest, PurchaseConfirmation, PurchaseService};
pub use redemption::{ConsumeOutcome, RedemptionService};
pub use refund::{RefundReceipt, RefundService};
