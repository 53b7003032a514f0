//! # Repositories
//!
//! One repository struct per aggregate. Each one owns a pool clone and all
//! the SQL touching its tables; nothing outside this module writes SQL.

pub mod consumption;
pub mod ledger;
pub mod outbox;
pub mod pack;
pub mod promo;
pub mod purchase;
pub mod rates;
pub mod refund;

pub use consumption::ConsumptionRepository;
pub use ledger::LedgerRepository;
pub use outbox::OutboxRepository;
pub use pack::PackRepository;
pub use promo::PromoRepository;
pub use purchase::PurchaseRepository;
pub use rates::CommissionRateRepository;
pub use refund::RefundRepository;
