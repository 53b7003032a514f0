//! # packline-db: Database Layer
//!
//! SQLite persistence for the pack marketplace, via sqlx.
//!
//! Every operation on the shared store is an independent round trip — there
//! is no cross-statement transaction on the purchase path. The workflows in
//! packline-service substitute ordering discipline for atomicity; the one
//! place real atomicity is required (the redemption decrement) and the
//! counter bumps are single conditional `UPDATE` statements in
//! [`repository::purchase`] and [`repository::pack`] / [`repository::promo`].
//!
//! ## Modules
//! - [`pool`] - connection pool + configuration ([`Database`], [`DbConfig`])
//! - [`migrations`] - embedded schema migrations
//! - [`repository`] - one repository per aggregate
//! - [`error`] - [`DbError`]

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
