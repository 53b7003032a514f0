//! # Commission Resolver
//!
//! Resolves the commission rate for a sale through the single authoritative
//! lookup (establishment override > category default > platform default) and
//! degrades to the platform default constant when the lookup has no answer
//! or fails outright. Availability over strictness: a rate-source outage
//! must never block a sale.
//!
//! The math itself (base selection, rounding) is pure and lives in
//! `packline_core::commission`.

use tracing::{debug, warn};

use packline_core::DEFAULT_COMMISSION_PERCENT;
use packline_db::repository::CommissionRateRepository;

/// Rate family for pack sales in the commission_rates table.
pub const PACK_SALE_COMMISSION: &str = "pack_sale";

/// Resolves commission rates with a safe fallback.
#[derive(Debug, Clone)]
pub struct CommissionResolver {
    rates: CommissionRateRepository,
}

impl CommissionResolver {
    /// Creates a resolver over the rate repository.
    pub fn new(rates: CommissionRateRepository) -> Self {
        CommissionResolver { rates }
    }

    /// Whole-percent rate for a pack sale. Infallible.
    ///
    /// A missing row at every tier is normal (new establishment, no category
    /// default) and resolves to the platform default silently; a *failed*
    /// lookup also resolves to the default but logs the anomaly.
    pub async fn resolve_rate(&self, establishment_id: &str, category: Option<&str>) -> i64 {
        match self
            .rates
            .resolve(PACK_SALE_COMMISSION, establishment_id, category)
            .await
        {
            Ok(Some(rate)) => {
                debug!(establishment_id, rate, "Commission rate resolved");
                rate
            }
            Ok(None) => {
                debug!(
                    establishment_id,
                    rate = DEFAULT_COMMISSION_PERCENT,
                    "No commission rate row at any tier, using platform default"
                );
                DEFAULT_COMMISSION_PERCENT
            }
            Err(err) => {
                warn!(
                    establishment_id,
                    error = %err,
                    rate = DEFAULT_COMMISSION_PERCENT,
                    "Commission rate lookup failed, falling back to platform default"
                );
                DEFAULT_COMMISSION_PERCENT
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use packline_core::CommissionRate;
    use packline_db::{Database, DbConfig};

    #[tokio::test]
    async fn test_resolves_configured_rate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.commission_rates()
            .insert(&CommissionRate {
                id: "r-1".to_string(),
                commission_type: PACK_SALE_COMMISSION.to_string(),
                establishment_id: Some("est-1".to_string()),
                category: None,
                rate_percent: 10,
            })
            .await
            .unwrap();

        let resolver = CommissionResolver::new(db.commission_rates());
        assert_eq!(resolver.resolve_rate("est-1", None).await, 10);
    }

    #[tokio::test]
    async fn test_falls_back_to_platform_default() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let resolver = CommissionResolver::new(db.commission_rates());

        assert_eq!(
            resolver.resolve_rate("est-unknown", Some("food")).await,
            DEFAULT_COMMISSION_PERCENT
        );
    }

    #[tokio::test]
    async fn test_lookup_failure_still_yields_default() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let resolver = CommissionResolver::new(db.commission_rates());
        db.close().await;

        // Pool is closed; the lookup errors but the sale still gets a rate
        assert_eq!(
            resolver.resolve_rate("est-1", None).await,
            DEFAULT_COMMISSION_PERCENT
        );
    }
}
