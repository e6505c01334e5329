//! Vault supplier counts for markets without individual position records.

use alloy::primitives::Address;
use lending_metrics_api::VaultPositionRecord;
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

use crate::markets::Network;

/// Deposit USD a vault depositor must exceed to count as a supplier.
pub const ACTIVE_SUPPLIER_MIN_USD: f64 = 5.0;

/// Threshold-filtered supplier count for one vault.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplierCount {
    /// Display name the count joins on
    pub market: String,
    pub network: Option<Network>,
    /// Distinct depositors above the threshold
    pub count: usize,
    /// USD held by the counted depositors
    pub total_usd: f64,
}

/// Count distinct depositors with `assets_usd > min_usd`.
///
/// Positions without a USD value never qualify.
pub fn count_suppliers(
    market: &str,
    network: Option<Network>,
    positions: &[VaultPositionRecord],
    min_usd: f64,
) -> SupplierCount {
    let mut suppliers: HashSet<Address> = HashSet::new();
    let mut total_usd = 0.0;

    for position in positions {
        match position.assets_usd {
            Some(usd) if usd > min_usd => {
                suppliers.insert(position.user.address);
                total_usd += usd;
            }
            _ => {}
        }
    }

    debug!(
        market,
        positions = positions.len(),
        suppliers = suppliers.len(),
        total_usd,
        "Counted vault suppliers"
    );

    SupplierCount {
        market: market.to_string(),
        network,
        count: suppliers.len(),
        total_usd,
    }
}
