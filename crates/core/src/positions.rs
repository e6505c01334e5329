//! Per-market position aggregation.

use alloy::primitives::Address;
use lending_metrics_api::RawPositionRecord;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::markets::MarketRegistry;
use crate::table::MarketTable;
use crate::units::{round_to, safe_ratio, to_decimal, ASSET_DECIMALS};

/// Borrow USD a position must exceed to count as an active borrower.
pub const ACTIVE_BORROWER_MIN_USD: f64 = 5.0;

/// Supply or borrow USD at or above which a position counts as a participant.
///
/// At zero every position qualifies, so participants equal distinct
/// addresses. Raise it through config to count only non-empty positions.
pub const ACTIVE_PARTICIPANT_MIN_USD: f64 = 0.0;

/// Thresholds applied while aggregating.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionThresholds {
    /// Strict: `borrow_usd > active_borrower_usd`
    pub active_borrower_usd: f64,
    /// Inclusive: `supply_usd >= x || borrow_usd >= x`
    pub active_participant_usd: f64,
}

impl Default for PositionThresholds {
    fn default() -> Self {
        Self {
            active_borrower_usd: ACTIVE_BORROWER_MIN_USD,
            active_participant_usd: ACTIVE_PARTICIPANT_MIN_USD,
        }
    }
}

/// Running totals for one market.
#[derive(Debug, Clone, Default)]
pub struct MarketPositionAggregate {
    pub collateral_symbol: Option<String>,
    pub total_supply_assets: f64,
    pub total_supply_usd: f64,
    pub total_borrow_assets: f64,
    pub total_borrow_usd: f64,
    pub total_collateral: f64,
    pub total_collateral_usd: f64,
    /// Records folded in, including repeats for the same address
    pub position_count: usize,
    active_borrowers: HashSet<Address>,
    active_participants: HashSet<Address>,
}

impl MarketPositionAggregate {
    /// Fold one record in. Sums are additive; set membership is per address.
    pub fn add(&mut self, position: &RawPositionRecord, thresholds: &PositionThresholds) -> Result<()> {
        let market = position.market.unique_key.as_str();
        let supply_usd = position.supply_assets_usd.unwrap_or(0.0);
        let borrow_usd = position.borrow_assets_usd.unwrap_or(0.0);

        self.total_supply_assets += convert("supplyAssets", market, position.supply_assets.as_str())?;
        self.total_borrow_assets += convert("borrowAssets", market, position.borrow_assets.as_str())?;
        self.total_collateral += convert("collateral", market, position.collateral.as_str())?;
        self.total_supply_usd += supply_usd;
        self.total_borrow_usd += borrow_usd;
        self.total_collateral_usd += position.collateral_usd.unwrap_or(0.0);
        self.position_count += 1;

        if self.collateral_symbol.is_none() {
            self.collateral_symbol = position.collateral_symbol().map(str::to_string);
        }

        let user = position.user.address;
        if borrow_usd > thresholds.active_borrower_usd {
            self.active_borrowers.insert(user);
        }
        if supply_usd >= thresholds.active_participant_usd
            || borrow_usd >= thresholds.active_participant_usd
        {
            self.active_participants.insert(user);
        }

        Ok(())
    }

    pub fn current_borrowers(&self) -> usize {
        self.active_borrowers.len()
    }

    pub fn current_participants(&self) -> usize {
        self.active_participants.len()
    }

    pub fn is_active_borrower(&self, user: &Address) -> bool {
        self.active_borrowers.contains(user)
    }

    /// Borrow over supply in USD, 0 when nothing is supplied.
    pub fn utilization(&self) -> f64 {
        safe_ratio(self.total_borrow_usd, self.total_supply_usd)
    }

    pub fn summary(&self) -> PositionSummary {
        PositionSummary {
            collateral_symbol: self.collateral_symbol.clone(),
            total_supply_assets: self.total_supply_assets,
            total_supply_usd: self.total_supply_usd,
            total_borrow_assets: self.total_borrow_assets,
            total_borrow_usd: self.total_borrow_usd,
            total_collateral: self.total_collateral,
            total_collateral_usd: self.total_collateral_usd,
            position_count: self.position_count,
            current_borrowers: self.current_borrowers(),
            current_participants: self.current_participants(),
            utilization: self.utilization(),
        }
    }
}

/// Output row of the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionSummary {
    pub collateral_symbol: Option<String>,
    pub total_supply_assets: f64,
    pub total_supply_usd: f64,
    pub total_borrow_assets: f64,
    pub total_borrow_usd: f64,
    pub total_collateral: f64,
    pub total_collateral_usd: f64,
    pub position_count: usize,
    pub current_borrowers: usize,
    pub current_participants: usize,
    pub utilization: f64,
}

impl PositionSummary {
    pub fn rounded(&self, decimals: u32) -> Self {
        Self {
            collateral_symbol: self.collateral_symbol.clone(),
            total_supply_assets: round_to(self.total_supply_assets, decimals),
            total_supply_usd: round_to(self.total_supply_usd, decimals),
            total_borrow_assets: round_to(self.total_borrow_assets, decimals),
            total_borrow_usd: round_to(self.total_borrow_usd, decimals),
            total_collateral: round_to(self.total_collateral, decimals),
            total_collateral_usd: round_to(self.total_collateral_usd, decimals),
            utilization: round_to(self.utilization, decimals),
            ..*self
        }
    }
}

/// Aggregate position records per market display name in one pass.
pub fn aggregate(
    positions: &[RawPositionRecord],
    registry: &MarketRegistry,
    thresholds: &PositionThresholds,
) -> Result<MarketTable<MarketPositionAggregate>> {
    let mut table = MarketTable::new();

    for position in positions {
        let name = registry.resolve(&position.market.unique_key);
        table
            .get_or_insert_with(name, MarketPositionAggregate::default)
            .add(position, thresholds)?;
    }

    for (market, agg) in table.iter() {
        debug!(
            market,
            positions = agg.position_count,
            borrowers = agg.current_borrowers(),
            participants = agg.current_participants(),
            "Aggregated positions"
        );
    }
    info!(records = positions.len(), markets = table.len(), "Positions aggregated");

    Ok(table)
}

fn convert(field: &'static str, market: &str, raw: &str) -> Result<f64> {
    to_decimal(raw, ASSET_DECIMALS).map_err(|e| PipelineError::invalid_number(field, market, e))
}
