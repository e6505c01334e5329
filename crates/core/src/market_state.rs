//! Market state normalization.
//!
//! Turns raw `markets` query results into one row per market display name.
//! Runs in two passes: the first collects the collateral prices that wrapper
//! markets borrow from *other* markets, the second builds the rows.

use lending_metrics_api::RawMarketRecord;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::markets::MarketRegistry;
use crate::table::MarketTable;
use crate::units::{round_to, to_decimal, ASSET_DECIMALS, PRICE_DECIMALS};

/// Normalized per-market figures.
///
/// `available_liquidity == direct_liquidity + reallocatable_liquidity` holds for
/// every row produced by [`normalize`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedMarketRow {
    pub collateral_usd: f64,
    pub total_supply: f64,
    pub total_borrowed: f64,
    pub available_liquidity: f64,
    pub utilization: f64,
    pub net_supply_apy: f64,
    pub net_borrow_apy: f64,
    /// Reallocatable liquidity in USD (price-adjusted for wrapper markets)
    pub reallocatable_liquidity: f64,
    /// Idle liquidity held by the market itself, in USD
    pub direct_liquidity: f64,
}

impl NormalizedMarketRow {
    /// Column names, in [`values`](Self::values) order.
    pub const COLUMNS: [&'static str; 9] = [
        "Collateral USD",
        "Total Supply",
        "Total Borrowed",
        "Available Liquidity",
        "Utilization",
        "Net Supply APY",
        "Net Borrow APY",
        "Reallocatable Liq",
        "Direct Liq",
    ];

    pub fn values(&self) -> [f64; 9] {
        [
            self.collateral_usd,
            self.total_supply,
            self.total_borrowed,
            self.available_liquidity,
            self.utilization,
            self.net_supply_apy,
            self.net_borrow_apy,
            self.reallocatable_liquidity,
            self.direct_liquidity,
        ]
    }

    /// Copy with every column rounded to `decimals` places.
    pub fn rounded(&self, decimals: u32) -> Self {
        Self {
            collateral_usd: round_to(self.collateral_usd, decimals),
            total_supply: round_to(self.total_supply, decimals),
            total_borrowed: round_to(self.total_borrowed, decimals),
            available_liquidity: round_to(self.available_liquidity, decimals),
            utilization: round_to(self.utilization, decimals),
            net_supply_apy: round_to(self.net_supply_apy, decimals),
            net_borrow_apy: round_to(self.net_borrow_apy, decimals),
            reallocatable_liquidity: round_to(self.reallocatable_liquidity, decimals),
            direct_liquidity: round_to(self.direct_liquidity, decimals),
        }
    }
}

/// Normalize a batch of raw market records.
///
/// Fails only on malformed fixed-point fields. A wrapper market whose price
/// source is missing from the batch keeps its unadjusted figures.
pub fn normalize(
    raw_markets: &[RawMarketRecord],
    registry: &MarketRegistry,
) -> Result<MarketTable<NormalizedMarketRow>> {
    let prices = collect_source_prices(raw_markets, registry)?;
    let mut table = MarketTable::new();

    for market in raw_markets {
        let id = market.unique_key.as_str();
        let name = registry.resolve(id);
        let state = &market.state;

        let collateral_price = convert("collateralPrice", id, market.collateral_price.as_str(), PRICE_DECIMALS)?;
        let collateral_assets = convert("collateralAssets", id, state.collateral_assets.as_str(), ASSET_DECIMALS)?;
        let mut collateral_usd = state
            .collateral_assets_usd
            .unwrap_or(collateral_price * collateral_assets);

        let mut reallocatable = convert(
            "reallocatableLiquidityAssets",
            id,
            market.reallocatable_liquidity_assets.as_str(),
            ASSET_DECIMALS,
        )?;

        if let Some(adjustment) = registry.get(id).and_then(|m| m.price_adjustment) {
            match prices.get(adjustment.price_source) {
                Some(&price) => {
                    reallocatable *= price;
                    if adjustment.scale_collateral_usd {
                        collateral_usd *= price;
                    }
                }
                None => warn!(
                    market = name,
                    price_source = adjustment.price_source,
                    "Price source missing from batch, skipping price adjustment"
                ),
            }
        }

        let row = NormalizedMarketRow {
            collateral_usd,
            total_supply: state.supply_assets_usd,
            total_borrowed: state.borrow_assets_usd,
            available_liquidity: state.liquidity_assets_usd + reallocatable,
            utilization: state.utilization,
            net_supply_apy: state.net_supply_apy,
            net_borrow_apy: state.net_borrow_apy,
            reallocatable_liquidity: reallocatable,
            direct_liquidity: state.liquidity_assets_usd,
        };

        debug!(
            market = name,
            supply = row.total_supply,
            borrowed = row.total_borrowed,
            available = row.available_liquidity,
            "Normalized market"
        );

        if table.insert(name, row).is_some() {
            warn!(market = name, "Duplicate market display name, keeping latest record");
        }
    }

    info!(markets = table.len(), "Market state normalized");
    Ok(table)
}

/// First pass: collateral prices of every market some wrapper depends on.
fn collect_source_prices<'a>(
    raw_markets: &'a [RawMarketRecord],
    registry: &MarketRegistry,
) -> Result<HashMap<&'a str, f64>> {
    let sources: Vec<&str> = registry.price_sources().collect();
    let mut prices = HashMap::new();

    for market in raw_markets {
        let id = market.unique_key.as_str();
        if sources.contains(&id) {
            let price = convert("collateralPrice", id, market.collateral_price.as_str(), PRICE_DECIMALS)?;
            prices.insert(id, price);
        }
    }

    Ok(prices)
}

fn convert(field: &'static str, market: &str, raw: &str, decimals: u8) -> Result<f64> {
    to_decimal(raw, decimals).map_err(|e| PipelineError::invalid_number(field, market, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markets::{Market, Network, Vault, BSDETH_EUSD_BASE, BSDETH_WETH, ETH_PLUS_EUSD, ETH_PLUS_WETH, REGISTRY};
    use lending_metrics_api::{MarketState, RawAmount};

    const ONE_PRICE: &str = "1000000000000000000000000000000000000";

    fn record(id: &str, price: &str, reallocatable: &str) -> RawMarketRecord {
        RawMarketRecord {
            unique_key: id.to_string(),
            collateral_price: RawAmount::from(price),
            reallocatable_liquidity_assets: RawAmount::from(reallocatable),
            state: MarketState {
                borrow_assets_usd: 800.0,
                supply_assets_usd: 1000.0,
                liquidity_assets_usd: 200.0,
                collateral_assets: RawAmount::from("3000000000000000000"),
                collateral_assets_usd: None,
                utilization: 0.8,
                net_supply_apy: 0.05,
                net_borrow_apy: 0.07,
            },
        }
    }

    fn test_registry() -> MarketRegistry {
        MarketRegistry::from_parts(
            [
                Market::new("A", "MarketA", Network::Ethereum),
                ETH_PLUS_EUSD,
                ETH_PLUS_WETH,
                BSDETH_EUSD_BASE,
                BSDETH_WETH,
            ],
            Vec::<Vault>::new(),
        )
    }

    fn assert_liquidity_invariant(row: &NormalizedMarketRow) {
        assert_eq!(
            row.available_liquidity,
            row.direct_liquidity + row.reallocatable_liquidity
        );
    }

    #[test]
    fn test_wrapper_without_price_source() {
        // Wrapper price of 1.0, its ETH+/eUSD source absent: adjustment skipped.
        let registry = test_registry();
        let batch = vec![
            record("A", ONE_PRICE, "0"),
            record("B", ONE_PRICE, "0"),
            record(ETH_PLUS_WETH.id, ONE_PRICE, "2000000000000000000"),
        ];

        let table = normalize(&batch, &registry).unwrap();
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["MarketA", "B", "ETH+/WETH"]);

        let wrapper = table.get("ETH+/WETH").unwrap();
        assert_eq!(wrapper.reallocatable_liquidity, 2.0);
        assert_eq!(wrapper.available_liquidity, 202.0);
        for (_, row) in table.iter() {
            assert_liquidity_invariant(row);
        }
    }

    #[test]
    fn test_wrapper_priced_from_other_market() {
        // ETH+ at 3000.5; wrapper reports 2 ETH+ of reallocatable liquidity.
        let batch = vec![
            record(ETH_PLUS_WETH.id, ONE_PRICE, "2000000000000000000"),
            record(
                ETH_PLUS_EUSD.id,
                "3000500000000000000000000000000000000000",
                "500000000000000000000",
            ),
        ];

        let table = normalize(&batch, &REGISTRY).unwrap();
        let wrapper = table.get("ETH+/WETH").unwrap();
        assert!((wrapper.reallocatable_liquidity - 6001.0).abs() < 1e-9);
        // Collateral USD is not scaled for ETH+/WETH: 1.0 * 3.0
        assert_eq!(wrapper.collateral_usd, 3.0);
        assert_liquidity_invariant(wrapper);

        // The source market itself is not adjusted.
        let source = table.get("ETH+/eUSD").unwrap();
        assert_eq!(source.reallocatable_liquidity, 500.0);
    }

    #[test]
    fn test_bsdeth_wrapper_scales_collateral() {
        let mut wrapper = record(BSDETH_WETH.id, ONE_PRICE, "1000000000000000000");
        wrapper.state.collateral_assets_usd = Some(10.0);
        let batch = vec![
            wrapper,
            record(
                BSDETH_EUSD_BASE.id,
                "2500000000000000000000000000000000000000",
                "0",
            ),
        ];

        let table = normalize(&batch, &REGISTRY).unwrap();
        let row = table.get("bsdETH/WETH").unwrap();
        assert!((row.reallocatable_liquidity - 2500.0).abs() < 1e-9);
        assert!((row.collateral_usd - 25000.0).abs() < 1e-9);
        assert_liquidity_invariant(row);
    }

    #[test]
    fn test_collateral_usd_fallback() {
        // 3 units at price 2.0 when the API omits collateralAssetsUsd
        let batch = vec![record("A", "2000000000000000000000000000000000000", "0")];
        let table = normalize(&batch, &test_registry()).unwrap();
        assert_eq!(table.get("MarketA").unwrap().collateral_usd, 6.0);

        let mut reported = record("A", "2000000000000000000000000000000000000", "0");
        reported.state.collateral_assets_usd = Some(5.5);
        let table = normalize(&[reported], &test_registry()).unwrap();
        assert_eq!(table.get("MarketA").unwrap().collateral_usd, 5.5);
    }

    #[test]
    fn test_state_fields_pass_through() {
        let table = normalize(&[record("A", ONE_PRICE, "0")], &test_registry()).unwrap();
        let row = table.get("MarketA").unwrap();
        assert_eq!(row.total_supply, 1000.0);
        assert_eq!(row.total_borrowed, 800.0);
        assert_eq!(row.direct_liquidity, 200.0);
        assert_eq!(row.utilization, 0.8);
        assert_eq!(row.net_supply_apy, 0.05);
        assert_eq!(row.net_borrow_apy, 0.07);
    }

    #[test]
    fn test_malformed_amount_is_fatal() {
        let batch = vec![record("A", ONE_PRICE, "not-a-number")];
        let err = normalize(&batch, &test_registry()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidNumber { field: "reallocatableLiquidityAssets", .. }
        ));
    }

    #[test]
    fn test_empty_batch() {
        let table = normalize(&[], &REGISTRY).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_rounding() {
        let row = NormalizedMarketRow {
            collateral_usd: 1.234_56,
            total_supply: 2.0,
            total_borrowed: 0.000_04,
            available_liquidity: 3.999_99,
            utilization: 0.812_345,
            net_supply_apy: 0.0,
            net_borrow_apy: 0.0,
            reallocatable_liquidity: 0.0,
            direct_liquidity: 3.999_99,
        };
        let rounded = row.rounded(4);
        assert_eq!(rounded.collateral_usd, 1.2346);
        assert_eq!(rounded.total_borrowed, 0.0);
        assert_eq!(rounded.available_liquidity, 4.0);
        assert_eq!(rounded.utilization, 0.8123);
    }
}
