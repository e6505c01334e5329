//! Liquidation ledger with per-market running seized totals.
//!
//! Events are ordered by block with a stable sort, so liquidations sharing a
//! block keep their feed order. The running sum is keyed by market identifier,
//! so display name resolution never affects ordering or grouping.

use alloy::primitives::Address;
use lending_metrics_api::LiquidationEvent;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

use crate::markets::MarketRegistry;
use crate::units::round_to;

/// One liquidation with its market's cumulative seized USD up to and including it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiquidationLedgerRow {
    pub block_number: u64,
    pub hash: String,
    /// Transaction type
    pub kind: String,
    /// Display name
    pub market: String,
    pub market_id: String,
    pub user: Address,
    pub liquidator: Address,
    pub seized_usd: f64,
    pub cumulative_seized_usd: f64,
}

/// Block-ordered liquidation rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiquidationLedger {
    rows: Vec<LiquidationLedgerRow>,
}

impl LiquidationLedger {
    pub fn build(events: &[LiquidationEvent], registry: &MarketRegistry) -> Self {
        let mut ordered: Vec<&LiquidationEvent> = events.iter().collect();
        ordered.sort_by_key(|e| e.block_number);

        let mut running: HashMap<&str, f64> = HashMap::new();
        let rows: Vec<LiquidationLedgerRow> = ordered
            .into_iter()
            .map(|event| {
                let total = running.entry(event.market_id.as_str()).or_insert(0.0);
                *total += event.seized_usd;
                LiquidationLedgerRow {
                    block_number: event.block_number,
                    hash: event.hash.clone(),
                    kind: event.kind.clone(),
                    market: registry.resolve(&event.market_id).to_string(),
                    market_id: event.market_id.clone(),
                    user: event.user,
                    liquidator: event.liquidator,
                    seized_usd: event.seized_usd,
                    cumulative_seized_usd: *total,
                }
            })
            .collect();

        info!(
            events = rows.len(),
            markets = running.len(),
            "Liquidation ledger built"
        );

        Self { rows }
    }

    pub fn rows(&self) -> &[LiquidationLedgerRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Final cumulative seized USD per market display name, sorted by name.
    pub fn totals_by_market(&self) -> Vec<(String, f64)> {
        let mut totals: HashMap<&str, f64> = HashMap::new();
        for row in &self.rows {
            totals.insert(row.market.as_str(), row.cumulative_seized_usd);
        }

        let mut totals: Vec<(String, f64)> = totals
            .into_iter()
            .map(|(market, total)| (market.to_string(), total))
            .collect();
        totals.sort_by(|a, b| a.0.cmp(&b.0));
        totals
    }

    /// Rows of one market display name, in ledger order.
    pub fn for_market<'a>(&'a self, market: &'a str) -> impl Iterator<Item = &'a LiquidationLedgerRow> {
        self.rows.iter().filter(move |row| row.market == market)
    }

    /// Distinct market display names in order of first liquidation.
    pub fn markets(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row.market.as_str()) {
                seen.push(row.market.as_str());
            }
        }
        seen
    }

    /// Copy with USD columns rounded to `decimals` places.
    pub fn rounded(&self, decimals: u32) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .map(|row| LiquidationLedgerRow {
                    seized_usd: round_to(row.seized_usd, decimals),
                    cumulative_seized_usd: round_to(row.cumulative_seized_usd, decimals),
                    ..row.clone()
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markets::{Market, Network, Vault, ETH_PLUS_EUSD, REGISTRY};

    fn event(block: u64, hash: &str, market: &str, seized: f64) -> LiquidationEvent {
        LiquidationEvent {
            block_number: block,
            hash: hash.to_string(),
            kind: "MarketLiquidation".to_string(),
            market_id: market.to_string(),
            seized_usd: seized,
            repaid_usd: None,
            bad_debt_usd: None,
            user: Address::repeat_byte(0x11),
            liquidator: Address::repeat_byte(0x22),
        }
    }

    #[test]
    fn test_running_total_per_market() {
        let registry = MarketRegistry::from_parts(
            [Market::new("X", "MarketX", Network::Ethereum)],
            Vec::<Vault>::new(),
        );
        let events = vec![
            event(100, "0x1", "X", 10.0),
            event(100, "0x2", "X", 5.0),
            event(101, "0x3", "X", 20.0),
        ];

        let ledger = LiquidationLedger::build(&events, &registry);
        let cumulative: Vec<f64> = ledger.rows().iter().map(|r| r.cumulative_seized_usd).collect();
        assert_eq!(cumulative, vec![10.0, 15.0, 35.0]);
        assert!(ledger.rows().iter().all(|r| r.market == "MarketX"));
        assert!(ledger.rows().iter().all(|r| r.kind == "MarketLiquidation"));
    }

    #[test]
    fn test_stable_sort_keeps_feed_order_within_block() {
        let events = vec![
            event(105, "0xc", "A", 1.0),
            event(100, "0xa", "A", 2.0),
            event(105, "0xd", "B", 3.0),
            event(100, "0xb", "B", 4.0),
            event(105, "0xe", "A", 5.0),
        ];

        let ledger = LiquidationLedger::build(&events, &REGISTRY);
        let hashes: Vec<&str> = ledger.rows().iter().map(|r| r.hash.as_str()).collect();
        assert_eq!(hashes, vec!["0xa", "0xb", "0xc", "0xd", "0xe"]);

        let a: Vec<f64> = ledger.for_market("A").map(|r| r.cumulative_seized_usd).collect();
        assert_eq!(a, vec![2.0, 3.0, 8.0]);
        let b: Vec<f64> = ledger.for_market("B").map(|r| r.cumulative_seized_usd).collect();
        assert_eq!(b, vec![4.0, 7.0]);
    }

    #[test]
    fn test_cumulative_is_monotonic_and_ends_at_sum() {
        let seized = [3.5, 0.0, 12.25, 7.0, 1.0];
        let events: Vec<_> = seized
            .iter()
            .enumerate()
            .map(|(i, &s)| event(200 - i as u64, "0x", ETH_PLUS_EUSD.id, s))
            .collect();

        let ledger = LiquidationLedger::build(&events, &REGISTRY);
        let rows = ledger.rows();
        for pair in rows.windows(2) {
            assert!(pair[1].cumulative_seized_usd >= pair[0].cumulative_seized_usd);
        }
        assert_eq!(rows.last().unwrap().cumulative_seized_usd, seized.iter().sum::<f64>());
        assert_eq!(ledger.totals_by_market(), vec![("ETH+/eUSD".to_string(), 23.75)]);
    }

    #[test]
    fn test_name_resolution_does_not_merge_partitions() {
        // Two unknown identifiers keep separate running sums
        let events = vec![event(1, "0x1", "id-1", 1.0), event(2, "0x2", "id-2", 2.0)];
        let ledger = LiquidationLedger::build(&events, &REGISTRY);
        assert_eq!(ledger.markets(), vec!["id-1", "id-2"]);
        assert_eq!(ledger.rows()[1].cumulative_seized_usd, 2.0);
    }

    #[test]
    fn test_totals_sorted_by_name() {
        let events = vec![
            event(1, "0x1", "zeta", 1.0),
            event(2, "0x2", "alpha", 2.0),
            event(3, "0x3", "zeta", 4.0),
        ];
        let ledger = LiquidationLedger::build(&events, &REGISTRY);
        assert_eq!(
            ledger.totals_by_market(),
            vec![("alpha".to_string(), 2.0), ("zeta".to_string(), 5.0)]
        );
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = LiquidationLedger::build(&[], &REGISTRY);
        assert!(ledger.is_empty());
        assert!(ledger.totals_by_market().is_empty());
        assert!(ledger.markets().is_empty());
    }
}
