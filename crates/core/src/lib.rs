//! Lending metrics core logic.
//!
//! This crate turns raw Morpho Blue query results into dashboard tables:
//! - Fixed-point unit conversion with exact U256 scaling
//! - Market registry resolving identifiers to display names
//! - Market state normalization with cross-market price adjustment
//! - Per-market position aggregation with deduplicated participant sets
//! - Liquidation ledger with per-market running seized totals
//! - Vault supplier counts and final table assembly
//! - Snapshot caching and dashboard orchestration
//!
//! Everything but [`LendingDashboard`] is synchronous and pure.

mod cache;
pub mod config;
mod dashboard;
mod error;
mod liquidations;
mod market_state;
pub mod markets;
mod positions;
mod suppliers;
mod table;
pub mod units;

pub use cache::{NoCache, SnapshotCache, TtlCache};
pub use config::{
    ApiConfig, CacheConfig, DashboardConfig, OutputConfig, ThresholdConfig, CONFIG_PATH_ENV,
    CSV_PATH_ENV, MAX_ROUND_DECIMALS, MORPHO_API_URL_ENV,
};
pub use dashboard::{
    build_snapshot, DashboardInputs, DashboardSnapshot, LendingDashboard, VaultDeposits,
    LENDING_MARKETS_PAGE,
};
pub use error::{PipelineError, Result};
pub use liquidations::{LiquidationLedger, LiquidationLedgerRow};
pub use market_state::{normalize, NormalizedMarketRow};
pub use markets::{Market, MarketRegistry, Network, PriceAdjustment, Vault, REGISTRY};
pub use positions::{
    aggregate, MarketPositionAggregate, PositionSummary, PositionThresholds,
    ACTIVE_BORROWER_MIN_USD, ACTIVE_PARTICIPANT_MIN_USD,
};
pub use suppliers::{count_suppliers, SupplierCount, ACTIVE_SUPPLIER_MIN_USD};
pub use table::{assemble, write_market_csv, FinalTable, MarketTable, TableRow};
pub use units::{to_decimal, NotNumeric, ASSET_DECIMALS, PRICE_DECIMALS};
