//! Dashboard orchestration.
//!
//! Fetches the raw batches for the lending markets page one after another,
//! runs them through the pipeline and keeps the resulting snapshot in a
//! [`SnapshotCache`] until it expires.

use chrono::{DateTime, Utc};
use lending_metrics_api::{
    LiquidationEvent, MetricsSource, RawMarketRecord, RawPositionRecord, VaultPositionRecord,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::cache::SnapshotCache;
use crate::config::DashboardConfig;
use crate::error::Result;
use crate::liquidations::LiquidationLedger;
use crate::market_state::{normalize, NormalizedMarketRow};
use crate::markets::{MarketRegistry, Vault};
use crate::positions::{aggregate, PositionSummary};
use crate::suppliers::{count_suppliers, SupplierCount};
use crate::table::{assemble, FinalTable, MarketTable};
use crate::units::round_to;

/// Cache key of the lending markets page snapshot.
pub const LENDING_MARKETS_PAGE: &str = "lending-markets";

/// Deposits in one tracked vault.
#[derive(Debug, Clone)]
pub struct VaultDeposits {
    pub vault: Vault,
    pub positions: Vec<VaultPositionRecord>,
}

/// Raw batches for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct DashboardInputs {
    pub markets: Vec<RawMarketRecord>,
    pub positions: Vec<RawPositionRecord>,
    pub liquidations: Vec<LiquidationEvent>,
    pub vault_deposits: Vec<VaultDeposits>,
}

/// Everything the lending markets page renders, rounded for presentation.
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub markets: MarketTable<NormalizedMarketRow>,
    pub positions: MarketTable<PositionSummary>,
    pub liquidations: LiquidationLedger,
    pub suppliers: Vec<SupplierCount>,
    pub table: FinalTable,
    pub fetched_at: DateTime<Utc>,
}

/// Run the pipeline over one set of raw batches.
///
/// Normalization, aggregation and the ledger each see only their own batch;
/// rounding is applied once the unrounded figures are final.
pub fn build_snapshot(
    inputs: &DashboardInputs,
    registry: &MarketRegistry,
    config: &DashboardConfig,
) -> Result<DashboardSnapshot> {
    let decimals = config.output.round_decimals;

    let markets = normalize(&inputs.markets, registry)?.map(|row| row.rounded(decimals));

    let positions = aggregate(&inputs.positions, registry, &config.thresholds.positions())?
        .map(|agg| agg.summary().rounded(decimals));

    let liquidations = LiquidationLedger::build(&inputs.liquidations, registry).rounded(decimals);

    let suppliers: Vec<SupplierCount> = inputs
        .vault_deposits
        .iter()
        .map(|deposits| {
            let mut count = count_suppliers(
                deposits.vault.name,
                Some(deposits.vault.network),
                &deposits.positions,
                config.thresholds.active_supplier_usd,
            );
            count.total_usd = round_to(count.total_usd, decimals);
            count
        })
        .collect();

    let table = assemble(&markets, &positions, &suppliers, registry);

    info!(
        markets = markets.len(),
        position_markets = positions.len(),
        liquidations = liquidations.len(),
        vaults = suppliers.len(),
        rows = table.len(),
        "Dashboard snapshot built"
    );

    Ok(DashboardSnapshot {
        markets,
        positions,
        liquidations,
        suppliers,
        table,
        fetched_at: Utc::now(),
    })
}

/// Lending markets page backed by a [`MetricsSource`].
pub struct LendingDashboard<'r, S> {
    source: S,
    cache: Arc<dyn SnapshotCache<DashboardSnapshot>>,
    registry: &'r MarketRegistry,
    config: DashboardConfig,
}

impl<'r, S: MetricsSource> LendingDashboard<'r, S> {
    pub fn new(
        source: S,
        cache: Arc<dyn SnapshotCache<DashboardSnapshot>>,
        registry: &'r MarketRegistry,
        config: DashboardConfig,
    ) -> Self {
        Self {
            source,
            cache,
            registry,
            config,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Cached snapshot if still fresh, else a newly fetched one.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Arc<DashboardSnapshot>> {
        if let Some(snapshot) = self.cache.get(LENDING_MARKETS_PAGE) {
            debug!(fetched_at = %snapshot.fetched_at, "Serving cached snapshot");
            return Ok(snapshot);
        }
        self.refresh().await
    }

    /// Fetch and rebuild regardless of the cache, then store the result.
    ///
    /// A failed fetch leaves any cached snapshot in place.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Arc<DashboardSnapshot>> {
        let inputs = self.fetch().await?;
        let snapshot = Arc::new(build_snapshot(&inputs, self.registry, &self.config)?);
        self.cache.insert(LENDING_MARKETS_PAGE, Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Drop the cached snapshot.
    pub fn invalidate(&self) {
        self.cache.invalidate(LENDING_MARKETS_PAGE);
    }

    async fn fetch(&self) -> Result<DashboardInputs> {
        let market_ids = self.registry.market_ids();

        let liquidations = self.source.liquidations(&market_ids).await?;
        let markets = self.source.markets(&market_ids).await?;
        let positions = self.source.market_positions(&market_ids).await?;

        let mut vault_deposits = Vec::new();
        for vault in self.registry.vaults() {
            let positions = self.source.vault_positions(vault.address).await?;
            vault_deposits.push(VaultDeposits {
                vault: vault.clone(),
                positions,
            });
        }

        info!(
            markets = markets.len(),
            positions = positions.len(),
            liquidations = liquidations.len(),
            vaults = vault_deposits.len(),
            "Fetched raw dashboard data"
        );

        Ok(DashboardInputs {
            markets,
            positions,
            liquidations,
            vault_deposits,
        })
    }
}
