//! eUSD Lending Metrics
//!
//! Builds the lending markets dashboard for eUSD Morpho Blue markets on
//! Ethereum and Base.
//! Features:
//! - Market state with price-adjusted reallocatable liquidity
//! - Per-market borrower and participant counts
//! - Liquidation ledger with cumulative seized USD
//! - Vault supplier counts and CSV export

use std::fs::File;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lending_metrics_api::MorphoClient;
use lending_metrics_core::{
    write_market_csv, DashboardConfig, DashboardSnapshot, LendingDashboard, NormalizedMarketRow,
    TtlCache, REGISTRY,
};

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,lending_metrics_core=debug")),
        )
        .init();

    // DASHBOARD_CONFIG selects a TOML file; MORPHO_API_URL and
    // DASHBOARD_CSV_PATH override single settings
    let config = DashboardConfig::from_env().context("failed to load dashboard config")?;
    config.log_config();

    info!(
        markets = REGISTRY.len(),
        vaults = REGISTRY.vaults().count(),
        "Market registry loaded"
    );

    let client = MorphoClient::with_url(config.api.url.clone())
        .with_timeout(config.api.timeout())?
        .with_retries(config.api.retries)
        .with_page_size(config.api.page_size);

    let cache = Arc::new(TtlCache::<DashboardSnapshot>::new(config.cache.ttl()));
    let output = config.output.clone();
    let dashboard = LendingDashboard::new(client, cache, &REGISTRY, config);

    let snapshot = dashboard.load().await.context("failed to build dashboard")?;

    print_market_table(&snapshot);
    print_liquidation_totals(&snapshot);
    print_final_table(&snapshot);

    if let Some(path) = &output.csv_path {
        let file = File::create(path).with_context(|| format!("failed to create {path}"))?;
        write_market_csv(&snapshot.markets, file)?;
        info!(path = %path, rows = snapshot.markets.len(), "Wrote market CSV");
    }

    if let Some(path) = &output.final_csv_path {
        let file = File::create(path).with_context(|| format!("failed to create {path}"))?;
        snapshot.table.write_csv(file)?;
        info!(path = %path, rows = snapshot.table.len(), "Wrote presentation table CSV");
    }

    Ok(())
}

fn print_market_table(snapshot: &DashboardSnapshot) {
    println!("\nMarket data ({})", snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"));
    print!("{:<22}", "Market");
    for column in NormalizedMarketRow::COLUMNS {
        print!("{column:>20}");
    }
    println!();

    for (market, row) in snapshot.markets.iter() {
        print!("{market:<22}");
        for value in row.values() {
            print!("{value:>20}");
        }
        println!();
    }
}

fn print_liquidation_totals(snapshot: &DashboardSnapshot) {
    println!("\nLiquidations ({} events)", snapshot.liquidations.len());
    for (market, total) in snapshot.liquidations.totals_by_market() {
        println!("{market:<22}{total:>20}");
    }
}

fn print_final_table(snapshot: &DashboardSnapshot) {
    println!("\nMarkets");
    println!(
        "{:<28}{:>8}{:>18}{:>18}{:>20}{:>16}",
        "Market", "Network", "Total Supply", "Total Borrowed", "Current Borrowers", "Open Positions"
    );

    for (market, row) in snapshot.table.iter() {
        let network = row.network.map(|n| n.label()).unwrap_or("");
        let supply = row.market_state.as_ref().map(|s| s.total_supply.to_string());
        let borrowed = row.market_state.as_ref().map(|s| s.total_borrowed.to_string());
        let borrowers = row.positions.as_ref().map(|p| p.current_borrowers.to_string());
        let open = row.open_positions().map(|n| n.to_string());

        println!(
            "{:<28}{:>8}{:>18}{:>18}{:>20}{:>16}",
            market,
            network,
            supply.as_deref().unwrap_or("-"),
            borrowed.as_deref().unwrap_or("-"),
            borrowers.as_deref().unwrap_or("-"),
            open.as_deref().unwrap_or("-"),
        );
    }
}

/// Print startup banner.
fn print_banner() {
    println!(r#"
    ┌─┐╦ ╦╔═╗╔╦╗  ╦  ┌─┐┌┐┌┌┬┐┬┌┐┌┌─┐
    ├┤ ║ ║╚═╗ ║║  ║  ├┤ │││ │││││││ ┬
    └─┘╚═╝╚═╝═╩╝  ╩═╝└─┘┘└┘─┴┘┴┘└┘└─┘
    Lending Metrics v0.1.0
    "#);
}
