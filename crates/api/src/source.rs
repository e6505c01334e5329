//! Abstraction over where raw dashboard data comes from.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::types::{LiquidationEvent, RawMarketRecord, RawPositionRecord, VaultPositionRecord};

/// Source of raw market, position, liquidation and vault data.
///
/// [`MorphoClient`](crate::MorphoClient) is the production implementation;
/// tests substitute in-memory fixtures.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn markets(&self, market_ids: &[String]) -> Result<Vec<RawMarketRecord>, ApiError>;

    async fn liquidations(&self, market_ids: &[String])
        -> Result<Vec<LiquidationEvent>, ApiError>;

    async fn market_positions(
        &self,
        market_ids: &[String],
    ) -> Result<Vec<RawPositionRecord>, ApiError>;

    async fn vault_positions(
        &self,
        vault_address: &str,
    ) -> Result<Vec<VaultPositionRecord>, ApiError>;
}
