//! Morpho Blue GraphQL API client.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::error::ApiError;
use crate::source::MetricsSource;
use crate::types::{
    GraphQlResponse, LiquidationEvent, MarketPositionsData, MarketsData, RawMarketRecord,
    RawPositionRecord, TransactionsData, VaultPositionRecord, VaultPositionsData,
};

/// Public Morpho Blue API endpoint.
pub const DEFAULT_API_URL: &str = "https://blue-api.morpho.org/graphql";

const MARKETS_QUERY: &str = r#"
query Markets($keys: [String!], $first: Int) {
  markets(first: $first, where: { uniqueKey_in: $keys }) {
    items {
      uniqueKey
      collateralPrice
      reallocatableLiquidityAssets
      state {
        borrowAssetsUsd
        supplyAssetsUsd
        liquidityAssetsUsd
        collateralAssets
        collateralAssetsUsd
        utilization
        netSupplyApy
        netBorrowApy
      }
    }
  }
}
"#;

const LIQUIDATIONS_QUERY: &str = r#"
query Liquidations($keys: [String!], $first: Int) {
  transactions(
    first: $first
    where: { marketUniqueKey_in: $keys, type_in: [MarketLiquidation] }
  ) {
    items {
      blockNumber
      hash
      type
      user { address }
      data {
        ... on MarketLiquidationTransactionData {
          seizedAssets
          repaidAssets
          seizedAssetsUsd
          repaidAssetsUsd
          badDebtAssetsUsd
          liquidator
          market { uniqueKey }
        }
      }
    }
  }
}
"#;

const MARKET_POSITIONS_QUERY: &str = r#"
query MarketPositions($keys: [String!], $first: Int) {
  marketPositions(first: $first, where: { marketUniqueKey_in: $keys }) {
    items {
      supplyAssets
      supplyAssetsUsd
      borrowAssets
      borrowAssetsUsd
      collateral
      collateralUsd
      user { address }
      market {
        uniqueKey
        collateralAsset { symbol }
      }
    }
  }
}
"#;

const VAULT_POSITIONS_QUERY: &str = r#"
query VaultPositions($vaults: [String!], $first: Int) {
  vaultPositions(
    first: $first
    orderBy: Shares
    orderDirection: Desc
    where: { vaultAddress_in: $vaults }
  ) {
    items {
      shares
      assets
      assetsUsd
      user { address }
    }
  }
}
"#;

/// Morpho Blue API client.
///
/// Every query is a single GraphQL POST; transport failures are retried up
/// to `retries` attempts in total with a linear backoff.
#[derive(Debug, Clone)]
pub struct MorphoClient {
    client: reqwest::Client,
    url: String,
    retries: u32,
    page_size: usize,
}

impl MorphoClient {
    /// Create a client for the public endpoint.
    pub fn new() -> Self {
        Self::with_url(DEFAULT_API_URL)
    }

    /// Create a client with custom endpoint URL.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            retries: 3,
            page_size: 500,
        }
    }

    /// Set a request timeout, rebuilding the underlying HTTP client.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ApiError> {
        self.client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Set the total number of attempts per query (at least one).
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries.max(1);
        self
    }

    /// Set the `first:` page size sent with every list query.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether a list result filled the whole page, so rows past it may be missing.
    fn page_is_full(&self, count: usize) -> bool {
        count >= self.page_size
    }

    fn check_page(&self, query: &'static str, count: usize) {
        if self.page_is_full(count) {
            warn!(
                query,
                count,
                page_size = self.page_size,
                "Result filled the page, later rows were not fetched"
            );
        }
    }

    /// Execute a query, retrying transient failures.
    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, ApiError> {
        let body = json!({ "query": query, "variables": variables });
        let mut attempt = 1;

        loop {
            match self.post(&body).await {
                Ok(data) => return Ok(data),
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    warn!(
                        attempt = attempt,
                        max_attempts = self.retries,
                        error = %e,
                        "Morpho API request failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(250 * u64::from(attempt))).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn post<T: DeserializeOwned>(&self, body: &serde_json::Value) -> Result<T, ApiError> {
        let response = self.client.post(&self.url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        decode_response(&text)
    }

    /// Fetch market snapshots for the given identifiers.
    #[instrument(skip(self, market_ids), fields(markets = market_ids.len()))]
    pub async fn fetch_markets(
        &self,
        market_ids: &[String],
    ) -> Result<Vec<RawMarketRecord>, ApiError> {
        let data: MarketsData = self
            .execute(
                MARKETS_QUERY,
                json!({ "keys": market_ids, "first": self.page_size }),
            )
            .await?;

        self.check_page("markets", data.markets.items.len());
        info!(count = data.markets.items.len(), "Fetched markets");
        Ok(data.markets.items)
    }

    /// Fetch every liquidation recorded in the given markets.
    #[instrument(skip(self, market_ids), fields(markets = market_ids.len()))]
    pub async fn fetch_liquidations(
        &self,
        market_ids: &[String],
    ) -> Result<Vec<LiquidationEvent>, ApiError> {
        let data: TransactionsData = self
            .execute(
                LIQUIDATIONS_QUERY,
                json!({ "keys": market_ids, "first": self.page_size }),
            )
            .await?;

        let events: Vec<LiquidationEvent> = data
            .transactions
            .items
            .into_iter()
            .map(LiquidationEvent::from)
            .collect();

        self.check_page("transactions", events.len());
        info!(count = events.len(), "Fetched liquidations");
        Ok(events)
    }

    /// Fetch per-user positions in the given markets.
    #[instrument(skip(self, market_ids), fields(markets = market_ids.len()))]
    pub async fn fetch_market_positions(
        &self,
        market_ids: &[String],
    ) -> Result<Vec<RawPositionRecord>, ApiError> {
        let data: MarketPositionsData = self
            .execute(
                MARKET_POSITIONS_QUERY,
                json!({ "keys": market_ids, "first": self.page_size }),
            )
            .await?;

        self.check_page("marketPositions", data.market_positions.items.len());
        info!(count = data.market_positions.items.len(), "Fetched market positions");
        Ok(data.market_positions.items)
    }

    /// Fetch depositor positions of a single vault, largest first.
    #[instrument(skip(self))]
    pub async fn fetch_vault_positions(
        &self,
        vault_address: &str,
    ) -> Result<Vec<VaultPositionRecord>, ApiError> {
        let data: VaultPositionsData = self
            .execute(
                VAULT_POSITIONS_QUERY,
                json!({ "vaults": [vault_address], "first": self.page_size }),
            )
            .await?;

        self.check_page("vaultPositions", data.vault_positions.items.len());
        debug!(count = data.vault_positions.items.len(), "Fetched vault positions");
        Ok(data.vault_positions.items)
    }
}

impl Default for MorphoClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsSource for MorphoClient {
    async fn markets(&self, market_ids: &[String]) -> Result<Vec<RawMarketRecord>, ApiError> {
        self.fetch_markets(market_ids).await
    }

    async fn liquidations(
        &self,
        market_ids: &[String],
    ) -> Result<Vec<LiquidationEvent>, ApiError> {
        self.fetch_liquidations(market_ids).await
    }

    async fn market_positions(
        &self,
        market_ids: &[String],
    ) -> Result<Vec<RawPositionRecord>, ApiError> {
        self.fetch_market_positions(market_ids).await
    }

    async fn vault_positions(
        &self,
        vault_address: &str,
    ) -> Result<Vec<VaultPositionRecord>, ApiError> {
        self.fetch_vault_positions(vault_address).await
    }
}

/// Decode a GraphQL envelope, surfacing its `errors` array.
fn decode_response<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    let envelope: GraphQlResponse<T> = serde_json::from_str(text)?;

    if !envelope.errors.is_empty() {
        return Err(ApiError::GraphQl(
            envelope.errors.into_iter().map(|e| e.message).collect(),
        ));
    }

    envelope.data.ok_or(ApiError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_markets_response() {
        let text = r#"{
            "data": {
                "markets": {
                    "items": [{
                        "uniqueKey": "0x9ec52d7195bafeba7137fa4d707a0f674a04a6d658c9066bcdbebc6d81eb0011",
                        "collateralPrice": "1000000000000000000000000000000000000",
                        "reallocatableLiquidityAssets": "2000000000000000000",
                        "state": {
                            "borrowAssetsUsd": 10.0,
                            "supplyAssetsUsd": 20.0,
                            "liquidityAssetsUsd": 10.0,
                            "collateralAssets": "0",
                            "collateralAssetsUsd": 0,
                            "utilization": 0.5,
                            "netSupplyApy": 0.01,
                            "netBorrowApy": 0.02
                        }
                    }]
                }
            }
        }"#;

        let data: MarketsData = decode_response(text).unwrap();
        assert_eq!(data.markets.items.len(), 1);
        assert_eq!(data.markets.items[0].state.collateral_assets_usd, Some(0.0));
    }

    #[test]
    fn test_decode_surfaces_graphql_errors() {
        let text = r#"{ "errors": [{ "message": "Cannot query field \"foo\"" }] }"#;
        let result: Result<MarketsData, _> = decode_response(text);
        assert!(matches!(result, Err(ApiError::GraphQl(ref msgs)) if msgs.len() == 1));
    }

    #[test]
    fn test_decode_missing_data() {
        let result: Result<MarketsData, _> = decode_response(r#"{ "data": null }"#);
        assert!(matches!(result, Err(ApiError::EmptyResponse)));
    }

    #[test]
    fn test_decode_rejects_malformed_body() {
        let result: Result<MarketsData, _> = decode_response("<html>gateway</html>");
        assert!(matches!(result, Err(ApiError::Decode(_))));
    }

    #[test]
    fn test_builder_clamps_retries() {
        let client = MorphoClient::with_url("http://localhost:4000/graphql")
            .with_retries(0)
            .with_page_size(100);
        assert_eq!(client.retries, 1);
        assert_eq!(client.page_size, 100);
        assert_eq!(client.url(), "http://localhost:4000/graphql");
    }

    #[test]
    fn test_full_page_detected() {
        let client = MorphoClient::new().with_page_size(3);
        assert!(!client.page_is_full(0));
        assert!(!client.page_is_full(2));
        assert!(client.page_is_full(3));
    }
}
