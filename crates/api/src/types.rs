//! Wire schemas for Morpho Blue GraphQL responses.
//!
//! Fixed-point amounts are kept verbatim as [`RawAmount`] and only scaled by the
//! pipeline; USD figures are decoded to `f64` here. Fields the API may report
//! as `null` are modelled as `Option`.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

/// Single entry of a GraphQL `errors` array.
#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

/// Paginated list wrapper (`{ items: [...] }`).
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct MarketsData {
    pub markets: Page<RawMarketRecord>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsData {
    pub transactions: Page<TransactionItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketPositionsData {
    pub market_positions: Page<RawPositionRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultPositionsData {
    pub vault_positions: Page<VaultPositionRecord>,
}

/// Fixed-point integer amount exactly as the API reported it.
///
/// BigInt fields arrive as strings, but some endpoints emit plain JSON numbers;
/// both are accepted and kept as text until unit conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RawAmount(String);

impl RawAmount {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RawAmount {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl std::fmt::Display for RawAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RawAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrNumber {
            String(String),
            Unsigned(u64),
            Signed(i64),
            Float(f64),
        }

        Ok(match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::String(s) => Self(s),
            StringOrNumber::Unsigned(n) => Self(n.to_string()),
            StringOrNumber::Signed(n) => Self(n.to_string()),
            StringOrNumber::Float(n) => Self(n.to_string()),
        })
    }
}

/// Per-market snapshot from the `markets` query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMarketRecord {
    /// Market identifier (32-byte hex key)
    pub unique_key: String,

    /// Collateral oracle price, scaled by 10^36
    pub collateral_price: RawAmount,

    /// Liquidity reachable through vault reallocation, scaled by 10^18
    pub reallocatable_liquidity_assets: RawAmount,

    /// Current market state
    pub state: MarketState,
}

/// Nested `state` object of a market.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketState {
    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub borrow_assets_usd: f64,

    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub supply_assets_usd: f64,

    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub liquidity_assets_usd: f64,

    /// Collateral deposited, scaled by 10^18
    pub collateral_assets: RawAmount,

    /// Collateral USD value; not reported for every market
    #[serde(default, deserialize_with = "deserialize_optional_f64")]
    pub collateral_assets_usd: Option<f64>,

    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub utilization: f64,

    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub net_supply_apy: f64,

    #[serde(deserialize_with = "deserialize_f64_from_string")]
    pub net_borrow_apy: f64,
}

/// Wallet reference (`user { address }`).
#[derive(Debug, Clone, Deserialize)]
pub struct UserRef {
    #[serde(deserialize_with = "deserialize_address")]
    pub address: Address,
}

/// Asset reference carrying only its symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetRef {
    pub symbol: String,
}

/// Market reference inside position and transaction payloads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketRef {
    pub unique_key: String,
    #[serde(default)]
    pub collateral_asset: Option<AssetRef>,
}

/// One user's position in one market.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPositionRecord {
    /// Supplied loan assets, scaled by 10^18
    pub supply_assets: RawAmount,

    #[serde(default, deserialize_with = "deserialize_optional_f64")]
    pub supply_assets_usd: Option<f64>,

    /// Borrowed loan assets, scaled by 10^18
    pub borrow_assets: RawAmount,

    #[serde(default, deserialize_with = "deserialize_optional_f64")]
    pub borrow_assets_usd: Option<f64>,

    /// Posted collateral, scaled by 10^18
    pub collateral: RawAmount,

    #[serde(default, deserialize_with = "deserialize_optional_f64")]
    pub collateral_usd: Option<f64>,

    pub user: UserRef,

    pub market: MarketRef,
}

impl RawPositionRecord {
    /// Collateral symbol of the position's market, if reported.
    pub fn collateral_symbol(&self) -> Option<&str> {
        self.market
            .collateral_asset
            .as_ref()
            .map(|asset| asset.symbol.as_str())
    }
}

/// One user's deposit in a vault.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultPositionRecord {
    pub shares: RawAmount,

    pub assets: RawAmount,

    #[serde(default, deserialize_with = "deserialize_optional_f64")]
    pub assets_usd: Option<f64>,

    pub user: UserRef,
}

/// Transaction item from the `transactions` query.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionItem {
    #[serde(deserialize_with = "deserialize_u64_from_string")]
    pub block_number: u64,

    pub hash: String,

    #[serde(rename = "type")]
    pub kind: String,

    pub user: UserRef,

    pub data: LiquidationData,
}

/// `MarketLiquidationTransactionData` fragment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidationData {
    #[serde(default)]
    pub seized_assets: Option<RawAmount>,

    #[serde(default)]
    pub repaid_assets: Option<RawAmount>,

    #[serde(default, deserialize_with = "deserialize_optional_f64")]
    pub seized_assets_usd: Option<f64>,

    #[serde(default, deserialize_with = "deserialize_optional_f64")]
    pub repaid_assets_usd: Option<f64>,

    #[serde(default, deserialize_with = "deserialize_optional_f64")]
    pub bad_debt_assets_usd: Option<f64>,

    #[serde(deserialize_with = "deserialize_address")]
    pub liquidator: Address,

    pub market: MarketRef,
}

/// Flattened liquidation event consumed by the ledger builder.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidationEvent {
    pub block_number: u64,
    pub hash: String,
    /// Transaction type as reported by the API (`MarketLiquidation`)
    pub kind: String,
    /// Market identifier of the liquidated position
    pub market_id: String,
    /// Collateral value seized, in USD (0 when the API omits it)
    pub seized_usd: f64,
    pub repaid_usd: Option<f64>,
    pub bad_debt_usd: Option<f64>,
    /// Liquidated borrower
    pub user: Address,
    pub liquidator: Address,
}

impl From<TransactionItem> for LiquidationEvent {
    fn from(item: TransactionItem) -> Self {
        Self {
            block_number: item.block_number,
            hash: item.hash,
            kind: item.kind,
            market_id: item.data.market.unique_key,
            seized_usd: item.data.seized_assets_usd.unwrap_or(0.0),
            repaid_usd: item.data.repaid_assets_usd,
            bad_debt_usd: item.data.bad_debt_assets_usd,
            user: item.user.address,
            liquidator: item.data.liquidator,
        }
    }
}

// Custom deserializers

fn deserialize_address<'de, D>(deserializer: D) -> Result<Address, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

fn deserialize_u64_from_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(u64),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s.parse().map_err(serde::de::Error::custom),
        StringOrNumber::Number(n) => Ok(n),
    }
}

fn deserialize_f64_from_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(f64),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s.parse().map_err(serde::de::Error::custom),
        StringOrNumber::Number(n) => Ok(n),
    }
}

fn deserialize_optional_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(f64),
    }

    match Option::<StringOrNumber>::deserialize(deserializer)? {
        Some(StringOrNumber::String(s)) => {
            if s.is_empty() {
                Ok(None)
            } else {
                s.parse().map(Some).map_err(serde::de::Error::custom)
            }
        }
        Some(StringOrNumber::Number(n)) => Ok(Some(n)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_market() {
        let json = r#"{
            "uniqueKey": "0x3f4d007982a480dd99052c05d811cf6838ce61b2a2be8dc52fca107f783d1f15",
            "collateralPrice": "3412550000000000000000000000000000000000",
            "reallocatableLiquidityAssets": "125000000000000000000000",
            "state": {
                "borrowAssetsUsd": 812345.12,
                "supplyAssetsUsd": 1002345.5,
                "liquidityAssetsUsd": 190000.38,
                "collateralAssets": "402000000000000000000",
                "collateralAssetsUsd": null,
                "utilization": 0.8104,
                "netSupplyApy": 0.0712,
                "netBorrowApy": 0.0901
            }
        }"#;

        let market: RawMarketRecord = serde_json::from_str(json).unwrap();
        assert_eq!(
            market.collateral_price.as_str(),
            "3412550000000000000000000000000000000000"
        );
        assert!(market.state.collateral_assets_usd.is_none());
        assert!((market.state.utilization - 0.8104).abs() < 1e-12);
    }

    #[test]
    fn test_raw_amount_accepts_numbers() {
        let amount: RawAmount = serde_json::from_str("2000000000000000000").unwrap();
        assert_eq!(amount.as_str(), "2000000000000000000");

        let amount: RawAmount = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(amount.as_str(), "42");
    }

    #[test]
    fn test_deserialize_position_with_null_usd() {
        let json = r#"{
            "supplyAssets": "0",
            "supplyAssetsUsd": null,
            "borrowAssets": "1500000000000000000000",
            "borrowAssetsUsd": "1500.25",
            "collateral": "1000000000000000000",
            "collateralUsd": null,
            "user": { "address": "0x0af3318c4060eac02d50e140de2fb0e492b59ecb" },
            "market": {
                "uniqueKey": "0x6029eea874791e01e2f3ce361f2e08839cd18b1e26eea6243fa3e43fe8f6fa23",
                "collateralAsset": { "symbol": "wstETH" }
            }
        }"#;

        let position: RawPositionRecord = serde_json::from_str(json).unwrap();
        assert!(position.supply_assets_usd.is_none());
        assert_eq!(position.borrow_assets_usd, Some(1500.25));
        assert!(position.collateral_usd.is_none());
        assert_eq!(position.collateral_symbol(), Some("wstETH"));
    }

    #[test]
    fn test_liquidation_event_from_transaction() {
        let json = r#"{
            "blockNumber": "20512345",
            "hash": "0xabc",
            "type": "MarketLiquidation",
            "user": { "address": "0x0af3318c4060eac02d50e140de2fb0e492b59ecb" },
            "data": {
                "seizedAssets": "5000000000000000000",
                "repaidAssets": "12000000000000000000000",
                "seizedAssetsUsd": 12500.5,
                "repaidAssetsUsd": 12000.0,
                "badDebtAssetsUsd": null,
                "liquidator": "0x5555555555555555555555555555555555555555",
                "market": { "uniqueKey": "0x461da96754b33fec844fc5e5718bf24298a2c832d8216c5ffd17a5230548f01f" }
            }
        }"#;

        let item: TransactionItem = serde_json::from_str(json).unwrap();
        let event = LiquidationEvent::from(item);
        assert_eq!(event.block_number, 20_512_345);
        assert_eq!(event.kind, "MarketLiquidation");
        assert_eq!(
            event.market_id,
            "0x461da96754b33fec844fc5e5718bf24298a2c832d8216c5ffd17a5230548f01f"
        );
        assert!((event.seized_usd - 12500.5).abs() < 1e-9);
        assert!(event.bad_debt_usd.is_none());
    }

    #[test]
    fn test_graphql_envelope_with_errors() {
        let json = r#"{ "data": null, "errors": [{ "message": "rate limited" }] }"#;
        let response: GraphQlResponse<MarketsData> = serde_json::from_str(json).unwrap();
        assert!(response.data.is_none());
        assert_eq!(response.errors[0].message, "rate limited");
    }
}
