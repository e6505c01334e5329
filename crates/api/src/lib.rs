//! Morpho Blue API access for the lending metrics dashboard.
//!
//! This crate provides:
//! - MorphoClient: GraphQL client for markets, liquidations, market and vault positions
//! - Wire schemas with explicit optional fields for nullable API values
//! - MetricsSource: the seam the pipeline fetches through

mod error;
mod morpho;
mod source;
mod types;

pub use error::ApiError;
pub use morpho::{MorphoClient, DEFAULT_API_URL};
pub use source::MetricsSource;
pub use types::{
    AssetRef, LiquidationData, LiquidationEvent, MarketRef, MarketState, RawAmount,
    RawMarketRecord, RawPositionRecord, TransactionItem, UserRef, VaultPositionRecord,
};
