//! Pipeline error taxonomy.
//!
//! Only malformed input and outer-surface failures are errors. Unknown market
//! identifiers, missing cross-market prices, zero supply and empty batches are
//! handled inline and never reach this type.

use lending_metrics_api::ApiError;
use thiserror::Error;

use crate::units::NotNumeric;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid {field} for market {market}: {source}")]
    InvalidNumber {
        field: &'static str,
        market: String,
        #[source]
        source: NotNumeric,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data source error: {0}")]
    Source(#[from] ApiError),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub(crate) fn invalid_number(field: &'static str, market: &str, source: NotNumeric) -> Self {
        Self::InvalidNumber {
            field,
            market: market.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
