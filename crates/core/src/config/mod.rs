//! Dashboard configuration.
//!
//! This module provides:
//! - API endpoint and transport settings
//! - Position and vault activity thresholds
//! - Snapshot cache lifetime
//! - Output rounding and CSV export location

mod dashboard;

pub use dashboard::{
    ApiConfig, CacheConfig, DashboardConfig, OutputConfig, ThresholdConfig, CONFIG_PATH_ENV,
    CSV_PATH_ENV, MAX_ROUND_DECIMALS, MORPHO_API_URL_ENV,
};
