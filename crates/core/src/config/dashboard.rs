//! Configuration with TOML file and environment overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{PipelineError, Result};
use crate::positions::PositionThresholds;

/// Path of the TOML config file.
pub const CONFIG_PATH_ENV: &str = "DASHBOARD_CONFIG";
/// Overrides `api.url`.
pub const MORPHO_API_URL_ENV: &str = "MORPHO_API_URL";
/// Overrides `output.csv_path`.
pub const CSV_PATH_ENV: &str = "DASHBOARD_CSV_PATH";

/// Largest `output.round_decimals` an `f64` can meaningfully carry.
pub const MAX_ROUND_DECIMALS: u32 = 15;

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Morpho API transport settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Activity thresholds for positions and vault suppliers
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    /// Snapshot cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Presentation settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Morpho API transport settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// GraphQL endpoint
    #[serde(default = "default_api_url")]
    pub url: String,

    /// Total attempts per query
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// `first:` argument of list queries
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    lending_metrics_api::DEFAULT_API_URL.to_string()
}
fn default_retries() -> u32 {
    3
}
fn default_page_size() -> usize {
    500
}
fn default_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            retries: default_retries(),
            page_size: default_page_size(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Activity thresholds (USD).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Borrow USD above which a position counts as an active borrower (strict)
    #[serde(default = "default_active_borrower")]
    pub active_borrower_usd: f64,

    /// Supply or borrow USD at or above which a position counts as a participant
    #[serde(default = "default_active_participant")]
    pub active_participant_usd: f64,

    /// Vault deposit USD above which a depositor counts as a supplier (strict)
    #[serde(default = "default_active_supplier")]
    pub active_supplier_usd: f64,
}

fn default_active_borrower() -> f64 {
    crate::positions::ACTIVE_BORROWER_MIN_USD
}
fn default_active_participant() -> f64 {
    crate::positions::ACTIVE_PARTICIPANT_MIN_USD
}
fn default_active_supplier() -> f64 {
    crate::suppliers::ACTIVE_SUPPLIER_MIN_USD
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            active_borrower_usd: default_active_borrower(),
            active_participant_usd: default_active_participant(),
            active_supplier_usd: default_active_supplier(),
        }
    }
}

impl ThresholdConfig {
    pub fn positions(&self) -> PositionThresholds {
        PositionThresholds {
            active_borrower_usd: self.active_borrower_usd,
            active_participant_usd: self.active_participant_usd,
        }
    }
}

/// Snapshot cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a fetched snapshot is reused (seconds)
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
}

fn default_ttl() -> u64 {
    3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Presentation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Decimal places kept in the final tables
    #[serde(default = "default_round_decimals")]
    pub round_decimals: u32,

    /// Where to write the market CSV, if anywhere
    #[serde(default)]
    pub csv_path: Option<String>,

    /// Where to write the joined presentation table CSV, if anywhere
    #[serde(default)]
    pub final_csv_path: Option<String>,
}

fn default_round_decimals() -> u32 {
    4
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            round_decimals: default_round_decimals(),
            csv_path: None,
            final_csv_path: None,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            thresholds: ThresholdConfig::default(),
            cache: CacheConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| PipelineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `DASHBOARD_CONFIG` if set, else defaults, then apply
    /// `MORPHO_API_URL` and `DASHBOARD_CSV_PATH` overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(url) = std::env::var(MORPHO_API_URL_ENV) {
            config.api.url = url;
        }
        if let Ok(path) = std::env::var(CSV_PATH_ENV) {
            config.output.csv_path = Some(path);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.api.url.trim().is_empty() {
            return Err(PipelineError::Config("api.url must not be empty".to_string()));
        }
        if self.api.page_size == 0 {
            return Err(PipelineError::Config("api.page_size must be positive".to_string()));
        }
        let t = &self.thresholds;
        if !(t.active_borrower_usd.is_finite()
            && t.active_participant_usd.is_finite()
            && t.active_supplier_usd.is_finite())
        {
            return Err(PipelineError::Config("thresholds must be finite".to_string()));
        }
        // Every active borrower must also count as a participant.
        if t.active_participant_usd > t.active_borrower_usd {
            return Err(PipelineError::Config(format!(
                "thresholds.active_participant_usd ({}) must not exceed thresholds.active_borrower_usd ({})",
                t.active_participant_usd, t.active_borrower_usd
            )));
        }
        if self.output.round_decimals > MAX_ROUND_DECIMALS {
            return Err(PipelineError::Config(format!(
                "output.round_decimals must be at most {MAX_ROUND_DECIMALS}"
            )));
        }
        Ok(())
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        tracing::info!(
            url = %self.api.url,
            retries = self.api.retries,
            page_size = self.api.page_size,
            timeout_secs = self.api.timeout_secs,
            "Morpho API settings"
        );
        tracing::info!(
            active_borrower_usd = self.thresholds.active_borrower_usd,
            active_participant_usd = self.thresholds.active_participant_usd,
            active_supplier_usd = self.thresholds.active_supplier_usd,
            "Activity thresholds"
        );
        tracing::info!(
            ttl_secs = self.cache.ttl_secs,
            round_decimals = self.output.round_decimals,
            csv_path = ?self.output.csv_path,
            final_csv_path = ?self.output.final_csv_path,
            "Cache and output settings"
        );
    }
}
