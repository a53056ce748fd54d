//! Service configuration

use anyhow::{ensure, Context, Result};
use forecast_lib::predictor::{ArimaOrder, PipelineConfig};
use forecast_lib::SyntheticConfig;
use serde::Deserialize;

/// Service configuration, read from `FORECAST_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// HTTP listen port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Location used when a request names none, and warmed at startup
    #[serde(default = "default_city")]
    pub default_city: String,

    /// Days of history per training run
    #[serde(default = "default_training_days")]
    pub training_days: usize,

    /// Forecast horizon in days
    #[serde(default = "default_horizon_days")]
    pub horizon_days: usize,

    /// Age in seconds after which a cached forecast is retrained
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: i64,

    #[serde(default = "default_synthetic_seed")]
    pub synthetic_seed: u64,

    #[serde(default = "default_clustering_probability")]
    pub clustering_probability: f64,

    /// Train the default city before accepting traffic
    #[serde(default = "default_warm_on_startup")]
    pub warm_on_startup: bool,
}

fn default_api_port() -> u16 {
    5000
}

fn default_city() -> String {
    "Batangas City".to_string()
}

fn default_training_days() -> usize {
    forecast_lib::predictor::DEFAULT_TRAINING_DAYS
}

fn default_horizon_days() -> usize {
    forecast_lib::predictor::DEFAULT_HORIZON
}

fn default_cache_ttl_secs() -> i64 {
    forecast_lib::DEFAULT_TTL_SECS
}

fn default_synthetic_seed() -> u64 {
    forecast_lib::source::DEFAULT_SEED
}

fn default_clustering_probability() -> f64 {
    SyntheticConfig::default().clustering_probability
}

fn default_warm_on_startup() -> bool {
    true
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            default_city: default_city(),
            training_days: default_training_days(),
            horizon_days: default_horizon_days(),
            cache_ttl_secs: default_cache_ttl_secs(),
            synthetic_seed: default_synthetic_seed(),
            clustering_probability: default_clustering_probability(),
            warm_on_startup: default_warm_on_startup(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("FORECAST").try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        Self::from_config(config)
    }

    /// Deserialize and validate an already-built configuration
    pub fn from_config(config: config::Config) -> Result<Self> {
        let parsed: Self = config
            .try_deserialize()
            .context("Invalid FORECAST_* configuration")?;
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            !self.default_city.trim().is_empty(),
            "default_city must not be empty"
        );
        ensure!(self.training_days > 0, "training_days must be positive");
        ensure!(self.horizon_days > 0, "horizon_days must be positive");
        ensure!(self.cache_ttl_secs > 0, "cache_ttl_secs must be positive");
        ensure!(
            (0.0..=1.0).contains(&self.clustering_probability),
            "clustering_probability must be within [0, 1]"
        );
        Ok(())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            training_days: self.training_days,
            horizon: self.horizon_days,
            order: ArimaOrder::default(),
            ..PipelineConfig::default()
        }
    }

    pub fn synthetic_config(&self) -> SyntheticConfig {
        SyntheticConfig {
            seed: self.synthetic_seed,
            clustering_probability: self.clustering_probability,
            ..SyntheticConfig::default()
        }
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_secs)
    }
}
