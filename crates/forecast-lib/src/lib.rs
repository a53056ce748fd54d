//! Suspension forecasting library
//!
//! This crate provides the core functionality for:
//! - Synthetic and pluggable suspension history sources
//! - ARIMA training, forecasting and backtesting
//! - Risk classification and recommendations
//! - A per-location result cache with single-flight retraining
//! - Health checks and observability

pub mod cache;
pub mod clock;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod source;

/// Service name reported in health responses and structured logs
pub const SERVICE_NAME: &str = "suspension-forecaster";

pub use cache::{CacheStats, ForecastCache, DEFAULT_TTL_SECS};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{PipelineError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::{ArimaEstimator, ArimaOrder, Pipeline, PipelineConfig, PipelineRunner};
pub use source::{EventSource, SyntheticConfig, SyntheticEventSource};
