//! End-to-end forecasting pipeline
//!
//! fetch -> preprocess -> train -> forecast -> classify -> recommend ->
//! backtest. Fetching is async; everything after it is CPU-bound and runs
//! on the blocking thread pool. Any failure before the backtest aborts the
//! run without a partial result.

use super::accuracy::{evaluate, DEFAULT_BACKTEST_WINDOW};
use super::arima::{ArimaOrder, Estimator};
use super::forecaster::{forecast, DEFAULT_CONFIDENCE_LEVEL};
use super::preprocess::preprocess;
use super::recommend::recommend;
use super::trainer::Trainer;
use crate::clock::Clock;
use crate::error::{PipelineError, Result};
use crate::models::{ModelInfo, Observation, PipelineResult};
use crate::source::EventSource;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Days of history used for training
pub const DEFAULT_TRAINING_DAYS: usize = 90;

/// Days forecast per run
pub const DEFAULT_HORIZON: usize = 7;

/// Configuration for a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Days of history fetched per run
    pub training_days: usize,
    /// Forecast horizon in days
    pub horizon: usize,
    /// Fixed model order
    pub order: ArimaOrder,
    /// Two-sided interval level for forecast bounds
    pub confidence_level: f64,
    /// Trailing days held out for the accuracy backtest
    pub backtest_window: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            training_days: DEFAULT_TRAINING_DAYS,
            horizon: DEFAULT_HORIZON,
            order: ArimaOrder::default(),
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            backtest_window: DEFAULT_BACKTEST_WINDOW,
        }
    }
}

/// Anything that can produce a consolidated result for a location
#[async_trait]
pub trait PipelineRunner: Send + Sync {
    async fn run(&self, location: &str) -> Result<PipelineResult>;
}

/// The forecasting pipeline
#[derive(Clone)]
pub struct Pipeline {
    source: Arc<dyn EventSource>,
    estimator: Arc<dyn Estimator>,
    clock: Arc<dyn Clock>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn EventSource>,
        estimator: Arc<dyn Estimator>,
        clock: Arc<dyn Clock>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            estimator,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run with explicit history length and horizon
    pub async fn run_with(
        &self,
        location: &str,
        days: usize,
        horizon: usize,
    ) -> Result<PipelineResult> {
        let start = Instant::now();
        info!(
            location = %location,
            training_days = days,
            horizon = horizon,
            order = %self.config.order,
            "Starting suspension forecast pipeline"
        );

        let series = self.source.fetch(location, days).await?;
        debug!(location = %location, samples = series.len(), "Loaded history");

        let trainer = Trainer::new(self.estimator.clone(), self.config.order);
        let confidence_level = self.config.confidence_level;
        let backtest_window = self.config.backtest_window;
        let now = self.clock.now();
        let owned_location = location.to_string();

        let result = tokio::task::spawn_blocking(move || {
            compute(
                &owned_location,
                &trainer,
                &series,
                horizon,
                confidence_level,
                backtest_window,
                now,
            )
        })
        .await
        .map_err(|e| PipelineError::Interrupted(e.to_string()))??;

        info!(
            location = %location,
            action = result.recommendation.action.as_str(),
            aic = result.model_info.aic,
            bic = result.model_info.bic,
            accuracy = ?result.accuracy.as_ref().map(|a| a.accuracy),
            duration_ms = start.elapsed().as_millis() as u64,
            "Pipeline completed"
        );

        Ok(result)
    }
}

#[async_trait]
impl PipelineRunner for Pipeline {
    async fn run(&self, location: &str) -> Result<PipelineResult> {
        self.run_with(location, self.config.training_days, self.config.horizon)
            .await
    }
}

/// The synchronous, CPU-bound part of a run
fn compute(
    location: &str,
    trainer: &Trainer,
    series: &[Observation],
    horizon: usize,
    confidence_level: f64,
    backtest_window: usize,
    now: DateTime<Utc>,
) -> Result<PipelineResult> {
    let smoothed = preprocess(series)?;
    let model = trainer.train(&smoothed)?;
    let points = forecast(&model, horizon, confidence_level)?;
    let recommendation = recommend(&points, now);

    // Backtest is best-effort and uses its own model
    let accuracy = match evaluate(trainer, &smoothed, backtest_window) {
        Ok(report) => report,
        Err(e) => {
            warn!(location = %location, error = %e, kind = e.kind(), "Accuracy backtest unavailable");
            None
        }
    };

    Ok(PipelineResult {
        forecast: points,
        recommendation,
        accuracy,
        model_info: ModelInfo {
            aic: model.aic,
            bic: model.bic,
            training_days: model.training_samples,
        },
    })
}
