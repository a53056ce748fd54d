//! Model training on the smoothed suspension signal

use super::arima::{ArimaOrder, Estimator, EstimatorError, FittedEstimate};
use crate::error::{PipelineError, Result};
use crate::models::SmoothedObservation;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// A trained model plus the diagnostics reported alongside forecasts
#[derive(Debug)]
pub struct FittedModel {
    estimate: Box<dyn FittedEstimate>,
    pub order: ArimaOrder,
    pub aic: f64,
    pub bic: f64,
    /// Number of daily samples the model was trained on
    pub training_samples: usize,
    /// Date of the last training sample; forecasts start the day after
    pub last_date: NaiveDate,
}

impl FittedModel {
    pub fn estimate(&self) -> &dyn FittedEstimate {
        self.estimate.as_ref()
    }
}

/// Fits the fixed-order model to the 7-day moving average
#[derive(Clone)]
pub struct Trainer {
    estimator: Arc<dyn Estimator>,
    order: ArimaOrder,
}

impl Trainer {
    pub fn new(estimator: Arc<dyn Estimator>, order: ArimaOrder) -> Self {
        Self { estimator, order }
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    /// Train on the series' `ma7` signal
    pub fn train(&self, series: &[SmoothedObservation]) -> Result<FittedModel> {
        let last_date = series
            .last()
            .map(|s| s.date)
            .ok_or(PipelineError::InsufficientData {
                required: self.order.min_observations(),
                actual: 0,
            })?;

        let start = Instant::now();
        let signal: Vec<f64> = series.iter().map(|s| s.ma7).collect();
        let estimate = self
            .estimator
            .fit(&signal, self.order)
            .map_err(training_error)?;

        let (aic, bic) = (estimate.aic(), estimate.bic());
        debug!(
            order = %self.order,
            samples = series.len(),
            aic = aic,
            bic = bic,
            duration_ms = start.elapsed().as_millis() as u64,
            "Model fitted"
        );

        Ok(FittedModel {
            estimate,
            order: self.order,
            aic,
            bic,
            training_samples: series.len(),
            last_date,
        })
    }
}

fn training_error(err: EstimatorError) -> PipelineError {
    match err {
        EstimatorError::InsufficientData { required, actual } => {
            PipelineError::InsufficientData { required, actual }
        }
        other => PipelineError::Training(other.to_string()),
    }
}
