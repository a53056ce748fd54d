//! Hold-out backtest of the forecasting model
//!
//! Fits a fresh, disposable model on all but the last few days of history
//! and scores its thresholded forecast against what actually happened.
//! The primary model is never touched.

use super::trainer::Trainer;
use crate::error::{PipelineError, Result};
use crate::models::{AccuracyReport, SmoothedObservation};

/// Number of trailing days held out for the backtest
pub const DEFAULT_BACKTEST_WINDOW: usize = 7;

/// Forecast probability above which a day counts as a predicted suspension
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Backtest `trainer`'s configuration on the last `window` days of `series`
///
/// Returns `Ok(None)` when the series is shorter than the window.
pub fn evaluate(
    trainer: &Trainer,
    series: &[SmoothedObservation],
    window: usize,
) -> Result<Option<AccuracyReport>> {
    if window == 0 || series.len() < window {
        return Ok(None);
    }

    let (train, test) = series.split_at(series.len() - window);
    let model = trainer.train(train)?;

    let raw = model
        .estimate()
        .forecast(window, 0.05)
        .map_err(|e| PipelineError::Forecast(e.to_string()))?;
    let predictions: Vec<f64> = raw.mean.iter().map(|p| p.clamp(0.0, 1.0)).collect();
    let actuals: Vec<u8> = test.iter().map(|s| s.suspended).collect();

    let matches = predictions
        .iter()
        .zip(&actuals)
        .filter(|(p, a)| u8::from(**p > DECISION_THRESHOLD) == **a)
        .count();

    Ok(Some(AccuracyReport {
        accuracy: matches as f64 / window as f64,
        predictions,
        actuals,
    }))
}
