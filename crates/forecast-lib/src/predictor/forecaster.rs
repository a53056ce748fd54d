//! Multi-step probability forecasts with confidence bounds

use super::classify::{classify_risk, confidence_band};
use super::trainer::FittedModel;
use crate::error::{PipelineError, Result};
use crate::models::ForecastPoint;
use chrono::Days;

/// Default two-sided interval level
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// Clip a value into the probability domain
fn clip_probability(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Forecast `horizon` days after the model's last training date
///
/// Point, lower and upper values are clipped to [0, 1] independently, so
/// near the domain edges the ordering `lower <= point <= upper` may not hold.
pub fn forecast(
    model: &FittedModel,
    horizon: usize,
    confidence_level: f64,
) -> Result<Vec<ForecastPoint>> {
    if horizon == 0 {
        return Err(PipelineError::Forecast(
            "horizon must be at least one day".to_string(),
        ));
    }

    let alpha = 1.0 - confidence_level;
    let raw = model
        .estimate()
        .forecast(horizon, alpha)
        .map_err(|e| PipelineError::Forecast(e.to_string()))?;
    if raw.mean.len() != horizon || raw.lower.len() != horizon || raw.upper.len() != horizon {
        return Err(PipelineError::Forecast(format!(
            "estimator returned {} points, expected {}",
            raw.mean.len(),
            horizon
        )));
    }

    (0..horizon)
        .map(|i| {
            let date = model
                .last_date
                .checked_add_days(Days::new(i as u64 + 1))
                .ok_or_else(|| PipelineError::Forecast("forecast date overflow".to_string()))?;
            let probability = clip_probability(raw.mean[i]);
            Ok(ForecastPoint {
                date,
                probability,
                risk_level: classify_risk(probability),
                confidence: confidence_band(i),
                lower_bound: clip_probability(raw.lower[i]),
                upper_bound: clip_probability(raw.upper[i]),
            })
        })
        .collect()
}
