//! Risk and confidence classification
//!
//! Both classifiers are pure functions over fixed thresholds.

use crate::models::{ConfidenceBand, RiskLevel};

/// Lower bound (inclusive) of each risk level, highest first
const RISK_THRESHOLDS: [(f64, RiskLevel); 3] = [
    (0.70, RiskLevel::Critical),
    (0.50, RiskLevel::High),
    (0.30, RiskLevel::Moderate),
];

/// Confidence of the first forecast day
pub const INITIAL_CONFIDENCE: f64 = 0.95;

/// Confidence lost per additional day of lead time
pub const CONFIDENCE_DECAY: f64 = 0.05;

/// Confidence never drops below this
pub const CONFIDENCE_FLOOR: f64 = 0.60;

/// Map a probability to a risk level; the highest matching threshold wins
pub fn classify_risk(probability: f64) -> RiskLevel {
    RISK_THRESHOLDS
        .iter()
        .find(|(threshold, _)| probability >= *threshold)
        .map(|(_, level)| *level)
        .unwrap_or(RiskLevel::Low)
}

/// Raw confidence for the forecast day at `horizon_index` (0-based)
pub fn raw_confidence(horizon_index: usize) -> f64 {
    (INITIAL_CONFIDENCE - CONFIDENCE_DECAY * horizon_index as f64).max(CONFIDENCE_FLOOR)
}

/// Confidence band for the forecast day at `horizon_index` (0-based)
pub fn confidence_band(horizon_index: usize) -> ConfidenceBand {
    let c = raw_confidence(horizon_index);
    if c > 0.80 {
        ConfidenceBand::High
    } else if c > 0.65 {
        ConfidenceBand::Medium
    } else {
        ConfidenceBand::Low
    }
}
