//! Core data models for the suspension forecaster

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One day of recorded history for a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    /// 1 if a suspension was issued that day, otherwise 0
    pub suspended: u8,
    /// mm/hour
    pub rainfall: f64,
    /// km/h
    pub wind_speed: f64,
}

/// Observation augmented with trailing moving averages of `suspended`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothedObservation {
    pub date: NaiveDate,
    pub suspended: u8,
    pub rainfall: f64,
    pub wind_speed: f64,
    pub ma3: f64,
    pub ma7: f64,
}

/// Ordinal risk classification of a suspension probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// High and critical days drive recommendations
    pub fn is_elevated(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

/// Qualitative confidence of a forecast point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceBand::High => "high",
            ConfidenceBand::Medium => "medium",
            ConfidenceBand::Low => "low",
        }
    }
}

/// One forecast day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub probability: f64,
    pub risk_level: RiskLevel,
    pub confidence: ConfidenceBand,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Recommended operational action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Monitor,
    MonitorClosely,
    Prepare,
    IssueNow,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Monitor => "monitor",
            Action::MonitorClosely => "monitor_closely",
            Action::Prepare => "prepare",
            Action::IssueNow => "issue_now",
        }
    }
}

/// Action and message synthesized from a forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: Action,
    pub message: String,
    /// Forecast points classified high or critical, in date order
    pub high_risk_days: Vec<ForecastPoint>,
}

/// Backtest of the model against the most recent days of history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub accuracy: f64,
    pub predictions: Vec<f64>,
    pub actuals: Vec<u8>,
}

/// Fit diagnostics reported with every result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub aic: f64,
    pub bic: f64,
    pub training_days: usize,
}

/// Consolidated output of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub forecast: Vec<ForecastPoint>,
    pub recommendation: Recommendation,
    pub accuracy: Option<AccuracyReport>,
    pub model_info: ModelInfo,
}

/// Published cache entry for one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub location: String,
    pub result: PipelineResult,
    pub last_trained_at: DateTime<Utc>,
}
