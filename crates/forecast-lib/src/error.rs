//! Failure kinds surfaced by the forecasting pipeline

use thiserror::Error;

/// Errors produced while fetching history, training, or forecasting
///
/// Each variant is a distinct failure kind so callers can branch on it
/// instead of inspecting message text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Not enough history for the fixed model order
    #[error("Insufficient data: {actual} samples, need {required}")]
    InsufficientData { required: usize, actual: usize },

    /// The estimator could not fit the model
    #[error("Training failed: {0}")]
    Training(String),

    /// The fit succeeded but forecast or interval generation failed
    #[error("Forecast failed: {0}")]
    Forecast(String),

    /// The event source could not supply history
    #[error("Event source error: {0}")]
    Source(String),

    /// The location key was rejected at the boundary
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    /// The blocking pipeline task did not run to completion
    #[error("Pipeline interrupted: {0}")]
    Interrupted(String),
}

impl PipelineError {
    /// Stable snake_case tag for the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InsufficientData { .. } => "insufficient_data",
            PipelineError::Training(_) => "training_failure",
            PipelineError::Forecast(_) => "forecast_failure",
            PipelineError::Source(_) => "source_failure",
            PipelineError::InvalidLocation(_) => "invalid_location",
            PipelineError::Interrupted(_) => "interrupted",
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct() {
        let errors = [
            PipelineError::InsufficientData { required: 20, actual: 3 },
            PipelineError::Training("x".into()),
            PipelineError::Forecast("x".into()),
            PipelineError::Source("x".into()),
            PipelineError::InvalidLocation("x".into()),
            PipelineError::Interrupted("x".into()),
        ];
        let mut kinds: Vec<_> = errors.iter().map(|e| e.kind()).collect();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn test_insufficient_data_message() {
        let err = PipelineError::InsufficientData { required: 20, actual: 3 };
        assert_eq!(err.to_string(), "Insufficient data: 3 samples, need 20");
    }
}
