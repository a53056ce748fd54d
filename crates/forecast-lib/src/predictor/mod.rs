//! Suspension forecasting engine

mod accuracy;
mod arima;
mod classify;
mod forecaster;
mod linalg;
mod pipeline;
mod preprocess;
mod recommend;
mod trainer;

pub use accuracy::{evaluate, DECISION_THRESHOLD, DEFAULT_BACKTEST_WINDOW};
pub use arima::{
    difference, ArimaEstimator, ArimaFit, ArimaOrder, Estimator, EstimatorError, FittedEstimate,
    IntervalForecast,
};
pub use classify::{
    classify_risk, confidence_band, raw_confidence, CONFIDENCE_DECAY, CONFIDENCE_FLOOR,
    INITIAL_CONFIDENCE,
};
pub use forecaster::{forecast, DEFAULT_CONFIDENCE_LEVEL};
pub use pipeline::{
    Pipeline, PipelineConfig, PipelineRunner, DEFAULT_HORIZON, DEFAULT_TRAINING_DAYS,
};
pub use preprocess::{preprocess, trailing_mean, LONG_WINDOW, SHORT_WINDOW};
pub use recommend::{days_until, decide, recommend, IMMEDIATE_WINDOW_DAYS};
pub use trainer::{FittedModel, Trainer};
