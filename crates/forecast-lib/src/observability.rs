//! Observability infrastructure for the suspension forecaster
//!
//! Provides:
//! - Prometheus metrics (training latency, cache hits/misses, trainings, failures)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for training latency (in seconds)
const TRAINING_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    training_latency_seconds: Histogram,
    cache_hits: IntCounter,
    cache_misses: IntCounter,
    trainings: IntCounter,
    pipeline_failures: IntCounterVec,
    cached_locations: IntGauge,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            training_latency_seconds: register_histogram!(
                "suspension_forecaster_training_latency_seconds",
                "Time spent running the forecasting pipeline for a location",
                TRAINING_BUCKETS.to_vec()
            )
            .expect("Failed to register training_latency_seconds"),

            cache_hits: register_int_counter!(
                "suspension_forecaster_cache_hits_total",
                "Requests served from a fresh cache entry"
            )
            .expect("Failed to register cache_hits"),

            cache_misses: register_int_counter!(
                "suspension_forecaster_cache_misses_total",
                "Requests that found no fresh cache entry"
            )
            .expect("Failed to register cache_misses"),

            trainings: register_int_counter!(
                "suspension_forecaster_trainings_total",
                "Completed pipeline trainings"
            )
            .expect("Failed to register trainings"),

            pipeline_failures: register_int_counter_vec!(
                "suspension_forecaster_pipeline_failures_total",
                "Pipeline runs that failed, by failure kind",
                &["kind"]
            )
            .expect("Failed to register pipeline_failures"),

            cached_locations: register_int_gauge!(
                "suspension_forecaster_cached_locations",
                "Number of locations with a cached forecast"
            )
            .expect("Failed to register cached_locations"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    /// Record how long a training run took
    pub fn observe_training_latency(&self, duration_secs: f64) {
        self.inner().training_latency_seconds.observe(duration_secs);
    }

    pub fn inc_cache_hits(&self) {
        self.inner().cache_hits.inc();
    }

    pub fn inc_cache_misses(&self) {
        self.inner().cache_misses.inc();
    }

    pub fn inc_trainings(&self) {
        self.inner().trainings.inc();
    }

    /// Count a failed run under its failure kind
    pub fn inc_pipeline_failures(&self, kind: &str) {
        self.inner()
            .pipeline_failures
            .with_label_values(&[kind])
            .inc();
    }

    pub fn set_cached_locations(&self, count: i64) {
        self.inner().cached_locations.set(count);
    }
}

/// Structured logger for service events
///
/// Emits one JSON event per significant occurrence, tagged with `event`.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, default_location: &str) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            default_location = %default_location,
            "Suspension forecaster started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Suspension forecaster shutting down"
        );
    }

    /// Log a completed training run
    pub fn log_model_trained(
        &self,
        location: &str,
        aic: f64,
        bic: f64,
        training_days: usize,
        accuracy: Option<f64>,
        duration_ms: u64,
    ) {
        info!(
            event = "model_trained",
            service = %self.service,
            location = %location,
            aic = aic,
            bic = bic,
            training_days = training_days,
            accuracy = ?accuracy,
            duration_ms = duration_ms,
            "Model trained and cached"
        );
    }

    /// Log a failed training run; any previous entry stays in place
    pub fn log_training_failed(&self, location: &str, kind: &str, error: &str, kept_previous: bool) {
        warn!(
            event = "training_failed",
            service = %self.service,
            location = %location,
            kind = %kind,
            error = %error,
            kept_previous = kept_previous,
            "Training failed"
        );
    }

    /// Log a request served from cache
    pub fn log_cache_hit(&self, location: &str, age_secs: i64) {
        info!(
            event = "cache_hit",
            service = %self.service,
            location = %location,
            age_secs = age_secs,
            "Using cached model"
        );
    }

    /// Log the outcome of startup warm-up
    pub fn log_cache_warmed(&self, location: &str, success: bool) {
        if success {
            info!(
                event = "cache_warmed",
                service = %self.service,
                location = %location,
                success = true,
                "Pre-trained model for default location"
            );
        } else {
            warn!(
                event = "cache_warmed",
                service = %self.service,
                location = %location,
                success = false,
                "Warm-up failed, default location will train on first request"
            );
        }
    }
}
