//! HTTP API for forecasts, model info, health checks and Prometheus metrics

use crate::config::ServiceConfig;
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use forecast_lib::{
    health::{components, HealthRegistry},
    predictor::{ArimaEstimator, Pipeline, PipelineRunner},
    AccuracyReport, CacheEntry, Clock, ForecastCache, ForecastPoint, ModelInfo, PipelineError,
    Recommendation, SyntheticEventSource,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// Longest accepted location key, in characters
pub const MAX_LOCATION_LEN: usize = 100;

/// History and horizon used by the quick self-test
const SELF_TEST_DAYS: usize = 30;
const SELF_TEST_HORIZON: usize = 3;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ForecastCache>,
    pub pipeline: Pipeline,
    pub health_registry: HealthRegistry,
    pub clock: Arc<dyn Clock>,
    pub config: ServiceConfig,
}

impl AppState {
    /// Wire the synthetic source, estimator, pipeline and cache together
    pub async fn build(config: ServiceConfig, clock: Arc<dyn Clock>) -> Self {
        let source = Arc::new(SyntheticEventSource::new(
            config.synthetic_config(),
            clock.clone(),
        ));
        let pipeline = Pipeline::new(
            source,
            Arc::new(ArimaEstimator::new()),
            clock.clone(),
            config.pipeline_config(),
        );
        let runner: Arc<dyn PipelineRunner> = Arc::new(pipeline.clone());
        let cache = Arc::new(ForecastCache::new(runner, clock.clone(), config.cache_ttl()));

        let health_registry = HealthRegistry::new(forecast_lib::SERVICE_NAME);
        health_registry.register(components::PIPELINE).await;
        health_registry.register(components::CACHE).await;

        Self {
            cache,
            pipeline,
            health_registry,
            clock,
            config,
        }
    }
}

/// Train the default location, then open readiness
///
/// A failed warm-up degrades the pipeline component but the service still
/// becomes ready; the location trains again on its first request.
pub async fn warm_up(state: &AppState) {
    if state.config.warm_on_startup {
        let city = &state.config.default_city;
        info!(city = %city, "Pre-training model for default location");
        match state.cache.warm(city).await {
            Ok(_) => state.health_registry.set_healthy(components::PIPELINE).await,
            Err(e) => {
                state
                    .health_registry
                    .set_degraded(components::PIPELINE, format!("warm-up failed: {}", e))
                    .await
            }
        }
    }
    state.health_registry.set_ready(true).await;
}

/// Serve `city` through the cache, then refresh the cache health component
async fn refresh(
    state: &AppState,
    city: &str,
    force: bool,
) -> forecast_lib::Result<Arc<CacheEntry>> {
    let outcome = state.cache.get_or_refresh(city, force).await;
    sync_cache_health(state).await;
    outcome
}

/// Degrade the cache component while any location is served from an older
/// model because its last retrain failed
pub async fn sync_cache_health(state: &AppState) {
    let degraded = state.cache.degraded_locations();
    if degraded.is_empty() {
        state.health_registry.set_healthy(components::CACHE).await;
        return;
    }

    let locations = degraded
        .iter()
        .map(|(location, e)| format!("{} ({})", location, e.kind()))
        .collect::<Vec<_>>()
        .join(", ");
    state
        .health_registry
        .set_degraded(
            components::CACHE,
            format!("retrain failed, serving previous model: {}", locations),
        )
        .await;
}

/// Trim, collapse inner whitespace and validate a location key
///
/// `None` falls back to `default`.
pub fn normalize_location(raw: Option<&str>, default: &str) -> Result<String, PipelineError> {
    let raw = raw.unwrap_or(default);
    if raw.chars().any(char::is_control) {
        return Err(PipelineError::InvalidLocation(
            "location must not contain control characters".to_string(),
        ));
    }

    let location = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if location.is_empty() {
        return Err(PipelineError::InvalidLocation(
            "location must not be empty".to_string(),
        ));
    }
    if location.chars().count() > MAX_LOCATION_LEN {
        return Err(PipelineError::InvalidLocation(format!(
            "location must be at most {} characters",
            MAX_LOCATION_LEN
        )));
    }
    Ok(location)
}

/// Error payload returned by every failing endpoint
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

/// Errors surfaced at the HTTP boundary
#[derive(Debug)]
pub enum ApiError {
    /// The query string or request body could not be parsed
    BadRequest(String),
    Pipeline(PipelineError),
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        ApiError::Pipeline(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(e) => pipeline_status(e),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Pipeline(e) => e.kind(),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(message) => message.clone(),
            ApiError::Pipeline(e) => e.to_string(),
        }
    }
}

fn pipeline_status(e: &PipelineError) -> StatusCode {
    match e {
        PipelineError::InvalidLocation(_) => StatusCode::BAD_REQUEST,
        PipelineError::InsufficientData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::Source(_) => StatusCode::BAD_GATEWAY,
        PipelineError::Training(_) | PipelineError::Forecast(_) | PipelineError::Interrupted(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind().to_string(),
            message: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Query parameters for the forecast endpoint
#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub city: Option<String>,
    pub days: Option<usize>,
    /// `true` in any letter case forces a retrain
    pub force_retrain: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub city: String,
    pub forecast: Vec<ForecastPoint>,
    pub recommendation: Recommendation,
    pub accuracy: Option<AccuracyReport>,
    pub model_info: ModelInfo,
    pub last_trained: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelSummary {
    pub city: String,
    pub last_trained: DateTime<Utc>,
    pub training_days: usize,
    pub accuracy: Option<f64>,
    pub aic: f64,
    pub bic: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelInfoResponse {
    pub models: Vec<ModelSummary>,
    pub total_models: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrainRequest {
    pub city: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RetrainResponse {
    pub success: bool,
    pub message: String,
    pub trained_at: DateTime<Utc>,
    pub model_info: ModelInfo,
}

/// Failed retrain; same status mapping as [`ApiError`] with `success: false`
struct RetrainFailure(ApiError);

impl From<ApiError> for RetrainFailure {
    fn from(e: ApiError) -> Self {
        RetrainFailure(e)
    }
}

impl From<PipelineError> for RetrainFailure {
    fn from(e: PipelineError) -> Self {
        RetrainFailure(ApiError::Pipeline(e))
    }
}

impl IntoResponse for RetrainFailure {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "error": self.0.kind(),
            "message": self.0.message(),
        });
        (self.0.status(), Json(body)).into_response()
    }
}

/// Parse a retrain body; an empty body retrains the default city
fn parse_retrain_request(body: &[u8]) -> Result<RetrainRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RetrainRequest::default());
    }
    Json::<RetrainRequest>::from_bytes(body)
        .map(|Json(request)| request)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = if health.status.is_operational() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn suspension_forecast(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ForecastQuery>, QueryRejection>,
) -> Result<Json<ForecastResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let city = normalize_location(query.city.as_deref(), &state.config.default_city)?;
    let days = query.days.unwrap_or(state.config.horizon_days);
    let force = query
        .force_retrain
        .as_deref()
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));

    let entry = refresh(&state, &city, force).await?;
    let result = &entry.result;
    let shown = days.min(result.forecast.len());

    Ok(Json(ForecastResponse {
        city,
        forecast: result.forecast[..shown].to_vec(),
        recommendation: result.recommendation.clone(),
        accuracy: result.accuracy.clone(),
        model_info: result.model_info.clone(),
        last_trained: entry.last_trained_at,
        generated_at: state.clock.now(),
    }))
}

async fn model_info(State(state): State<Arc<AppState>>) -> Json<ModelInfoResponse> {
    let models: Vec<ModelSummary> = state
        .cache
        .entries()
        .iter()
        .map(|entry| ModelSummary {
            city: entry.location.clone(),
            last_trained: entry.last_trained_at,
            training_days: entry.result.model_info.training_days,
            accuracy: entry.result.accuracy.as_ref().map(|a| a.accuracy),
            aic: entry.result.model_info.aic,
            bic: entry.result.model_info.bic,
        })
        .collect();

    Json(ModelInfoResponse {
        total_models: models.len(),
        models,
    })
}

async fn retrain(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<RetrainResponse>, RetrainFailure> {
    let request = parse_retrain_request(&body)?;
    let city = normalize_location(request.city.as_deref(), &state.config.default_city)?;

    info!(city = %city, "Force retraining model");
    let entry = refresh(&state, &city, true).await?;

    Ok(Json(RetrainResponse {
        success: true,
        message: format!("Model retrained successfully for {}", city),
        trained_at: entry.last_trained_at,
        model_info: entry.result.model_info.clone(),
    }))
}

/// Uncached quick run on a short history
async fn self_test(State(state): State<Arc<AppState>>) -> Response {
    let outcome = state
        .pipeline
        .run_with(&state.config.default_city, SELF_TEST_DAYS, SELF_TEST_HORIZON)
        .await;

    match outcome {
        Ok(result) => Json(serde_json::json!({
            "status": "success",
            "message": "Prediction test successful",
            "sample_forecast": result.forecast,
        }))
        .into_response(),
        Err(e) => {
            warn!(error = %e, kind = e.kind(), "Self-test failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "error",
                    "error": e.kind(),
                    "message": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/predictions/suspension-forecast", get(suspension_forecast))
        .route("/api/predictions/model-info", get(model_info))
        .route("/api/predictions/retrain", post(retrain))
        .route("/api/predictions/test", get(self_test))
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use forecast_lib::{ComponentStatus, ManualClock, PipelineResult};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Real pipeline that can be switched into failing
    struct FlakyRunner {
        inner: Pipeline,
        fail: AtomicBool,
    }

    #[async_trait]
    impl PipelineRunner for FlakyRunner {
        async fn run(&self, location: &str) -> forecast_lib::Result<PipelineResult> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(PipelineError::Source("event store unreachable".to_string()));
            }
            self.inner.run(location).await
        }
    }

    async fn flaky_state() -> (AppState, Arc<FlakyRunner>) {
        let config = ServiceConfig::default();
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 1, 17, 10, 30, 0).unwrap(),
        ));
        let pipeline = Pipeline::new(
            Arc::new(SyntheticEventSource::new(
                config.synthetic_config(),
                clock.clone(),
            )),
            Arc::new(ArimaEstimator::new()),
            clock.clone(),
            config.pipeline_config(),
        );
        let runner = Arc::new(FlakyRunner {
            inner: pipeline.clone(),
            fail: AtomicBool::new(false),
        });
        let health_registry = HealthRegistry::new(forecast_lib::SERVICE_NAME);
        health_registry.register(components::CACHE).await;

        let state = AppState {
            cache: Arc::new(ForecastCache::new(
                runner.clone(),
                clock.clone(),
                config.cache_ttl(),
            )),
            pipeline,
            health_registry,
            clock,
            config,
        };
        (state, runner)
    }

    #[tokio::test]
    async fn test_cache_health_follows_failed_retrains() {
        let (state, runner) = flaky_state().await;
        refresh(&state, "Lipa City", false).await.unwrap();

        runner.fail.store(true, Ordering::SeqCst);
        let err = refresh(&state, "Lipa City", true).await.unwrap_err();
        assert_eq!(err.kind(), "source_failure");

        let health = state.health_registry.health().await;
        let cache = &health.components[components::CACHE];
        assert_eq!(cache.status, ComponentStatus::Degraded);
        let message = cache.message.as_deref().unwrap();
        assert!(message.contains("Lipa City (source_failure)"), "{}", message);

        runner.fail.store(false, Ordering::SeqCst);
        refresh(&state, "Lipa City", true).await.unwrap();
        let health = state.health_registry.health().await;
        assert_eq!(
            health.components[components::CACHE].status,
            ComponentStatus::Healthy
        );
    }

    #[tokio::test]
    async fn test_failure_without_previous_entry_keeps_cache_healthy() {
        let (state, runner) = flaky_state().await;
        runner.fail.store(true, Ordering::SeqCst);
        refresh(&state, "Tanauan", false).await.unwrap_err();

        let health = state.health_registry.health().await;
        assert_eq!(
            health.components[components::CACHE].status,
            ComponentStatus::Healthy
        );
    }

    #[test]
    fn test_retrain_body_parsing() {
        assert!(parse_retrain_request(b"").unwrap().city.is_none());
        assert!(parse_retrain_request(b"  \n").unwrap().city.is_none());
        assert!(parse_retrain_request(b"{}").unwrap().city.is_none());
        assert_eq!(
            parse_retrain_request(br#"{"city": "Lipa City"}"#)
                .unwrap()
                .city
                .as_deref(),
            Some("Lipa City")
        );

        for bad in [
            &br#"{"city": 5}"#[..],
            b"not json",
            br#"{"cty": "Lipa City"}"#,
            b"null",
        ] {
            let err = parse_retrain_request(bad).unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
            assert_eq!(err.kind(), "bad_request");
        }
    }

    #[test]
    fn test_normalize_defaults_and_collapses() {
        assert_eq!(
            normalize_location(None, "Batangas City").unwrap(),
            "Batangas City"
        );
        assert_eq!(
            normalize_location(Some("  Lipa    City "), "Batangas City").unwrap(),
            "Lipa City"
        );
    }

    #[test]
    fn test_normalize_rejects_bad_keys() {
        for bad in ["", "   ", "Lipa\u{0}City", "Lipa\nCity"] {
            let err = normalize_location(Some(bad), "Batangas City").unwrap_err();
            assert_eq!(err.kind(), "invalid_location", "{:?}", bad);
        }
        let long = "x".repeat(MAX_LOCATION_LEN + 1);
        assert!(normalize_location(Some(&long), "Batangas City").is_err());
        let limit = "x".repeat(MAX_LOCATION_LEN);
        assert!(normalize_location(Some(&limit), "Batangas City").is_ok());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            pipeline_status(&PipelineError::InsufficientData {
                required: 20,
                actual: 3
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            pipeline_status(&PipelineError::Source("down".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            pipeline_status(&PipelineError::Training("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
