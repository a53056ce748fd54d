//! Integration tests for the forecast service API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use forecast_lib::{health::components, ManualClock};
use std::sync::Arc;
use suspension_service::{api::warm_up, create_router, AppState, ServiceConfig};
use tower::ServiceExt;

async fn setup_app(config: ServiceConfig) -> (Router, Arc<AppState>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 1, 17, 10, 30, 0).unwrap(),
    ));
    let state = Arc::new(AppState::build(config, clock).await);
    let router = create_router(state.clone());
    (router, state)
}

async fn setup_warm_app() -> (Router, Arc<AppState>) {
    let (router, state) = setup_app(ServiceConfig::default()).await;
    warm_up(&state).await;
    (router, state)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_json(app: Router, uri: &str, body: Option<&str>) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method("POST").uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_reports_service_and_components() {
    let (app, _state) = setup_app(ServiceConfig::default()).await;
    let (status, health) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["service"], "suspension-forecaster");
    assert!(health["timestamp"].is_string());
    assert!(health["components"][components::PIPELINE].is_object());
    assert!(health["components"][components::CACHE].is_object());
}

#[tokio::test]
async fn test_health_returns_503_when_unhealthy() {
    let (app, state) = setup_app(ServiceConfig::default()).await;
    state
        .health_registry
        .set_unhealthy(components::CACHE, "poisoned")
        .await;

    let (status, health) = get_json(app, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_waits_for_warm_up() {
    let (app, state) = setup_app(ServiceConfig::default()).await;
    let (status, readiness) = get_json(app.clone(), "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);

    warm_up(&state).await;
    let (status, readiness) = get_json(app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
    assert_eq!(state.cache.len(), 1);
}

#[tokio::test]
async fn test_failed_warm_up_degrades_but_serves() {
    let config = ServiceConfig {
        training_days: 10,
        ..ServiceConfig::default()
    };
    let (app, state) = setup_app(config).await;
    warm_up(&state).await;

    let (status, health) = get_json(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["components"][components::PIPELINE]["status"], "degraded");

    let (status, _) = get_json(app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert!(state.cache.is_empty());
}

#[tokio::test]
async fn test_forecast_default_city() {
    let (app, _state) = setup_warm_app().await;
    let (status, body) = get_json(app, "/api/predictions/suspension-forecast").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["city"], "Batangas City");
    assert_eq!(body["forecast"].as_array().unwrap().len(), 7);
    assert_eq!(body["forecast"][0]["date"], "2025-01-18");
    assert_eq!(body["model_info"]["training_days"], 90);
    assert!(body["accuracy"]["accuracy"].is_number());
    assert!(body["recommendation"]["action"].is_string());
    assert_eq!(body["generated_at"], "2025-01-17T10:30:00Z");
    assert_eq!(body["last_trained"], "2025-01-17T10:30:00Z");

    for point in body["forecast"].as_array().unwrap() {
        let p = point["probability"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&p));
    }
}

#[tokio::test]
async fn test_forecast_days_truncates_only() {
    let (app, state) = setup_warm_app().await;
    let (status, body) = get_json(
        app.clone(),
        "/api/predictions/suspension-forecast?days=3",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["forecast"].as_array().unwrap().len(), 3);

    // More days than the horizon is capped, and nothing retrains
    let (_, body) = get_json(app, "/api/predictions/suspension-forecast?days=30").await;
    assert_eq!(body["forecast"].as_array().unwrap().len(), 7);
    assert_eq!(state.cache.stats().trainings, 1);
}

#[tokio::test]
async fn test_forecast_normalizes_city() {
    let (app, state) = setup_app(ServiceConfig::default()).await;
    let (status, body) = get_json(
        app,
        "/api/predictions/suspension-forecast?city=%20%20Lipa%20%20%20City%20",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["city"], "Lipa City");
    assert!(state.cache.get("Lipa City").is_some());
}

#[tokio::test]
async fn test_forecast_rejects_blank_city() {
    let (app, state) = setup_app(ServiceConfig::default()).await;
    let (status, body) = get_json(app, "/api/predictions/suspension-forecast?city=%20%20").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_location");
    assert!(body["message"].is_string());
    assert!(state.cache.is_empty());
}

#[tokio::test]
async fn test_forecast_rejects_malformed_days() {
    let (app, _state) = setup_app(ServiceConfig::default()).await;
    let (status, body) = get_json(app, "/api/predictions/suspension-forecast?days=abc").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_forecast_insufficient_history_is_422() {
    let config = ServiceConfig {
        training_days: 10,
        ..ServiceConfig::default()
    };
    let (app, _state) = setup_app(config).await;
    let (status, body) = get_json(app, "/api/predictions/suspension-forecast").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "insufficient_data");
}

#[tokio::test]
async fn test_force_retrain_query_retrains() {
    let (app, state) = setup_warm_app().await;
    let (status, _) = get_json(
        app,
        "/api/predictions/suspension-forecast?force_retrain=TRUE",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.cache.stats().trainings, 2);
}

#[tokio::test]
async fn test_model_info_lists_cached_locations() {
    let (app, _state) = setup_warm_app().await;
    let _ = get_json(app.clone(), "/api/predictions/suspension-forecast?city=Lipa").await;

    let (status, body) = get_json(app, "/api/predictions/model-info").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_models"], 2);

    let models = body["models"].as_array().unwrap();
    assert_eq!(models[0]["city"], "Batangas City");
    assert_eq!(models[1]["city"], "Lipa");
    assert_eq!(models[0]["training_days"], 90);
    assert!(models[0]["aic"].is_number());
    assert!(models[0]["last_trained"].is_string());
}

#[tokio::test]
async fn test_retrain_with_city() {
    let (app, state) = setup_warm_app().await;
    let (status, body) = post_json(
        app,
        "/api/predictions/retrain",
        Some(r#"{"city": "Batangas City"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(
        body["message"],
        "Model retrained successfully for Batangas City"
    );
    assert!(body["trained_at"].is_string());
    assert_eq!(body["model_info"]["training_days"], 90);
    assert_eq!(state.cache.stats().trainings, 2);
}

#[tokio::test]
async fn test_retrain_without_body_uses_default_city() {
    let (app, state) = setup_app(ServiceConfig::default()).await;
    let (status, body) = post_json(app, "/api/predictions/retrain", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(state.cache.get("Batangas City").is_some());
}

#[tokio::test]
async fn test_retrain_rejects_malformed_body() {
    let (app, state) = setup_app(ServiceConfig::default()).await;

    for bad in [r#"{"city": 5}"#, "not json", r#"{"cty": "Lipa City"}"#] {
        let (status, body) = post_json(app.clone(), "/api/predictions/retrain", Some(bad)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", bad);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "bad_request");
        assert!(body["message"].is_string());
    }
    assert!(state.cache.is_empty());
    assert_eq!(state.cache.stats().trainings, 0);
}

#[tokio::test]
async fn test_retrain_rejects_blank_city() {
    let (app, state) = setup_app(ServiceConfig::default()).await;
    let (status, body) = post_json(
        app,
        "/api/predictions/retrain",
        Some(r#"{"city": "   "}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "invalid_location");
    assert!(state.cache.is_empty());
}

#[tokio::test]
async fn test_retrain_failure_payload() {
    let config = ServiceConfig {
        training_days: 10,
        ..ServiceConfig::default()
    };
    let (app, _state) = setup_app(config).await;
    let (status, body) = post_json(app, "/api/predictions/retrain", Some(r#"{}"#)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "insufficient_data");
}

#[tokio::test]
async fn test_self_test_endpoint_bypasses_cache() {
    let (app, state) = setup_app(ServiceConfig::default()).await;
    let (status, body) = get_json(app, "/api/predictions/test").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["sample_forecast"].as_array().unwrap().len(), 3);
    assert!(state.cache.is_empty());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _state) = setup_warm_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("suspension_forecaster_trainings_total"));
    assert!(text.contains("suspension_forecaster_training_latency_seconds"));
}
