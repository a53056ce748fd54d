//! Suspension forecast service
//!
//! Serves ARIMA suspension forecasts over HTTP, caching one trained result
//! per location and warming the default location before taking traffic.

use anyhow::Result;
use forecast_lib::{observability::StructuredLogger, Clock, SystemClock};
use std::sync::Arc;
use suspension_service::{api, ServiceConfig};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = ServiceConfig::load()?;
    info!(
        port = config.api_port,
        default_city = %config.default_city,
        training_days = config.training_days,
        horizon_days = config.horizon_days,
        cache_ttl_secs = config.cache_ttl_secs,
        "Service configured"
    );

    let logger = StructuredLogger::new(forecast_lib::SERVICE_NAME);
    logger.log_startup(SERVICE_VERSION, &config.default_city);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = Arc::new(api::AppState::build(config.clone(), clock).await);

    api::warm_up(&state).await;

    let shutdown_logger = logger.clone();
    api::serve(config.api_port, state, async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => shutdown_logger.log_shutdown("SIGINT received"),
            Err(e) => shutdown_logger.log_shutdown(&format!("signal handler failed: {}", e)),
        }
    })
    .await?;

    info!("Shut down cleanly");
    Ok(())
}
