//! HTTP front end for the suspension forecaster
//!
//! Split from the binary so integration tests can drive the real router.

pub mod api;
pub mod config;

pub use api::{create_router, normalize_location, AppState};
pub use config::ServiceConfig;
