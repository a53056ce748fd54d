//! Historical event sources
//!
//! The pipeline reads history for a location through [`EventSource`]. The
//! only implementation today is a seeded synthetic generator standing in for
//! a persistent event store.

mod synthetic;

pub use synthetic::{SyntheticConfig, SyntheticEventSource, DEFAULT_SEED};

use crate::error::Result;
use crate::models::Observation;

pub use async_trait::async_trait;

/// Trait for history providers
///
/// Implementations must return one observation per calendar day, in
/// ascending date order, with no gaps.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch the most recent `days` observations for a location
    async fn fetch(&self, location: &str, days: usize) -> Result<Vec<Observation>>;
}
