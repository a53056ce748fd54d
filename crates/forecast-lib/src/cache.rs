//! Per-location forecast cache
//!
//! Holds the last pipeline result for every location and decides between
//! reuse and retraining. The freshness check, the pipeline run and the
//! publish happen under one lock per location, so concurrent requests for
//! the same stale key share a single training run. Different locations
//! never wait on each other.

use crate::clock::Clock;
use crate::error::{PipelineError, Result};
use crate::models::CacheEntry;
use crate::observability::{ServiceMetrics, StructuredLogger};
use crate::predictor::PipelineRunner;
use crate::SERVICE_NAME;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::debug;

/// Age after which a cached result is retrained (6 hours)
pub const DEFAULT_TTL_SECS: i64 = 6 * 60 * 60;

/// Training slot for one location
#[derive(Default)]
struct Flight {
    /// Runs finished under this slot, successful or not
    completed: AtomicU64,
    /// Error of the most recent run, `None` if it succeeded
    last_failure: Mutex<Option<PipelineError>>,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    trainings: AtomicU64,
    failures: AtomicU64,
}

/// Point-in-time cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub trainings: u64,
    pub failures: u64,
    pub cached_locations: usize,
}

/// Time-bounded, single-flight cache in front of a [`PipelineRunner`]
pub struct ForecastCache {
    runner: Arc<dyn PipelineRunner>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    /// Published entries; replaced whole, never mutated in place
    entries: DashMap<String, Arc<CacheEntry>>,
    flights: DashMap<String, Arc<Flight>>,
    /// Locations whose last retrain failed while an older entry is still served
    degraded: DashMap<String, PipelineError>,
    counters: Counters,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
}

impl ForecastCache {
    pub fn new(runner: Arc<dyn PipelineRunner>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            runner,
            clock,
            ttl,
            entries: DashMap::new(),
            flights: DashMap::new(),
            degraded: DashMap::new(),
            counters: Counters::default(),
            metrics: ServiceMetrics::new(),
            logger: StructuredLogger::new(SERVICE_NAME),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether `entry` is older than the TTL at `now`
    pub fn is_stale(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.last_trained_at > self.ttl
    }

    /// Return the cached result for `location`, training first if the entry
    /// is missing, stale, or `force` is set
    ///
    /// Callers that arrive while a run for the same location is in progress
    /// wait for it and receive its outcome, including its error. A failed
    /// run leaves the previously published entry in place.
    pub async fn get_or_refresh(&self, location: &str, force: bool) -> Result<Arc<CacheEntry>> {
        if !force {
            let now = self.clock.now();
            if let Some(entry) = self.fresh(location, now) {
                self.record_hit(&entry, now);
                return Ok(entry);
            }
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        self.metrics.inc_cache_misses();

        let flight = self
            .flights
            .entry(location.to_string())
            .or_default()
            .value()
            .clone();
        let seen = flight.completed.load(Ordering::Acquire);
        let mut last_failure = flight.last_failure.lock().await;

        if flight.completed.load(Ordering::Acquire) != seen {
            // Another caller ran the pipeline while we waited for the slot
            if let Some(error) = last_failure.as_ref() {
                return Err(error.clone());
            }
            if let Some(entry) = self.get(location) {
                debug!(location = %location, "Joined in-flight training");
                self.record_hit(&entry, self.clock.now());
                return Ok(entry);
            }
        } else if !force {
            let now = self.clock.now();
            if let Some(entry) = self.fresh(location, now) {
                self.record_hit(&entry, now);
                return Ok(entry);
            }
        }

        let started = Instant::now();
        let outcome = self.runner.run(location).await;
        let elapsed = started.elapsed();
        self.metrics.observe_training_latency(elapsed.as_secs_f64());

        let published = match outcome {
            Ok(result) => {
                let entry = Arc::new(CacheEntry {
                    location: location.to_string(),
                    result,
                    last_trained_at: self.clock.now(),
                });
                self.entries.insert(location.to_string(), entry.clone());
                self.degraded.remove(location);
                *last_failure = None;

                self.counters.trainings.fetch_add(1, Ordering::Relaxed);
                self.metrics.inc_trainings();
                self.metrics.set_cached_locations(self.entries.len() as i64);
                self.logger.log_model_trained(
                    location,
                    entry.result.model_info.aic,
                    entry.result.model_info.bic,
                    entry.result.model_info.training_days,
                    entry.result.accuracy.as_ref().map(|a| a.accuracy),
                    elapsed.as_millis() as u64,
                );
                Ok(entry)
            }
            Err(error) => {
                *last_failure = Some(error.clone());

                let kept_previous = self.entries.contains_key(location);
                if kept_previous {
                    self.degraded.insert(location.to_string(), error.clone());
                }

                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                self.metrics.inc_pipeline_failures(error.kind());
                self.logger.log_training_failed(
                    location,
                    error.kind(),
                    &error.to_string(),
                    kept_previous,
                );
                Err(error)
            }
        };

        flight.completed.fetch_add(1, Ordering::Release);
        published
    }

    /// Train `location` ahead of traffic
    pub async fn warm(&self, location: &str) -> Result<Arc<CacheEntry>> {
        let outcome = self.get_or_refresh(location, false).await;
        self.logger.log_cache_warmed(location, outcome.is_ok());
        outcome
    }

    /// Published entry for `location`, regardless of age
    pub fn get(&self, location: &str) -> Option<Arc<CacheEntry>> {
        self.entries.get(location).map(|r| r.value().clone())
    }

    /// Snapshot of every published entry, ordered by location
    pub fn entries(&self) -> Vec<Arc<CacheEntry>> {
        let mut entries: Vec<_> = self.entries.iter().map(|r| r.value().clone()).collect();
        entries.sort_by(|a, b| a.location.cmp(&b.location));
        entries
    }

    /// Locations still served from an older entry after their last retrain
    /// failed, ordered by location
    pub fn degraded_locations(&self) -> Vec<(String, PipelineError)> {
        let mut degraded: Vec<_> = self
            .degraded
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        degraded.sort_by(|a, b| a.0.cmp(&b.0));
        degraded
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            trainings: self.counters.trainings.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            cached_locations: self.entries.len(),
        }
    }

    fn fresh(&self, location: &str, now: DateTime<Utc>) -> Option<Arc<CacheEntry>> {
        self.get(location).filter(|entry| !self.is_stale(entry, now))
    }

    fn record_hit(&self, entry: &CacheEntry, now: DateTime<Utc>) {
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        self.metrics.inc_cache_hits();
        self.logger
            .log_cache_hit(&entry.location, (now - entry.last_trained_at).num_seconds());
    }
}
