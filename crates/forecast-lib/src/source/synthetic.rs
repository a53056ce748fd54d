//! Seeded synthetic suspension history
//!
//! Produces a seasonally modulated suspension signal with short-run
//! clustering and log-normal weather covariates. A fixed seed yields
//! identical values for an identical number of days.

use super::{async_trait, EventSource};
use crate::clock::Clock;
use crate::error::{PipelineError, Result};
use crate::models::Observation;
use chrono::Days;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal, Normal};
use std::f64::consts::PI;
use std::sync::Arc;
use tracing::debug;

/// Seed used when none is configured
pub const DEFAULT_SEED: u64 = 42;

/// Shape of the generated signal
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub seed: u64,
    /// Baseline daily suspension probability
    pub base_probability: f64,
    /// Amplitude of the seasonal term (two full cycles over the series)
    pub seasonal_amplitude: f64,
    /// Standard deviation of the gaussian noise added to the probability
    pub noise_std_dev: f64,
    /// Chance that a suspended day is followed by another suspended day
    pub clustering_probability: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            base_probability: 0.15,
            seasonal_amplitude: 0.2,
            noise_std_dev: 0.1,
            clustering_probability: 0.4,
        }
    }
}

/// Synthetic stand-in for a persistent event store
pub struct SyntheticEventSource {
    config: SyntheticConfig,
    clock: Arc<dyn Clock>,
}

impl SyntheticEventSource {
    pub fn new(config: SyntheticConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    /// Generate `days` consecutive observations ending today
    pub fn generate(&self, days: usize) -> Result<Vec<Observation>> {
        if days == 0 {
            return Err(PipelineError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        let cfg = &self.config;
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let noise = Normal::new(0.0, cfg.noise_std_dev)
            .map_err(|e| PipelineError::Source(format!("noise distribution: {}", e)))?;
        let rainfall_dist = LogNormal::new(2.0, 1.0)
            .map_err(|e| PipelineError::Source(format!("rainfall distribution: {}", e)))?;
        let wind_dist = LogNormal::new(3.0, 0.5)
            .map_err(|e| PipelineError::Source(format!("wind distribution: {}", e)))?;

        let step = if days > 1 {
            4.0 * PI / (days - 1) as f64
        } else {
            0.0
        };
        let noise_draws: Vec<f64> = (0..days).map(|_| noise.sample(&mut rng)).collect();
        let probabilities: Vec<f64> = noise_draws
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let seasonal = (i as f64 * step).sin() * cfg.seasonal_amplitude + 0.2;
                (cfg.base_probability + seasonal + n).clamp(0.0, 1.0)
            })
            .collect();

        let mut suspended: Vec<u8> = probabilities
            .iter()
            .map(|p| u8::from(rng.gen::<f64>() < *p))
            .collect();

        // Suspensions cluster: a suspended day may carry over to the next
        for i in 1..days {
            if suspended[i - 1] == 1 && rng.gen::<f64>() < cfg.clustering_probability {
                suspended[i] = 1;
            }
        }

        let rain: Vec<f64> = (0..days).map(|_| rainfall_dist.sample(&mut rng)).collect();
        let wind: Vec<f64> = (0..days).map(|_| wind_dist.sample(&mut rng)).collect();

        let end = self.clock.now().date_naive();
        let start = end
            .checked_sub_days(Days::new((days - 1) as u64))
            .ok_or_else(|| PipelineError::Source(format!("cannot go back {} days", days)))?;

        let mut observations = Vec::with_capacity(days);
        for i in 0..days {
            let date = start
                .checked_add_days(Days::new(i as u64))
                .ok_or_else(|| PipelineError::Source("date overflow".to_string()))?;
            observations.push(Observation {
                date,
                suspended: suspended[i],
                rainfall: rain[i],
                wind_speed: wind[i],
            });
        }

        debug!(
            days = days,
            suspended_days = suspended.iter().filter(|s| **s == 1).count(),
            "Generated synthetic history"
        );

        Ok(observations)
    }
}

#[async_trait]
impl EventSource for SyntheticEventSource {
    async fn fetch(&self, _location: &str, days: usize) -> Result<Vec<Observation>> {
        self.generate(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn source(seed: u64) -> SyntheticEventSource {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 17, 10, 30, 0).unwrap());
        SyntheticEventSource::new(
            SyntheticConfig {
                seed,
                ..Default::default()
            },
            Arc::new(clock),
        )
    }

    #[test]
    fn test_series_ends_today_without_gaps() {
        let series = source(DEFAULT_SEED).generate(90).unwrap();
        assert_eq!(series.len(), 90);
        assert_eq!(
            series.last().unwrap().date,
            NaiveDate::from_ymd_opt(2025, 1, 17).unwrap()
        );
        for pair in series.windows(2) {
            assert_eq!((pair[1].date - pair[0].date).num_days(), 1);
        }
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let a = source(7).generate(60).unwrap();
        let b = source(7).generate(60).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_values_in_domain() {
        let series = source(DEFAULT_SEED).generate(120).unwrap();
        assert!(series.iter().all(|o| o.suspended <= 1));
        assert!(series.iter().all(|o| o.rainfall > 0.0 && o.wind_speed > 0.0));
        assert!(series.iter().any(|o| o.suspended == 1));
    }

    #[test]
    fn test_single_day() {
        let series = source(DEFAULT_SEED).generate(1).unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_zero_days_rejected() {
        let err = source(DEFAULT_SEED).generate(0).unwrap_err();
        assert_eq!(err.kind(), "insufficient_data");
    }

    #[tokio::test]
    async fn test_fetch_ignores_location() {
        let src = source(DEFAULT_SEED);
        let a = src.fetch("Batangas City", 30).await.unwrap();
        let b = src.fetch("Lipa City", 30).await.unwrap();
        assert_eq!(a, b);
    }
}
