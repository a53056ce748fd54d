//! Series preprocessing
//!
//! Orders history by date and derives trailing moving averages of the
//! binary suspension signal. Windows shrink at the start of the series
//! instead of dropping samples.

use crate::error::{PipelineError, Result};
use crate::models::{Observation, SmoothedObservation};

/// Short smoothing window
pub const SHORT_WINDOW: usize = 3;

/// Long smoothing window, used as the training signal
pub const LONG_WINDOW: usize = 7;

/// Sort observations and attach 3- and 7-sample trailing means
pub fn preprocess(series: &[Observation]) -> Result<Vec<SmoothedObservation>> {
    if series.is_empty() {
        return Err(PipelineError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }

    let mut sorted = series.to_vec();
    sorted.sort_by_key(|o| o.date);

    let values: Vec<f64> = sorted.iter().map(|o| f64::from(o.suspended)).collect();
    let ma3 = trailing_mean(&values, SHORT_WINDOW);
    let ma7 = trailing_mean(&values, LONG_WINDOW);

    Ok(sorted
        .into_iter()
        .zip(ma3)
        .zip(ma7)
        .map(|((o, ma3), ma7)| SmoothedObservation {
            date: o.date,
            suspended: o.suspended,
            rainfall: o.rainfall,
            wind_speed: o.wind_speed,
            ma3,
            ma7,
        })
        .collect())
}

/// Trailing mean with a minimum window of one sample
pub fn trailing_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        let len = (i + 1).min(window);
        out.push(sum / len as f64);
    }
    out
}
