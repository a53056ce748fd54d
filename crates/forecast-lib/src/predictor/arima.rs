//! ARIMA estimation and interval forecasting
//!
//! Fits ARIMA(p, d, q) without a constant by conditional sum of squares.
//! Starting values come from the Hannan-Rissanen two-stage regression and
//! are refined with Levenberg-Marquardt steps. Forecast intervals use the
//! psi-weights of the integrated model and a normal quantile.
//!
//! The estimator sits behind the [`Estimator`] trait so a different
//! numerical backend can be plugged in without touching the pipeline.

use super::linalg::{least_squares, solve};
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;
use std::fmt;
use thiserror::Error;

/// Residual variance floor, keeps the likelihood finite on flat series
const MIN_VARIANCE: f64 = 1e-10;

/// Default Levenberg-Marquardt iteration cap
const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Default relative improvement below which refinement stops
const DEFAULT_TOLERANCE: f64 = 1e-8;

/// Model order (p, d, q)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Order of the long autoregression used to estimate innovations
    fn long_ar_order(&self) -> usize {
        if self.q == 0 {
            0
        } else {
            self.p + self.q + 2
        }
    }

    /// First differenced index usable in the second-stage regression
    fn regression_start(&self) -> usize {
        self.p.max(self.long_ar_order() + self.q)
    }

    /// Smallest raw series length the estimator accepts
    pub fn min_observations(&self) -> usize {
        self.d + self.regression_start() + self.p + self.q + 1
    }
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self::new(5, 1, 2)
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

/// Failures reported by the numerical backend
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimatorError {
    #[error("series has {actual} observations, order requires {required}")]
    InsufficientData { required: usize, actual: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("estimation did not converge: {0}")]
    NonConvergence(String),

    #[error("singular system: {0}")]
    Singular(String),

    #[error("non-finite values: {0}")]
    NonFinite(String),
}

/// Point forecast with a two-sided interval
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalForecast {
    pub mean: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Fits a model to a univariate series
pub trait Estimator: Send + Sync {
    fn fit(
        &self,
        data: &[f64],
        order: ArimaOrder,
    ) -> Result<Box<dyn FittedEstimate>, EstimatorError>;
}

/// A fitted model able to forecast beyond the end of its data
pub trait FittedEstimate: Send + Sync + fmt::Debug {
    fn aic(&self) -> f64;

    fn bic(&self) -> f64;

    /// Innovation variance
    fn sigma2(&self) -> f64;

    /// Number of residuals entering the likelihood
    fn observations(&self) -> usize;

    /// Forecast `steps` values with a `1 - alpha` interval
    fn forecast(&self, steps: usize, alpha: f64) -> Result<IntervalForecast, EstimatorError>;
}

/// Conditional-sum-of-squares ARIMA estimator
#[derive(Debug, Clone)]
pub struct ArimaEstimator {
    max_iterations: usize,
    tolerance: f64,
}

impl Default for ArimaEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl ArimaEstimator {
    pub fn new() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Fit and return the concrete model type
    pub fn fit_arima(&self, data: &[f64], order: ArimaOrder) -> Result<ArimaFit, EstimatorError> {
        if data.iter().any(|v| !v.is_finite()) {
            return Err(EstimatorError::InvalidInput(
                "series contains NaN or infinite values".to_string(),
            ));
        }
        let required = order.min_observations();
        if data.len() < required {
            return Err(EstimatorError::InsufficientData {
                required,
                actual: data.len(),
            });
        }

        let w = difference(data, order.d);
        let initial = hannan_rissanen(&w, order)?;
        let params = self.refine(&w, order, initial)?;

        let (ar, ma) = params.split_at(order.p);
        let residuals = css_residuals(&w, ar, ma);
        let n_eff = w.len() - order.p;
        let sse: f64 = residuals[order.p..].iter().map(|e| e * e).sum();
        let sigma2 = (sse / n_eff as f64).max(MIN_VARIANCE);
        let llf = -0.5 * n_eff as f64 * ((2.0 * PI * sigma2).ln() + 1.0);
        let k = (order.p + order.q + 1) as f64;
        let aic = -2.0 * llf + 2.0 * k;
        let bic = -2.0 * llf + k * (n_eff as f64).ln();

        if !aic.is_finite() || !bic.is_finite() {
            return Err(EstimatorError::NonConvergence(
                "information criteria are not finite".to_string(),
            ));
        }

        Ok(ArimaFit {
            order,
            ar: ar.to_vec(),
            ma: ma.to_vec(),
            sigma2,
            aic,
            bic,
            n_eff,
            data: data.to_vec(),
            differenced: w,
            residuals,
        })
    }

    /// Levenberg-Marquardt on the CSS objective
    fn refine(
        &self,
        w: &[f64],
        order: ArimaOrder,
        mut params: Vec<f64>,
    ) -> Result<Vec<f64>, EstimatorError> {
        if params.is_empty() {
            return Ok(params);
        }

        let objective = |beta: &[f64]| -> (Vec<f64>, f64) {
            let (ar, ma) = beta.split_at(order.p);
            let r = css_residuals(w, ar, ma)[order.p..].to_vec();
            let sse = r.iter().map(|e| e * e).sum();
            (r, sse)
        };

        let (mut residuals, mut sse) = objective(&params);
        if !sse.is_finite() {
            return Err(EstimatorError::NonConvergence(
                "initial residuals are not finite".to_string(),
            ));
        }

        let k = params.len();
        let mut lambda = 1e-3;
        for _ in 0..self.max_iterations {
            let mut jacobian = vec![vec![0.0; k]; residuals.len()];
            for col in 0..k {
                let h = 1e-6 * (1.0 + params[col].abs());
                let mut shifted = params.clone();
                shifted[col] += h;
                let (r_shift, _) = objective(&shifted);
                for (row, (a, b)) in r_shift.iter().zip(&residuals).enumerate() {
                    jacobian[row][col] = (a - b) / h;
                }
            }

            let mut jtj = vec![vec![0.0; k]; k];
            let mut jtr = vec![0.0; k];
            for (row, r) in jacobian.iter().zip(&residuals) {
                for i in 0..k {
                    jtr[i] -= row[i] * r;
                    for j in 0..k {
                        jtj[i][j] += row[i] * row[j];
                    }
                }
            }

            let mut improved = false;
            while lambda < 1e10 {
                let mut damped = jtj.clone();
                for (i, row) in damped.iter_mut().enumerate() {
                    row[i] += lambda * (row[i] + 1e-12);
                }
                let Some(step) = solve(damped, jtr.clone()) else {
                    lambda *= 10.0;
                    continue;
                };
                let candidate: Vec<f64> = params.iter().zip(&step).map(|(p, s)| p + s).collect();
                let (r_new, sse_new) = objective(&candidate);
                if sse_new.is_finite() && sse_new < sse {
                    let gain = (sse - sse_new) / sse.max(f64::MIN_POSITIVE);
                    params = candidate;
                    residuals = r_new;
                    sse = sse_new;
                    lambda = (lambda / 10.0).max(1e-12);
                    improved = gain > self.tolerance;
                    break;
                }
                lambda *= 10.0;
            }

            if !improved {
                break;
            }
        }

        Ok(params)
    }
}

impl Estimator for ArimaEstimator {
    fn fit(
        &self,
        data: &[f64],
        order: ArimaOrder,
    ) -> Result<Box<dyn FittedEstimate>, EstimatorError> {
        Ok(Box::new(self.fit_arima(data, order)?))
    }
}

/// A fitted ARIMA model
#[derive(Debug, Clone)]
pub struct ArimaFit {
    order: ArimaOrder,
    ar: Vec<f64>,
    ma: Vec<f64>,
    sigma2: f64,
    aic: f64,
    bic: f64,
    n_eff: usize,
    data: Vec<f64>,
    differenced: Vec<f64>,
    residuals: Vec<f64>,
}

impl ArimaFit {
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    /// Psi-weights of the integrated model, `psi[0] == 1`
    fn psi_weights(&self, count: usize) -> Vec<f64> {
        // phi(B) * (1 - B)^d as 1 - sum(a_i B^i)
        let mut poly = vec![1.0];
        poly.extend(self.ar.iter().map(|c| -c));
        for _ in 0..self.order.d {
            let mut next = vec![0.0; poly.len() + 1];
            for (i, c) in poly.iter().enumerate() {
                next[i] += c;
                next[i + 1] -= c;
            }
            poly = next;
        }
        let a: Vec<f64> = poly.iter().skip(1).map(|c| -c).collect();

        let mut psi = Vec::with_capacity(count);
        for j in 0..count {
            if j == 0 {
                psi.push(1.0);
                continue;
            }
            let mut value = if j <= self.ma.len() { self.ma[j - 1] } else { 0.0 };
            for i in 1..=j.min(a.len()) {
                value += a[i - 1] * psi[j - i];
            }
            psi.push(value);
        }
        psi
    }

    /// Undo `d` rounds of differencing on forecasts of the differenced series
    fn integrate(&self, forecasts: Vec<f64>) -> Vec<f64> {
        let mut result = forecasts;
        for level in (0..self.order.d).rev() {
            let anchor = difference(&self.data, level).last().copied().unwrap_or(0.0);
            let mut running = anchor;
            result = result
                .into_iter()
                .map(|v| {
                    running += v;
                    running
                })
                .collect();
        }
        result
    }
}

impl FittedEstimate for ArimaFit {
    fn aic(&self) -> f64 {
        self.aic
    }

    fn bic(&self) -> f64 {
        self.bic
    }

    fn sigma2(&self) -> f64 {
        self.sigma2
    }

    fn observations(&self) -> usize {
        self.n_eff
    }

    fn forecast(&self, steps: usize, alpha: f64) -> Result<IntervalForecast, EstimatorError> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(EstimatorError::InvalidInput(format!(
                "alpha must be in (0, 1), got {}",
                alpha
            )));
        }
        if steps == 0 {
            return Ok(IntervalForecast {
                mean: Vec::new(),
                lower: Vec::new(),
                upper: Vec::new(),
            });
        }

        let mut extended = self.differenced.clone();
        let mut shocks = self.residuals.clone();
        for _ in 0..steps {
            let t = extended.len();
            let mut value = 0.0;
            for (i, phi) in self.ar.iter().enumerate() {
                value += phi * extended[t - 1 - i];
            }
            for (j, theta) in self.ma.iter().enumerate() {
                if let Some(idx) = t.checked_sub(1 + j) {
                    value += theta * shocks[idx];
                }
            }
            extended.push(value);
            shocks.push(0.0);
        }
        let mean = self.integrate(extended[self.differenced.len()..].to_vec());

        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| EstimatorError::InvalidInput(format!("normal distribution: {}", e)))?;
        let z = normal.inverse_cdf(1.0 - alpha / 2.0);

        let psi = self.psi_weights(steps);
        let mut cumulative = 0.0;
        let mut lower = Vec::with_capacity(steps);
        let mut upper = Vec::with_capacity(steps);
        for (h, m) in mean.iter().enumerate() {
            cumulative += psi[h] * psi[h];
            let half_width = z * (self.sigma2 * cumulative).sqrt();
            lower.push(m - half_width);
            upper.push(m + half_width);
        }

        let finite = |v: &[f64]| v.iter().all(|x| x.is_finite());
        if !finite(&mean) || !finite(&lower) || !finite(&upper) {
            return Err(EstimatorError::NonFinite(format!(
                "{}-step forecast diverged",
                steps
            )));
        }

        Ok(IntervalForecast { mean, lower, upper })
    }
}

/// Apply `order` rounds of first differencing
pub fn difference(data: &[f64], order: usize) -> Vec<f64> {
    let mut result = data.to_vec();
    for _ in 0..order {
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Conditional residuals; entries before index `p` are zero
fn css_residuals(w: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let p = ar.len();
    let mut e = vec![0.0; w.len()];
    for t in p..w.len() {
        let mut predicted = 0.0;
        for (i, phi) in ar.iter().enumerate() {
            predicted += phi * w[t - 1 - i];
        }
        for (j, theta) in ma.iter().enumerate() {
            if t >= p + 1 + j {
                predicted += theta * e[t - 1 - j];
            }
        }
        e[t] = w[t] - predicted;
    }
    e
}

/// Two-stage regression for starting values `[phi.., theta..]`
fn hannan_rissanen(w: &[f64], order: ArimaOrder) -> Result<Vec<f64>, EstimatorError> {
    let (p, q) = (order.p, order.q);
    if p + q == 0 {
        return Ok(Vec::new());
    }

    let m = order.long_ar_order();
    let mut innovations = vec![0.0; w.len()];
    if q > 0 {
        let rows: Vec<Vec<f64>> = (m..w.len())
            .map(|t| (1..=m).map(|i| w[t - i]).collect())
            .collect();
        let targets: Vec<f64> = w[m..].to_vec();
        let coeffs = least_squares(&rows, &targets).ok_or_else(|| {
            EstimatorError::Singular("long autoregression is singular".to_string())
        })?;
        for t in m..w.len() {
            let fitted: f64 = coeffs.iter().enumerate().map(|(i, a)| a * w[t - 1 - i]).sum();
            innovations[t] = w[t] - fitted;
        }
    }

    let start = order.regression_start();
    let rows: Vec<Vec<f64>> = (start..w.len())
        .map(|t| {
            let mut row: Vec<f64> = (1..=p).map(|i| w[t - i]).collect();
            row.extend((1..=q).map(|j| innovations[t - j]));
            row
        })
        .collect();
    let targets: Vec<f64> = w[start..].to_vec();
    least_squares(&rows, &targets)
        .ok_or_else(|| EstimatorError::Singular("ARMA regression is singular".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal as Gaussian};

    fn ar1_series(phi: f64, n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Gaussian::new(0.0, 1.0).unwrap();
        let mut y = vec![0.0];
        for _ in 1..n {
            let prev = *y.last().unwrap();
            y.push(phi * prev + noise.sample(&mut rng));
        }
        y
    }

    #[test]
    fn test_min_observations() {
        assert_eq!(ArimaOrder::default().min_observations(), 20);
        assert_eq!(ArimaOrder::new(1, 0, 0).min_observations(), 3);
        assert_eq!(ArimaOrder::new(0, 1, 0).min_observations(), 2);
    }

    #[test]
    fn test_recovers_ar1_coefficient() {
        let data = ar1_series(0.6, 500, 3);
        let fit = ArimaEstimator::new()
            .fit_arima(&data, ArimaOrder::new(1, 0, 0))
            .unwrap();
        let phi = fit.ar_coefficients()[0];
        assert!((phi - 0.6).abs() < 0.1, "phi was {}", phi);
        assert!(fit.aic().is_finite());
        assert!(fit.bic() > fit.aic());
    }

    #[test]
    fn test_random_walk_interval_grows_with_sqrt_horizon() {
        let data = ar1_series(1.0, 100, 11);
        let fit = ArimaEstimator::new()
            .fit_arima(&data, ArimaOrder::new(0, 1, 0))
            .unwrap();
        let fc = fit.forecast(4, 0.05).unwrap();
        let last = *data.last().unwrap();
        assert!(fc.mean.iter().all(|m| (m - last).abs() < 1e-12));

        let w1 = fc.upper[0] - fc.lower[0];
        let w4 = fc.upper[3] - fc.lower[3];
        assert!((w4 / w1 - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_default_order_on_smoothed_signal() {
        let raw: Vec<f64> = ar1_series(0.8, 90, 5)
            .iter()
            .map(|v| if *v > 0.5 { 1.0 } else { 0.0 })
            .collect();
        let smoothed = crate::predictor::preprocess::trailing_mean(&raw, 7);
        let fit = ArimaEstimator::new()
            .fit(&smoothed, ArimaOrder::default())
            .unwrap();
        assert!(fit.aic().is_finite());
        assert!(fit.bic().is_finite());

        let fc = fit.forecast(7, 0.05).unwrap();
        assert_eq!(fc.mean.len(), 7);
        for h in 0..7 {
            assert!(fc.lower[h] <= fc.mean[h] && fc.mean[h] <= fc.upper[h]);
        }
        for h in 1..7 {
            let prev = fc.upper[h - 1] - fc.lower[h - 1];
            let cur = fc.upper[h] - fc.lower[h];
            assert!(cur + 1e-12 >= prev);
        }
    }

    #[test]
    fn test_flat_series_fits() {
        let data = vec![0.0; 40];
        let fit = ArimaEstimator::new()
            .fit(&data, ArimaOrder::default())
            .unwrap();
        assert!(fit.aic().is_finite());
        let fc = fit.forecast(3, 0.05).unwrap();
        assert!(fc.mean.iter().all(|m| m.abs() < 1e-9));
    }

    #[test]
    fn test_short_series_rejected() {
        let err = ArimaEstimator::new()
            .fit(&[0.1; 10], ArimaOrder::default())
            .unwrap_err();
        assert_eq!(
            err,
            EstimatorError::InsufficientData {
                required: 20,
                actual: 10
            }
        );
    }

    #[test]
    fn test_nan_rejected() {
        let mut data = vec![0.2; 30];
        data[4] = f64::NAN;
        let err = ArimaEstimator::new()
            .fit(&data, ArimaOrder::default())
            .unwrap_err();
        assert!(matches!(err, EstimatorError::InvalidInput(_)));
    }

    #[test]
    fn test_invalid_alpha() {
        let data = ar1_series(0.5, 50, 1);
        let fit = ArimaEstimator::new()
            .fit(&data, ArimaOrder::new(1, 0, 0))
            .unwrap();
        assert!(fit.forecast(3, 1.5).is_err());
        assert!(fit.forecast(0, 0.05).unwrap().mean.is_empty());
    }

    #[test]
    fn test_difference() {
        assert_eq!(difference(&[1.0, 3.0, 6.0, 10.0], 1), vec![2.0, 3.0, 4.0]);
        assert_eq!(difference(&[1.0, 3.0, 6.0, 10.0], 2), vec![1.0, 1.0]);
    }
}
