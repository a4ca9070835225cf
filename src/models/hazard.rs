//! Time to default: a Weibull survival model fitted by maximum likelihood.
//!
//! Only uncensored durations (loans that actually defaulted) enter the fit;
//! censored observations are ignored rather than modelled. With location fixed
//! at zero the scale has a closed form given the shape, so the fit reduces to a
//! one-dimensional root of the profile score equation
//!
//! ```text
//! g(k) = Σ xᵢᵏ ln xᵢ / Σ xᵢᵏ − 1/k − mean(ln xᵢ) = 0
//! λ    = (Σ xᵢᵏ / n)^(1/k)
//! ```
//!
//! `g` is strictly increasing in `k`, so a bracketed Newton search is safe.

use statrs::function::gamma::gamma;
use tracing::{debug, warn};

use crate::domain::{Distribution, PredictionResult, WeibullParams};
use crate::error::EstimateError;
use crate::math::{RootOptions, newton_bracketed};

/// Fixed standard deviation behind the survival band. A placeholder, not an
/// estimate of the fit's sampling variance.
pub const SURVIVAL_BAND_SIGMA: f64 = 0.05;

const Z_975: f64 = 1.96;

/// Minimum number of uncensored defaults needed to fit.
pub const MIN_EVENTS: usize = 2;

const SHAPE_LOWER: f64 = 1e-3;
const SHAPE_SEARCH_LIMIT: f64 = 1e6;

/// What a call to [`HazardEstimator::fit`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HazardFit {
    /// Parameters were replaced.
    Fitted(WeibullParams),
    /// Fewer than [`MIN_EVENTS`] usable defaults; parameters unchanged.
    InsufficientEvents { uncensored: usize },
    /// All default times identical (shape unbounded); parameters unchanged.
    Degenerate,
}

/// Weibull hazard / survival model.
#[derive(Debug, Clone, Default)]
pub struct HazardEstimator {
    params: WeibullParams,
}

impl HazardEstimator {
    /// Start from `k = 1, λ = 1`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_params(params: WeibullParams) -> Result<Self, EstimateError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !(valid(params.shape) && valid(params.scale)) {
            return Err(EstimateError::invalid(format!(
                "Weibull parameters must be finite and > 0, got shape={} scale={}",
                params.shape, params.scale
            )));
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> WeibullParams {
        self.params
    }

    /// Fit to parallel `(duration, defaulted)` observations.
    ///
    /// Durations of zero cannot enter the log-likelihood and are skipped along
    /// with censored ones.
    pub fn fit(&mut self, durations: &[f64], events: &[bool]) -> Result<HazardFit, EstimateError> {
        if durations.len() != events.len() {
            return Err(EstimateError::shape("event count", durations.len(), events.len()));
        }

        let uncensored = events.iter().filter(|&&e| e).count();
        let defaults: Vec<f64> = durations
            .iter()
            .zip(events)
            .filter(|&(_, &e)| e)
            .map(|(&d, _)| d)
            .filter(|d| d.is_finite() && *d > 0.0)
            .collect();
        if defaults.len() < uncensored {
            warn!(
                skipped = uncensored - defaults.len(),
                "ignoring non-positive default durations in Weibull fit"
            );
        }

        if defaults.len() < MIN_EVENTS {
            debug!(uncensored = defaults.len(), "too few defaults for Weibull fit; keeping prior");
            return Ok(HazardFit::InsufficientEvents {
                uncensored: defaults.len(),
            });
        }

        let Some(params) = fit_weibull(&defaults) else {
            warn!(
                n = defaults.len(),
                "default times are degenerate; keeping current Weibull parameters"
            );
            return Ok(HazardFit::Degenerate);
        };

        debug!(
            n = defaults.len(),
            shape = params.shape,
            scale = params.scale,
            "fitted Weibull hazard"
        );
        self.params = params;
        Ok(HazardFit::Fitted(params))
    }

    /// `S(t) = exp(-(t/λ)^k)`. Negative times are treated as zero.
    pub fn survival(&self, t: f64) -> f64 {
        let t = t.max(0.0);
        (-(t / self.params.scale).powf(self.params.shape)).exp()
    }

    /// Instantaneous hazard `h(t) = (k/λ)(t/λ)^(k-1)`.
    pub fn hazard_rate(&self, t: f64) -> f64 {
        let WeibullParams { shape, scale } = self.params;
        let t = t.max(0.0);
        (shape / scale) * (t / scale).powf(shape - 1.0)
    }

    /// Expected time to default, `λ·Γ(1 + 1/k)`.
    pub fn mean_time_to_default(&self) -> f64 {
        self.params.scale * gamma(1.0 + 1.0 / self.params.shape)
    }

    /// Survival probability at `t` with a fixed ±1.96σ band clamped to `[0, 1]`.
    pub fn predict_survival(&self, t: f64) -> PredictionResult {
        let s = self.survival(t);
        let half_width = Z_975 * SURVIVAL_BAND_SIGMA;
        PredictionResult::new(
            s,
            (s - half_width).max(0.0),
            (s + half_width).min(1.0),
            Distribution::Weibull,
        )
        .with_param("shape", self.params.shape)
        .with_param("scale", self.params.scale)
    }
}

/// Maximum-likelihood Weibull fit (location 0) to strictly positive samples.
///
/// Returns `None` when the log-samples have no spread or no root is found.
pub fn fit_weibull(samples: &[f64]) -> Option<WeibullParams> {
    let n = samples.len() as f64;
    let logs: Vec<f64> = samples.iter().map(|x| x.ln()).collect();
    let log_mean = logs.iter().sum::<f64>() / n;
    let log_max = logs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let log_var = logs.iter().map(|l| (l - log_mean).powi(2)).sum::<f64>() / n;
    if !(log_var > 1e-14) {
        return None;
    }

    // Weights are rescaled by exp(-k·max ln x) so x^k cannot overflow.
    let moments = |k: f64| {
        let mut s0 = 0.0;
        let mut s1 = 0.0;
        let mut s2 = 0.0;
        for &l in &logs {
            let u = (k * (l - log_max)).exp();
            s0 += u;
            s1 += u * l;
            s2 += u * l * l;
        }
        (s0, s1 / s0, s2 / s0)
    };
    let score = |k: f64| {
        let (_, m1, m2) = moments(k);
        (m1 - 1.0 / k - log_mean, (m2 - m1 * m1) + 1.0 / (k * k))
    };

    let mut hi = 1.0;
    while score(hi).0 <= 0.0 {
        hi *= 2.0;
        if hi > SHAPE_SEARCH_LIMIT {
            return None;
        }
    }

    let root = newton_bracketed(score, SHAPE_LOWER, hi, &RootOptions::default())?;
    if !root.converged {
        warn!(iterations = root.iterations, "Weibull shape search did not converge");
    }
    let shape = root.x;
    let (s0, _, _) = moments(shape);
    let scale = (log_max + (s0 / n).ln() / shape).exp();

    (shape.is_finite() && scale.is_finite() && shape > 0.0 && scale > 0.0)
        .then_some(WeibullParams { shape, scale })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution as _, Weibull};

    #[test]
    fn too_few_defaults_keeps_prior() {
        let mut est = HazardEstimator::new();
        let out = est.fit(&[5.0, 8.0, 12.0], &[true, false, false]).unwrap();
        assert_eq!(out, HazardFit::InsufficientEvents { uncensored: 1 });
        assert_eq!(est.params(), WeibullParams { shape: 1.0, scale: 1.0 });
    }

    #[test]
    fn censored_observations_are_ignored() {
        let mut a = HazardEstimator::new();
        let mut b = HazardEstimator::new();
        a.fit(&[10.0, 20.0, 30.0], &[true, true, true]).unwrap();
        b.fit(&[10.0, 20.0, 30.0, 2.0, 90.0], &[true, true, true, false, false])
            .unwrap();
        assert_eq!(a.params(), b.params());
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let mut est = HazardEstimator::new();
        assert!(matches!(
            est.fit(&[1.0, 2.0], &[true]),
            Err(EstimateError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn survival_at_scale_is_exp_minus_one() {
        let mut est = HazardEstimator::new();
        let out = est
            .fit(&[10.0, 20.0, 30.0, 40.0, 50.0], &[true; 5])
            .unwrap();
        assert!(matches!(out, HazardFit::Fitted(_)));
        let p = est.params();
        assert!(p.shape > 0.0 && p.scale > 0.0);

        let res = est.predict_survival(p.scale);
        assert_relative_eq!(res.mean, (-1.0f64).exp(), epsilon = 1e-12);
        assert_eq!(res.distribution, Distribution::Weibull);
        assert_relative_eq!(res.lower, res.mean - 0.098, epsilon = 1e-12);
        assert_relative_eq!(res.upper, res.mean + 0.098, epsilon = 1e-12);
        assert_eq!(res.param("shape"), Some(p.shape));
    }

    #[test]
    fn fitted_parameters_satisfy_the_likelihood_equations() {
        let xs = [10.0, 20.0, 30.0, 40.0, 50.0];
        let p = fit_weibull(&xs).unwrap();
        let k = p.shape;
        let sum_k: f64 = xs.iter().map(|x: &f64| x.powf(k)).sum();
        let sum_k_log: f64 = xs.iter().map(|x: &f64| x.powf(k) * x.ln()).sum();
        let mean_log: f64 = xs.iter().map(|x: &f64| x.ln()).sum::<f64>() / 5.0;
        assert_relative_eq!(sum_k_log / sum_k - 1.0 / k - mean_log, 0.0, epsilon = 1e-9);
        assert_relative_eq!(p.scale, (sum_k / 5.0).powf(1.0 / k), epsilon = 1e-9);
    }

    #[test]
    fn recovers_known_parameters_from_simulated_defaults() {
        let mut rng = StdRng::seed_from_u64(17);
        let dist = Weibull::new(20.0, 1.5).unwrap();
        let xs: Vec<f64> = (0..5_000).map(|_| dist.sample(&mut rng)).collect();
        let p = fit_weibull(&xs).unwrap();
        assert_relative_eq!(p.shape, 1.5, epsilon = 0.075);
        assert_relative_eq!(p.scale, 20.0, epsilon = 1.0);
    }

    #[test]
    fn identical_default_times_are_degenerate() {
        let mut est = HazardEstimator::new();
        let out = est.fit(&[12.0, 12.0, 12.0], &[true; 3]).unwrap();
        assert_eq!(out, HazardFit::Degenerate);
        assert_eq!(est.params(), WeibullParams::default());
    }

    #[test]
    fn band_is_clamped_to_unit_interval() {
        let est = HazardEstimator::new();
        let at_zero = est.predict_survival(0.0);
        assert_eq!(at_zero.upper, 1.0);
        let late = est.predict_survival(50.0);
        assert_eq!(late.lower, 0.0);
    }

    #[test]
    fn exponential_prior_has_unit_hazard_and_mean() {
        let est = HazardEstimator::new();
        assert_relative_eq!(est.hazard_rate(3.0), 1.0);
        assert_relative_eq!(est.mean_time_to_default(), 1.0, epsilon = 1e-12);
    }

    proptest! {
        #[test]
        fn survival_at_time_zero_is_certain(shape in 0.1f64..10.0, scale in 0.1f64..500.0) {
            let est = HazardEstimator::from_params(WeibullParams { shape, scale }).unwrap();
            prop_assert_eq!(est.predict_survival(0.0).mean, 1.0);
        }

        #[test]
        fn survival_is_non_increasing(t in 0.0f64..100.0, dt in 0.0f64..100.0) {
            let params = WeibullParams { shape: 1.7, scale: 24.0 };
            let est = HazardEstimator::from_params(params).unwrap();
            prop_assert!(est.survival(t + dt) <= est.survival(t));
        }
    }
}
