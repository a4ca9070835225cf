//! Probability of default: Bayesian logistic regression with a Laplace
//! approximation to the posterior.
//!
//! Fitting:
//! - prior `w ~ N(0, I/τ)`
//! - MAP `ŵ` by BFGS on the negative log posterior, starting from `w = 0`
//! - covariance `H⁻¹` with `H = Xᵀ·diag(p(1-p))·X + τI` evaluated at `ŵ`
//!
//! Prediction draws weight vectors from `N(ŵ, H⁻¹)`, pushes each through the
//! logistic link and summarizes the sampled probabilities by their mean and
//! their 2.5th/97.5th percentiles. That is an equal-tailed interval, not a
//! highest-density interval.

use nalgebra::{DMatrix, DVector};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution as _, StandardNormal};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::domain::{Distribution, PosteriorWeights, PredictionResult};
use crate::error::EstimateError;
use crate::math::{
    BfgsOptions, log_sigmoid, log1m_sigmoid, minimize_bfgs, percentile_sorted, sampling_factor,
    sigmoid, try_invert,
};

/// Isotropic variance used when the Hessian cannot be inverted.
pub const FALLBACK_COVARIANCE: f64 = 1e-6;

/// Answer for queries made before any training data has been seen.
pub const UNTRAINED_MEAN: f64 = 0.05;
pub const UNTRAINED_LOWER: f64 = 0.01;
pub const UNTRAINED_UPPER: f64 = 0.10;

/// Relative tolerance when checking a stored covariance for symmetry.
const SYMMETRY_TOLERANCE: f64 = 1e-8;

const LOWER_PERCENTILE: f64 = 2.5;
const UPPER_PERCENTILE: f64 = 97.5;

/// Diagnostics from a single [`PdEstimator::fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct PdFitReport {
    pub iterations: usize,
    pub converged: bool,
    /// Negative log posterior at the returned weights.
    pub neg_log_posterior: f64,
    /// `true` when the Hessian was singular and `ε·I` stands in for `H⁻¹`.
    pub covariance_fallback: bool,
}

/// Bayesian logistic-regression PD model.
///
/// The posterior is replaced wholesale by each `fit`; there is no incremental
/// merge across fits.
#[derive(Debug, Clone, Default)]
pub struct PdEstimator {
    posterior: Option<PosteriorWeights>,
    max_iterations: Option<usize>,
}

impl PdEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap optimizer iterations (defaults to `200 × features`).
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Rebuild a fitted estimator from a stored posterior.
    pub fn from_posterior(posterior: PosteriorWeights) -> Result<Self, EstimateError> {
        let p = posterior.mean.len();
        if p == 0 {
            return Err(EstimateError::invalid("posterior has no weights"));
        }
        if posterior.covariance.nrows() != p {
            return Err(EstimateError::shape("covariance rows", p, posterior.covariance.nrows()));
        }
        if posterior.covariance.ncols() != p {
            return Err(EstimateError::shape("covariance columns", p, posterior.covariance.ncols()));
        }
        if posterior.mean.iter().any(|v| !v.is_finite()) {
            return Err(EstimateError::invalid("posterior mean has non-finite entries"));
        }
        if posterior.covariance.iter().any(|v| !v.is_finite()) {
            return Err(EstimateError::invalid("posterior covariance has non-finite entries"));
        }
        let cov = &posterior.covariance;
        for i in 0..p {
            for j in (i + 1)..p {
                let (a, b) = (cov[(i, j)], cov[(j, i)]);
                if (a - b).abs() > SYMMETRY_TOLERANCE * (1.0 + a.abs().max(b.abs())) {
                    return Err(EstimateError::invalid(format!(
                        "posterior covariance is not symmetric at ({i}, {j}): {a} vs {b}"
                    )));
                }
            }
        }
        Ok(Self {
            posterior: Some(posterior),
            max_iterations: None,
        })
    }

    pub fn posterior(&self) -> Option<&PosteriorWeights> {
        self.posterior.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.posterior.is_some()
    }

    /// Feature width fixed by the last fit.
    pub fn n_features(&self) -> Option<usize> {
        self.posterior.as_ref().map(PosteriorWeights::n_features)
    }

    /// Fit the Laplace posterior to an `n × p` design matrix and `{0, 1}` labels.
    ///
    /// The first column of `x` is conventionally an all-ones intercept; the
    /// estimator does not add one.
    pub fn fit(
        &mut self,
        x: &DMatrix<f64>,
        y: &DVector<f64>,
        prior_precision: f64,
    ) -> Result<PdFitReport, EstimateError> {
        validate_training_data(x, y, prior_precision)?;

        let p = x.ncols();
        let opts = BfgsOptions {
            max_iterations: self
                .max_iterations
                .unwrap_or(BfgsOptions::for_dimension(p).max_iterations),
            ..BfgsOptions::for_dimension(p)
        };
        let min = minimize_bfgs(
            |w| neg_log_posterior(x, y, w, prior_precision),
            DVector::zeros(p),
            &opts,
        );
        if !min.converged {
            warn!(
                iterations = min.iterations,
                grad_max = min.gradient.amax(),
                "PD optimizer did not converge; using best iterate as MAP"
            );
        }

        let hessian = posterior_hessian(x, &min.x, prior_precision);
        let (covariance, covariance_fallback) = posterior_covariance(&hessian);
        if covariance_fallback {
            warn!(
                features = p,
                "PD Hessian is singular; falling back to isotropic covariance"
            );
        }

        debug!(
            rows = x.nrows(),
            features = p,
            iterations = min.iterations,
            converged = min.converged,
            objective = min.value,
            "fitted PD posterior"
        );

        self.posterior = Some(PosteriorWeights {
            mean: min.x,
            covariance,
        });

        Ok(PdFitReport {
            iterations: min.iterations,
            converged: min.converged,
            neg_log_posterior: min.value,
            covariance_fallback,
        })
    }

    /// Posterior predictive PD for one row or a batch of rows, using the
    /// thread-local RNG.
    ///
    /// For a batch, all `rows × n_samples` sampled probabilities are pooled
    /// into a single summary. Use [`PdEstimator::predict_each`] to score rows
    /// independently.
    pub fn predict(
        &self,
        x: &DMatrix<f64>,
        n_samples: usize,
    ) -> Result<PredictionResult, EstimateError> {
        self.predict_with_rng(x, n_samples, &mut rand::thread_rng())
    }

    /// Convenience wrapper for a single feature row.
    pub fn predict_row(
        &self,
        row: &[f64],
        n_samples: usize,
    ) -> Result<PredictionResult, EstimateError> {
        let x = DMatrix::from_row_slice(1, row.len(), row);
        self.predict(&x, n_samples)
    }

    /// [`PdEstimator::predict`] with a caller-supplied RNG.
    pub fn predict_with_rng<R: Rng + ?Sized>(
        &self,
        x: &DMatrix<f64>,
        n_samples: usize,
        rng: &mut R,
    ) -> Result<PredictionResult, EstimateError> {
        let Some(posterior) = &self.posterior else {
            return Ok(untrained_result());
        };
        self.check_width(x)?;
        if n_samples == 0 {
            return Err(EstimateError::invalid("n_samples must be positive"));
        }
        if x.nrows() == 0 {
            return Err(EstimateError::invalid("no rows to predict"));
        }

        let weights = sample_weights(posterior, n_samples, rng);
        // (rows × p) · (p × n_samples)
        let logits = x * weights.transpose();
        let mut probs: Vec<f64> = logits.iter().map(|&z| sigmoid(z)).collect();
        probs.sort_by(|a, b| a.total_cmp(b));

        let mean = probs.iter().sum::<f64>() / probs.len() as f64;
        let lower = percentile_sorted(&probs, LOWER_PERCENTILE).unwrap_or(mean);
        let upper = percentile_sorted(&probs, UPPER_PERCENTILE).unwrap_or(mean);

        Ok(
            PredictionResult::new(mean, lower, upper, Distribution::PosteriorPredictive)
                .with_param("n_samples", n_samples as f64),
        )
    }

    /// Score every row of `x` independently, in parallel.
    ///
    /// Row `i` draws from its own RNG stream derived from `seed` and `i`, so
    /// the output does not depend on thread scheduling.
    pub fn predict_each(
        &self,
        x: &DMatrix<f64>,
        n_samples: usize,
        seed: u64,
    ) -> Result<Vec<PredictionResult>, EstimateError> {
        if self.posterior.is_none() {
            return Ok(vec![untrained_result(); x.nrows()]);
        }
        self.check_width(x)?;

        (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row = x.rows(i, 1).into_owned();
                let mut rng = StdRng::seed_from_u64(row_seed(seed, i));
                self.predict_with_rng(&row, n_samples, &mut rng)
            })
            .collect()
    }

    fn check_width(&self, x: &DMatrix<f64>) -> Result<(), EstimateError> {
        match self.n_features() {
            Some(p) if p != x.ncols() => Err(EstimateError::shape("feature width", p, x.ncols())),
            _ => Ok(()),
        }
    }
}

/// Documented fallback for an estimator that has never been fit.
pub fn untrained_result() -> PredictionResult {
    PredictionResult::new(UNTRAINED_MEAN, UNTRAINED_LOWER, UNTRAINED_UPPER, Distribution::Beta)
}

/// Negative log posterior `τ/2·‖w‖² − Σ [y log p + (1−y) log(1−p)]` and its gradient
/// `τw − Xᵀ(y − p)`.
pub fn neg_log_posterior(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    w: &DVector<f64>,
    prior_precision: f64,
) -> (f64, DVector<f64>) {
    let logits = x * w;
    let mut log_lik = 0.0;
    let mut residual = DVector::<f64>::zeros(y.len());
    for i in 0..y.len() {
        let z = logits[i];
        log_lik += y[i] * log_sigmoid(z) + (1.0 - y[i]) * log1m_sigmoid(z);
        residual[i] = y[i] - sigmoid(z);
    }
    let value = 0.5 * prior_precision * w.norm_squared() - log_lik;
    let gradient = w * prior_precision - x.transpose() * residual;
    (value, gradient)
}

/// `H = Xᵀ·diag(p(1−p))·X + τI` at weights `w`.
pub fn posterior_hessian(x: &DMatrix<f64>, w: &DVector<f64>, prior_precision: f64) -> DMatrix<f64> {
    let p = x.ncols();
    let logits = x * w;
    let mut weighted = x.clone();
    for (i, mut row) in weighted.row_iter_mut().enumerate() {
        let prob = sigmoid(logits[i]);
        row *= prob * (1.0 - prob);
    }
    x.transpose() * weighted + DMatrix::<f64>::identity(p, p) * prior_precision
}

/// Symmetric `H⁻¹`, or `ε·I` when `H` cannot be inverted. The flag reports the fallback.
pub fn posterior_covariance(hessian: &DMatrix<f64>) -> (DMatrix<f64>, bool) {
    match try_invert(hessian) {
        // Symmetrize away rounding from the LU inverse.
        Some(cov) => ((&cov + cov.transpose()) * 0.5, false),
        None => {
            let p = hessian.nrows();
            (DMatrix::<f64>::identity(p, p) * FALLBACK_COVARIANCE, true)
        }
    }
}

/// Draw an `n_samples × p` matrix of weight vectors from `N(mean, covariance)`.
fn sample_weights<R: Rng + ?Sized>(
    posterior: &PosteriorWeights,
    n_samples: usize,
    rng: &mut R,
) -> DMatrix<f64> {
    let p = posterior.n_features();
    let factor = sampling_factor(&posterior.covariance);
    let z = DMatrix::<f64>::from_fn(n_samples, p, |_, _| StandardNormal.sample(rng));
    let mut draws = z * factor.transpose();
    for j in 0..p {
        draws.column_mut(j).add_scalar_mut(posterior.mean[j]);
    }
    draws
}

fn row_seed(seed: u64, row: usize) -> u64 {
    seed ^ (row as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn validate_training_data(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    prior_precision: f64,
) -> Result<(), EstimateError> {
    if x.nrows() != y.len() {
        return Err(EstimateError::shape("label count", x.nrows(), y.len()));
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(EstimateError::invalid("design matrix is empty"));
    }
    if !(prior_precision.is_finite() && prior_precision > 0.0) {
        return Err(EstimateError::invalid(format!(
            "prior precision must be finite and > 0, got {prior_precision}"
        )));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(EstimateError::invalid("design matrix contains non-finite values"));
    }
    if let Some(bad) = y.iter().find(|&&v| v != 0.0 && v != 1.0) {
        return Err(EstimateError::invalid(format!("labels must be 0 or 1, got {bad}")));
    }
    Ok(())
}
