//! Loss given default: a running `Beta(α, β)` belief blended with each batch of
//! realized loss fractions.
//!
//! The update is a weighted method-of-moments blend, not a conjugate update:
//! observations are continuous fractions rather than Bernoulli trials. For a
//! batch of `n` losses with mean `m` and variance `v`:
//!
//! ```text
//! φ      = m(1-m)/v - 1          (φ = 1 if negative; v floored at 1e-6)
//! w      = n / (n + 10)
//! α     ← α(1-w) + mφ·w·n
//! β     ← β(1-w) + (1-m)φ·w·n
//! ```
//!
//! The `w·n` scaling is kept as-is so stored beliefs stay comparable across
//! versions. Repeated updates compound.

use statrs::function::beta::inv_beta_reg;
use tracing::{debug, warn};

use crate::domain::{BetaBelief, Distribution, PredictionResult};
use crate::error::EstimateError;
use crate::math::{mean, population_variance};

/// Variance floor applied before deriving the implied precision.
pub const VARIANCE_FLOOR: f64 = 1e-6;

/// Pseudo-count controlling how fast data outweighs the current belief.
const BLEND_PSEUDO_COUNT: f64 = 10.0;

/// Beta-belief LGD model.
#[derive(Debug, Clone, Default)]
pub struct LgdEstimator {
    belief: BetaBelief,
}

impl LgdEstimator {
    /// Start from the default `Beta(2, 2)` prior.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a custom prior; both shapes must be finite and positive.
    pub fn with_prior(alpha: f64, beta: f64) -> Result<Self, EstimateError> {
        Self::from_belief(BetaBelief { alpha, beta })
    }

    /// Resume from a stored belief.
    pub fn from_belief(belief: BetaBelief) -> Result<Self, EstimateError> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !(valid(belief.alpha) && valid(belief.beta)) {
            return Err(EstimateError::invalid(format!(
                "Beta shapes must be finite and > 0, got alpha={} beta={}",
                belief.alpha, belief.beta
            )));
        }
        Ok(Self { belief })
    }

    pub fn belief(&self) -> BetaBelief {
        self.belief
    }

    /// Blend a batch of realized loss fractions into the belief.
    ///
    /// Values that are non-finite or outside `[0, 1]` are dropped. A batch with
    /// nothing left is a no-op.
    pub fn update(&mut self, observed: &[f64]) {
        let valid: Vec<f64> = observed
            .iter()
            .copied()
            .filter(|v| (0.0..=1.0).contains(v))
            .collect();
        if valid.len() < observed.len() {
            warn!(
                dropped = observed.len() - valid.len(),
                kept = valid.len(),
                "ignoring LGD observations outside [0, 1]"
            );
        }
        let (Some(m), Some(var)) = (mean(&valid), population_variance(&valid)) else {
            debug!("empty LGD batch; belief unchanged");
            return;
        };
        let n = valid.len() as f64;

        let var = var.max(VARIANCE_FLOOR);
        let mut phi = m * (1.0 - m) / var - 1.0;
        if phi < 0.0 {
            phi = 1.0;
        }

        let alpha_data = m * phi;
        let beta_data = (1.0 - m) * phi;
        let w = n / (n + BLEND_PSEUDO_COUNT);

        self.belief.alpha = self.belief.alpha * (1.0 - w) + alpha_data * w * n;
        self.belief.beta = self.belief.beta * (1.0 - w) + beta_data * w * n;

        debug!(
            n = valid.len(),
            sample_mean = m,
            phi,
            alpha = self.belief.alpha,
            beta = self.belief.beta,
            "updated LGD belief"
        );
    }

    /// Mean of the belief with its exact 2.5% / 97.5% quantiles.
    pub fn predict(&self) -> PredictionResult {
        let BetaBelief { alpha, beta } = self.belief;
        let mean = self.belief.mean();
        let bounds = (
            beta_quantile(alpha, beta, 0.025),
            beta_quantile(alpha, beta, 0.975),
        );
        let (lower, upper) = match bounds {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => {
                warn!(alpha, beta, "Beta quantiles unavailable; collapsing interval to the mean");
                (mean, mean)
            }
        };

        PredictionResult::new(mean, lower, upper, Distribution::Beta)
            .with_param("alpha", alpha)
            .with_param("beta", beta)
    }
}

/// Quantile `q` of `Beta(alpha, beta)` by inverting the regularized incomplete
/// beta function, or `None` for invalid shapes or `q` outside `[0, 1]`.
pub fn beta_quantile(alpha: f64, beta: f64, q: f64) -> Option<f64> {
    let valid = |v: f64| v.is_finite() && v > 0.0;
    if !(valid(alpha) && valid(beta) && (0.0..=1.0).contains(&q)) {
        return None;
    }
    let x = inv_beta_reg(alpha, beta, q);
    x.is_finite().then_some(x)
}
