//! Shared domain types.
//!
//! Parameter sets and results are plain serializable values so they can be:
//!
//! - held by an estimator while fitting and predicting
//! - written to a JSON model snapshot and reloaded later
//! - exported per loan to CSV

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Distribution label attached to every prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distribution {
    #[serde(rename = "Beta")]
    Beta,
    /// Monte Carlo posterior predictive of a fitted PD model.
    #[serde(rename = "Posterior Predictive")]
    PosteriorPredictive,
    #[serde(rename = "Weibull")]
    Weibull,
}

impl Distribution {
    pub fn label(self) -> &'static str {
        match self {
            Distribution::Beta => "Beta",
            Distribution::PosteriorPredictive => "Posterior Predictive",
            Distribution::Weibull => "Weibull",
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Point estimate with a two-sided uncertainty band.
///
/// Returned by value from every estimator's predict call; estimators never keep
/// a reference to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
    pub distribution: Distribution,
    pub params: BTreeMap<String, f64>,
}

impl PredictionResult {
    pub fn new(mean: f64, lower: f64, upper: f64, distribution: Distribution) -> Self {
        Self {
            mean,
            lower,
            upper,
            distribution,
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: f64) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }

    pub fn param(&self, name: &str) -> Option<f64> {
        self.params.get(name).copied()
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Laplace posterior over logistic-regression weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorWeights {
    /// MAP weights (posterior mean under the Laplace approximation).
    pub mean: DVector<f64>,
    /// Inverse Hessian of the negative log posterior at the MAP.
    pub covariance: DMatrix<f64>,
}

impl PosteriorWeights {
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }
}

/// Running `Beta(α, β)` belief about loss given default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BetaBelief {
    pub alpha: f64,
    pub beta: f64,
}

impl Default for BetaBelief {
    /// Weakly informative prior centred on a 50% loss.
    fn default() -> Self {
        Self {
            alpha: 2.0,
            beta: 2.0,
        }
    }
}

impl BetaBelief {
    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }
}

/// Weibull time-to-default parameters (location fixed at zero).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeibullParams {
    /// Shape `k`.
    pub shape: f64,
    /// Scale `λ`.
    pub scale: f64,
}

impl Default for WeibullParams {
    /// `k = 1, λ = 1`: the exponential-like prior kept until enough defaults are seen.
    fn default() -> Self {
        Self {
            shape: 1.0,
            scale: 1.0,
        }
    }
}

/// Lifecycle status of a loan in the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    Pending,
    Active,
    PaidOff,
    Defaulted,
    WrittenOff,
}

impl LoanStatus {
    /// Defaulted and written-off loans count as defaults.
    pub fn is_default(self) -> bool {
        matches!(self, LoanStatus::Defaulted | LoanStatus::WrittenOff)
    }

    /// Pending applications carry no outcome and are excluded from training.
    pub fn has_outcome(self) -> bool {
        self != LoanStatus::Pending
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LoanStatus::Pending => "PENDING",
            LoanStatus::Active => "ACTIVE",
            LoanStatus::PaidOff => "PAID_OFF",
            LoanStatus::Defaulted => "DEFAULTED",
            LoanStatus::WrittenOff => "WRITTEN_OFF",
        }
    }
}

impl FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "PENDING" => Ok(LoanStatus::Pending),
            "ACTIVE" => Ok(LoanStatus::Active),
            "PAID_OFF" | "PAIDOFF" | "CLOSED" => Ok(LoanStatus::PaidOff),
            "DEFAULTED" | "DEFAULT" => Ok(LoanStatus::Defaulted),
            "WRITTEN_OFF" | "WRITTENOFF" => Ok(LoanStatus::WrittenOff),
            other => Err(format!("unknown loan status '{other}'")),
        }
    }
}

/// Number of raw features per loan: principal, monthly rate, tenure, income.
pub const RAW_FEATURES: usize = 4;

/// Raw feature names, in the fixed order used for fitting and prediction.
pub const FEATURE_NAMES: [&str; RAW_FEATURES] =
    ["principal", "monthly_rate", "tenure_months", "monthly_income"];

/// One loan from the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub loan_id: String,
    pub principal: f64,
    pub monthly_rate: f64,
    pub tenure_months: f64,
    pub monthly_income: f64,
    pub status: LoanStatus,
    /// Amount recovered after default.
    pub recovered: f64,
    /// Months elapsed since disbursement (time to default for defaulted loans).
    pub months_on_book: f64,
}

impl LoanRecord {
    pub fn features(&self) -> [f64; RAW_FEATURES] {
        [
            self.principal,
            self.monthly_rate,
            self.tenure_months,
            self.monthly_income,
        ]
    }

    /// Exposure at default. The book carries no amortization schedule, so the
    /// full principal is used.
    pub fn ead(&self) -> f64 {
        self.principal
    }

    /// Realized loss fraction `1 - recovered / EAD`, clamped to `[0, 1]`.
    ///
    /// `None` for loans that have not defaulted.
    pub fn observed_lgd(&self) -> Option<f64> {
        if !self.status.is_default() {
            return None;
        }
        let ead = self.ead();
        let recovery_rate = if ead > 0.0 { self.recovered / ead } else { 0.0 };
        Some((1.0 - recovery_rate).clamp(0.0, 1.0))
    }
}

/// Per-loan risk output, one row of the metrics export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRiskMetric {
    pub loan_id: String,
    pub pd_mean: f64,
    pub pd_lower: f64,
    pub pd_upper: f64,
    pub lgd_mean: f64,
    pub lgd_lower: f64,
    pub lgd_upper: f64,
    pub ead: f64,
    pub expected_loss: f64,
    /// Weibull hazard at the loan's months on book; empty for loans with no
    /// time on book, where `k < 1` makes the rate unbounded.
    pub hazard_rate: Option<f64>,
}

/// Run configuration shared by the CLI and the training pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    /// Precision `τ` of the isotropic Gaussian prior on PD weights.
    pub prior_precision: f64,
    /// Posterior draws per PD prediction.
    pub n_samples: usize,
    pub lgd_prior_alpha: f64,
    pub lgd_prior_beta: f64,
    /// Seed for Monte Carlo draws; `None` draws from the thread RNG.
    pub seed: Option<u64>,
    /// Optimizer iteration cap; `None` uses `200 × features`.
    pub max_iterations: Option<usize>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            prior_precision: 1.0,
            n_samples: 1000,
            lgd_prior_alpha: 2.0,
            lgd_prior_beta: 2.0,
            seed: None,
            max_iterations: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loan(status: LoanStatus, principal: f64, recovered: f64) -> LoanRecord {
        LoanRecord {
            loan_id: "L1".to_string(),
            principal,
            monthly_rate: 0.05,
            tenure_months: 12.0,
            monthly_income: 500.0,
            status,
            recovered,
            months_on_book: 6.0,
        }
    }

    #[test]
    fn observed_lgd_only_for_defaults_and_clamped() {
        assert_eq!(loan(LoanStatus::Active, 1000.0, 0.0).observed_lgd(), None);
        assert_eq!(loan(LoanStatus::Defaulted, 1000.0, 250.0).observed_lgd(), Some(0.75));
        assert_eq!(loan(LoanStatus::WrittenOff, 1000.0, 1500.0).observed_lgd(), Some(0.0));
        assert_eq!(loan(LoanStatus::Defaulted, 0.0, 10.0).observed_lgd(), Some(1.0));
    }

    #[test]
    fn status_parsing_is_lenient_about_case_and_separators() {
        assert_eq!("paid off".parse::<LoanStatus>(), Ok(LoanStatus::PaidOff));
        assert_eq!("Written-Off".parse::<LoanStatus>(), Ok(LoanStatus::WrittenOff));
        assert!("bogus".parse::<LoanStatus>().is_err());
    }

    #[test]
    fn distribution_labels_serialize_as_plain_strings() {
        let json = serde_json::to_string(&Distribution::PosteriorPredictive).unwrap();
        assert_eq!(json, "\"Posterior Predictive\"");
        assert_eq!(Distribution::Weibull.to_string(), "Weibull");
    }
}
