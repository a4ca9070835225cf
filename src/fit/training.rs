//! Training all three estimators from a loan book.
//!
//! Training data are assembled from the book as follows:
//! - PD: every loan with an outcome (i.e. not pending); label 1 for defaulted
//!   or written-off loans; standardized features with an intercept
//! - LGD: one realized loss fraction per defaulted loan
//! - hazard: `(months on book, defaulted)` per loan with an outcome
//!
//! The three fits share nothing, so they run concurrently.

use nalgebra::DVector;
use tracing::info;

use crate::domain::{LoanRecord, RAW_FEATURES, RiskConfig};
use crate::error::AppError;
use crate::fit::features::FeatureScaler;
use crate::models::{HazardEstimator, HazardFit, LgdEstimator, PdEstimator, PdFitReport};

/// A trained estimator set plus the scaler its PD model was fitted with.
#[derive(Debug, Clone)]
pub struct TrainedModels {
    pub pd: PdEstimator,
    pub lgd: LgdEstimator,
    pub hazard: HazardEstimator,
    pub scaler: FeatureScaler,
}

/// What happened during [`train_models`].
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub loans_used: usize,
    pub loans_skipped: usize,
    pub defaults: usize,
    pub pd: PdFitReport,
    pub lgd_observations: usize,
    pub hazard: HazardFit,
}

/// Fit PD, LGD and hazard estimators on the loans with a known outcome.
pub fn train_models(
    book: &[LoanRecord],
    config: &RiskConfig,
) -> Result<(TrainedModels, TrainingReport), AppError> {
    let loans: Vec<&LoanRecord> = book.iter().filter(|l| l.status.has_outcome()).collect();
    if loans.is_empty() {
        return Err(AppError::new(3, "No loans with an outcome to train on."));
    }

    let rows: Vec<[f64; RAW_FEATURES]> = loans.iter().map(|l| l.features()).collect();
    let labels = DVector::from_iterator(
        loans.len(),
        loans.iter().map(|l| if l.status.is_default() { 1.0 } else { 0.0 }),
    );
    let observed_lgds: Vec<f64> = loans.iter().filter_map(|l| l.observed_lgd()).collect();
    let durations: Vec<f64> = loans.iter().map(|l| l.months_on_book).collect();
    let events: Vec<bool> = loans.iter().map(|l| l.status.is_default()).collect();

    let scaler = FeatureScaler::fit(&rows)?;
    let x = scaler.design_matrix(&rows);

    let mut pd = match config.max_iterations {
        Some(n) => PdEstimator::new().with_max_iterations(n),
        None => PdEstimator::new(),
    };
    let mut lgd = LgdEstimator::with_prior(config.lgd_prior_alpha, config.lgd_prior_beta)?;
    let mut hazard = HazardEstimator::new();

    let (pd_report, hazard_fit) = rayon::join(
        || pd.fit(&x, &labels, config.prior_precision),
        || {
            lgd.update(&observed_lgds);
            hazard.fit(&durations, &events)
        },
    );
    let pd_report = pd_report?;
    let hazard_fit = hazard_fit?;

    let report = TrainingReport {
        loans_used: loans.len(),
        loans_skipped: book.len() - loans.len(),
        defaults: events.iter().filter(|&&e| e).count(),
        pd: pd_report,
        lgd_observations: observed_lgds.len(),
        hazard: hazard_fit,
    };
    info!(
        loans = report.loans_used,
        defaults = report.defaults,
        pd_converged = report.pd.converged,
        lgd_observations = report.lgd_observations,
        "trained credit-risk models"
    );

    Ok((
        TrainedModels {
            pd,
            lgd,
            hazard,
            scaler,
        },
        report,
    ))
}
