//! Scoring loans with a trained model set.

use rand::Rng;
use tracing::debug;

use crate::domain::{LoanRecord, LoanRiskMetric, PredictionResult, RAW_FEATURES, RiskConfig};
use crate::error::AppError;
use crate::fit::training::TrainedModels;
use crate::report::expected_loss;

/// PD, LGD and expected loss for a single loan or hypothetical feature set.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanPrediction {
    pub pd: PredictionResult,
    pub lgd: PredictionResult,
    pub ead: f64,
    pub expected_loss: f64,
}

/// Predict from raw features `[principal, monthly_rate, tenure_months, monthly_income]`.
///
/// Exposure at default is taken to be the principal.
pub fn predict_features<R: Rng + ?Sized>(
    models: &TrainedModels,
    features: &[f64],
    n_samples: usize,
    rng: &mut R,
) -> Result<LoanPrediction, AppError> {
    let x = models.scaler.design_row(features)?;
    let pd = models.pd.predict_with_rng(&x, n_samples, rng)?;
    let lgd = models.lgd.predict();
    let ead = features[0];
    Ok(LoanPrediction {
        expected_loss: expected_loss(pd.mean, lgd.mean, ead),
        pd,
        lgd,
        ead,
    })
}

/// Score every loan in the book (pending ones included).
///
/// Rows are scored in parallel; with `config.seed` set the output is
/// reproducible.
pub fn score_portfolio(
    models: &TrainedModels,
    book: &[LoanRecord],
    config: &RiskConfig,
) -> Result<Vec<LoanRiskMetric>, AppError> {
    let rows: Vec<[f64; RAW_FEATURES]> = book.iter().map(LoanRecord::features).collect();
    let x = models.scaler.design_matrix(&rows);
    let seed = config.seed.unwrap_or_else(rand::random);
    let pds = models.pd.predict_each(&x, config.n_samples, seed)?;
    let lgd = models.lgd.predict();

    let metrics: Vec<LoanRiskMetric> = book
        .iter()
        .zip(pds)
        .map(|(loan, pd)| LoanRiskMetric {
            loan_id: loan.loan_id.clone(),
            expected_loss: expected_loss(pd.mean, lgd.mean, loan.ead()),
            pd_mean: pd.mean,
            pd_lower: pd.lower,
            pd_upper: pd.upper,
            lgd_mean: lgd.mean,
            lgd_lower: lgd.lower,
            lgd_upper: lgd.upper,
            ead: loan.ead(),
            hazard_rate: (loan.months_on_book > 0.0)
                .then(|| models.hazard.hazard_rate(loan.months_on_book)),
        })
        .collect();

    debug!(loans = metrics.len(), n_samples = config.n_samples, "scored portfolio");
    Ok(metrics)
}
