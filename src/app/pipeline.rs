//! Shared "train and score" pipeline used by the `train` and `demo` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! loan book -> train estimators -> score every loan -> portfolio summary
//!
//! The commands can then focus on where the book comes from and on presentation.

use tracing::info;

use crate::domain::{LoanRecord, LoanRiskMetric, RiskConfig};
use crate::error::AppError;
use crate::fit::scoring::score_portfolio;
use crate::fit::training::{TrainedModels, TrainingReport, train_models};
use crate::report::{PortfolioSummary, summarize_portfolio};

/// All computed outputs of a single training run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub models: TrainedModels,
    pub report: TrainingReport,
    pub metrics: Vec<LoanRiskMetric>,
    pub summary: PortfolioSummary,
}

/// Train on `book` and score every loan in it with the trained models.
pub fn run_train(book: &[LoanRecord], config: &RiskConfig) -> Result<RunOutput, AppError> {
    let (models, report) = train_models(book, config)?;
    let metrics = score_portfolio(&models, book, config)?;
    let summary = summarize_portfolio(&metrics);

    info!(
        loans = summary.loans,
        total_ead = summary.total_ead,
        total_expected_loss = summary.total_expected_loss,
        "scored book"
    );

    Ok(RunOutput {
        models,
        report,
        metrics,
        summary,
    })
}
