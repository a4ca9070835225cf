//! Terminal formatting for training, scoring and prediction output.
//!
//! Formatting lives here so the estimators and the pipeline stay free of
//! presentation concerns.

use crate::domain::{LoanRiskMetric, PredictionResult};
use crate::fit::scoring::LoanPrediction;
use crate::fit::training::{TrainedModels, TrainingReport};
use crate::models::HazardFit;
use crate::report::PortfolioSummary;

/// Summary of a training run and the resulting parameters.
pub fn format_training_summary(report: &TrainingReport, models: &TrainedModels) -> String {
    let mut out = String::new();

    out.push_str("=== cr - Bayesian credit-risk models ===\n");
    out.push_str(&format!(
        "Loans: used={} skipped(pending)={} defaults={}\n",
        report.loans_used, report.loans_skipped, report.defaults
    ));

    out.push_str("\nPD (Laplace logistic regression):\n");
    out.push_str(&format!(
        "- optimizer: iterations={} converged={} -log posterior={:.4}\n",
        report.pd.iterations, report.pd.converged, report.pd.neg_log_posterior
    ));
    if report.pd.covariance_fallback {
        out.push_str("- WARNING: singular Hessian, covariance replaced by 1e-6 * I\n");
    }
    if let Some(post) = models.pd.posterior() {
        let coefs: Vec<f64> = post.mean.iter().copied().collect();
        out.push_str(&format!("- weights (intercept first): {}\n", fmt_vec(&coefs)));
        let sds: Vec<f64> = post.covariance.diagonal().iter().map(|v| v.max(0.0).sqrt()).collect();
        out.push_str(&format!("- posterior sd: {}\n", fmt_vec(&sds)));
    }

    let belief = models.lgd.belief();
    out.push_str("\nLGD (Beta belief):\n");
    out.push_str(&format!(
        "- observations={} alpha={:.4} beta={:.4} mean={:.4}\n",
        report.lgd_observations,
        belief.alpha,
        belief.beta,
        belief.mean()
    ));

    let params = models.hazard.params();
    out.push_str("\nHazard (Weibull):\n");
    match report.hazard {
        HazardFit::Fitted(_) => {}
        HazardFit::InsufficientEvents { uncensored } => out.push_str(&format!(
            "- not fitted: {uncensored} usable default(s), prior kept\n"
        )),
        HazardFit::Degenerate => {
            out.push_str("- not fitted: identical default times, prior kept\n")
        }
    }
    out.push_str(&format!(
        "- shape={:.4} scale={:.4} mean time to default={:.2}\n",
        params.shape,
        params.scale,
        models.hazard.mean_time_to_default()
    ));

    out
}

/// Portfolio totals plus the loans with the largest expected loss.
pub fn format_portfolio(summary: &PortfolioSummary, top: &[LoanRiskMetric]) -> String {
    let mut out = String::new();
    out.push_str("\nPortfolio:\n");
    out.push_str(&format!(
        "- loans={} EAD={:.2} EL={:.2} EL rate={:.4}% weighted PD={:.4}\n",
        summary.loans,
        summary.total_ead,
        summary.total_expected_loss,
        summary.loss_rate() * 100.0,
        summary.weighted_pd
    ));

    if !top.is_empty() {
        out.push_str(&format!("\nTop {} by expected loss:\n", top.len()));
        out.push_str(&format!(
            "{:<10} {:>14} {:>8} {:>19} {:>8} {:>12}\n",
            "loan", "EAD", "PD", "PD 95%", "LGD", "EL"
        ));
        for m in top {
            out.push_str(&format!(
                "{:<10} {:>14.2} {:>8.4} [{:>7.4}, {:>7.4}] {:>8.4} {:>12.2}\n",
                m.loan_id, m.ead, m.pd_mean, m.pd_lower, m.pd_upper, m.lgd_mean, m.expected_loss
            ));
        }
    }
    out
}

/// PD / LGD / EL for one loan.
pub fn format_loan_prediction(pred: &LoanPrediction) -> String {
    let mut out = String::new();
    out.push_str(&format!("PD:  {}\n", fmt_result(&pred.pd)));
    out.push_str(&format!("LGD: {}\n", fmt_result(&pred.lgd)));
    out.push_str(&format!("EAD: {:.2}\n", pred.ead));
    out.push_str(&format!("Expected loss: {:.2}\n", pred.expected_loss));
    out
}

/// Survival probability at `t` with the model's hazard rate.
pub fn format_survival(t: f64, result: &PredictionResult, hazard_rate: f64) -> String {
    format!(
        "S({t}) = {}\nhazard rate at t: {hazard_rate:.6}\n",
        fmt_result(result)
    )
}

pub fn fmt_result(r: &PredictionResult) -> String {
    let params: Vec<String> = r.params.iter().map(|(k, v)| format!("{k}={v:.4}")).collect();
    let mut s = format!(
        "{:.4} [{:.4}, {:.4}] ({})",
        r.mean, r.lower, r.upper, r.distribution
    );
    if !params.is_empty() {
        s.push_str(&format!(" {{{}}}", params.join(", ")));
    }
    s
}

fn fmt_vec(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.4}")).collect();
    format!("[{}]", parts.join(", "))
}
