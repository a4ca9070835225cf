//! Reporting utilities: expected loss, portfolio aggregation, and formatted
//! terminal output.

pub mod format;

pub use format::*;

use crate::domain::LoanRiskMetric;

/// `EL = PD × LGD × EAD`.
pub fn expected_loss(pd: f64, lgd: f64, ead: f64) -> f64 {
    pd * lgd * ead
}

/// Portfolio-level totals over scored loans.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSummary {
    pub loans: usize,
    pub total_ead: f64,
    pub total_expected_loss: f64,
    /// EAD-weighted average PD.
    pub weighted_pd: f64,
}

impl PortfolioSummary {
    /// Expected loss as a fraction of exposure.
    pub fn loss_rate(&self) -> f64 {
        if self.total_ead > 0.0 {
            self.total_expected_loss / self.total_ead
        } else {
            0.0
        }
    }
}

pub fn summarize_portfolio(metrics: &[LoanRiskMetric]) -> PortfolioSummary {
    let total_ead: f64 = metrics.iter().map(|m| m.ead).sum();
    let total_expected_loss = metrics.iter().map(|m| m.expected_loss).sum();
    let weighted_pd = if total_ead > 0.0 {
        metrics.iter().map(|m| m.pd_mean * m.ead).sum::<f64>() / total_ead
    } else {
        0.0
    };
    PortfolioSummary {
        loans: metrics.len(),
        total_ead,
        total_expected_loss,
        weighted_pd,
    }
}

/// Loans with the largest expected loss, descending.
pub fn top_by_expected_loss(metrics: &[LoanRiskMetric], top_n: usize) -> Vec<LoanRiskMetric> {
    let mut sorted = metrics.to_vec();
    sorted.sort_by(|a, b| b.expected_loss.total_cmp(&a.expected_loss));
    sorted.truncate(top_n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn metric(id: &str, pd: f64, ead: f64) -> LoanRiskMetric {
        LoanRiskMetric {
            loan_id: id.to_string(),
            pd_mean: pd,
            pd_lower: pd,
            pd_upper: pd,
            lgd_mean: 0.5,
            lgd_lower: 0.5,
            lgd_upper: 0.5,
            ead,
            expected_loss: expected_loss(pd, 0.5, ead),
            hazard_rate: None,
        }
    }

    #[test]
    fn summary_weights_pd_by_exposure() {
        let metrics = [metric("a", 0.1, 100.0), metric("b", 0.3, 300.0)];
        let summary = summarize_portfolio(&metrics);
        assert_eq!(summary.loans, 2);
        assert_relative_eq!(summary.total_ead, 400.0);
        assert_relative_eq!(summary.total_expected_loss, 5.0 + 45.0);
        assert_relative_eq!(summary.weighted_pd, 0.25);
        assert_relative_eq!(summary.loss_rate(), 0.125);
    }

    #[test]
    fn empty_portfolio_has_zero_rates() {
        let summary = summarize_portfolio(&[]);
        assert_eq!(summary.weighted_pd, 0.0);
        assert_eq!(summary.loss_rate(), 0.0);
    }

    #[test]
    fn top_by_expected_loss_sorts_descending() {
        let metrics = [metric("a", 0.1, 100.0), metric("b", 0.3, 300.0), metric("c", 0.2, 50.0)];
        let top = top_by_expected_loss(&metrics, 2);
        let ids: Vec<_> = top.iter().map(|m| m.loan_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
