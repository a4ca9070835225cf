//! Synthetic loan-book generation for demos and tests.
//!
//! Loans are drawn from a fixed, seeded process so the same seed always yields
//! the same book:
//!
//! - principal and monthly income are log-normal
//! - default probability is logistic in the installment-to-income ratio and the rate
//! - recoveries on defaulted loans are `Beta(2, 3)` fractions of principal
//! - months to default are Weibull, capped at the tenure

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{Beta, LogNormal, Weibull};

use crate::domain::{LoanRecord, LoanStatus};
use crate::error::AppError;
use crate::math::sigmoid;

const TENURES: [f64; 5] = [6.0, 12.0, 18.0, 24.0, 36.0];

const PENDING_SHARE: f64 = 0.05;
const WRITTEN_OFF_SHARE: f64 = 0.2;
const PAID_OFF_SHARE: f64 = 0.4;

/// Generate `count` loans from `seed`.
pub fn generate_loan_book(count: usize, seed: u64) -> Result<Vec<LoanRecord>, AppError> {
    if count == 0 {
        return Err(AppError::new(2, "Loan count must be > 0."));
    }

    let dist_err =
        |e: &dyn std::fmt::Display| AppError::new(4, format!("Sample distribution error: {e}"));
    let principal_dist = LogNormal::new(200_000f64.ln(), 0.6).map_err(|e| dist_err(&e))?;
    let income_dist = LogNormal::new(120_000f64.ln(), 0.5).map_err(|e| dist_err(&e))?;
    let recovery_dist = Beta::new(2.0, 3.0).map_err(|e| dist_err(&e))?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut book = Vec::with_capacity(count);

    for i in 0..count {
        let principal = principal_dist.sample(&mut rng).round();
        let monthly_income = income_dist.sample(&mut rng).round();
        let monthly_rate = rng.gen_range(0.03..0.08);
        let tenure_months = TENURES[rng.gen_range(0..TENURES.len())];

        let installment = principal * (1.0 + monthly_rate * tenure_months) / tenure_months;
        let burden = installment / monthly_income;
        let pd = sigmoid(-4.0 + 8.0 * burden + 25.0 * (monthly_rate - 0.05));

        let (status, recovered, months_on_book) = if rng.gen_bool(PENDING_SHARE) {
            (LoanStatus::Pending, 0.0, 0.0)
        } else if rng.gen_bool(pd) {
            let status = if rng.gen_bool(WRITTEN_OFF_SHARE) {
                LoanStatus::WrittenOff
            } else {
                LoanStatus::Defaulted
            };
            let recovered = (recovery_dist.sample(&mut rng) * principal).round();
            let time_dist = Weibull::new(0.6 * tenure_months, 1.4).map_err(|e| dist_err(&e))?;
            let months = time_dist.sample(&mut rng).ceil().clamp(1.0, tenure_months);
            (status, recovered, months)
        } else if rng.gen_bool(PAID_OFF_SHARE) {
            (LoanStatus::PaidOff, 0.0, tenure_months)
        } else {
            let months = rng.gen_range(1..=tenure_months as u32) as f64;
            (LoanStatus::Active, 0.0, months)
        };

        book.push(LoanRecord {
            loan_id: format!("LN-{:05}", i + 1),
            principal,
            monthly_rate,
            tenure_months,
            monthly_income,
            status,
            recovered,
            months_on_book,
        });
    }

    Ok(book)
}
