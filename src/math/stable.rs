//! Numerically stable logistic functions.
//!
//! The PD likelihood is written in terms of logits `z = x·w`:
//!
//! - `log p     = -softplus(-z)`
//! - `log (1-p) = -softplus(z)`
//!
//! where `softplus(x) = ln(1 + e^x)`. Evaluating `ln(1 + e^x)` directly overflows
//! for large positive `x` and loses all precision for large negative `x`, so we
//! use the log-sum-exp form `max(x, 0) + ln(1 + e^{-|x|})`.

/// Logistic function `1 / (1 + e^{-z})`.
///
/// Split on the sign of `z` so neither branch ever exponentiates a large
/// positive number.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// `ln(1 + e^x)` without overflow.
pub fn softplus(x: f64) -> f64 {
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

/// `ln sigmoid(z)`.
pub fn log_sigmoid(z: f64) -> f64 {
    -softplus(-z)
}

/// `ln (1 - sigmoid(z))`.
pub fn log1m_sigmoid(z: f64) -> f64 {
    -softplus(z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sigmoid_symmetry_and_midpoint() {
        assert_relative_eq!(sigmoid(0.0), 0.5);
        for &z in &[0.1, 1.0, 5.0, 30.0] {
            assert_relative_eq!(sigmoid(z) + sigmoid(-z), 1.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn softplus_does_not_overflow() {
        assert_relative_eq!(softplus(1000.0), 1000.0);
        assert!(softplus(-1000.0) >= 0.0);
        assert!(softplus(-1000.0) < 1e-300);
        assert_relative_eq!(softplus(0.0), std::f64::consts::LN_2);
    }

    #[test]
    fn log_probabilities_match_direct_form_in_safe_range() {
        for &z in &[-8.0_f64, -1.0, 0.0, 0.5, 3.0, 8.0] {
            let p = 1.0 / (1.0 + (-z).exp());
            assert_relative_eq!(log_sigmoid(z), p.ln(), epsilon = 1e-12);
            assert_relative_eq!(log1m_sigmoid(z), (1.0 - p).ln(), epsilon = 1e-12);
        }
    }

    #[test]
    fn log_probabilities_stay_finite_for_extreme_logits() {
        assert!(log_sigmoid(-800.0).is_finite());
        assert!(log1m_sigmoid(800.0).is_finite());
        assert_relative_eq!(log_sigmoid(-800.0), -800.0);
    }
}
