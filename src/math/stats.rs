//! Sample moments and percentiles.

use std::cmp::Ordering;

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance (divides by `n`, not `n - 1`).
pub fn population_variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some(ss / values.len() as f64)
}

/// Population standard deviation.
pub fn population_std(values: &[f64]) -> Option<f64> {
    population_variance(values).map(f64::sqrt)
}

/// The `q`-th percentile (`q` in `[0, 100]`) using linear interpolation between
/// closest ranks.
///
/// Sorts `values` in place. Returns `None` for an empty slice or `q` outside
/// `[0, 100]`.
pub fn percentile_mut(values: &mut [f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=100.0).contains(&q) {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    percentile_sorted(values, q)
}

/// Same as [`percentile_mut`] for data already sorted ascending.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=100.0).contains(&q) {
        return None;
    }
    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn percentile_interpolates_between_ranks() {
        let mut v = vec![4.0, 1.0, 3.0, 2.0, 5.0];
        assert_relative_eq!(percentile_mut(&mut v, 50.0).unwrap(), 3.0);
        assert_relative_eq!(percentile_sorted(&v, 0.0).unwrap(), 1.0);
        assert_relative_eq!(percentile_sorted(&v, 100.0).unwrap(), 5.0);
        // pos = 0.025 * 4 = 0.1 -> 1.0 + 0.1 * (2.0 - 1.0)
        assert_relative_eq!(percentile_sorted(&v, 2.5).unwrap(), 1.1);
    }

    #[test]
    fn percentile_rejects_empty_and_out_of_range() {
        assert!(percentile_mut(&mut [], 50.0).is_none());
        assert!(percentile_sorted(&[1.0], 101.0).is_none());
    }

    #[test]
    fn variance_divides_by_n() {
        let v = [0.2, 0.4, 0.6];
        assert_relative_eq!(mean(&v).unwrap(), 0.4);
        assert_relative_eq!(population_variance(&v).unwrap(), 0.08 / 3.0, epsilon = 1e-15);
        assert_relative_eq!(population_variance(&[0.4; 10]).unwrap(), 0.0, epsilon = 1e-15);
    }
}
