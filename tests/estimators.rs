use std::sync::{Arc, RwLock};

use approx::assert_abs_diff_eq;
use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand::rngs::StdRng;

use credit_risk::domain::Distribution;
use credit_risk::error::EstimateError;
use credit_risk::math::population_variance;
use credit_risk::models::{HazardEstimator, HazardFit, LgdEstimator, PdEstimator};

/// Intercept plus one feature; label 1 exactly when the feature is positive.
fn separable() -> (DMatrix<f64>, DVector<f64>) {
    let xs: Vec<f64> = (0..20).map(|i| -4.75 + 0.5 * i as f64).collect();
    let x = DMatrix::from_fn(20, 2, |r, c| if c == 0 { 1.0 } else { xs[r] });
    let y = DVector::from_iterator(20, xs.iter().map(|&v| if v > 0.0 { 1.0 } else { 0.0 }));
    (x, y)
}

fn fitted_pd() -> PdEstimator {
    let (x, y) = separable();
    let mut pd = PdEstimator::new();
    pd.fit(&x, &y, 1.0).unwrap();
    pd
}

#[test]
fn pd_separates_held_out_rows() {
    let pd = fitted_pd();

    let high = pd.predict_row(&[1.0, 8.0], 2000).unwrap();
    let low = pd.predict_row(&[1.0, -8.0], 2000).unwrap();

    assert!(high.mean > 0.8, "high side mean {}", high.mean);
    assert!(low.mean < 0.2, "low side mean {}", low.mean);
    for r in [&high, &low] {
        assert_eq!(r.distribution, Distribution::PosteriorPredictive);
        assert!(r.lower <= r.mean && r.mean <= r.upper);
        assert!(r.mean > 0.0 && r.mean < 1.0);
        assert_eq!(r.param("n_samples"), Some(2000.0));
    }
}

#[test]
fn pd_fit_is_deterministic() {
    let a = fitted_pd();
    let b = fitted_pd();
    assert_eq!(a.posterior(), b.posterior());
}

#[test]
fn untrained_pd_returns_fallback() {
    let r = PdEstimator::new().predict_row(&[1.0, 3.0], 100).unwrap();
    assert_eq!((r.mean, r.lower, r.upper), (0.05, 0.01, 0.10));
    assert_eq!(r.distribution, Distribution::Beta);
    assert!(r.params.is_empty());
}

#[test]
fn pd_rejects_wrong_feature_width() {
    let err = fitted_pd().predict_row(&[1.0, 2.0, 3.0], 100).unwrap_err();
    assert!(matches!(err, EstimateError::ShapeMismatch { expected: 2, actual: 3, .. }));
}

#[test]
fn more_samples_tighten_repeated_estimates() {
    let pd = fitted_pd();
    let row = DMatrix::from_row_slice(1, 2, &[1.0, 0.25]);
    let mut rng = StdRng::seed_from_u64(99);

    let mut spread = |n: usize| {
        let means: Vec<f64> = (0..20)
            .map(|_| pd.predict_with_rng(&row, n, &mut rng).unwrap().mean)
            .collect();
        population_variance(&means).unwrap()
    };

    let coarse = spread(100);
    let fine = spread(10_000);
    assert!(fine < coarse, "variance {fine} should be below {coarse}");
}

#[test]
fn lgd_default_prior_mean_is_half() {
    let r = LgdEstimator::new().predict();
    assert_eq!(r.mean, 0.5);
    assert_eq!(r.distribution, Distribution::Beta);
    assert!(r.lower < 0.5 && r.upper > 0.5);
}

#[test]
fn lgd_identical_observations_pull_mean() {
    let mut lgd = LgdEstimator::new();
    lgd.update(&[0.4; 10]);
    let r = lgd.predict();
    assert!(r.mean < 0.5 && r.mean > 0.4);
    assert!(r.lower <= r.mean && r.mean <= r.upper);
}

#[test]
fn hazard_survival_at_scale_is_inverse_e() {
    let mut hazard = HazardEstimator::new();
    let fit = hazard
        .fit(&[10.0, 20.0, 30.0, 40.0, 50.0], &[true; 5])
        .unwrap();
    let HazardFit::Fitted(params) = fit else {
        panic!("expected a fit, got {fit:?}");
    };
    assert!(params.shape > 0.0 && params.scale > 0.0);

    let at_scale = hazard.predict_survival(params.scale);
    assert_abs_diff_eq!(at_scale.mean, (-1.0f64).exp(), epsilon = 1e-9);
    assert_eq!(at_scale.distribution, Distribution::Weibull);
    assert_eq!(hazard.predict_survival(0.0).mean, 1.0);
}

#[test]
fn hazard_with_one_default_keeps_prior() {
    let mut hazard = HazardEstimator::new();
    hazard.fit(&[5.0, 9.0, 12.0], &[true, false, false]).unwrap();
    let params = hazard.params();
    assert_eq!((params.shape, params.scale), (1.0, 1.0));
    assert_eq!(hazard.predict_survival(0.0).mean, 1.0);
}

#[test]
fn concurrent_readers_share_a_fitted_estimator() {
    let shared = Arc::new(RwLock::new(PdEstimator::new()));
    {
        let (x, y) = separable();
        let mut writer = shared.write().unwrap();
        writer.fit(&x, &y, 1.0).unwrap();
    }

    let row = DMatrix::from_row_slice(1, 2, &[1.0, 1.5]);
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = Arc::clone(&shared);
                let row = row.clone();
                scope.spawn(move || {
                    let pd = shared.read().unwrap();
                    let mut rng = StdRng::seed_from_u64(7);
                    pd.predict_with_rng(&row, 500, &mut rng).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for r in &results[1..] {
        assert_eq!(r, &results[0]);
    }
}
