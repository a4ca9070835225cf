//! Unconstrained quasi-Newton minimization (BFGS).
//!
//! The objective returns its value and gradient together, since for the models
//! in this crate both come out of the same pass over the data.
//!
//! Termination never raises: when the iteration cap is hit or the line search
//! cannot make progress, the best iterate found so far is returned with
//! `converged = false`.

use nalgebra::{DMatrix, DVector};

/// Armijo sufficient-decrease constant for the backtracking line search.
const ARMIJO_C1: f64 = 1e-4;

/// Smallest step the line search will try before giving up.
const MIN_STEP: f64 = 1e-16;

/// Options for [`minimize_bfgs`].
#[derive(Debug, Clone, Copy)]
pub struct BfgsOptions {
    /// Converged once the max-norm of the gradient falls below this.
    pub gtol: f64,
    /// Hard cap on iterations.
    pub max_iterations: usize,
}

impl BfgsOptions {
    /// Defaults scaled to the problem dimension (`200 × dim` iterations).
    pub fn for_dimension(dim: usize) -> Self {
        Self {
            gtol: 1e-5,
            max_iterations: 200 * dim.max(1),
        }
    }
}

/// Outcome of a minimization run.
#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: DVector<f64>,
    pub value: f64,
    pub gradient: DVector<f64>,
    pub iterations: usize,
    pub converged: bool,
}

/// Minimize `objective` starting from `x0` with BFGS and a backtracking line search.
pub fn minimize_bfgs<F>(objective: F, x0: DVector<f64>, opts: &BfgsOptions) -> Minimum
where
    F: Fn(&DVector<f64>) -> (f64, DVector<f64>),
{
    let n = x0.len();
    let identity = DMatrix::<f64>::identity(n, n);

    let mut x = x0;
    let (mut fx, mut g) = objective(&x);
    let mut h_inv = identity.clone();
    let mut iterations = 0;

    if !fx.is_finite() {
        return Minimum {
            x,
            value: fx,
            gradient: g,
            iterations,
            converged: false,
        };
    }

    while iterations < opts.max_iterations {
        if g.amax() <= opts.gtol {
            return Minimum {
                x,
                value: fx,
                gradient: g,
                iterations,
                converged: true,
            };
        }

        let mut direction = -(&h_inv * &g);
        let mut slope = g.dot(&direction);
        if !(slope < 0.0) {
            // Curvature estimate went bad; restart from steepest descent.
            h_inv = identity.clone();
            direction = -g.clone();
            slope = -g.dot(&g);
        }

        let mut step = 1.0;
        let accepted = loop {
            let x_new = &x + &direction * step;
            let (f_new, g_new) = objective(&x_new);
            if f_new.is_finite() && f_new <= fx + ARMIJO_C1 * step * slope {
                break Some((x_new, f_new, g_new));
            }
            step *= 0.5;
            if step < MIN_STEP {
                break None;
            }
        };

        let Some((x_new, f_new, g_new)) = accepted else {
            break;
        };

        let s = &x_new - &x;
        let y = &g_new - &g;
        let sy = s.dot(&y);
        if sy > 1e-12 {
            let rho = 1.0 / sy;
            let left = &identity - &s * y.transpose() * rho;
            let right = &identity - &y * s.transpose() * rho;
            h_inv = &left * &h_inv * &right + &s * s.transpose() * rho;
        }

        x = x_new;
        fx = f_new;
        g = g_new;
        iterations += 1;
    }

    let converged = g.amax() <= opts.gtol;
    Minimum {
        x,
        value: fx,
        gradient: g,
        iterations,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rosenbrock(v: &DVector<f64>) -> (f64, DVector<f64>) {
        let (a, b) = (v[0], v[1]);
        let f = (1.0 - a).powi(2) + 100.0 * (b - a * a).powi(2);
        let ga = -2.0 * (1.0 - a) - 400.0 * a * (b - a * a);
        let gb = 200.0 * (b - a * a);
        (f, DVector::from_vec(vec![ga, gb]))
    }

    #[test]
    fn minimizes_shifted_quadratic() {
        let f = |v: &DVector<f64>| {
            let d = v - DVector::from_vec(vec![2.0, -3.0]);
            (d.dot(&d), 2.0 * d)
        };
        let min = minimize_bfgs(f, DVector::zeros(2), &BfgsOptions::for_dimension(2));
        assert!(min.converged);
        assert_relative_eq!(min.x[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(min.x[1], -3.0, epsilon = 1e-6);
    }

    #[test]
    fn minimizes_rosenbrock() {
        let opts = BfgsOptions {
            gtol: 1e-5,
            max_iterations: 2_000,
        };
        let min = minimize_bfgs(rosenbrock, DVector::from_vec(vec![-1.2, 1.0]), &opts);
        assert!(min.converged, "stopped after {} iterations", min.iterations);
        assert_relative_eq!(min.x[0], 1.0, epsilon = 1e-3);
        assert_relative_eq!(min.x[1], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn iteration_cap_returns_best_iterate() {
        let opts = BfgsOptions {
            gtol: 1e-12,
            max_iterations: 3,
        };
        let start = DVector::from_vec(vec![-1.2, 1.0]);
        let (f0, _) = rosenbrock(&start);
        let min = minimize_bfgs(rosenbrock, start, &opts);
        assert!(!min.converged);
        assert_eq!(min.iterations, 3);
        assert!(min.value < f0);
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let opts = BfgsOptions::for_dimension(2);
        let a = minimize_bfgs(rosenbrock, DVector::from_vec(vec![0.0, 0.0]), &opts);
        let b = minimize_bfgs(rosenbrock, DVector::from_vec(vec![0.0, 0.0]), &opts);
        assert_eq!(a.x, b.x);
        assert_eq!(a.iterations, b.iterations);
    }
}
