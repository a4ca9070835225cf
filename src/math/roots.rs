//! Safeguarded Newton root finding on a bracket.
//!
//! Newton steps are taken while they stay inside the current bracket; any step
//! that would leave it (or a zero derivative) is replaced by a bisection step.
//! The bracket shrinks every iteration, so the method cannot diverge.

/// Options for [`newton_bracketed`].
#[derive(Debug, Clone, Copy)]
pub struct RootOptions {
    /// Absolute tolerance on `|f(x)|`.
    pub ftol: f64,
    /// Relative tolerance on the step size.
    pub xtol: f64,
    pub max_iterations: usize,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            ftol: 1e-12,
            xtol: 1e-12,
            max_iterations: 200,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Root {
    pub x: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Find a root of `f` on `[a, b]`, where `f` returns `(value, derivative)`.
///
/// Returns `None` when `f(a)` and `f(b)` do not bracket a sign change or are
/// not finite. Running out of iterations returns the last iterate with
/// `converged = false`.
pub fn newton_bracketed<F>(f: F, a: f64, b: f64, opts: &RootOptions) -> Option<Root>
where
    F: Fn(f64) -> (f64, f64),
{
    let (fa, _) = f(a);
    let (fb, _) = f(b);
    if !(fa.is_finite() && fb.is_finite()) {
        return None;
    }
    if fa == 0.0 {
        return Some(Root { x: a, iterations: 0, converged: true });
    }
    if fb == 0.0 {
        return Some(Root { x: b, iterations: 0, converged: true });
    }
    if fa.signum() == fb.signum() {
        return None;
    }

    // Orient so that f(neg) < 0 < f(pos).
    let (mut neg, mut pos) = if fa < 0.0 { (a, b) } else { (b, a) };
    let mut x = 0.5 * (a + b);

    for iteration in 1..=opts.max_iterations {
        let (fx, dfx) = f(x);
        if !fx.is_finite() {
            return None;
        }
        if fx.abs() <= opts.ftol {
            return Some(Root { x, iterations: iteration, converged: true });
        }
        if fx < 0.0 {
            neg = x;
        } else {
            pos = x;
        }

        let (lo, hi) = if neg < pos { (neg, pos) } else { (pos, neg) };
        let newton = x - fx / dfx;
        let next = if dfx != 0.0 && newton.is_finite() && newton > lo && newton < hi {
            newton
        } else {
            0.5 * (lo + hi)
        };

        if (next - x).abs() <= opts.xtol * (1.0 + x.abs()) {
            return Some(Root { x: next, iterations: iteration, converged: true });
        }
        x = next;
    }

    Some(Root {
        x,
        iterations: opts.max_iterations,
        converged: false,
    })
}
