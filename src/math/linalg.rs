//! Dense linear algebra helpers on top of `nalgebra`.
//!
//! Both helpers are total: a failed decomposition is reported through the
//! return value, never through a panic.

use nalgebra::{DMatrix, DVector};

/// Invert a square matrix.
///
/// Returns `None` when the matrix is not square, is singular, or when the
/// inverse contains non-finite entries.
pub fn try_invert(m: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if !m.is_square() || m.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let inv = m.clone().try_inverse()?;
    if inv.iter().all(|v| v.is_finite()) {
        Some(inv)
    } else {
        None
    }
}

/// A factor `L` with `L·Lᵀ = cov`, used to turn standard normal draws into
/// draws from `N(μ, cov)`.
///
/// Cholesky is tried first. Covariances that are only positive semi-definite
/// (or slightly indefinite from round-off) fall back to a symmetric eigen
/// decomposition with negative eigenvalues clamped to zero.
pub fn sampling_factor(cov: &DMatrix<f64>) -> DMatrix<f64> {
    if let Some(chol) = cov.clone().cholesky() {
        return chol.l();
    }
    let eig = cov.clone().symmetric_eigen();
    let roots = DVector::from_iterator(
        eig.eigenvalues.len(),
        eig.eigenvalues.iter().map(|&v| v.max(0.0).sqrt()),
    );
    eig.eigenvectors * DMatrix::from_diagonal(&roots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn inverts_well_conditioned_matrix() {
        let m = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let inv = try_invert(&m).unwrap();
        let id = &m * &inv;
        assert_relative_eq!(id, DMatrix::identity(2, 2), epsilon = 1e-12);
    }

    #[test]
    fn singular_matrix_is_reported_not_panicked() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert!(try_invert(&m).is_none());
        assert!(try_invert(&DMatrix::zeros(3, 3)).is_none());
        assert!(try_invert(&DMatrix::zeros(2, 3)).is_none());
    }

    #[test]
    fn sampling_factor_reproduces_covariance() {
        let cov = DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]);
        let l = sampling_factor(&cov);
        assert_relative_eq!(&l * l.transpose(), cov, epsilon = 1e-12);
    }

    #[test]
    fn sampling_factor_handles_semidefinite_covariance() {
        // Rank one: cholesky fails, eigen fallback must still reproduce it.
        let cov = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let l = sampling_factor(&cov);
        assert_relative_eq!(&l * l.transpose(), cov, epsilon = 1e-10);
    }
}
