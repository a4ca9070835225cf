//! Feature standardization and design-matrix assembly.
//!
//! Raw loan features live on wildly different scales (principal in currency
//! units, rates as fractions), so each column is standardized with the
//! training mean and population standard deviation before an all-ones
//! intercept column is prepended. The same scaler must be used at predict time
//! so the column order and scaling match the fit.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::domain::{FEATURE_NAMES, RAW_FEATURES};
use crate::error::AppError;
use crate::math::{mean, population_std};

/// Added to each standard deviation so constant columns do not divide by zero.
const STD_EPS: f64 = 1e-8;

/// Per-column standardization learned from the training book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl FeatureScaler {
    /// Identity scaling (used before any training data exists).
    pub fn identity() -> Self {
        Self {
            mean: vec![0.0; RAW_FEATURES],
            std: vec![1.0; RAW_FEATURES],
        }
    }

    pub fn fit(rows: &[[f64; RAW_FEATURES]]) -> Result<Self, AppError> {
        if rows.is_empty() {
            return Err(AppError::new(3, "Cannot fit feature scaler on an empty book."));
        }
        let mut means = Vec::with_capacity(RAW_FEATURES);
        let mut stds = Vec::with_capacity(RAW_FEATURES);
        for j in 0..RAW_FEATURES {
            let column: Vec<f64> = rows.iter().map(|r| r[j]).collect();
            if column.iter().any(|v| !v.is_finite()) {
                return Err(AppError::new(
                    2,
                    format!("Non-finite value in feature '{}'.", FEATURE_NAMES[j]),
                ));
            }
            // Both are Some: the column is non-empty.
            means.push(mean(&column).unwrap_or(0.0));
            stds.push(population_std(&column).unwrap_or(0.0) + STD_EPS);
        }
        Ok(Self {
            mean: means,
            std: stds,
        })
    }

    /// Standardized design matrix with the intercept in column 0.
    pub fn design_matrix(&self, rows: &[[f64; RAW_FEATURES]]) -> DMatrix<f64> {
        DMatrix::from_fn(rows.len(), RAW_FEATURES + 1, |i, j| {
            if j == 0 {
                1.0
            } else {
                (rows[i][j - 1] - self.mean[j - 1]) / self.std[j - 1]
            }
        })
    }

    /// Single-row design matrix for a hypothetical loan.
    pub fn design_row(&self, features: &[f64]) -> Result<DMatrix<f64>, AppError> {
        let row: [f64; RAW_FEATURES] = features.try_into().map_err(|_| {
            AppError::new(
                2,
                format!(
                    "Expected {RAW_FEATURES} features [{}], got {}.",
                    FEATURE_NAMES.join(", "),
                    features.len()
                ),
            )
        })?;
        Ok(self.design_matrix(&[row]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn standardizes_columns_and_prepends_intercept() {
        let rows = [[100.0, 0.1, 12.0, 50.0], [300.0, 0.3, 24.0, 50.0]];
        let scaler = FeatureScaler::fit(&rows).unwrap();
        let x = scaler.design_matrix(&rows);
        assert_eq!(x.shape(), (2, 5));
        assert_eq!(x.column(0).iter().copied().collect::<Vec<_>>(), vec![1.0, 1.0]);
        assert_relative_eq!(x[(0, 1)], -1.0, epsilon = 1e-8);
        assert_relative_eq!(x[(1, 1)], 1.0, epsilon = 1e-8);
        // Constant column maps to zero rather than NaN.
        assert_eq!(x[(0, 4)], 0.0);
    }

    #[test]
    fn design_row_requires_four_features() {
        let scaler = FeatureScaler::identity();
        assert!(scaler.design_row(&[1.0, 2.0, 3.0]).is_err());
        let x = scaler.design_row(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(x.shape(), (1, 5));
        assert_eq!(x[(0, 4)], 4.0);
    }

    #[test]
    fn empty_book_is_insufficient_data() {
        let err = FeatureScaler::fit(&[]).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
