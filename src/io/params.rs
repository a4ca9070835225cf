//! Read/write model JSON snapshots.
//!
//! A snapshot is the portable form of a trained model set: the PD posterior
//! (absent when the model was never fitted), the LGD belief, the Weibull
//! parameters and the feature scaler the PD weights expect.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BetaBelief, PosteriorWeights, RAW_FEATURES, WeibullParams};
use crate::error::AppError;
use crate::fit::features::FeatureScaler;
use crate::fit::training::TrainedModels;
use crate::models::{HazardEstimator, LgdEstimator, PdEstimator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub tool: String,
    pub trained_at: DateTime<Utc>,
    pub scaler: FeatureScaler,
    pub pd: Option<PosteriorWeights>,
    pub lgd: BetaBelief,
    pub hazard: WeibullParams,
}

impl ModelSnapshot {
    pub fn from_models(models: &TrainedModels, trained_at: DateTime<Utc>) -> Self {
        Self {
            tool: "cr".to_string(),
            trained_at,
            scaler: models.scaler.clone(),
            pd: models.pd.posterior().cloned(),
            lgd: models.lgd.belief(),
            hazard: models.hazard.params(),
        }
    }

    /// Rebuild estimators, validating every parameter on the way in.
    pub fn into_models(self) -> Result<TrainedModels, AppError> {
        if self.scaler.mean.len() != RAW_FEATURES || self.scaler.std.len() != RAW_FEATURES {
            return Err(AppError::new(
                2,
                format!("Snapshot scaler must cover {RAW_FEATURES} features."),
            ));
        }
        if self.scaler.std.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(AppError::new(2, "Snapshot scaler has a non-positive std."));
        }

        let pd = match self.pd {
            Some(posterior) => {
                if posterior.n_features() != RAW_FEATURES + 1 {
                    return Err(AppError::new(
                        2,
                        format!(
                            "Snapshot PD weights have {} entries, expected {}.",
                            posterior.n_features(),
                            RAW_FEATURES + 1
                        ),
                    ));
                }
                PdEstimator::from_posterior(posterior)?
            }
            None => PdEstimator::new(),
        };

        Ok(TrainedModels {
            pd,
            lgd: LgdEstimator::from_belief(self.lgd)?,
            hazard: HazardEstimator::from_params(self.hazard)?,
            scaler: self.scaler,
        })
    }
}

/// Write a model JSON file.
pub fn write_model_json(path: &Path, snapshot: &ModelSnapshot) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(2, format!("Failed to create model JSON '{}': {e}", path.display()))
    })?;
    serde_json::to_writer_pretty(file, snapshot)
        .map_err(|e| AppError::new(2, format!("Failed to write model JSON: {e}")))?;
    Ok(())
}

/// Read a model JSON file.
pub fn read_model_json(path: &Path) -> Result<ModelSnapshot, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(2, format!("Failed to open model JSON '{}': {e}", path.display()))
    })?;
    let snapshot: ModelSnapshot = serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid model JSON: {e}")))?;
    Ok(snapshot)
}
