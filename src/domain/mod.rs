//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - the uniform prediction output (`PredictionResult`, `Distribution`)
//! - per-estimator parameter state (`PosteriorWeights`, `BetaBelief`, `WeibullParams`)
//! - loan-book records and per-loan risk metrics
//! - run configuration (`RiskConfig`)

pub mod types;

pub use types::*;
