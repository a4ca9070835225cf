//! Caller-side orchestration around the estimators.
//!
//! Responsibilities:
//!
//! - standardize raw loan features and prepend the intercept
//! - train PD / LGD / hazard estimators from a loan book
//! - score single loans and whole portfolios

pub mod features;
pub mod scoring;
pub mod training;

pub use features::*;
pub use scoring::*;
pub use training::*;
