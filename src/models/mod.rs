//! The three credit-risk estimators.
//!
//! Each estimator owns its parameter state exclusively. Fitting takes
//! `&mut self` and prediction `&self`, so sharing one instance across threads
//! means wrapping it in a lock (e.g. `RwLock`) owned by the caller: many
//! concurrent predictions, one writer at a time. The three estimators share
//! nothing and can be trained or queried independently.

pub mod hazard;
pub mod lgd;
pub mod pd;

pub use hazard::{HazardEstimator, HazardFit};
pub use lgd::LgdEstimator;
pub use pd::{PdEstimator, PdFitReport};
