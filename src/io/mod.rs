//! Input/output helpers.
//!
//! - CSV loan-book ingest + validation (`ingest`)
//! - per-loan metrics export (`export`)
//! - model JSON read/write (`params`)

pub mod export;
pub mod ingest;
pub mod params;

pub use export::*;
pub use ingest::*;
pub use params::*;
