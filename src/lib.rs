//! `credit-risk` library crate.
//!
//! Bayesian estimators for probability of default (Laplace-approximated
//! logistic regression), loss given default (Beta belief) and time to default
//! (Weibull), plus the loan-book plumbing around them.
//!
//! The binary (`cr`) is a thin wrapper around this library so that core logic
//! is testable without spawning processes.

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
