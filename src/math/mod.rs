//! Numeric primitives: stable logistic functions, moments/percentiles, dense
//! linear algebra, BFGS minimization and bracketed root finding.

pub mod linalg;
pub mod optim;
pub mod roots;
pub mod stable;
pub mod stats;

pub use linalg::*;
pub use optim::*;
pub use roots::*;
pub use stable::*;
pub use stats::*;
