//! Numerical solvers
//!
//! Pure math shared by the finance, statistics and matrix formulas. Every loop
//! is bounded by a compile-time cap.

pub mod amortization;
pub mod linalg;
pub mod newton;
pub mod regression;

pub use linalg::Matrix;
pub use newton::{find_root, Root};
pub use regression::LinearFit;
