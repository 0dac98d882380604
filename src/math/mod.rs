//! Mathematical utilities: least squares (batch and recursive) and orthogonalization.

pub mod ols;
pub mod ortho;
pub mod rls;

pub use ols::*;
pub use ortho::OrthoBasis;
pub use rls::RecursiveLeastSquares;
