//! Model structure search and fitting.
//!
//! Responsibilities:
//!
//! - forward orthogonal regression over a candidate matrix
//! - arborescence expansion around the plain regression (parallel per level)
//! - select the best distinct term set with BIC / AIC / shortest
//! - solve coefficients, per output channel or for rational structures

pub mod arbo;
pub mod fitter;
pub mod forlsr;
pub mod mimo;
pub mod rational;
pub mod selection;

pub use arbo::*;
pub use fitter::*;
pub use forlsr::*;
pub use mimo::*;
pub use rational::*;
pub use selection::*;
