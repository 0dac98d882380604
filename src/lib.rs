//! `arbo-narx` library crate.
//!
//! Nonlinear system identification by arborescent forward orthogonal
//! regression:
//!
//! - generate a dictionary of candidate regressors from lagged signals
//! - search term subsets with an error-reduction-ratio arborescence
//! - select a subset with an information criterion and solve its coefficients
//! - extend the same machinery to several outputs and to rational models

pub mod analysis;
pub mod data;
pub mod dictionary;
pub mod domain;
pub mod error;
pub mod fit;
pub mod math;
pub mod models;
pub mod pipeline;
pub mod report;

pub use error::{ArboError, Result};
pub use pipeline::{identify, Identification};
