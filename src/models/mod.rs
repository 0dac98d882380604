//! Identified model structures.
//!
//! Models are plain data (terms + coefficients) with small, pure evaluation
//! methods so the fitting and reporting code can stay generic.

pub mod model;

pub use model::*;
