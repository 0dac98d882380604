//! Reporting utilities: residuals, rankings, and formatted text output.

pub mod format;

pub use format::*;

use crate::domain::Dataset;
use crate::error::{ArboError, Result};
use crate::models::FittedModel;

/// One-step-ahead residual at time `k`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Residual {
    pub k: usize,
    pub observed: f64,
    pub fitted: f64,
    pub residual: f64,
}

/// One-step-ahead residuals of `model` over `dataset`.
pub fn compute_residuals(model: &FittedModel, dataset: &Dataset) -> Result<Vec<Residual>> {
    if model.output >= dataset.outputs().len() {
        return Err(ArboError::config(format!("Output index {} out of range.", model.output)));
    }
    let fitted = model.predict(dataset)?;
    let observed = &dataset.outputs()[model.output].values[model.start..];
    Ok(observed
        .iter()
        .zip(fitted)
        .enumerate()
        .map(|(i, (&observed, fitted))| Residual {
            k: model.start + i,
            observed,
            fitted,
            residual: observed - fitted,
        })
        .collect())
}

/// The `top_n` residuals of largest magnitude, largest first.
pub fn largest_residuals(residuals: &[Residual], top_n: usize) -> Vec<Residual> {
    let mut sorted = residuals.to_vec();
    sorted.sort_by(|a, b| {
        b.residual
            .abs()
            .partial_cmp(&a.residual.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted.truncate(top_n);
    sorted
}
