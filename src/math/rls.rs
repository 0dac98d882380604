//! Recursive least squares with exponential forgetting.
//!
//! The state `(θ, P)` is updated one regressor row at a time:
//!
//! ```text
//! g = P φ / (λ + φᵀ P φ)
//! θ ← θ + g (y - φᵀ θ)
//! P ← (P - g φᵀ P) / λ
//! ```
//!
//! With `λ = 1` and a large initial covariance the estimate converges to the
//! batch least-squares solution.

use nalgebra::{DMatrix, DVector};

use crate::error::{ArboError, Result};

#[derive(Debug, Clone)]
pub struct RecursiveLeastSquares {
    theta: DVector<f64>,
    p: DMatrix<f64>,
    lambda: f64,
    updates: usize,
}

impl RecursiveLeastSquares {
    /// Start from `θ = 0`, `P = delta · I`.
    pub fn new(dim: usize, lambda: f64, delta: f64) -> Result<Self> {
        if dim == 0 {
            return Err(ArboError::config("RLS dimension must be >= 1."));
        }
        if !(lambda.is_finite() && lambda > 0.0 && lambda <= 1.0) {
            return Err(ArboError::config(format!(
                "Invalid forgetting factor {lambda} (must be in (0, 1])."
            )));
        }
        if !(delta.is_finite() && delta > 0.0) {
            return Err(ArboError::config(format!(
                "Invalid initial covariance scale {delta} (must be > 0)."
            )));
        }
        Ok(Self {
            theta: DVector::zeros(dim),
            p: DMatrix::identity(dim, dim) * delta,
            lambda,
            updates: 0,
        })
    }

    pub fn theta(&self) -> &DVector<f64> {
        &self.theta
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.p
    }

    pub fn updates(&self) -> usize {
        self.updates
    }

    /// Absorb one observation; returns the a-priori prediction error.
    pub fn update(&mut self, phi: &DVector<f64>, y: f64) -> Result<f64> {
        if phi.len() != self.theta.len() {
            return Err(ArboError::config(format!(
                "Regressor has {} entries, expected {}.",
                phi.len(),
                self.theta.len()
            )));
        }

        let p_phi = &self.p * phi;
        let denom = self.lambda + phi.dot(&p_phi);
        if !(denom.is_finite() && denom > 0.0) {
            return Err(ArboError::numerical(format!("RLS gain denominator {denom} is not positive.")));
        }

        let gain = &p_phi / denom;
        let err = y - phi.dot(&self.theta);
        self.theta += &gain * err;
        self.p = (&self.p - &gain * p_phi.transpose()) / self.lambda;
        // Keep P symmetric against round-off drift.
        self.p = (&self.p + self.p.transpose()) * 0.5;
        self.updates += 1;

        if self.theta.iter().any(|v| !v.is_finite()) {
            return Err(ArboError::numerical("RLS estimate diverged."));
        }
        Ok(err)
    }

    /// Run every row of `x` through [`Self::update`] and return the final estimate.
    pub fn fit(&mut self, x: &DMatrix<f64>, y: &DVector<f64>) -> Result<DVector<f64>> {
        if x.nrows() != y.len() {
            return Err(ArboError::config("RLS design matrix and target lengths differ."));
        }
        for (i, row) in x.row_iter().enumerate() {
            let phi = row.transpose();
            self.update(&phi, y[i])?;
        }
        Ok(self.theta.clone())
    }
}
