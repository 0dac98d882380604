//! Evaluation of identified models.
//!
//! Two primitive operations are needed by the fitter and by callers:
//! - one-step-ahead prediction, where lagged outputs come from the recorded data
//! - free-run simulation, where lagged outputs are the model's own predictions
//!
//! Both are implemented for polynomial (`FittedModel`) and rational
//! (`RationalModel`) structures.

use serde::{Deserialize, Serialize};

use crate::domain::{Dataset, FitQuality, SignalId, Term};
use crate::error::{ArboError, Result};

/// Denominators smaller than this in magnitude are treated as singular.
pub const DENOMINATOR_EPS: f64 = 1e-12;

/// A linear-in-parameters model `y[k] = Σ θ_i φ_i[k]` for one output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedModel {
    /// Index of the modelled output in the dataset.
    pub output: usize,
    pub output_name: String,
    /// Selected terms, in selection order.
    pub terms: Vec<Term>,
    pub coefficients: Vec<f64>,
    /// Error reduction ratio of each term, in selection order.
    pub err: Vec<f64>,
    pub quality: FitQuality,
    /// First time index the model can be evaluated at.
    pub start: usize,
}

impl FittedModel {
    /// Evaluate `Σ θ_i φ_i` at `k` through a sample lookup.
    pub fn eval_with<F>(&self, k: usize, value: F) -> f64
    where
        F: Fn(SignalId, usize) -> f64,
    {
        self.terms
            .iter()
            .zip(self.coefficients.iter())
            .map(|(t, &c)| c * t.eval_with(k, &value))
            .sum()
    }

    /// One-step-ahead predictions for `k = start..n`.
    pub fn predict(&self, dataset: &Dataset) -> Result<Vec<f64>> {
        check_history(dataset, self.start)?;
        let out: Vec<f64> = (self.start..dataset.len())
            .map(|k| self.eval_with(k, |id, j| dataset.value(id, j)))
            .collect();
        if out.iter().any(|v| !v.is_finite()) {
            return Err(ArboError::numerical("Non-finite one-step prediction."));
        }
        Ok(out)
    }

    /// Free-run simulation over the full history.
    ///
    /// The first `start` samples are copied from the data as initial conditions;
    /// afterwards the modelled output is fed back while every other signal keeps
    /// its recorded values.
    pub fn simulate(&self, dataset: &Dataset) -> Result<Vec<f64>> {
        check_history(dataset, self.start)?;
        let own = SignalId::output(self.output);
        let mut sim = dataset.outputs()[self.output].values.clone();
        for k in self.start..dataset.len() {
            let v = {
                let sim = &sim;
                self.eval_with(k, |id, j| if id == own { sim[j] } else { dataset.value(id, j) })
            };
            if !v.is_finite() {
                return Err(ArboError::numerical(format!("Free-run simulation diverged at k={k}.")));
            }
            sim[k] = v;
        }
        Ok(sim)
    }

    /// True when every term is a plain lagged signal (no constant, no products).
    pub fn is_linear(&self) -> bool {
        self.terms.iter().all(Term::is_linear)
    }

    /// Coefficient of a term by display name.
    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.terms
            .iter()
            .position(|t| t.name() == name)
            .map(|i| self.coefficients[i])
    }
}

/// A rational model `y[k] = (Σ a_i n_i[k]) / (1 + Σ b_j d_j[k])`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RationalModel {
    pub output: usize,
    pub output_name: String,
    pub numerator: Vec<Term>,
    pub numerator_coefficients: Vec<f64>,
    pub denominator: Vec<Term>,
    pub denominator_coefficients: Vec<f64>,
    /// Quality of the true rational prediction `N / D`.
    pub quality: FitQuality,
    /// Quality of the linearized regression `y = N - y·(D - 1)`.
    pub linearized_quality: FitQuality,
    pub start: usize,
}

impl RationalModel {
    fn parts_with<F>(&self, k: usize, value: F) -> (f64, f64)
    where
        F: Fn(SignalId, usize) -> f64,
    {
        let num: f64 = self
            .numerator
            .iter()
            .zip(self.numerator_coefficients.iter())
            .map(|(t, &c)| c * t.eval_with(k, &value))
            .sum();
        let den: f64 = 1.0
            + self
                .denominator
                .iter()
                .zip(self.denominator_coefficients.iter())
                .map(|(t, &c)| c * t.eval_with(k, &value))
                .sum::<f64>();
        (num, den)
    }

    /// Evaluate `N / D` at `k`; a vanishing denominator is a numerical error.
    pub fn eval_with<F>(&self, k: usize, value: F) -> Result<f64>
    where
        F: Fn(SignalId, usize) -> f64,
    {
        let (num, den) = self.parts_with(k, value);
        if !(den.is_finite() && den.abs() >= DENOMINATOR_EPS) {
            return Err(ArboError::numerical(format!("Rational denominator vanishes at k={k} (D={den:e}).")));
        }
        let v = num / den;
        if !v.is_finite() {
            return Err(ArboError::numerical(format!("Non-finite rational prediction at k={k}.")));
        }
        Ok(v)
    }

    pub fn predict(&self, dataset: &Dataset) -> Result<Vec<f64>> {
        check_history(dataset, self.start)?;
        (self.start..dataset.len())
            .map(|k| self.eval_with(k, |id, j| dataset.value(id, j)))
            .collect()
    }

    pub fn simulate(&self, dataset: &Dataset) -> Result<Vec<f64>> {
        check_history(dataset, self.start)?;
        let own = SignalId::output(self.output);
        let mut sim = dataset.outputs()[self.output].values.clone();
        for k in self.start..dataset.len() {
            let v = {
                let sim = &sim;
                self.eval_with(k, |id, j| if id == own { sim[j] } else { dataset.value(id, j) })?
            };
            sim[k] = v;
        }
        Ok(sim)
    }
}

fn check_history(dataset: &Dataset, start: usize) -> Result<()> {
    if start >= dataset.len() {
        return Err(ArboError::config(format!(
            "Model needs {start} initial samples but the dataset has {}.",
            dataset.len()
        )));
    }
    Ok(())
}
