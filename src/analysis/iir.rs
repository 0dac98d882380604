//! Linear model to IIR filter conversion.

use serde::{Deserialize, Serialize};

use crate::domain::{SignalId, SignalRole};
use crate::error::{ArboError, Result};
use crate::models::FittedModel;

/// Direct-form IIR coefficients, `a[0] = 1`.
///
/// `Σ a[j] y[k-j] = Σ b[i] x[k-i]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IirFilter {
    pub b: Vec<f64>,
    pub a: Vec<f64>,
}

impl IirFilter {
    /// Filter `x` from rest.
    pub fn filter(&self, x: &[f64]) -> Result<Vec<f64>> {
        let a0 = match self.a.first() {
            Some(&a0) if a0.is_finite() && a0 != 0.0 => a0,
            _ => {
                return Err(ArboError::config(
                    "IIR denominator needs a finite, non-zero leading coefficient.",
                ));
            }
        };
        let mut y = vec![0.0; x.len()];
        for k in 0..x.len() {
            let mut acc = 0.0;
            for (i, &bi) in self.b.iter().enumerate().take(k + 1) {
                acc += bi * x[k - i];
            }
            for (j, &aj) in self.a.iter().enumerate().skip(1).take(k) {
                acc -= aj * y[k - j];
            }
            y[k] = acc / a0;
        }
        Ok(y)
    }
}

/// Convert a model made only of `x[k-i]` and `y[k-j]` terms into `(b, a)`.
///
/// The model must use the first input and its own output only.
pub fn to_iir(model: &FittedModel) -> Result<IirFilter> {
    let own = SignalId::output(model.output);
    let mut b = vec![0.0];
    let mut a = vec![1.0];

    for (term, &c) in model.terms.iter().zip(model.coefficients.iter()) {
        if !term.is_linear() {
            return Err(ArboError::config(format!(
                "Term '{}' is not linear; only x[k-i] and y[k-j] terms convert to IIR.",
                term.name()
            )));
        }
        let f = term.factors()[0];
        match f.signal.role {
            SignalRole::Input if f.signal.index == 0 => {
                if b.len() <= f.lag {
                    b.resize(f.lag + 1, 0.0);
                }
                b[f.lag] += c;
            }
            SignalRole::Output if f.signal == own => {
                if a.len() <= f.lag {
                    a.resize(f.lag + 1, 0.0);
                }
                a[f.lag] -= c;
            }
            _ => {
                return Err(ArboError::config(format!(
                    "Term '{}' refers to a signal other than the first input or the modelled output.",
                    term.name()
                )));
            }
        }
    }
    Ok(IirFilter { b, a })
}
