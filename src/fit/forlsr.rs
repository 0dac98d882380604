//! One forward orthogonal least squares regression pass.
//!
//! Given a target `y` and a candidate matrix `D`, terms are added one at a time:
//!
//! - imposed terms enter first, in the given order
//! - every remaining candidate is kept orthogonalized (modified Gram-Schmidt)
//!   against the terms selected so far
//! - the candidate with the largest error reduction ratio is added; ties go to
//!   the lowest dictionary index
//!
//! The pass stops when `1 - ΣERR < rho`, when the best remaining ERR is below
//! `min_err`, when `max_terms` is reached, or when candidates run out.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::debug;

use crate::domain::SearchConfig;
use crate::error::{ArboError, Result};
use crate::math::ortho::{dot, err, project_out};

/// Why a regression pass stopped adding terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Explained variance reached `1 - rho`.
    Threshold,
    /// Best remaining contribution fell below `min_err`.
    MinErr,
    MaxTerms,
    /// No linearly independent candidates left.
    Exhausted,
}

/// Outcome of one regression pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Regression {
    /// Selected dictionary indices, in selection order.
    pub terms: Vec<usize>,
    /// Error reduction ratio of each selected term.
    pub err: Vec<f64>,
    pub stop: StopReason,
    /// Residual sum of squares implied by the orthogonal decomposition.
    pub sse: f64,
}

impl Regression {
    pub fn explained(&self) -> f64 {
        self.err.iter().sum()
    }
}

struct Workspace<'a> {
    y: &'a [f64],
    y_energy: f64,
    /// Candidate columns, progressively orthogonalized.
    cand: Vec<Vec<f64>>,
    /// Squared norms of the original columns.
    norms2: Vec<f64>,
    active: Vec<bool>,
    tol: f64,
}

impl Workspace<'_> {
    fn current_err(&self, j: usize) -> f64 {
        err(&self.cand[j], self.y, self.y_energy)
    }

    /// Add column `j` to the selection and deflate the remaining candidates.
    fn accept(&mut self, j: usize) -> Result<f64> {
        let omega = std::mem::take(&mut self.cand[j]);
        self.active[j] = false;
        let n2 = dot(&omega, &omega);
        if n2 <= self.tol * self.norms2[j] {
            return Err(ArboError::numerical(format!(
                "Term {j} is collinear with the previously selected terms."
            )));
        }
        let e = err(&omega, self.y, self.y_energy);

        let tol = self.tol;
        self.cand
            .par_iter_mut()
            .zip(self.active.par_iter_mut())
            .zip(self.norms2.par_iter())
            .for_each(|((w, active), &orig)| {
                if !*active {
                    return;
                }
                project_out(w, &omega, n2);
                if dot(w, w) <= tol * orig {
                    *active = false;
                }
            });
        Ok(e)
    }
}

/// Run one regression pass with `imposed` terms forced in first.
pub fn orthogonal_regression(
    y: &DVector<f64>,
    matrix: &DMatrix<f64>,
    imposed: &[usize],
    opts: &SearchConfig,
) -> Result<Regression> {
    let (rows, m) = matrix.shape();
    if y.len() != rows {
        return Err(ArboError::config(format!(
            "Target has {} samples but the regression matrix has {rows} rows.",
            y.len()
        )));
    }
    if m == 0 {
        return Err(ArboError::config("Regression matrix has no candidate columns."));
    }
    if let Some(&bad) = imposed.iter().find(|&&j| j >= m) {
        return Err(ArboError::config(format!("Imposed term index {bad} out of range (m={m}).")));
    }

    let y_energy = y.norm_squared();
    if !(y_energy.is_finite() && y_energy > 0.0) {
        return Err(ArboError::numerical("Target output is identically zero or non-finite."));
    }

    let cand: Vec<Vec<f64>> = (0..m).map(|j| matrix.column(j).iter().copied().collect()).collect();
    let norms2: Vec<f64> = cand.iter().map(|c| dot(c, c)).collect();
    let active: Vec<bool> = norms2.iter().map(|&n2| n2 > 0.0).collect();

    let mut ws = Workspace {
        y: y.as_slice(),
        y_energy,
        cand,
        norms2,
        active,
        tol: opts.collinearity_tol,
    };

    let mut terms = Vec::new();
    let mut errs = Vec::new();

    for &j in imposed {
        if terms.contains(&j) {
            continue;
        }
        if ws.norms2[j] <= 0.0 {
            return Err(ArboError::numerical(format!("Imposed term {j} is identically zero.")));
        }
        let e = ws.accept(j)?;
        terms.push(j);
        errs.push(e);
    }

    let stop = loop {
        let explained: f64 = errs.iter().sum();
        if 1.0 - explained < opts.rho {
            break StopReason::Threshold;
        }
        if terms.len() >= opts.max_terms {
            break StopReason::MaxTerms;
        }

        let scores: Vec<(usize, f64)> = (0..m)
            .into_par_iter()
            .filter(|&j| ws.active[j])
            .map(|j| (j, ws.current_err(j)))
            .collect();

        // Ascending scan with strict comparison keeps the first index on ties.
        let mut best: Option<(usize, f64)> = None;
        for (j, e) in scores {
            match best {
                Some((_, be)) if e <= be => {}
                _ => best = Some((j, e)),
            }
        }

        let Some((j, e)) = best else {
            break StopReason::Exhausted;
        };
        if e < opts.min_err {
            break StopReason::MinErr;
        }

        let e = ws.accept(j)?;
        terms.push(j);
        errs.push(e);
    };

    let explained: f64 = errs.iter().sum();
    let sse = (y_energy * (1.0 - explained)).max(0.0);

    debug!(
        imposed = imposed.len(),
        selected = terms.len(),
        explained,
        ?stop,
        "orthogonal regression finished"
    );

    Ok(Regression {
        terms,
        err: errs,
        stop,
        sse,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> SearchConfig {
        SearchConfig {
            rho: 1e-10,
            ..SearchConfig::default()
        }
    }

    /// Columns: c0 = sin, c1 = cos, c2 = ramp, c3 = sin + ramp (collinear combo).
    fn problem() -> (DMatrix<f64>, DVector<f64>) {
        let n = 40;
        let m = DMatrix::from_fn(n, 4, |i, j| {
            let t = i as f64 * 0.3;
            match j {
                0 => t.sin(),
                1 => t.cos(),
                2 => i as f64 / n as f64,
                _ => t.sin() + i as f64 / n as f64,
            }
        });
        let y = DVector::from_fn(n, |i, _| 2.0 * m[(i, 1)] - 0.5 * m[(i, 2)]);
        (m, y)
    }

    #[test]
    fn finds_exact_support() {
        let (m, y) = problem();
        let reg = orthogonal_regression(&y, &m, &[], &opts()).unwrap();
        let mut terms = reg.terms.clone();
        terms.sort();
        assert_eq!(terms, vec![1, 2]);
        assert_eq!(reg.stop, StopReason::Threshold);
        assert!((reg.explained() - 1.0).abs() < 1e-10);
        assert!(reg.sse < 1e-8);
    }

    #[test]
    fn imposed_terms_enter_first() {
        let (m, y) = problem();
        let reg = orthogonal_regression(&y, &m, &[0], &opts()).unwrap();
        assert_eq!(reg.terms[0], 0);
        assert!(reg.terms.len() >= 3);
    }

    #[test]
    fn collinear_candidates_are_dropped() {
        let (m, y) = problem();
        // After imposing c0 and c2, c3 = c0 + c2 has no component left.
        let reg = orthogonal_regression(&y, &m, &[0, 2], &opts()).unwrap();
        assert!(!reg.terms.contains(&3));
    }

    #[test]
    fn zero_target_is_a_numerical_error() {
        let (m, _) = problem();
        let y = DVector::zeros(m.nrows());
        assert!(orthogonal_regression(&y, &m, &[], &opts()).unwrap_err().is_numerical());
    }

    #[test]
    fn weak_contributions_stop_the_pass() {
        let (m, y) = problem();
        let full = orthogonal_regression(&y, &m, &[], &opts()).unwrap();
        assert_eq!(full.terms.len(), 2);
        assert!(full.err[0] > full.err[1]);

        // Nothing left after the first term can reach this threshold.
        let cfg = SearchConfig {
            min_err: 0.5 * (full.err[0] + full.err[1]),
            ..opts()
        };
        let reg = orthogonal_regression(&y, &m, &[], &cfg).unwrap();
        assert_eq!(reg.stop, StopReason::MinErr);
        assert_eq!(reg.terms, vec![full.terms[0]]);
        assert!((reg.err[0] - full.err[0]).abs() < 1e-12);
    }

    #[test]
    fn max_terms_bounds_the_pass() {
        let (m, y) = problem();
        let cfg = SearchConfig {
            max_terms: 1,
            ..opts()
        };
        let reg = orthogonal_regression(&y, &m, &[], &cfg).unwrap();
        assert_eq!(reg.terms.len(), 1);
        assert_eq!(reg.stop, StopReason::MaxTerms);
    }
}
