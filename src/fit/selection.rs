//! Model selection among search solutions using information criteria.
//!
//! Every node of the arborescence yields a candidate term set. For each
//! distinct set we compute
//! - SSE (from the orthogonal decomposition)
//! - BIC = n · ln(SSE/n) + k · ln(n), or AIC = n · ln(SSE/n) + 2k
//!
//! Selection rules:
//! 1. Compute the criterion for every distinct solution
//! 2. Keep the solutions within `ic_tolerance` of the best score
//! 3. Among those pick the fewest terms, then the lowest score, then the
//!    earliest generated node
//!
//! With `Criterion::Shortest` the fewest terms win outright, then the lowest SSE.

use std::collections::HashSet;

use crate::domain::{Criterion, FitQuality};
use crate::fit::arbo::SearchTree;

/// Relative floor on `SSE/n` so exact fits compare on their penalty only.
const SSE_FLOOR_REL: f64 = 1e-12;

/// A distinct term set found by the search.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Node that first produced this term set.
    pub node: usize,
    pub terms: Vec<usize>,
    pub err: Vec<f64>,
    pub sse: f64,
    pub score: f64,
}

/// Information criterion value for `k` coefficients fitted on `n` samples.
///
/// `y_energy` scales the SSE floor so criteria stay finite on noiseless data.
pub fn information_criterion(criterion: Criterion, n: usize, sse: f64, k: usize, y_energy: f64) -> f64 {
    let n_f = n.max(1) as f64;
    let floor = (SSE_FLOOR_REL * y_energy / n_f).max(f64::MIN_POSITIVE);
    let sse_per = (sse / n_f).max(floor);
    match criterion {
        Criterion::Bic => n_f * sse_per.ln() + (k as f64) * n_f.ln(),
        Criterion::Aic => n_f * sse_per.ln() + 2.0 * k as f64,
        Criterion::Shortest => sse_per,
    }
}

/// Collapse search nodes into distinct solutions, scored with `criterion`.
///
/// Nodes that selected no terms are not solutions.
pub fn collect_solutions(tree: &SearchTree, criterion: Criterion, n: usize, y_energy: f64) -> Vec<Solution> {
    let mut seen: HashSet<Vec<usize>> = HashSet::new();
    let mut out = Vec::new();
    for node in &tree.nodes {
        if node.regression.terms.is_empty() {
            continue;
        }
        let mut key = node.regression.terms.clone();
        key.sort_unstable();
        if !seen.insert(key) {
            continue;
        }
        let k = node.regression.terms.len();
        out.push(Solution {
            node: node.id,
            terms: node.regression.terms.clone(),
            err: node.regression.err.clone(),
            sse: node.regression.sse,
            score: information_criterion(criterion, n, node.regression.sse, k, y_energy),
        });
    }
    out
}

/// Index (into `solutions`) of the selected solution.
///
/// Returns `None` only for an empty slice.
pub fn select_solution(solutions: &[Solution], criterion: Criterion, ic_tolerance: f64) -> Option<usize> {
    if solutions.is_empty() {
        return None;
    }

    if criterion == Criterion::Shortest {
        let mut best = 0;
        for (i, s) in solutions.iter().enumerate().skip(1) {
            let b = &solutions[best];
            if s.terms.len() < b.terms.len() || (s.terms.len() == b.terms.len() && s.sse < b.sse) {
                best = i;
            }
        }
        return Some(best);
    }

    let best_score = solutions
        .iter()
        .map(|s| s.score)
        .fold(f64::INFINITY, f64::min);

    // Prefer simplicity within the tolerance band.
    let mut chosen: Option<usize> = None;
    for (i, s) in solutions.iter().enumerate() {
        if s.score > best_score + ic_tolerance {
            continue;
        }
        match chosen {
            None => chosen = Some(i),
            Some(c) => {
                let cur = &solutions[c];
                if s.terms.len() < cur.terms.len() || (s.terms.len() == cur.terms.len() && s.score < cur.score) {
                    chosen = Some(i);
                }
            }
        }
    }
    chosen
}

/// Fit diagnostics from observed and fitted values.
pub fn fit_quality(y: &[f64], fitted: &[f64], k: usize) -> FitQuality {
    let n = y.len();
    let sse: f64 = y.iter().zip(fitted.iter()).map(|(a, b)| (a - b) * (a - b)).sum();
    let y_energy: f64 = y.iter().map(|v| v * v).sum();
    let mean = if n > 0 { y.iter().sum::<f64>() / n as f64 } else { 0.0 };
    let sst: f64 = y.iter().map(|v| (v - mean) * (v - mean)).sum();

    let r_squared = if sst > 0.0 {
        1.0 - sse / sst
    } else if sse == 0.0 {
        1.0
    } else {
        0.0
    };
    let rmse = if n > 0 { (sse / n as f64).sqrt() } else { 0.0 };

    FitQuality {
        n,
        k,
        sse,
        rmse,
        r_squared,
        bic: information_criterion(Criterion::Bic, n, sse, k, y_energy),
        aic: information_criterion(Criterion::Aic, n, sse, k, y_energy),
    }
}
