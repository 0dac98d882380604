//! Low-level fitting routines for a single output channel.
//!
//! Given:
//! - an evaluated candidate matrix (one column per dictionary term)
//! - the cut target history of one output
//! - search thresholds
//!
//! we:
//! - expand the arborescence over the candidate matrix
//! - pick the best distinct solution with the configured criterion
//! - solve the coefficients of that term set on the full history
//!
//! and return the fitted model plus search diagnostics.

use nalgebra::{DMatrix, DVector};
use tracing::{info, warn};

use crate::dictionary::Dictionary;
use crate::domain::{SearchConfig, Solver};
use crate::error::{ArboError, Result};
use crate::fit::arbo::{arborescence, SearchTree};
use crate::fit::selection::{collect_solutions, fit_quality, select_solution};
use crate::math::{numerical_rank, solve_least_squares, RecursiveLeastSquares};
use crate::models::FittedModel;

/// Search diagnostics attached to every fit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSummary {
    /// Evaluated arborescence nodes.
    pub nodes: usize,
    pub pruned: usize,
    pub depth_reached: usize,
    /// Distinct term sets among the nodes.
    pub solutions: usize,
    /// Node that produced the selected term set.
    pub selected_node: usize,
    /// Term count of the plain (root) regression.
    pub root_terms: usize,
}

/// A fitted output channel.
#[derive(Debug, Clone)]
pub struct OutputFit {
    pub model: FittedModel,
    pub summary: SearchSummary,
    /// Dictionary indices of the selected terms, in selection order.
    pub indices: Vec<usize>,
}

/// Estimate coefficients of `columns` of `matrix` against `y`.
pub fn solve_coefficients(
    matrix: &DMatrix<f64>,
    y: &DVector<f64>,
    columns: &[usize],
    solver: Solver,
) -> Result<DVector<f64>> {
    if columns.is_empty() {
        return Err(ArboError::config("Cannot fit an empty term set."));
    }
    if let Some(&bad) = columns.iter().find(|&&j| j >= matrix.ncols()) {
        return Err(ArboError::config(format!("Term index {bad} out of range.")));
    }
    let x = matrix.select_columns(columns);

    match solver {
        Solver::Ordinary => solve_least_squares(&x, y),
        Solver::Recursive {
            forgetting,
            initial_covariance,
        } => {
            let rank = numerical_rank(&x);
            if rank < columns.len() {
                return Err(ArboError::numerical(format!(
                    "Rank-deficient design matrix: rank {rank} < {} columns.",
                    columns.len()
                )));
            }
            let mut rls = RecursiveLeastSquares::new(columns.len(), forgetting, initial_covariance)?;
            rls.fit(&x, y)
        }
    }
}

/// Fit a fixed term set (no search) and wrap it as a model.
pub fn fit_terms(
    dictionary: &Dictionary,
    matrix: &DMatrix<f64>,
    y: &DVector<f64>,
    output: (usize, &str),
    columns: &[usize],
    err: &[f64],
    solver: Solver,
) -> Result<FittedModel> {
    let theta = solve_coefficients(matrix, y, columns, solver)?;
    let x = matrix.select_columns(columns);
    let fitted = &x * &theta;
    let quality = fit_quality(y.as_slice(), fitted.as_slice(), columns.len());

    if quality.r_squared < 0.0 {
        warn!(output = output.1, r_squared = quality.r_squared, "fit explains less than the mean");
    }

    Ok(FittedModel {
        output: output.0,
        output_name: output.1.to_string(),
        terms: columns.iter().map(|&j| dictionary.terms()[j].clone()).collect(),
        coefficients: theta.iter().copied().collect(),
        err: if err.len() == columns.len() {
            err.to_vec()
        } else {
            vec![0.0; columns.len()]
        },
        quality,
        start: dictionary.start(),
    })
}

/// Error for a search whose nodes all came back empty.
pub(crate) fn no_solution(tree: &SearchTree) -> ArboError {
    let stop = tree.nodes.first().map(|n| n.regression.stop);
    ArboError::numerical(format!("Search selected no terms (root pass stopped: {stop:?})."))
}

/// Search, select and solve one output channel.
pub fn fit_output(
    dictionary: &Dictionary,
    matrix: &DMatrix<f64>,
    y: &DVector<f64>,
    output: (usize, &str),
    search: &SearchConfig,
    solver: Solver,
) -> Result<OutputFit> {
    if matrix.ncols() != dictionary.len() {
        return Err(ArboError::config(format!(
            "Regression matrix has {} columns for {} dictionary terms.",
            matrix.ncols(),
            dictionary.len()
        )));
    }

    let tree = arborescence(y, matrix, search)?;
    let y_energy = y.norm_squared();
    let solutions = collect_solutions(&tree, search.criterion, y.len(), y_energy);
    let Some(idx) = select_solution(&solutions, search.criterion, search.ic_tolerance) else {
        return Err(no_solution(&tree));
    };
    let chosen = &solutions[idx];

    let model = fit_terms(dictionary, matrix, y, output, &chosen.terms, &chosen.err, solver)?;

    info!(
        output = output.1,
        terms = model.terms.len(),
        rmse = model.quality.rmse,
        bic = model.quality.bic,
        "fitted output channel"
    );

    Ok(OutputFit {
        summary: SearchSummary {
            nodes: tree.nodes.len(),
            pruned: tree.pruned,
            depth_reached: tree.depth_reached,
            solutions: solutions.len(),
            selected_node: chosen.node,
            root_terms: tree.nodes[0].regression.terms.len(),
        },
        indices: chosen.terms.clone(),
        model,
    })
}
