//! Rational model identification.
//!
//! The model
//!
//! ```text
//! y[k] = (Σ a_i n_i[k]) / (1 + Σ b_j d_j[k])
//! ```
//!
//! is normalized so the denominator's constant is 1. Multiplying through gives
//! a linear-in-parameters problem
//!
//! ```text
//! y[k] = Σ a_i n_i[k] - Σ b_j (y[k] · d_j[k])
//! ```
//!
//! which the arborescence searches over the joint candidate set
//! `[N | -y∘D]`. Selected columns are split back into numerator and
//! denominator terms afterwards.

use nalgebra::DMatrix;
use tracing::info;

use crate::dictionary::{build_dictionary, Dictionary};
use crate::domain::{Dataset, RationalConfig};
use crate::error::{ArboError, Result};
use crate::fit::arbo::arborescence;
use crate::fit::fitter::{no_solution, solve_coefficients, SearchSummary};
use crate::fit::selection::{collect_solutions, fit_quality, select_solution};
use crate::models::RationalModel;

/// A fitted rational model plus search diagnostics.
#[derive(Debug, Clone)]
pub struct RationalFit {
    pub model: RationalModel,
    pub summary: SearchSummary,
    pub numerator: Dictionary,
    pub denominator: Dictionary,
}

/// Identify output `output` of `dataset` as a rational model.
pub fn identify_rational(dataset: &Dataset, output: usize, config: &RationalConfig) -> Result<RationalFit> {
    config.validate()?;
    if output >= dataset.outputs().len() {
        return Err(ArboError::config(format!("Output index {output} out of range.")));
    }

    let numerator = build_dictionary(dataset, &config.numerator)?;
    let denominator = build_dictionary(dataset, &config.denominator)?;
    let start = numerator.start().max(denominator.start());
    let numerator = numerator.with_start(start);
    let denominator = denominator.with_start(start);

    let nm = numerator.evaluate(dataset)?;
    let dm = denominator.evaluate(dataset)?;
    let y = numerator.target(dataset, output)?;

    let (rows, nn) = nm.shape();
    let nd = dm.ncols();
    let joint = DMatrix::from_fn(rows, nn + nd, |r, c| {
        if c < nn {
            nm[(r, c)]
        } else {
            -y[r] * dm[(r, c - nn)]
        }
    });

    let tree = arborescence(&y, &joint, &config.search)?;
    let solutions = collect_solutions(&tree, config.search.criterion, rows, y.norm_squared());
    let Some(idx) = select_solution(&solutions, config.search.criterion, config.search.ic_tolerance) else {
        return Err(no_solution(&tree));
    };
    let chosen = &solutions[idx];

    let theta = solve_coefficients(&joint, &y, &chosen.terms, config.solver)?;
    let linearized = joint.select_columns(&chosen.terms) * &theta;
    let linearized_quality = fit_quality(y.as_slice(), linearized.as_slice(), chosen.terms.len());

    let mut num_terms = Vec::new();
    let mut num_coefs = Vec::new();
    let mut den_terms = Vec::new();
    let mut den_coefs = Vec::new();
    for (&j, &c) in chosen.terms.iter().zip(theta.iter()) {
        if j < nn {
            num_terms.push(numerator.terms()[j].clone());
            num_coefs.push(c);
        } else {
            den_terms.push(denominator.terms()[j - nn].clone());
            den_coefs.push(c);
        }
    }

    let mut model = RationalModel {
        output,
        output_name: dataset.outputs()[output].name.clone(),
        numerator: num_terms,
        numerator_coefficients: num_coefs,
        denominator: den_terms,
        denominator_coefficients: den_coefs,
        quality: linearized_quality,
        linearized_quality,
        start,
    };

    // A denominator that vanishes on the data surfaces here as a numerical error.
    let predicted = model.predict(dataset)?;
    model.quality = fit_quality(y.as_slice(), &predicted, chosen.terms.len());

    info!(
        output = model.output_name.as_str(),
        numerator = model.numerator.len(),
        denominator = model.denominator.len(),
        rmse = model.quality.rmse,
        "fitted rational model"
    );

    Ok(RationalFit {
        summary: SearchSummary {
            nodes: tree.nodes.len(),
            pruned: tree.pruned,
            depth_reached: tree.depth_reached,
            solutions: solutions.len(),
            selected_node: chosen.node,
            root_terms: tree.nodes[0].regression.terms.len(),
        },
        model,
        numerator,
        denominator,
    })
}
