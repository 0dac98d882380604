//! End-to-end identification of one output channel.
//!
//! Keeping the workflow in one place avoids duplicating it across callers:
//! config validation -> dictionary -> regression matrix -> search/selection
//! -> coefficient solve -> residuals.

use tracing::{debug, info};

use crate::dictionary::{build_dictionary, Dictionary};
use crate::domain::{Dataset, IdentConfig};
use crate::error::{ArboError, Result};
use crate::fit::{fit_output, OutputFit};
use crate::report::{compute_residuals, Residual};

/// All computed outputs of a single identification run.
#[derive(Debug, Clone)]
pub struct Identification {
    pub dictionary: Dictionary,
    pub fit: OutputFit,
    pub residuals: Vec<Residual>,
}

/// Identify output `output` of `dataset`.
pub fn identify(dataset: &Dataset, output: usize, config: &IdentConfig) -> Result<Identification> {
    // 1) Validate options before any allocation-heavy work.
    config.validate()?;
    if output >= dataset.outputs().len() {
        return Err(ArboError::config(format!("Output index {output} out of range.")));
    }

    // 2) Candidate dictionary and its regression matrix.
    let dictionary = build_dictionary(dataset, &config.dictionary)?;
    let matrix = dictionary.evaluate(dataset)?;
    let y = dictionary.target(dataset, output)?;
    debug!(terms = dictionary.len(), rows = matrix.nrows(), "regression matrix ready");

    // 3) Search, select and solve.
    let name = dataset.outputs()[output].name.as_str();
    let fit = fit_output(&dictionary, &matrix, &y, (output, name), &config.search, config.solver)?;

    // 4) One-step-ahead residuals on the recorded data.
    let residuals = compute_residuals(&fit.model, dataset)?;

    info!(
        output = name,
        terms = fit.model.terms.len(),
        nodes = fit.summary.nodes,
        r_squared = fit.model.quality.r_squared,
        "identification finished"
    );

    Ok(Identification {
        dictionary,
        fit,
        residuals,
    })
}
