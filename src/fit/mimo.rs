//! Multiple-output identification.
//!
//! All channels share one dictionary built over every input and every
//! output's lags, so cross-coupled systems can be represented. The search and
//! the coefficient solve are then repeated independently per channel.

use rayon::prelude::*;
use tracing::info;

use crate::dictionary::{build_dictionary, Dictionary};
use crate::domain::{Dataset, IdentConfig};
use crate::error::Result;
use crate::fit::fitter::{fit_output, OutputFit};

/// Per-channel fits over a shared dictionary.
#[derive(Debug, Clone)]
pub struct MimoFit {
    pub dictionary: Dictionary,
    /// One fit per output, in dataset order.
    pub channels: Vec<OutputFit>,
}

impl MimoFit {
    pub fn channel(&self, name: &str) -> Option<&OutputFit> {
        self.channels.iter().find(|c| c.model.output_name == name)
    }

    /// Sum of per-channel SSE.
    pub fn total_sse(&self) -> f64 {
        self.channels.iter().map(|c| c.model.quality.sse).sum()
    }
}

/// Identify every output channel of `dataset`.
pub fn identify_mimo(dataset: &Dataset, config: &IdentConfig) -> Result<MimoFit> {
    config.validate()?;
    let dictionary = build_dictionary(dataset, &config.dictionary)?;
    let matrix = dictionary.evaluate(dataset)?;

    info!(
        outputs = dataset.outputs().len(),
        terms = dictionary.len(),
        rows = matrix.nrows(),
        "identifying MIMO system"
    );

    let channels: Vec<OutputFit> = (0..dataset.outputs().len())
        .into_par_iter()
        .map(|o| {
            let y = dictionary.target(dataset, o)?;
            let name = dataset.outputs()[o].name.as_str();
            fit_output(&dictionary, &matrix, &y, (o, name), &config.search, config.solver)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(MimoFit { dictionary, channels })
}
