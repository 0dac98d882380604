//! Lagged base variables.
//!
//! Inputs may act instantaneously (`x[k]`), outputs only through their past
//! (`y[k-1]`, `y[k-2]`, …). The enumeration order is deterministic:
//! inputs in declaration order, then outputs, each with ascending lags.

use crate::domain::{Dataset, DictionaryConfig, Factor, SignalId};
use crate::error::{ArboError, Result};

/// Enumerate the degree-1 building blocks of the dictionary.
pub fn lagged_variables(dataset: &Dataset, config: &DictionaryConfig) -> Result<Vec<Factor>> {
    let mut out = Vec::new();

    for i in 0..dataset.inputs().len() {
        for lag in 0..=config.input_lags {
            out.push(Factor::new(SignalId::input(i), lag, 1));
        }
    }
    for o in 0..dataset.outputs().len() {
        for lag in 1..=config.output_lags {
            out.push(Factor::new(SignalId::output(o), lag, 1));
        }
    }

    if out.is_empty() && config.degree > 0 {
        return Err(ArboError::config(
            "No lagged variables: the dataset has no inputs and output_lags is 0.",
        ));
    }

    let max_lag = config.max_lag();
    if max_lag >= dataset.len() {
        return Err(ArboError::config(format!(
            "Maximum lag {max_lag} leaves no usable samples (n={}).",
            dataset.len()
        )));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lagged_variables_order_inputs_then_outputs() {
        let ds = Dataset::siso(vec![0.0; 10], vec![0.0; 10]).unwrap();
        let cfg = DictionaryConfig {
            input_lags: 1,
            output_lags: 2,
            ..DictionaryConfig::default()
        };
        let vars = lagged_variables(&ds, &cfg).unwrap();
        let described: Vec<(SignalId, usize)> = vars.iter().map(|f| (f.signal, f.lag)).collect();
        assert_eq!(
            described,
            vec![
                (SignalId::input(0), 0),
                (SignalId::input(0), 1),
                (SignalId::output(0), 1),
                (SignalId::output(0), 2),
            ]
        );
    }

    #[test]
    fn lag_beyond_history_is_rejected() {
        let ds = Dataset::siso(vec![0.0; 3], vec![0.0; 3]).unwrap();
        let cfg = DictionaryConfig {
            input_lags: 3,
            ..DictionaryConfig::default()
        };
        assert!(lagged_variables(&ds, &cfg).unwrap_err().is_configuration());
    }
}
