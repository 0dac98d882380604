//! Term dictionary generation.
//!
//! Responsibilities:
//!
//! - enumerate lagged base variables (`lagger`)
//! - expand them into monomials up to the configured degree (`expander`)
//! - wrap monomials in the configured nonlinearities
//! - evaluate every term over the usable part of the data history (parallel)
//!
//! Enumeration is deterministic given the same dataset layout and configuration,
//! which is what makes the downstream search reproducible.

use std::collections::HashSet;

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::debug;

use crate::domain::{Dataset, DictionaryConfig, Nonlinearity, Term};
use crate::error::{ArboError, Result};

pub mod expander;
pub mod lagger;

pub use expander::*;
pub use lagger::*;

/// Factor by which the pre-enumeration bound may exceed `max_terms`.
const ESTIMATE_SLACK: u128 = 4;

/// An ordered candidate set of unique terms.
#[derive(Debug, Clone)]
pub struct Dictionary {
    terms: Vec<Term>,
    /// First usable time index (rows before it are initial conditions).
    start: usize,
}

impl Dictionary {
    /// Wrap an explicit term list. Duplicates are a configuration error.
    pub fn from_terms(terms: Vec<Term>) -> Result<Self> {
        if terms.is_empty() {
            return Err(ArboError::config("Dictionary is empty."));
        }
        let mut seen = HashSet::with_capacity(terms.len());
        for t in &terms {
            if !seen.insert(t) {
                return Err(ArboError::config(format!("Duplicate term '{}' in dictionary.", t.name())));
            }
        }
        let start = terms.iter().map(Term::max_lag).max().unwrap_or(0);
        Ok(Self { terms, start })
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn start(&self) -> usize {
        self.start
    }

    /// Move the first usable row later (never earlier than the terms require).
    pub fn with_start(mut self, start: usize) -> Self {
        self.start = self.start.max(start);
        self
    }

    pub fn position(&self, term: &Term) -> Option<usize> {
        self.terms.iter().position(|t| t == term)
    }

    pub fn names(&self) -> Vec<&str> {
        self.terms.iter().map(Term::name).collect()
    }

    /// Number of rows [`Self::evaluate`] produces for `dataset`.
    pub fn rows(&self, dataset: &Dataset) -> usize {
        dataset.len().saturating_sub(self.start)
    }

    /// Evaluate every term on rows `start..n` into a `(rows × terms)` matrix.
    pub fn evaluate(&self, dataset: &Dataset) -> Result<DMatrix<f64>> {
        let n = dataset.len();
        if self.start >= n {
            return Err(ArboError::config(format!(
                "Dictionary needs {} initial samples but only {n} are available.",
                self.start
            )));
        }
        let rows = n - self.start;
        let start = self.start;

        // Columns are independent; collect preserves term order.
        let columns: Vec<Vec<f64>> = self
            .terms
            .par_iter()
            .map(|t| (start..n).map(|k| t.eval(dataset, k)).collect())
            .collect();

        for (t, col) in self.terms.iter().zip(columns.iter()) {
            if col.iter().any(|v| !v.is_finite()) {
                return Err(ArboError::numerical(format!(
                    "Term '{}' evaluates to non-finite values on the data.",
                    t.name()
                )));
            }
        }

        Ok(DMatrix::from_fn(rows, self.terms.len(), |r, c| columns[c][r]))
    }

    /// Output `index` on rows `start..n`.
    pub fn target(&self, dataset: &Dataset, index: usize) -> Result<DVector<f64>> {
        if index >= dataset.outputs().len() {
            return Err(ArboError::config(format!("Output index {index} out of range.")));
        }
        let values = &dataset.outputs()[index].values;
        if self.start >= values.len() {
            return Err(ArboError::config("No usable samples after the initial conditions."));
        }
        Ok(DVector::from_row_slice(&values[self.start..]))
    }
}

/// Generate the candidate dictionary for `dataset` under `config`.
///
/// Order: constant, monomials by degree, then each operator over the monomials
/// up to `operator_degree`.
pub fn build_dictionary(dataset: &Dataset, config: &DictionaryConfig) -> Result<Dictionary> {
    config.validate()?;
    let vars = lagged_variables(dataset, config)?;

    let mut operators: Vec<Nonlinearity> = Vec::new();
    for &op in &config.operators {
        if op != Nonlinearity::Identity && !operators.contains(&op) {
            operators.push(op);
        }
    }

    let expand_degree = if operators.is_empty() {
        config.degree
    } else {
        config.degree.max(config.operator_degree)
    };

    // Upper bound before enumeration; the exact count is checked after dedup.
    let estimate = monomial_count(vars.len(), config.degree)
        .saturating_add(monomial_count(vars.len(), config.operator_degree).saturating_mul(operators.len() as u128))
        .saturating_add(config.include_constant as u128);
    if let Some(cap) = config.max_terms {
        if estimate > (cap as u128).saturating_mul(ESTIMATE_SLACK) {
            return Err(ArboError::config(format!(
                "Dictionary would hold up to {estimate} terms, far above max_terms={cap}."
            )));
        }
    }

    let monomials = expand_monomials(&vars, expand_degree);

    let mut terms = Vec::new();
    let mut seen: HashSet<Term> = HashSet::new();
    let mut push = |term: Term, terms: &mut Vec<Term>| {
        if seen.insert(term.clone()) {
            terms.push(term);
        }
    };

    if config.include_constant {
        push(Term::constant(), &mut terms);
    }
    for m in monomials.iter().filter(|m| degree_of(m) <= config.degree) {
        push(Term::new(Nonlinearity::Identity, m.clone(), dataset)?, &mut terms);
    }
    for &op in &operators {
        for m in monomials.iter().filter(|m| degree_of(m) <= config.operator_degree) {
            // |m| == m when every exponent is even.
            if op == Nonlinearity::Abs && m.iter().all(|f| f.exponent % 2 == 0) {
                continue;
            }
            push(Term::new(op, m.clone(), dataset)?, &mut terms);
        }
    }

    if terms.is_empty() {
        return Err(ArboError::config("Dictionary configuration produced no terms."));
    }
    if let Some(cap) = config.max_terms {
        if terms.len() > cap {
            return Err(ArboError::config(format!(
                "Dictionary holds {} terms, above max_terms={cap}.",
                terms.len()
            )));
        }
    }

    debug!(
        terms = terms.len(),
        variables = vars.len(),
        degree = config.degree,
        operators = operators.len(),
        "built dictionary"
    );

    Ok(Dictionary {
        terms,
        start: config.max_lag(),
    })
}

fn degree_of(m: &[crate::domain::Factor]) -> u32 {
    m.iter().map(|f| f.exponent).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SignalId;

    fn dataset(n: usize) -> Dataset {
        let x: Vec<f64> = (0..n).map(|i| (i as f64 * 0.37).sin()).collect();
        let y: Vec<f64> = (0..n).map(|i| (i as f64 * 0.11).cos()).collect();
        Dataset::siso(x, y).unwrap()
    }

    #[test]
    fn dictionary_has_no_duplicates() {
        let ds = dataset(30);
        let cfg = DictionaryConfig {
            input_lags: 2,
            output_lags: 2,
            degree: 3,
            operators: vec![Nonlinearity::Abs, Nonlinearity::Exp, Nonlinearity::Abs, Nonlinearity::Cos],
            operator_degree: 2,
            include_constant: true,
            max_terms: None,
        };
        let dict = build_dictionary(&ds, &cfg).unwrap();
        let unique: HashSet<&Term> = dict.terms().iter().collect();
        assert_eq!(unique.len(), dict.len());
        let names: HashSet<&str> = dict.names().into_iter().collect();
        assert_eq!(names.len(), dict.len());
        assert!(!dict.names().contains(&"abs(x[k]^2)"));
    }

    #[test]
    fn generation_is_deterministic() {
        let ds = dataset(20);
        let cfg = DictionaryConfig {
            operators: vec![Nonlinearity::Sin],
            ..DictionaryConfig::default()
        };
        let a = build_dictionary(&ds, &cfg).unwrap();
        let b = build_dictionary(&ds, &cfg).unwrap();
        assert_eq!(a.terms(), b.terms());
    }

    #[test]
    fn linear_dictionary_layout() {
        let ds = dataset(10);
        let cfg = DictionaryConfig {
            input_lags: 1,
            output_lags: 1,
            degree: 1,
            ..DictionaryConfig::default()
        };
        let dict = build_dictionary(&ds, &cfg).unwrap();
        assert_eq!(dict.names(), vec!["1", "x[k]", "x[k-1]", "y[k-1]"]);
        assert_eq!(dict.start(), 1);

        let m = dict.evaluate(&ds).unwrap();
        assert_eq!(m.shape(), (9, 4));
        // Row 0 corresponds to k = 1.
        assert_eq!(m[(0, 0)], 1.0);
        assert_eq!(m[(0, 2)], ds.value(SignalId::input(0), 0));
        assert_eq!(m[(0, 3)], ds.value(SignalId::output(0), 0));
    }

    #[test]
    fn oversized_dictionary_is_a_configuration_error() {
        let ds = dataset(50);
        let cfg = DictionaryConfig {
            input_lags: 10,
            output_lags: 10,
            degree: 4,
            max_terms: Some(1_000),
            ..DictionaryConfig::default()
        };
        assert!(build_dictionary(&ds, &cfg).unwrap_err().is_configuration());
    }

    #[test]
    fn cap_counts_generated_terms_not_the_bound() {
        let ds = dataset(20);
        // 3 variables: 9 monomials, 6 abs terms (squares skipped), constant.
        let cfg = DictionaryConfig {
            input_lags: 1,
            output_lags: 1,
            degree: 2,
            operators: vec![Nonlinearity::Abs],
            operator_degree: 2,
            include_constant: true,
            max_terms: Some(16),
        };
        let dict = build_dictionary(&ds, &cfg).unwrap();
        assert_eq!(dict.len(), 16);

        let tighter = DictionaryConfig {
            max_terms: Some(15),
            ..cfg
        };
        assert!(build_dictionary(&ds, &tighter).unwrap_err().is_configuration());
    }

    #[test]
    fn explicit_duplicate_terms_are_rejected() {
        let err = Dictionary::from_terms(vec![Term::constant(), Term::constant()]).unwrap_err();
        assert!(err.is_configuration());
    }
}
