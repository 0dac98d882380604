//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during dictionary generation and search
//! - attached to fitted models for reporting
//! - handed to downstream tooling without extra conversion

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{ArboError, Result};

/// Whether a signal is an exogenous input or a modelled output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalRole {
    Input,
    Output,
}

/// Address of a signal inside a [`Dataset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SignalId {
    pub role: SignalRole,
    pub index: usize,
}

impl SignalId {
    pub fn input(index: usize) -> Self {
        Self { role: SignalRole::Input, index }
    }

    pub fn output(index: usize) -> Self {
        Self { role: SignalRole::Output, index }
    }
}

/// A named, uniformly sampled sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub name: String,
    pub values: Vec<f64>,
}

impl Signal {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Input and output histories of one experiment.
///
/// All signals share the same length and names are unique across both groups.
/// Deserialization goes through [`Dataset::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct Dataset {
    inputs: Vec<Signal>,
    outputs: Vec<Signal>,
}

/// Unchecked wire form of a [`Dataset`].
#[derive(Deserialize)]
struct RawDataset {
    #[serde(default)]
    inputs: Vec<Signal>,
    outputs: Vec<Signal>,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = ArboError;

    fn try_from(raw: RawDataset) -> Result<Self> {
        Dataset::new(raw.inputs, raw.outputs)
    }
}

impl Dataset {
    pub fn new(inputs: Vec<Signal>, outputs: Vec<Signal>) -> Result<Self> {
        if outputs.is_empty() {
            return Err(ArboError::config("Dataset needs at least one output signal."));
        }

        let len = outputs[0].values.len();
        if len == 0 {
            return Err(ArboError::config("Signals must contain at least one sample."));
        }

        let mut names: Vec<&str> = Vec::with_capacity(inputs.len() + outputs.len());
        for s in inputs.iter().chain(outputs.iter()) {
            if s.values.len() != len {
                return Err(ArboError::config(format!(
                    "Signal '{}' has {} samples, expected {len}.",
                    s.name,
                    s.values.len()
                )));
            }
            if s.name.is_empty() {
                return Err(ArboError::config("Signal names must not be empty."));
            }
            if names.contains(&s.name.as_str()) {
                return Err(ArboError::config(format!("Duplicate signal name '{}'.", s.name)));
            }
            if s.values.iter().any(|v| !v.is_finite()) {
                return Err(ArboError::config(format!(
                    "Signal '{}' contains non-finite samples.",
                    s.name
                )));
            }
            names.push(&s.name);
        }

        Ok(Self { inputs, outputs })
    }

    /// Single-input single-output dataset with the conventional `x` / `y` names.
    pub fn siso(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        Self::new(vec![Signal::new("x", x)], vec![Signal::new("y", y)])
    }

    /// Number of samples per signal.
    pub fn len(&self) -> usize {
        self.outputs[0].values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn inputs(&self) -> &[Signal] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Signal] {
        &self.outputs
    }

    pub fn signal(&self, id: SignalId) -> &Signal {
        match id.role {
            SignalRole::Input => &self.inputs[id.index],
            SignalRole::Output => &self.outputs[id.index],
        }
    }

    pub fn name(&self, id: SignalId) -> &str {
        &self.signal(id).name
    }

    pub fn value(&self, id: SignalId, k: usize) -> f64 {
        self.signal(id).values[k]
    }

    /// Look up a signal id by name.
    pub fn find(&self, name: &str) -> Option<SignalId> {
        if let Some(i) = self.inputs.iter().position(|s| s.name == name) {
            return Some(SignalId::input(i));
        }
        self.outputs
            .iter()
            .position(|s| s.name == name)
            .map(SignalId::output)
    }
}

/// Scalar nonlinearity wrapped around a monomial.
///
/// Powers are carried by factor exponents, so `Identity` covers plain monomials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nonlinearity {
    Identity,
    Abs,
    Exp,
    Sin,
    Cos,
}

impl Nonlinearity {
    pub fn apply(self, v: f64) -> f64 {
        match self {
            Nonlinearity::Identity => v,
            Nonlinearity::Abs => v.abs(),
            Nonlinearity::Exp => v.exp(),
            Nonlinearity::Sin => v.sin(),
            Nonlinearity::Cos => v.cos(),
        }
    }

    /// Function name used in term labels (`None` for identity).
    pub fn label(self) -> Option<&'static str> {
        match self {
            Nonlinearity::Identity => None,
            Nonlinearity::Abs => Some("abs"),
            Nonlinearity::Exp => Some("exp"),
            Nonlinearity::Sin => Some("sin"),
            Nonlinearity::Cos => Some("cos"),
        }
    }
}

/// One lagged signal raised to a positive power: `s[k-lag]^exponent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Factor {
    pub signal: SignalId,
    pub lag: usize,
    pub exponent: u32,
}

impl Factor {
    pub fn new(signal: SignalId, lag: usize, exponent: u32) -> Self {
        Self { signal, lag, exponent }
    }
}

/// A candidate regressor: `op(Π s_i[k-lag_i]^e_i)`.
///
/// A term without factors is the constant `1`. Factors are kept sorted so two
/// terms describing the same expression compare equal. The display name is
/// derived once at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Term {
    op: Nonlinearity,
    factors: Vec<Factor>,
    name: String,
}

impl Term {
    pub fn constant() -> Self {
        Self {
            op: Nonlinearity::Identity,
            factors: Vec::new(),
            name: "1".to_string(),
        }
    }

    /// Build a term, folding repeated `(signal, lag)` pairs into exponents.
    pub fn new(op: Nonlinearity, factors: Vec<Factor>, dataset: &Dataset) -> Result<Self> {
        if factors.is_empty() {
            if op != Nonlinearity::Identity {
                return Err(ArboError::config("Nonlinearities need at least one factor."));
            }
            return Ok(Self::constant());
        }

        let mut folded: Vec<Factor> = Vec::with_capacity(factors.len());
        let mut sorted = factors;
        sorted.sort();
        for f in sorted {
            if f.exponent == 0 {
                return Err(ArboError::config("Factor exponents must be >= 1."));
            }
            let count = match f.signal.role {
                SignalRole::Input => dataset.inputs().len(),
                SignalRole::Output => dataset.outputs().len(),
            };
            if f.signal.index >= count {
                return Err(ArboError::config(format!(
                    "Signal {:?} #{} does not exist in the dataset.",
                    f.signal.role, f.signal.index
                )));
            }
            if f.signal.role == SignalRole::Output && f.lag == 0 {
                return Err(ArboError::config(format!(
                    "Output '{}' cannot appear without delay.",
                    dataset.name(f.signal)
                )));
            }
            match folded.last_mut() {
                Some(last) if last.signal == f.signal && last.lag == f.lag => {
                    last.exponent += f.exponent;
                }
                _ => folded.push(f),
            }
        }

        let name = label(op, &folded, dataset);
        Ok(Self {
            op,
            factors: folded,
            name,
        })
    }

    pub fn op(&self) -> Nonlinearity {
        self.op
    }

    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_constant(&self) -> bool {
        self.factors.is_empty()
    }

    /// A single undistorted lagged variable: `s[k-j]`.
    pub fn is_linear(&self) -> bool {
        self.op == Nonlinearity::Identity
            && self.factors.len() == 1
            && self.factors[0].exponent == 1
    }

    /// Total polynomial degree of the wrapped monomial.
    pub fn degree(&self) -> u32 {
        self.factors.iter().map(|f| f.exponent).sum()
    }

    pub fn max_lag(&self) -> usize {
        self.factors.iter().map(|f| f.lag).max().unwrap_or(0)
    }

    /// Whether any factor refers to the given signal.
    pub fn uses(&self, signal: SignalId) -> bool {
        self.factors.iter().any(|f| f.signal == signal)
    }

    /// Evaluate at time `k` through an arbitrary sample lookup.
    ///
    /// Callers guarantee `k >= self.max_lag()`.
    pub fn eval_with<F>(&self, k: usize, value: F) -> f64
    where
        F: Fn(SignalId, usize) -> f64,
    {
        let mut prod = 1.0;
        for f in &self.factors {
            prod *= value(f.signal, k - f.lag).powi(f.exponent as i32);
        }
        if self.factors.is_empty() {
            return prod;
        }
        self.op.apply(prod)
    }

    /// Evaluate at time `k` on recorded data.
    pub fn eval(&self, dataset: &Dataset, k: usize) -> f64 {
        self.eval_with(k, |id, j| dataset.value(id, j))
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.op == other.op && self.factors == other.factors
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.op.hash(state);
        self.factors.hash(state);
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn label(op: Nonlinearity, factors: &[Factor], dataset: &Dataset) -> String {
    let parts: Vec<String> = factors
        .iter()
        .map(|f| {
            let name = dataset.name(f.signal);
            let base = if f.lag == 0 {
                format!("{name}[k]")
            } else {
                format!("{name}[k-{}]", f.lag)
            };
            if f.exponent == 1 {
                base
            } else {
                format!("{base}^{}", f.exponent)
            }
        })
        .collect();
    let body = parts.join("*");
    match op.label() {
        Some(func) => format!("{func}({body})"),
        None => body,
    }
}

/// Complexity-penalized metric used to pick among search solutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    /// `n ln(SSE/n) + k ln n`.
    Bic,
    /// `n ln(SSE/n) + 2k`.
    Aic,
    /// Fewest terms, then lowest SSE.
    Shortest,
}

/// Bounds of the candidate term dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryConfig {
    /// Inputs enter with lags `0..=input_lags`.
    pub input_lags: usize,
    /// Outputs enter with lags `1..=output_lags`.
    pub output_lags: usize,
    /// Maximum monomial degree.
    pub degree: u32,
    /// Nonlinearities applied on top of the monomials.
    pub operators: Vec<Nonlinearity>,
    /// Maximum degree of the monomials the operators wrap.
    pub operator_degree: u32,
    pub include_constant: bool,
    /// Hard cap on the number of generated terms.
    pub max_terms: Option<usize>,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            input_lags: 2,
            output_lags: 2,
            degree: 2,
            operators: Vec::new(),
            operator_degree: 1,
            include_constant: true,
            max_terms: Some(20_000),
        }
    }
}

impl DictionaryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.degree == 0 && !self.include_constant {
            return Err(ArboError::config(
                "Dictionary degree must be >= 1 unless the constant term is included.",
            ));
        }
        if self.degree > 16 {
            return Err(ArboError::config(format!(
                "Dictionary degree {} is out of range (max 16).",
                self.degree
            )));
        }
        if !self.operators.is_empty() && self.operator_degree == 0 {
            return Err(ArboError::config("Operator degree must be >= 1 when operators are set."));
        }
        if self.operator_degree > 16 {
            return Err(ArboError::config(format!(
                "Operator degree {} is out of range (max 16).",
                self.operator_degree
            )));
        }
        if self.max_terms == Some(0) {
            return Err(ArboError::config("max_terms must be > 0."));
        }
        Ok(())
    }

    /// Largest lag any generated term can carry.
    pub fn max_lag(&self) -> usize {
        self.input_lags.max(self.output_lags)
    }
}

/// Thresholds and bounds of the arborescence search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Stop a regression once `1 - ΣERR < rho`.
    pub rho: f64,
    /// Do not add terms whose ERR is below this value.
    pub min_err: f64,
    /// Maximum number of terms per regression.
    pub max_terms: usize,
    /// Maximum depth of the arborescence (0 = plain forward regression).
    pub max_depth: usize,
    /// Maximum number of evaluated nodes.
    pub max_nodes: usize,
    /// Relative squared-norm below which an orthogonalized candidate counts as collinear.
    pub collinearity_tol: f64,
    pub criterion: Criterion,
    /// Solutions within this many criterion points of the best are compared on size.
    pub ic_tolerance: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            rho: 1e-5,
            min_err: 1e-10,
            max_terms: 20,
            max_depth: 2,
            max_nodes: 500,
            collinearity_tol: 1e-10,
            criterion: Criterion::Bic,
            ic_tolerance: 2.0,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.rho.is_finite() && self.rho >= 0.0 && self.rho < 1.0) {
            return Err(ArboError::config(format!("Invalid rho {} (must be in [0, 1)).", self.rho)));
        }
        if !(self.min_err.is_finite() && self.min_err >= 0.0 && self.min_err < 1.0) {
            return Err(ArboError::config(format!(
                "Invalid min_err {} (must be in [0, 1)).",
                self.min_err
            )));
        }
        if self.max_terms == 0 {
            return Err(ArboError::config("Search max_terms must be >= 1."));
        }
        if self.max_nodes == 0 {
            return Err(ArboError::config("Search max_nodes must be >= 1."));
        }
        if !(self.collinearity_tol.is_finite() && self.collinearity_tol > 0.0 && self.collinearity_tol < 1.0) {
            return Err(ArboError::config("collinearity_tol must be in (0, 1)."));
        }
        if !(self.ic_tolerance.is_finite() && self.ic_tolerance >= 0.0) {
            return Err(ArboError::config("ic_tolerance must be finite and >= 0."));
        }
        Ok(())
    }
}

/// How coefficients of a fixed term set are estimated.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Solver {
    /// Batch least squares over the whole history (SVD).
    #[default]
    Ordinary,
    /// Row-by-row recursive least squares.
    Recursive {
        /// Forgetting factor in `(0, 1]`.
        forgetting: f64,
        /// Initial covariance scale `P0 = initial_covariance · I`.
        initial_covariance: f64,
    },
}

impl Solver {
    pub fn validate(&self) -> Result<()> {
        match *self {
            Solver::Ordinary => Ok(()),
            Solver::Recursive {
                forgetting,
                initial_covariance,
            } => {
                if !(forgetting.is_finite() && forgetting > 0.0 && forgetting <= 1.0) {
                    return Err(ArboError::config(format!(
                        "Invalid forgetting factor {forgetting} (must be in (0, 1])."
                    )));
                }
                if !(initial_covariance.is_finite() && initial_covariance > 0.0) {
                    return Err(ArboError::config("initial_covariance must be finite and > 0."));
                }
                Ok(())
            }
        }
    }
}

/// Full configuration of a polynomial / operator NARX identification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentConfig {
    pub dictionary: DictionaryConfig,
    pub search: SearchConfig,
    pub solver: Solver,
}

impl IdentConfig {
    pub fn validate(&self) -> Result<()> {
        self.dictionary.validate()?;
        self.search.validate()?;
        self.solver.validate()
    }
}

/// Configuration of a rational identification `y = N / (1 + D)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RationalConfig {
    pub numerator: DictionaryConfig,
    /// Must exclude the constant term: it is fixed to 1 by normalization.
    pub denominator: DictionaryConfig,
    pub search: SearchConfig,
    pub solver: Solver,
}

impl Default for RationalConfig {
    fn default() -> Self {
        Self {
            numerator: DictionaryConfig::default(),
            denominator: DictionaryConfig {
                include_constant: false,
                ..DictionaryConfig::default()
            },
            search: SearchConfig::default(),
            solver: Solver::default(),
        }
    }
}

impl RationalConfig {
    pub fn validate(&self) -> Result<()> {
        self.numerator.validate()?;
        self.denominator.validate()?;
        if self.denominator.include_constant {
            return Err(ArboError::config(
                "Denominator dictionary must not include the constant term (normalized to 1).",
            ));
        }
        self.search.validate()?;
        self.solver.validate()
    }
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    /// Number of fitted samples.
    pub n: usize,
    /// Number of fitted coefficients.
    pub k: usize,
    pub sse: f64,
    pub rmse: f64,
    /// Explained fraction of the centered output variance.
    pub r_squared: f64,
    pub bic: f64,
    pub aic: f64,
}
