//! Error type shared by every stage of identification.

/// Errors surfaced by dictionary generation, search and fitting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArboError {
    /// Invalid user-specified bounds or options.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Ill-conditioned or rank-deficient fit, vanishing denominator, non-finite values.
    #[error("numerical error: {0}")]
    Numerical(String),
}

impl ArboError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn numerical(message: impl Into<String>) -> Self {
        Self::Numerical(message.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn is_numerical(&self) -> bool {
        matches!(self, Self::Numerical(_))
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ArboError>;
