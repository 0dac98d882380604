//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - recorded signals and datasets (`Signal`, `Dataset`, `SignalId`)
//! - symbolic regressor terms (`Term`, `Factor`, `Nonlinearity`)
//! - configuration (`DictionaryConfig`, `SearchConfig`, `IdentConfig`, `RationalConfig`)
//! - fit diagnostics (`FitQuality`)

pub mod types;

pub use types::*;
