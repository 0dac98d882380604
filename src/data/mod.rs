//! Synthetic excitation signals and reference system simulation.

pub mod sample;

pub use sample::*;
