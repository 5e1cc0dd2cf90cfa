//! varflow: Variable Transformation Library
//!
//! Resolves declared missing values, generates derived sub-variables,
//! filters rows with a sandboxed expression language and computes
//! descriptive statistics for a tabular dataset.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
