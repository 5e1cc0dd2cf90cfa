//! Pipeline module - the variable transformation stages
//!
//! Stages run in a fixed order: missing values, derived sub-variables,
//! filter, describe. Each stage is a pure function of columns and rows;
//! `Pipeline` owns the committed result.

pub mod column;
pub mod config;
pub mod derive;
pub mod describe;
pub mod discretize;
pub mod error;
pub mod expression;
pub mod filter;
pub mod loader;
pub mod missing;
pub mod orchestrator;
pub mod value;

pub use column::*;
pub use config::*;
pub use derive::*;
pub use describe::*;
pub use discretize::{build_discretizer, Discretizer, EqualFrequency, EqualWidth, KMeans};
pub use error::*;
pub use filter::*;
pub use loader::*;
pub use missing::*;
pub use orchestrator::*;
pub use value::*;
