//! Report module - variable tables and state export

pub mod export;
pub mod summary;

pub use export::*;
pub use summary::*;
