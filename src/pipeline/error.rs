//! Error types for the variable pipeline.
//!
//! Every stage reports failures through `PipelineError`. Each variant maps to
//! one `ErrorKind` so callers can branch on the category without matching
//! the payload.

use thiserror::Error;

/// Errors raised by pipeline stages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// A column scheduled for interpolation holds a value that is not numeric.
    #[error("Cannot interpolate column '{column}': value '{value}' is not numeric")]
    NonNumericInterpolation {
        /// Column being interpolated (or its reference column)
        column: String,
        /// The offending value, as text
        value: String,
    },

    /// `nearest`/`lagrange` was requested without a usable reference column.
    #[error("Column '{column}' needs a reference variable for interpolation{}", reference_suffix(.reference))]
    MissingReferenceVariable {
        column: String,
        reference: Option<String>,
    },

    /// Standardize/center requested before the source carries statistics.
    #[error("Column '{column}' has no {statistic}; describe the dataset before deriving sub-variables")]
    MissingPrecomputedStatistic {
        column: String,
        statistic: &'static str,
    },

    /// A discretized sub-variable cannot be built for this column.
    #[error("Cannot discretize column '{column}': {reason}")]
    InvalidDerivation { column: String, reason: String },

    /// The filter expression could not be parsed or evaluated.
    #[error("Filter '{expression}' failed: {message}")]
    FilterEvaluationError { expression: String, message: String },

    /// The expression references a forbidden primitive.
    #[error("Expression rejected: '{token}' is not allowed")]
    UnsafeExpression { expression: String, token: String },

    /// A column with this name already exists.
    #[error("Column '{0}' already exists")]
    DuplicateColumnName(String),

    /// A computed-column expression could not be parsed or evaluated.
    #[error("Expression '{expression}' failed: {message}")]
    ExpressionEvaluationError { expression: String, message: String },

    /// An expression names a column that is not in the dataset.
    #[error("Unknown variable '{name}' in expression")]
    UndefinedVariableReference { name: String },
}

fn reference_suffix(reference: &Option<String>) -> String {
    reference
        .as_ref()
        .map(|r| format!(" but '{}' does not exist", r))
        .unwrap_or_default()
}

/// Category of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NonNumericInterpolation,
    MissingReferenceVariable,
    MissingPrecomputedStatistic,
    InvalidDerivation,
    FilterEvaluationError,
    UnsafeExpression,
    DuplicateColumnName,
    ExpressionEvaluationError,
    UndefinedVariableReference,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::NonNumericInterpolation { .. } => ErrorKind::NonNumericInterpolation,
            PipelineError::MissingReferenceVariable { .. } => ErrorKind::MissingReferenceVariable,
            PipelineError::MissingPrecomputedStatistic { .. } => {
                ErrorKind::MissingPrecomputedStatistic
            }
            PipelineError::InvalidDerivation { .. } => ErrorKind::InvalidDerivation,
            PipelineError::FilterEvaluationError { .. } => ErrorKind::FilterEvaluationError,
            PipelineError::UnsafeExpression { .. } => ErrorKind::UnsafeExpression,
            PipelineError::DuplicateColumnName(_) => ErrorKind::DuplicateColumnName,
            PipelineError::ExpressionEvaluationError { .. } => ErrorKind::ExpressionEvaluationError,
            PipelineError::UndefinedVariableReference { .. } => {
                ErrorKind::UndefinedVariableReference
            }
        }
    }
}

/// Result alias for pipeline stages
pub type PipelineResult<T> = Result<T, PipelineError>;
