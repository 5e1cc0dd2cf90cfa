//! Expression engine for filters and computed columns
//!
//! Expressions are tokenized, parsed into a tree and evaluated against row
//! values. Nothing is ever executed as host code: the grammar only knows
//! variable references, literals, operators and a fixed set of math
//! functions. The deny-list scan in [`find_forbidden_token`] is kept as an
//! early, explicit rejection for expressions that look like code.

mod eval;
mod lexer;
mod parser;

use std::fmt;

use thiserror::Error;

pub use eval::{evaluate, Environment};
pub use lexer::{tokenize, Token, VARIABLE_DELIMITER};
pub use parser::{parse, BinaryOp, Expr, Function, UnaryOp, MAX_DEPTH};

/// Errors from tokenizing, parsing or evaluating an expression
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("expression is empty")]
    Empty,
    #[error("unexpected character '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },
    #[error("unterminated variable reference starting at position {position}")]
    UnterminatedVariable { position: usize },
    #[error("unterminated string starting at position {position}")]
    UnterminatedString { position: usize },
    #[error("invalid number '{literal}'")]
    InvalidNumber { literal: String },
    #[error("unexpected token {found}")]
    UnexpectedToken { found: String },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("expression nests deeper than {limit} levels")]
    TooDeep { limit: usize },
    #[error("unknown identifier '{name}'; reference columns as :::name:::")]
    UnknownIdentifier { name: String },
    #[error("function '{function}' does not accept {given} argument(s)")]
    Arity { function: String, given: usize },
    #[error("unknown variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("cannot apply {operation} to '{value}'")]
    TypeMismatch { operation: String, value: String },
}

/// A value produced or consumed by expression evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(f64),
    Text(String),
    Bool(bool),
    Absent,
}

impl Scalar {
    pub fn is_absent(&self) -> bool {
        matches!(self, Scalar::Absent)
    }

    pub fn truthy(&self) -> bool {
        match self {
            Scalar::Number(n) => *n != 0.0 && !n.is_nan(),
            Scalar::Text(s) => !s.is_empty(),
            Scalar::Bool(b) => *b,
            Scalar::Absent => false,
        }
    }

    /// Numeric view used by arithmetic and comparisons
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Scalar::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse::<f64>().ok()
                }
            }
            Scalar::Absent => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Text(s) => write!(f, "{}", s),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Absent => write!(f, "undefined"),
        }
    }
}

/// Identifiers that name networking, dynamic code, timer or storage primitives
const FORBIDDEN_IDENTIFIERS: &[&str] = &[
    "fetch",
    "XMLHttpRequest",
    "WebSocket",
    "EventSource",
    "navigator",
    "eval",
    "Function",
    "import",
    "require",
    "setTimeout",
    "setInterval",
    "setImmediate",
    "requestAnimationFrame",
    "localStorage",
    "sessionStorage",
    "indexedDB",
    "document",
    "window",
    "globalThis",
    "process",
];

/// Return the first forbidden identifier in the expression, if any.
///
/// Text inside `:::name:::` references is skipped so that a column may be
/// named e.g. `process`.
pub fn find_forbidden_token(expression: &str) -> Option<&'static str> {
    let mut outside = String::with_capacity(expression.len());
    let mut rest = expression;
    while let Some(start) = rest.find(VARIABLE_DELIMITER) {
        outside.push_str(&rest[..start]);
        outside.push(' ');
        let after = &rest[start + VARIABLE_DELIMITER.len()..];
        match after.find(VARIABLE_DELIMITER) {
            Some(end) => rest = &after[end + VARIABLE_DELIMITER.len()..],
            None => {
                rest = after;
                break;
            }
        }
    }
    outside.push_str(rest);

    outside
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .filter(|word| !word.is_empty())
        .find_map(|word| FORBIDDEN_IDENTIFIERS.iter().copied().find(|f| *f == word))
}
