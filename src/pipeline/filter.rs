//! Row filtering and computed-column evaluation
//!
//! Both share the same expression engine. Variable references are resolved
//! against row values coerced by column type: interval/ratio columns read as
//! numbers, everything else as text.

use std::collections::HashMap;

use tracing::debug;

use super::column::{Variable, VariableType};
use super::error::{PipelineError, PipelineResult};
use super::expression::{
    evaluate, find_forbidden_token, parse, Environment, Expr, ExpressionError, Scalar,
};
use super::value::{cell, DataRow, Value};

/// Variable lookup for a single row
struct RowEnvironment<'a> {
    row: &'a DataRow,
    types: &'a HashMap<&'a str, VariableType>,
}

impl Environment for RowEnvironment<'_> {
    fn lookup(&self, name: &str) -> Option<Scalar> {
        let kind = self.types.get(name)?;
        let value = cell(self.row, name);
        if value.is_absent() {
            return Some(Scalar::Absent);
        }
        Some(match (kind, value) {
            (VariableType::IntervalOrRatio, v) => {
                v.as_number().map(Scalar::Number).unwrap_or(Scalar::Absent)
            }
            (VariableType::NominalOrOrdinal, Value::Number(n)) => Scalar::Text(n.to_string()),
            (VariableType::NominalOrOrdinal, Value::Text(s)) => Scalar::Text(s.clone()),
            (VariableType::NominalOrOrdinal, Value::Absent) => Scalar::Absent,
        })
    }
}

fn column_types(columns: &[Variable]) -> HashMap<&str, VariableType> {
    columns.iter().map(|c| (c.name.as_str(), c.kind)).collect()
}

/// Every referenced variable must name a column
fn check_references(expr: &Expr, types: &HashMap<&str, VariableType>) -> PipelineResult<()> {
    match expr
        .variables()
        .into_iter()
        .find(|name| !types.contains_key(name.as_str()))
    {
        Some(name) => Err(PipelineError::UndefinedVariableReference { name }),
        None => Ok(()),
    }
}

/// Indices of rows that satisfy the filter.
///
/// An empty or absent expression keeps every row. Rows whose evaluation is
/// absent, falsy, or fails are excluded.
pub fn filter_indices(
    columns: &[Variable],
    rows: &[DataRow],
    expression: Option<&str>,
) -> PipelineResult<Vec<usize>> {
    let Some(expression) = expression.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok((0..rows.len()).collect());
    };

    let expr = parse(expression).map_err(|e| PipelineError::FilterEvaluationError {
        expression: expression.to_string(),
        message: e.to_string(),
    })?;
    let types = column_types(columns);
    check_references(&expr, &types)?;

    let kept: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|&(_, row)| {
            let env = RowEnvironment { row, types: &types };
            matches!(evaluate(&expr, &env), Ok(value) if value.truthy())
        })
        .map(|(i, _)| i)
        .collect();

    debug!(
        expression,
        kept = kept.len(),
        dropped = rows.len() - kept.len(),
        "filter applied"
    );
    Ok(kept)
}

/// Rows that satisfy the filter, in their original order
pub fn apply_filter(
    columns: &[Variable],
    rows: &[DataRow],
    expression: Option<&str>,
) -> PipelineResult<Vec<DataRow>> {
    let indices = filter_indices(columns, rows, expression)?;
    Ok(indices.into_iter().map(|i| rows[i].clone()).collect())
}

/// Reject expressions that name forbidden primitives, then parse.
pub fn compile_computed_expression(
    columns: &[Variable],
    expression: &str,
) -> PipelineResult<Expr> {
    if let Some(token) = find_forbidden_token(expression) {
        return Err(PipelineError::UnsafeExpression {
            expression: expression.to_string(),
            token: token.to_string(),
        });
    }
    let expr = parse(expression).map_err(|e| evaluation_error(expression, &e))?;
    check_references(&expr, &column_types(columns))?;
    Ok(expr)
}

/// Evaluate a computed-column expression for every row.
///
/// Absent operands and non-finite results yield absent cells; booleans are
/// stored as 1/0.
pub fn compute_column(
    columns: &[Variable],
    rows: &[DataRow],
    expression: &str,
) -> PipelineResult<Vec<Value>> {
    let expr = compile_computed_expression(columns, expression)?;
    evaluate_computed(columns, rows, &expr, expression)
}

/// Evaluate an already compiled computed-column expression
pub fn evaluate_computed(
    columns: &[Variable],
    rows: &[DataRow],
    expr: &Expr,
    expression: &str,
) -> PipelineResult<Vec<Value>> {
    let types = column_types(columns);

    rows.iter()
        .map(|row| {
            let env = RowEnvironment { row, types: &types };
            let value = evaluate(expr, &env).map_err(|e| evaluation_error(expression, &e))?;
            Ok(match value {
                Scalar::Number(n) => Value::from_number(n),
                Scalar::Bool(b) => Value::Number(if b { 1.0 } else { 0.0 }),
                Scalar::Text(s) => Value::Text(s),
                Scalar::Absent => Value::Absent,
            })
        })
        .collect()
}

fn evaluation_error(expression: &str, error: &ExpressionError) -> PipelineError {
    match error {
        ExpressionError::UndefinedVariable { name } => {
            PipelineError::UndefinedVariableReference { name: name.clone() }
        }
        other => PipelineError::ExpressionEvaluationError {
            expression: expression.to_string(),
            message: other.to_string(),
        },
    }
}
