//! Derived sub-variable generation
//!
//! For every non-derived column that requests sub-variables, synthesized
//! columns are appended: `<name>_standard`, `<name>_center` and
//! `<name>_<method>discrete`. They inherit counts and type from the source
//! and are flagged `derived`, which keeps them out of further missing-value
//! handling and derivation.

use std::collections::HashSet;

use tracing::debug;

use super::column::{Discretization, Variable};
use super::config::PipelineConfig;
use super::discretize::build_discretizer;
use super::error::{PipelineError, PipelineResult};
use super::value::{cell, DataRow, Value};

pub const STANDARD_SUFFIX: &str = "_standard";
pub const CENTER_SUFFIX: &str = "_center";

/// Name of the discretized sub-variable for `method`
pub fn discrete_name(source: &str, discretization: &Discretization) -> String {
    format!("{}_{}discrete", source, discretization.method.label())
}

/// Append derived sub-variables using the default configuration
pub fn derive_sub_variables(
    columns: &[Variable],
    rows: Vec<DataRow>,
) -> PipelineResult<(Vec<Variable>, Vec<DataRow>)> {
    derive_sub_variables_with(columns, rows, &PipelineConfig::default())
}

/// Append derived sub-variables.
///
/// Standardizing and centering read `mean`/`std` from the source column as
/// it was last described; they fail if the column carries no statistics.
pub fn derive_sub_variables_with(
    columns: &[Variable],
    mut rows: Vec<DataRow>,
    config: &PipelineConfig,
) -> PipelineResult<(Vec<Variable>, Vec<DataRow>)> {
    let mut output: Vec<Variable> = columns.to_vec();
    let mut names: HashSet<String> = columns.iter().map(|c| c.name.clone()).collect();

    for source in columns
        .iter()
        .filter(|c| !c.derived && !c.sub_vars.is_empty())
    {
        let mut generated: Vec<(Variable, Vec<Value>)> = Vec::new();

        if source.sub_vars.standardize {
            let (mean, std) = mean_and_std(source)?;
            let values = map_numeric(&rows, &source.name, |x| (x - mean) / std);
            generated.push((
                Variable::derived_from(source, format!("{}{}", source.name, STANDARD_SUFFIX)),
                values,
            ));
        }

        if source.sub_vars.center {
            let (mean, _) = mean_and_std(source)?;
            let values = map_numeric(&rows, &source.name, |x| x - mean);
            generated.push((
                Variable::derived_from(source, format!("{}{}", source.name, CENTER_SUFFIX)),
                values,
            ));
        }

        for discretization in &source.sub_vars.discretize {
            let values = discretize(&rows, source, discretization, config)?;
            generated.push((
                Variable::derived_from(source, discrete_name(&source.name, discretization)),
                values,
            ));
        }

        for (column, values) in generated {
            if !names.insert(column.name.clone()) {
                return Err(PipelineError::DuplicateColumnName(column.name));
            }
            debug!(source = %source.name, derived = %column.name, "generated sub-variable");
            for (row, value) in rows.iter_mut().zip(values) {
                row.insert(column.name.clone(), value);
            }
            output.push(column);
        }
    }

    Ok((output, rows))
}

fn mean_and_std(source: &Variable) -> PipelineResult<(f64, f64)> {
    let summary = source
        .summary
        .as_ref()
        .ok_or_else(|| PipelineError::MissingPrecomputedStatistic {
            column: source.name.clone(),
            statistic: "mean/std",
        })?;
    Ok((summary.mean, summary.std))
}

/// Apply `f` to every numeric cell; absent and non-numeric cells stay absent
fn map_numeric(rows: &[DataRow], column: &str, f: impl Fn(f64) -> f64) -> Vec<Value> {
    rows.iter()
        .map(|row| match cell(row, column).as_number() {
            Some(x) => Value::from_number(f(x)),
            None => Value::Absent,
        })
        .collect()
}

fn discretize(
    rows: &[DataRow],
    source: &Variable,
    discretization: &Discretization,
    config: &PipelineConfig,
) -> PipelineResult<Vec<Value>> {
    let invalid = |reason: String| PipelineError::InvalidDerivation {
        column: source.name.clone(),
        reason,
    };

    if discretization.groups == 0 {
        return Err(invalid("number of groups must be at least 1".to_string()));
    }

    let mut cells = Vec::with_capacity(rows.len());
    for row in rows {
        let value = cell(row, &source.name);
        if value.is_absent() {
            cells.push(None);
            continue;
        }
        let number = value
            .as_number()
            .ok_or_else(|| invalid(format!("value '{}' is not numeric", value)))?;
        cells.push(Some(number));
    }

    let defined: Vec<f64> = cells.iter().flatten().copied().collect();
    if defined.is_empty() {
        return Ok(vec![Value::Absent; rows.len()]);
    }

    let discretizer = build_discretizer(
        discretization.method,
        discretization.groups,
        &defined,
        config,
    );
    Ok(cells
        .into_iter()
        .map(|c| match c {
            Some(x) => Value::Number(discretizer.predict(x) as f64),
            None => Value::Absent,
        })
        .collect())
}
