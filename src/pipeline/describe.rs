//! Descriptive statistics for every column
//!
//! Describe never fails: absent and non-numeric values simply do not count
//! toward numeric statistics. It is idempotent, since every field it writes
//! is a function of the rows alone.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use tracing::debug;

use super::column::{NumericSummary, Variable, VariableType};
use super::value::{cell, normalized_bits, DataRow};

/// Recompute counts and statistics for every column (in parallel)
pub fn describe(columns: &[Variable], rows: &[DataRow]) -> Vec<Variable> {
    describe_with(columns, rows, true)
}

/// Recompute counts and statistics, optionally on the rayon pool
pub fn describe_with(columns: &[Variable], rows: &[DataRow], parallel: bool) -> Vec<Variable> {
    debug!(
        columns = columns.len(),
        rows = rows.len(),
        parallel,
        "describing dataset"
    );
    if parallel {
        columns
            .par_iter()
            .map(|column| describe_column(column, rows))
            .collect()
    } else {
        columns
            .iter()
            .map(|column| describe_column(column, rows))
            .collect()
    }
}

/// Recompute counts and statistics for one column.
///
/// Declarative fields (missing values, methods, sub-variables, `derived`)
/// are carried over unchanged.
pub fn describe_column(column: &Variable, rows: &[DataRow]) -> Variable {
    let mut missing = 0usize;
    let mut distinct = HashSet::new();
    let mut numbers = Vec::with_capacity(rows.len());
    let mut all_numeric = true;

    for row in rows {
        let value = cell(row, &column.name);
        match value.distinct_key() {
            None => missing += 1,
            Some(key) => {
                distinct.insert(key);
                match value.as_number() {
                    Some(n) => numbers.push(n),
                    None => all_numeric = false,
                }
            }
        }
    }

    let mut described = column.clone();
    described.count = rows.len();
    described.missing = missing;
    described.valid = rows.len() - missing;
    described.unique = distinct.len();

    if all_numeric && !numbers.is_empty() {
        described.kind = VariableType::IntervalOrRatio;
        described.summary = Some(summarize(&mut numbers));
    } else {
        described.kind = VariableType::NominalOrOrdinal;
        described.summary = None;
    }
    described
}

/// Numeric summary of a non-empty sample; sorts `values` in place
fn summarize(values: &mut [f64]) -> NumericSummary {
    values.sort_by(|a, b| a.total_cmp(b));
    let mean = mean(values);
    let median = quantile(values, 0.5);
    NumericSummary {
        min: values[0],
        max: values[values.len() - 1],
        mean,
        std: population_std(values, mean),
        q1: quantile(values, 0.25),
        q2: median,
        q3: quantile(values, 0.75),
        mode: mode(values, mean, median),
    }
}

/// Arithmetic mean; `NaN` for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation around a precomputed mean
pub fn population_std(values: &[f64], mean: f64) -> f64 {
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Linearly interpolated quantile of an ascending slice.
///
/// Position `p * (n - 1)` is interpolated between its neighbours, so
/// `quantile(_, 0.5)` is the usual median.
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let position = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Median of an unsorted sample; `None` when empty
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(quantile(&sorted, 0.5))
}

/// Most frequent value.
///
/// When several values share the top frequency, the Pearson empirical mode
/// `3 * median - 2 * mean` is reported instead. This is an approximation,
/// not one of the tied modes.
fn mode(values: &[f64], mean: f64, median: f64) -> f64 {
    let mut frequencies: HashMap<u64, (f64, usize)> = HashMap::new();
    for &v in values {
        frequencies.entry(normalized_bits(v)).or_insert((v, 0)).1 += 1;
    }
    let top = frequencies.values().map(|(_, n)| *n).max().unwrap_or(0);
    let mut modes = frequencies.values().filter(|(_, n)| *n == top);

    match (modes.next(), modes.next()) {
        (Some((value, _)), None) => *value,
        _ => {
            debug!(top_frequency = top, "modes tie; using Pearson empirical mode");
            3.0 * median - 2.0 * mean
        }
    }
}
