//! Missing value substitution and interpolation
//!
//! Substitution turns declared missing codes into absent cells in place.
//! Interpolation then fills absent cells on a private copy of the rows, one
//! column at a time, so the substituted rows stay untouched for other
//! consumers.

use std::collections::HashMap;

use tracing::debug;

use super::column::{MissingMethod, Variable};
use super::describe::{mean, median};
use super::error::{PipelineError, PipelineResult};
use super::value::{cell, normalized_bits, DataRow, Value};

/// Number of reference points taken on each side for Lagrange interpolation
const LAGRANGE_POINTS_PER_SIDE: usize = 3;

/// Substitute declared missing values, then interpolate on a copy.
///
/// Returns the columns unchanged and the interpolated rows.
pub fn resolve_missing(
    columns: &[Variable],
    mut rows: Vec<DataRow>,
) -> PipelineResult<(Vec<Variable>, Vec<DataRow>)> {
    let substituted = substitute_missing(columns, &mut rows);
    debug!(substituted, "missing value codes replaced");
    let resolved = interpolate_missing(columns, &rows)?;
    Ok((columns.to_vec(), resolved))
}

/// Replace every cell that loosely equals a declared missing value with absent.
///
/// Derived columns are skipped. Returns the number of replaced cells.
pub fn substitute_missing(columns: &[Variable], rows: &mut [DataRow]) -> usize {
    let mut replaced = 0;
    for column in columns
        .iter()
        .filter(|c| !c.derived && !c.missing_values.is_empty())
    {
        for row in rows.iter_mut() {
            if let Some(value) = row.get_mut(&column.name) {
                if column.missing_values.iter().any(|m| value.loose_eq(m)) {
                    *value = Value::Absent;
                    replaced += 1;
                }
            }
        }
    }
    replaced
}

/// Fill absent cells according to each column's missing method.
///
/// Works on a deep copy of `rows`. Columns are processed in order, so a later
/// column may use an earlier, already filled column as its reference.
pub fn interpolate_missing(columns: &[Variable], rows: &[DataRow]) -> PipelineResult<Vec<DataRow>> {
    let mut resolved = rows.to_vec();

    for column in columns.iter().filter(|c| !c.derived) {
        let Some(method) = column.missing_method else {
            continue;
        };

        let target = numeric_cells(&resolved, &column.name)?;
        let reference = if method.needs_reference() {
            let refer = reference_column(column, columns)?;
            Some(numeric_cells(&resolved, refer)?)
        } else {
            None
        };

        let fills = match (method, reference) {
            (MissingMethod::Mean, _) => fill_constant(&target, mean_of_defined(&target)),
            (MissingMethod::Median, _) => fill_constant(&target, median_of_defined(&target)),
            (MissingMethod::Nearest, Some(reference)) => fill_nearest(&target, &reference),
            (MissingMethod::Lagrange, Some(reference)) => fill_lagrange(&target, &reference),
            // Reference-based methods always resolved a reference above
            (_, None) => vec![None; target.len()],
        };

        let mut filled = 0usize;
        for (row, fill) in resolved.iter_mut().zip(fills) {
            if let Some(v) = fill {
                row.insert(column.name.clone(), Value::Number(v));
                filled += 1;
            }
        }
        debug!(column = %column.name, ?method, filled, "interpolated absent values");
    }

    Ok(resolved)
}

fn reference_column<'a>(column: &Variable, columns: &'a [Variable]) -> PipelineResult<&'a str> {
    let missing_reference = || PipelineError::MissingReferenceVariable {
        column: column.name.clone(),
        reference: column.missing_refer.clone(),
    };
    let refer = column.missing_refer.as_deref().ok_or_else(missing_reference)?;
    columns
        .iter()
        .find(|c| c.name == refer)
        .map(|c| c.name.as_str())
        .ok_or_else(missing_reference)
}

/// Numeric view of a column; absent cells are `None`
fn numeric_cells(rows: &[DataRow], column: &str) -> PipelineResult<Vec<Option<f64>>> {
    rows.iter()
        .map(|row| {
            let value = cell(row, column);
            if value.is_absent() {
                return Ok(None);
            }
            value
                .as_number()
                .map(Some)
                .ok_or_else(|| PipelineError::NonNumericInterpolation {
                    column: column.to_string(),
                    value: value.to_string(),
                })
        })
        .collect()
}

fn defined(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().collect()
}

fn mean_of_defined(values: &[Option<f64>]) -> Option<f64> {
    let defined = defined(values);
    if defined.is_empty() {
        None
    } else {
        Some(mean(&defined))
    }
}

fn median_of_defined(values: &[Option<f64>]) -> Option<f64> {
    median(&defined(values))
}

fn fill_constant(target: &[Option<f64>], fill: Option<f64>) -> Vec<Option<f64>> {
    target
        .iter()
        .map(|v| if v.is_none() { fill } else { None })
        .collect()
}

/// For each absent target, copy the target of the row whose reference is
/// numerically closest. Ties keep the earliest row.
fn fill_nearest(target: &[Option<f64>], reference: &[Option<f64>]) -> Vec<Option<f64>> {
    let candidates: Vec<(f64, f64)> = reference
        .iter()
        .zip(target)
        .filter_map(|(r, t)| Some(((*r)?, (*t)?)))
        .collect();

    target
        .iter()
        .zip(reference)
        .map(|(t, r)| {
            if t.is_some() {
                return None;
            }
            let r = (*r)?;
            let mut best: Option<(f64, f64)> = None;
            for &(candidate_ref, candidate_target) in &candidates {
                let distance = (candidate_ref - r).abs();
                if best.map_or(true, |(d, _)| distance < d) {
                    best = Some((distance, candidate_target));
                }
            }
            best.map(|(_, v)| v)
        })
        .collect()
}

/// Lagrange interpolation through the nearest known points on each side.
fn fill_lagrange(target: &[Option<f64>], reference: &[Option<f64>]) -> Vec<Option<f64>> {
    let points = lagrange_points(target, reference);

    target
        .iter()
        .zip(reference)
        .map(|(t, r)| {
            if t.is_some() {
                return None;
            }
            let x = (*r)?;
            if let Some(&(_, y)) = points.iter().find(|(px, _)| *px == x) {
                return Some(y);
            }
            let split = points.partition_point(|(px, _)| *px < x);
            let below = &points[split.saturating_sub(LAGRANGE_POINTS_PER_SIDE)..split];
            let above_end = (split + LAGRANGE_POINTS_PER_SIDE).min(points.len());
            let above = &points[split..above_end];

            let selected: Vec<(f64, f64)> = below.iter().chain(above).copied().collect();
            if selected.is_empty() {
                return None;
            }
            Some(lagrange(&selected, x)).filter(|v| v.is_finite())
        })
        .collect()
}

/// Known (reference, target) pairs, one per reference value (last wins),
/// sorted ascending by reference
fn lagrange_points(target: &[Option<f64>], reference: &[Option<f64>]) -> Vec<(f64, f64)> {
    let mut points: Vec<(f64, f64)> = Vec::new();
    let mut index: HashMap<u64, usize> = HashMap::new();
    for (r, t) in reference.iter().zip(target) {
        if let (Some(x), Some(y)) = (r, t) {
            match index.get(&normalized_bits(*x)) {
                Some(&i) => points[i].1 = *y,
                None => {
                    index.insert(normalized_bits(*x), points.len());
                    points.push((*x, *y));
                }
            }
        }
    }
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    points
}

/// Evaluate the Lagrange polynomial through `points` (distinct x) at `x`
pub(crate) fn lagrange(points: &[(f64, f64)], x: f64) -> f64 {
    points
        .iter()
        .enumerate()
        .map(|(i, &(xi, yi))| {
            let basis: f64 = points
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, &(xj, _))| (x - xj) / (xi - xj))
                .product();
            yi * basis
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lagrange_reproduces_quadratic() {
        let points = [(0.0, 1.0), (1.0, 2.0), (2.0, 5.0)];
        // y = x^2 + 1
        assert!((lagrange(&points, 3.0) - 10.0).abs() < 1e-9);
        assert!((lagrange(&points, 1.5) - 3.25).abs() < 1e-9);
    }

    #[test]
    fn test_lagrange_points_dedupe_keeps_last() {
        let target = [Some(1.0), Some(2.0), Some(9.0)];
        let reference = [Some(5.0), Some(1.0), Some(5.0)];
        let points = lagrange_points(&target, &reference);
        assert_eq!(points, vec![(1.0, 2.0), (5.0, 9.0)]);
    }

    #[test]
    fn test_nearest_tie_keeps_first_candidate() {
        let target = [Some(10.0), None, Some(30.0), Some(40.0)];
        let reference = [Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        let fills = fill_nearest(&target, &reference);
        assert_eq!(fills, vec![None, Some(10.0), None, None]);
    }
}
