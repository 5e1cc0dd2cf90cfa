//! Shared test utilities and fixture generators

#![allow(dead_code)]

use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;
use varflow::pipeline::{DataRow, Value, Variable};

/// Build a row from `(column, value)` pairs
pub fn row<const N: usize>(cells: [(&str, Value); N]) -> DataRow {
    cells
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// One-column rows; `None` becomes an absent cell
pub fn numeric_rows(column: &str, values: &[Option<f64>]) -> Vec<DataRow> {
    values
        .iter()
        .map(|v| row([(column, Value::from(*v))]))
        .collect()
}

/// Rows with a reference column and a target column side by side
pub fn reference_rows(reference: &[f64], target: &[Option<f64>]) -> Vec<DataRow> {
    reference
        .iter()
        .zip(target)
        .map(|(r, t)| row([("ref", Value::Number(*r)), ("target", Value::from(*t))]))
        .collect()
}

/// Small survey-style dataset:
/// - `age`: numeric with a `-99` missing code (once as text)
/// - `income`: numeric with one absent cell
/// - `city`: nominal
pub fn create_survey_rows() -> Vec<DataRow> {
    vec![
        row([
            ("age", Value::Number(25.0)),
            ("income", Value::Number(30_000.0)),
            ("city", Value::from("Oslo")),
        ]),
        row([
            ("age", Value::Number(35.0)),
            ("income", Value::Number(52_000.0)),
            ("city", Value::from("Bergen")),
        ]),
        row([
            ("age", Value::Number(-99.0)),
            ("income", Value::Absent),
            ("city", Value::from("Oslo")),
        ]),
        row([
            ("age", Value::from("-99")),
            ("income", Value::Number(41_000.0)),
            ("city", Value::from("Tromsø")),
        ]),
        row([
            ("age", Value::Number(52.0)),
            ("income", Value::Number(75_000.0)),
            ("city", Value::from("Bergen")),
        ]),
    ]
}

/// Column declarations matching `create_survey_rows`
pub fn create_survey_columns() -> Vec<Variable> {
    vec![
        Variable::new("age").with_missing_values(vec![Value::Number(-99.0)]),
        Variable::new("income"),
        Variable::new("city"),
    ]
}

/// Random numeric dataset for performance/stress tests
pub fn create_random_rows(rows: usize, cols: usize, seed: u64) -> Vec<DataRow> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..rows)
        .map(|_| {
            (0..cols)
                .map(|c| {
                    let value = if rng.gen::<f64>() < 0.05 {
                        Value::Absent
                    } else {
                        Value::Number(rng.gen::<f64>() * 100.0)
                    };
                    (format!("col_{}", c), value)
                })
                .collect()
        })
        .collect()
}

/// Write `content` to a JSON file in a fresh temp directory
pub fn create_temp_json(name: &str, content: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write fixture");
    (dir, path)
}

/// Numeric cells of a column, `None` for absent
pub fn column_values(rows: &[DataRow], column: &str) -> Vec<Option<f64>> {
    rows.iter()
        .map(|r| r.get(column).and_then(Value::as_number))
        .collect()
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}
