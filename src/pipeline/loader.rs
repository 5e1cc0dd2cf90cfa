//! Dataset loader for JSON dataset documents
//!
//! A document is either a bare array of row objects or an object with
//! `rows` and optional `columns` / `filter`. Columns that are not declared
//! are created with empty metadata, one per field, in first-seen order.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::column::Variable;
use super::config::PipelineConfig;
use super::orchestrator::PersistedState;
use super::value::DataRow;
use crate::utils::{create_spinner, finish_with_success};

/// Columns, rows and an optional filter read from disk
#[derive(Debug, Clone, Default)]
pub struct DatasetDocument {
    pub columns: Vec<Variable>,
    pub rows: Vec<DataRow>,
    pub filter: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDocument {
    Rows(Vec<DataRow>),
    Full {
        #[serde(default)]
        columns: Vec<Variable>,
        rows: Vec<DataRow>,
        #[serde(default)]
        filter: Option<String>,
    },
}

/// Load a dataset document from a `.json` file
pub fn load_dataset(path: &Path) -> Result<DatasetDocument> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if extension != "json" {
        anyhow::bail!(
            "Unsupported file format: {}. Supported formats: json",
            extension
        );
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset: {}", path.display()))?;
    parse_dataset(&content)
        .with_context(|| format!("Failed to parse dataset: {}", path.display()))
}

/// Parse a dataset document from JSON text
pub fn parse_dataset(content: &str) -> Result<DatasetDocument> {
    let raw: RawDocument = serde_json::from_str(content)?;
    let (mut columns, rows, filter) = match raw {
        RawDocument::Rows(rows) => (Vec::new(), rows, None),
        RawDocument::Full {
            columns,
            rows,
            filter,
        } => (columns, rows, filter),
    };

    let mut known: HashSet<String> = columns.iter().map(|c| c.name.clone()).collect();
    for name in field_names(&rows) {
        if known.insert(name.clone()) {
            columns.push(Variable::new(name));
        }
    }

    Ok(DatasetDocument {
        columns,
        rows,
        filter,
    })
}

/// Load a dataset and report its shape, with a spinner while reading
pub fn load_dataset_with_progress(path: &Path) -> Result<(DatasetDocument, usize, usize)> {
    let spinner = create_spinner(&format!("Loading {}...", path.display()));
    let document = load_dataset(path)?;
    let (rows, cols) = (document.rows.len(), document.columns.len());
    finish_with_success(&spinner, &format!("Loaded {} rows, {} columns", rows, cols));
    Ok((document, rows, cols))
}

/// Read a persisted pipeline state written by a previous run
pub fn load_persisted_state(path: &Path) -> Result<PersistedState> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse state file: {}", path.display()))
}

/// Read a pipeline configuration file; unset fields keep their defaults
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Field names across all rows in first-seen order.
///
/// Rows are stored with sorted keys, so order within a row is alphabetical.
fn field_names(rows: &[DataRow]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for row in rows {
        for name in row.keys() {
            if seen.insert(name.as_str()) {
                names.push(name.clone());
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_rows_create_columns() {
        let doc = parse_dataset(r#"[{"a": 1, "b": "x"}, {"a": 2, "c": null}]"#).unwrap();
        let names: Vec<&str> = doc.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(doc.rows.len(), 2);
    }

    #[test]
    fn test_declared_columns_are_kept_first() {
        let doc = parse_dataset(
            r#"{"columns": [{"name": "b", "missingValues": [-99]}], "rows": [{"a": 1, "b": -99}]}"#,
        )
        .unwrap();
        assert_eq!(doc.columns[0].name, "b");
        assert_eq!(doc.columns[0].missing_values.len(), 1);
        assert_eq!(doc.columns[1].name, "a");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"kmeans_max_iterations": 7}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.kmeans_max_iterations, 7);
        assert_eq!(config.large_dataset_threshold, 10_000);
        assert!(config.parallel);
    }

    #[test]
    fn test_non_json_extension_is_rejected() {
        let err = load_dataset(Path::new("data.csv")).unwrap_err();
        assert!(err.to_string().contains("Unsupported file format"));
    }
}
