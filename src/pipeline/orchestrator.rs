//! Pipeline orchestration and committed state
//!
//! A rebuild always recomputes from the declared columns and the raw rows:
//! Missing -> Derive -> Filter -> Describe. Describe covers every resolved
//! row rather than the working set, so it is computed ahead of the filter,
//! which then reads the fresh column types. The result is committed as one
//! immutable snapshot; a failure at any stage leaves the previous snapshot
//! in place.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use super::column::Variable;
use super::config::PipelineConfig;
use super::derive::derive_sub_variables_with;
use super::describe::{describe_column, describe_with};
use super::error::{PipelineError, PipelineResult};
use super::filter::{compile_computed_expression, evaluate_computed, filter_indices};
use super::missing::resolve_missing;
use super::value::{DataRow, Value};

/// Output of a full pipeline run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineOutput {
    /// Declared columns plus derived columns, described over `rows`
    pub columns: Vec<Variable>,
    /// Resolved rows: substituted, interpolated and carrying derived cells
    pub rows: Vec<DataRow>,
    /// Indices into `rows` that pass the filter (the working set)
    pub working: Vec<usize>,
}

impl PipelineOutput {
    /// Materialize the working row set
    pub fn working_rows(&self) -> Vec<DataRow> {
        self.working.iter().map(|&i| self.rows[i].clone()).collect()
    }
}

/// Run every stage in order.
///
/// Derived columns in `columns` are dropped first and regenerated. The
/// variable table is described over the resolved rows, so filtering never
/// changes column metadata, and the filter sees the column types of this
/// run rather than whatever `kind` the input carried.
pub fn run_pipeline(
    columns: &[Variable],
    raw_rows: &[DataRow],
    filter: Option<&str>,
    config: &PipelineConfig,
) -> PipelineResult<PipelineOutput> {
    let span = info_span!("rebuild", rows = raw_rows.len());
    let _guard = span.enter();

    let declared: Vec<Variable> = columns.iter().filter(|c| !c.derived).cloned().collect();
    ensure_unique_names(&declared)?;

    let (resolved_columns, resolved_rows) = resolve_missing(&declared, raw_rows.to_vec())?;
    debug!(stage = "missing", "stage complete");

    let (derived_columns, derived_rows) =
        derive_sub_variables_with(&resolved_columns, resolved_rows, config)?;
    debug!(stage = "derive", columns = derived_columns.len(), "stage complete");

    // The filter reads column types from this run, never from the input
    let described = describe_with(&derived_columns, &derived_rows, config.parallel);
    debug!(stage = "describe", "stage complete");

    let working = filter_indices(&described, &derived_rows, filter)?;
    debug!(stage = "filter", working = working.len(), "stage complete");

    Ok(PipelineOutput {
        columns: described,
        rows: derived_rows,
        working,
    })
}

/// Evaluate `expression` over `rows` and prepend the result as a new column.
///
/// The new column is described on its own; no other stage is re-run.
pub fn add_computed_column(
    columns: &[Variable],
    rows: &[DataRow],
    name: &str,
    expression: &str,
) -> PipelineResult<(Vec<Variable>, Vec<DataRow>)> {
    let values = compute_values(columns, rows, name, expression)?;
    let mut rows = rows.to_vec();
    for (row, value) in rows.iter_mut().zip(values) {
        row.insert(name.to_string(), value);
    }

    let column = describe_column(&Variable::new(name), &rows);
    let mut columns = columns.to_vec();
    columns.insert(0, column);
    Ok((columns, rows))
}

fn compute_values(
    columns: &[Variable],
    rows: &[DataRow],
    name: &str,
    expression: &str,
) -> PipelineResult<Vec<Value>> {
    let expr = compile_computed_expression(columns, expression)?;
    if columns.iter().any(|c| c.name == name) {
        return Err(PipelineError::DuplicateColumnName(name.to_string()));
    }
    evaluate_computed(columns, rows, &expr, expression)
}

fn ensure_unique_names(columns: &[Variable]) -> PipelineResult<()> {
    let mut seen = HashSet::new();
    for column in columns {
        if !seen.insert(column.name.as_str()) {
            return Err(PipelineError::DuplicateColumnName(column.name.clone()));
        }
    }
    Ok(())
}

/// The blobs an external store keeps after every commit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub raw_rows: Vec<DataRow>,
    pub columns: Vec<Variable>,
    pub rows: Vec<DataRow>,
    pub large_dataset: bool,
}

/// Immutable view of the committed pipeline state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineSnapshot {
    pub raw_rows: Vec<DataRow>,
    pub columns: Vec<Variable>,
    pub rows: Vec<DataRow>,
    pub working: Vec<usize>,
    pub filter: Option<String>,
    pub large_dataset: bool,
}

impl PipelineSnapshot {
    pub fn working_rows(&self) -> Vec<DataRow> {
        self.working.iter().map(|&i| self.rows[i].clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Variable> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            raw_rows: self.raw_rows.clone(),
            columns: self.columns.clone(),
            rows: self.rows.clone(),
            large_dataset: self.large_dataset,
        }
    }
}

/// Owner of the live dataset.
///
/// Writers are serialized by an internal mutex, so a second rebuild waits
/// for the first to commit. Readers take a snapshot without waiting on a
/// running rebuild.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    writer: Mutex<()>,
    current: RwLock<Arc<PipelineSnapshot>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            writer: Mutex::new(()),
            current: RwLock::new(Arc::new(PipelineSnapshot::default())),
        }
    }

    /// Restore a previously persisted state without recomputing it.
    ///
    /// Every resolved row is in the working set until a filter is set.
    pub fn restore(state: PersistedState, config: PipelineConfig) -> Self {
        let snapshot = PipelineSnapshot {
            working: (0..state.rows.len()).collect(),
            raw_rows: state.raw_rows,
            columns: state.columns,
            rows: state.rows,
            filter: None,
            large_dataset: state.large_dataset,
        };
        Self {
            config,
            writer: Mutex::new(()),
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The committed state
    pub fn snapshot(&self) -> Arc<PipelineSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the dataset and rebuild, keeping the current filter
    pub fn load(
        &self,
        columns: Vec<Variable>,
        raw_rows: Vec<DataRow>,
    ) -> PipelineResult<Arc<PipelineSnapshot>> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let filter = self.snapshot().filter.clone();
        self.rebuild_locked(columns, raw_rows, filter)
    }

    /// Replace the dataset and the filter in a single rebuild
    pub fn load_with_filter(
        &self,
        columns: Vec<Variable>,
        raw_rows: Vec<DataRow>,
        filter: Option<String>,
    ) -> PipelineResult<Arc<PipelineSnapshot>> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.rebuild_locked(columns, raw_rows, filter)
    }

    /// Replace the column declarations and rebuild over the current raw rows
    pub fn set_columns(&self, columns: Vec<Variable>) -> PipelineResult<Arc<PipelineSnapshot>> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.snapshot();
        self.rebuild_locked(columns, current.raw_rows.clone(), current.filter.clone())
    }

    /// Change the filter expression and rebuild
    pub fn set_filter(&self, filter: Option<String>) -> PipelineResult<Arc<PipelineSnapshot>> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.snapshot();
        self.rebuild_locked(current.columns.clone(), current.raw_rows.clone(), filter)
    }

    /// Rebuild from the committed declarations
    pub fn rebuild(&self) -> PipelineResult<Arc<PipelineSnapshot>> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.snapshot();
        self.rebuild_locked(
            current.columns.clone(),
            current.raw_rows.clone(),
            current.filter.clone(),
        )
    }

    fn rebuild_locked(
        &self,
        columns: Vec<Variable>,
        raw_rows: Vec<DataRow>,
        filter: Option<String>,
    ) -> PipelineResult<Arc<PipelineSnapshot>> {
        let output = run_pipeline(&columns, &raw_rows, filter.as_deref(), &self.config)?;
        let snapshot = PipelineSnapshot {
            large_dataset: self.config.is_large(raw_rows.len()),
            raw_rows,
            columns: output.columns,
            rows: output.rows,
            working: output.working,
            filter,
        };
        info!(
            columns = snapshot.columns.len(),
            rows = snapshot.rows.len(),
            working = snapshot.working.len(),
            "pipeline committed"
        );
        Ok(self.commit(snapshot))
    }

    /// Add a computed column to the committed state.
    ///
    /// Values are computed from the resolved rows and also written into the
    /// raw rows so that later rebuilds keep the column. The new column joins
    /// the working set of every row without re-running the filter.
    ///
    /// The stored values are a one-time result: later rebuilds do not
    /// re-evaluate `expression`, so changing how a source column resolves
    /// missing values leaves the computed column as it was.
    pub fn add_computed_column(
        &self,
        name: &str,
        expression: &str,
    ) -> PipelineResult<Arc<PipelineSnapshot>> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.snapshot();

        let values = compute_values(&current.columns, &current.rows, name, expression)?;

        let mut rows = current.rows.clone();
        let mut raw_rows = current.raw_rows.clone();
        for (raw, value) in raw_rows.iter_mut().zip(&values) {
            raw.insert(name.to_string(), value.clone());
        }
        for (row, value) in rows.iter_mut().zip(values) {
            row.insert(name.to_string(), value);
        }

        let mut columns = current.columns.clone();
        columns.insert(0, describe_column(&Variable::new(name), &rows));

        info!(column = name, "computed column added");
        Ok(self.commit(PipelineSnapshot {
            raw_rows,
            columns,
            rows,
            working: current.working.clone(),
            filter: current.filter.clone(),
            large_dataset: current.large_dataset,
        }))
    }

    fn commit(&self, snapshot: PipelineSnapshot) -> Arc<PipelineSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&snapshot);
        snapshot
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
