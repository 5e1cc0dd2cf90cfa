//! JSON export of the committed pipeline state
//!
//! The export carries the persisted blobs (raw rows, variable table,
//! resolved rows, large-dataset flag) so a later run can restore them with
//! `--state`, plus the working row set and some run metadata.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::pipeline::{DataRow, PersistedState, PipelineSnapshot};

/// Run metadata written alongside the state
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub timestamp: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub working_rows: usize,
}

/// Full export document
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineExport {
    pub metadata: ExportMetadata,
    #[serde(flatten)]
    pub state: PersistedState,
    pub working: Vec<DataRow>,
}

impl PipelineExport {
    pub fn from_snapshot(snapshot: &PipelineSnapshot, input_file: Option<&Path>) -> Self {
        Self {
            metadata: ExportMetadata {
                timestamp: Utc::now().to_rfc3339(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                input_file: input_file.map(|p| p.display().to_string()),
                filter: snapshot.filter.clone(),
                working_rows: snapshot.working.len(),
            },
            state: snapshot.persisted(),
            working: snapshot.working_rows(),
        }
    }
}

/// Write the export document as pretty JSON
pub fn export_pipeline_state(export: &PipelineExport, output_path: &Path) -> Result<()> {
    let json =
        serde_json::to_string_pretty(export).context("Failed to serialize pipeline state to JSON")?;

    std::fs::write(output_path, json).with_context(|| {
        format!(
            "Failed to write pipeline state to {}",
            output_path.display()
        )
    })?;

    Ok(())
}
