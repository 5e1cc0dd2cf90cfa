//! Command-line argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::pipeline::PipelineConfig;

/// varflow - Resolve missing values, derive sub-variables, filter rows and describe columns
#[derive(Parser, Debug)]
#[command(name = "varflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Input dataset (JSON: an array of rows, or {"columns", "rows", "filter"})
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output file for the committed state (JSON).
    /// Defaults to input directory with '_state' suffix (e.g., data.json → data_state.json).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Filter expression; reference columns as :::name:::.
    /// Overrides any filter stored in the input document.
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Add a computed column after the run, as NAME=EXPRESSION.
    /// May be repeated; columns are added in order.
    #[arg(short = 'c', long = "compute", value_parser = parse_computed)]
    pub computed: Vec<ComputedColumn>,

    /// Restore a state file written by a previous run instead of reading --input rows
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Pipeline configuration file (JSON). Command-line flags override it.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Maximum k-means iterations for cluster discretization
    #[arg(long)]
    pub kmeans_max_iterations: Option<usize>,

    /// Row count above which a dataset is flagged as large
    #[arg(long)]
    pub large_dataset_threshold: Option<usize>,

    /// Describe columns on a single thread
    #[arg(long, default_value = "false")]
    pub sequential: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Skip interactive confirmation prompts
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the variable table of a dataset without writing anything
    Describe {
        /// Input dataset (JSON)
        input: PathBuf,

        /// Filter expression to apply before reporting the working row count
        #[arg(short, long)]
        filter: Option<String>,
    },
}

/// A `NAME=EXPRESSION` pair from `--compute`
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedColumn {
    pub name: String,
    pub expression: String,
}

impl Cli {
    /// Get the output path, deriving from input if not explicitly provided.
    /// The derived path will be in the same directory as the input with a '_state' suffix.
    pub fn output_path(&self) -> Option<PathBuf> {
        if let Some(output) = &self.output {
            return Some(output.clone());
        }
        let input = self.input.as_ref().or(self.state.as_ref())?;
        let parent = input.parent().unwrap_or_else(|| Path::new("."));
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        Some(parent.join(format!("{}_state.json", stem)))
    }

    /// Layer command-line overrides on top of a base configuration
    pub fn apply_overrides(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(iterations) = self.kmeans_max_iterations {
            config.kmeans_max_iterations = iterations;
        }
        if let Some(threshold) = self.large_dataset_threshold {
            config.large_dataset_threshold = threshold;
        }
        if self.sequential {
            config.parallel = false;
        }
        config
    }
}

/// Parse `NAME=EXPRESSION`; the expression may itself contain '='
fn parse_computed(s: &str) -> Result<ComputedColumn, String> {
    let (name, expression) = s
        .split_once('=')
        .ok_or_else(|| format!("'{}' is not of the form NAME=EXPRESSION", s))?;
    let name = name.trim();
    let expression = expression.trim();

    if name.is_empty() {
        return Err("computed column name must not be empty".to_string());
    }
    if expression.is_empty() {
        return Err(format!("computed column '{}' has an empty expression", name));
    }
    Ok(ComputedColumn {
        name: name.to_string(),
        expression: expression.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_computed_keeps_equality_operators() {
        let parsed = parse_computed("flag = :::a::: == 1").unwrap();
        assert_eq!(parsed.name, "flag");
        assert_eq!(parsed.expression, ":::a::: == 1");
    }

    #[test]
    fn test_parse_computed_rejects_missing_name() {
        assert!(parse_computed("=1 + 1").is_err());
        assert!(parse_computed("no_equals").is_err());
        assert!(parse_computed("x=").is_err());
    }
}
