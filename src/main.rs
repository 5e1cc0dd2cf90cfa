//! varflow: Variable Transformation CLI Tool
//!
//! Loads a JSON dataset, resolves missing values, derives sub-variables,
//! applies a filter, describes every column and writes the committed state.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use console::style;
use tracing::{debug, info};

use varflow::cli::{confirm_overwrite, Cli, Commands};
use varflow::pipeline::{
    load_config, load_dataset_with_progress, load_persisted_state, DataRow,
    Pipeline, PipelineConfig, PipelineResult, SubVariables, Variable,
};
use varflow::report::{export_pipeline_state, print_variable_table, PipelineExport, RunSummary};
use varflow::utils::{
    create_spinner, finish_with_error, finish_with_success, init_logging, print_banner,
    print_completion, print_config, print_count, print_info, print_step_header, print_step_time,
    print_success,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };
    let config = cli.apply_overrides(config);
    debug!(?config, "configuration resolved");

    // Handle subcommands
    if let Some(command) = &cli.command {
        return match command {
            Commands::Describe { input, filter } => run_describe(input, filter.as_deref(), &config),
        };
    }

    if cli.input.is_none() && cli.state.is_none() {
        anyhow::bail!("Input file is required. Use -i/--input or --state to specify one.");
    }
    let output_path = cli
        .output_path()
        .ok_or_else(|| anyhow::anyhow!("Could not derive an output path; use -o/--output"))?;

    if !cli.no_confirm && !confirm_overwrite(&output_path)? {
        println!("Cancelled by user.");
        return Ok(());
    }

    print_banner(env!("CARGO_PKG_VERSION"));
    let source = cli
        .state
        .as_deref()
        .or(cli.input.as_deref())
        .unwrap_or_else(|| Path::new("."));
    print_config(
        source,
        Some(output_path.as_path()),
        cli.filter.as_deref(),
        cli.computed.len(),
    );

    // Step 1: Load and run the pipeline
    print_step_header(1, "Load & Rebuild");
    let step_start = Instant::now();
    let pipeline = match &cli.state {
        Some(state_path) => {
            let state = load_persisted_state(state_path)?;
            print_success("State restored");
            let pipeline = Pipeline::restore(state, config.clone());
            if cli.filter.is_some() {
                pipeline.set_filter(cli.filter.clone())?;
            }
            pipeline
        }
        None => {
            let input = cli
                .input
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("Input file is required"))?;
            let (document, rows, cols) = load_dataset_with_progress(input)?;
            print_count("rows", rows, None);
            print_count("columns", cols, None);

            let filter = cli.filter.clone().or(document.filter);
            let pipeline = Pipeline::new(config.clone());
            let spinner = create_spinner("Resolving, deriving, filtering, describing...");
            match load_primed(&pipeline, document.columns, document.rows, filter) {
                Ok(()) => finish_with_success(&spinner, "Pipeline rebuilt"),
                Err(e) => {
                    finish_with_error(&spinner, "Pipeline rebuild failed");
                    return Err(e.into());
                }
            }
            pipeline
        }
    };
    print_step_time(step_start.elapsed());

    // Step 2: Computed columns
    let mut computed_names = Vec::with_capacity(cli.computed.len());
    if !cli.computed.is_empty() {
        print_step_header(2, "Computed Columns");
        let step_start = Instant::now();
        for computed in &cli.computed {
            pipeline.add_computed_column(&computed.name, &computed.expression)?;
            print_success(&format!("{} = {}", computed.name, computed.expression));
            computed_names.push(computed.name.clone());
        }
        print_step_time(step_start.elapsed());
    }

    let snapshot = pipeline.snapshot();
    print_variable_table(&snapshot.columns);
    RunSummary::from_snapshot(&snapshot, computed_names).display();
    if snapshot.large_dataset {
        print_info(&format!(
            "More than {} rows; consider narrowing the dataset with a filter",
            pipeline.config().large_dataset_threshold
        ));
    }

    // Step 3: Export
    print_step_header(3, "Save State");
    let step_start = Instant::now();
    let export = PipelineExport::from_snapshot(&snapshot, cli.input.as_deref());
    export_pipeline_state(&export, &output_path)?;
    info!(path = %output_path.display(), "state written");
    print_success(&format!("Saved to {}", output_path.display()));
    print_step_time(step_start.elapsed());

    print_completion();
    Ok(())
}

/// Load a dataset whose standardize/center requests may lack statistics.
///
/// Those requests are withheld for a first unfiltered rebuild, then
/// re-applied on top of the described columns together with the filter.
fn load_primed(
    pipeline: &Pipeline,
    columns: Vec<Variable>,
    rows: Vec<DataRow>,
    filter: Option<String>,
) -> PipelineResult<()> {
    let needs_statistics = |c: &Variable| {
        c.summary.is_none() && !c.derived && (c.sub_vars.standardize || c.sub_vars.center)
    };
    if !columns.iter().any(needs_statistics) {
        pipeline.load_with_filter(columns, rows, filter)?;
        return Ok(());
    }

    debug!("priming statistics before deriving sub-variables");
    let requested: HashMap<String, SubVariables> = columns
        .iter()
        .map(|c| (c.name.clone(), c.sub_vars.clone()))
        .collect();
    let withheld = columns
        .into_iter()
        .map(|c| c.with_sub_vars(SubVariables::default()))
        .collect();
    let primed = pipeline.load_with_filter(withheld, rows, None)?;

    let columns = primed
        .columns
        .iter()
        .filter(|c| !c.derived)
        .map(|c| match requested.get(&c.name) {
            Some(sub_vars) => c.clone().with_sub_vars(sub_vars.clone()),
            None => c.clone(),
        })
        .collect();
    pipeline.load_with_filter(columns, primed.raw_rows.clone(), filter)?;
    Ok(())
}

/// Print the variable table of a dataset without writing any state
fn run_describe(input: &Path, filter: Option<&str>, config: &PipelineConfig) -> Result<()> {
    let (document, _, _) = load_dataset_with_progress(input)?;
    let filter = filter.map(str::to_string).or(document.filter);
    let pipeline = Pipeline::new(config.clone());
    load_primed(&pipeline, document.columns, document.rows, filter)?;
    let output = pipeline.snapshot();

    print_variable_table(&output.columns);
    println!();
    println!(
        "    {} {} of {} rows in the working set",
        style("✧").cyan(),
        style(output.working.len()).yellow().bold(),
        output.rows.len()
    );
    Ok(())
}
