//! Variable table and run summary

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::pipeline::{PipelineSnapshot, Variable};

/// Counts describing one pipeline run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub declared_columns: usize,
    pub derived_columns: usize,
    pub computed_columns: Vec<String>,
    pub rows: usize,
    pub working_rows: usize,
    pub large_dataset: bool,
}

impl RunSummary {
    pub fn from_snapshot(snapshot: &PipelineSnapshot, computed_columns: Vec<String>) -> Self {
        let derived_columns = snapshot.columns.iter().filter(|c| c.derived).count();
        Self {
            declared_columns: snapshot
                .columns
                .len()
                .saturating_sub(derived_columns + computed_columns.len()),
            derived_columns,
            computed_columns,
            rows: snapshot.rows.len(),
            working_rows: snapshot.working.len(),
            large_dataset: snapshot.large_dataset,
        }
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("RUN SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![
            Cell::new("📁 Declared Columns"),
            Cell::new(self.declared_columns),
        ]);
        table.add_row(vec![
            Cell::new("🧬 Derived Columns"),
            Cell::new(self.derived_columns).fg(Color::Cyan),
        ]);
        table.add_row(vec![
            Cell::new("∑  Computed Columns"),
            Cell::new(self.computed_columns.len()).fg(Color::Cyan),
        ]);
        table.add_row(vec![Cell::new("🧾 Rows"), Cell::new(self.rows)]);

        let excluded = self.rows.saturating_sub(self.working_rows);
        table.add_row(vec![
            Cell::new("🔎 Working Rows"),
            Cell::new(self.working_rows)
                .fg(if excluded > 0 { Color::Yellow } else { Color::Green })
                .add_attribute(Attribute::Bold),
        ]);
        if self.large_dataset {
            table.add_row(vec![
                Cell::new("⚠️  Large Dataset"),
                Cell::new("yes").fg(Color::Yellow),
            ]);
        }

        for line in table.to_string().lines() {
            println!("    {}", line);
        }
    }
}

/// Build the variable table shown after a run
pub fn variable_table(columns: &[Variable]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        [
            "Variable", "Type", "Count", "Missing", "Valid", "Unique", "Mean", "Std", "Min",
            "Median", "Max", "Mode",
        ]
        .into_iter()
        .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
    );

    for column in columns {
        let name = if column.derived {
            Cell::new(&column.name).fg(Color::Cyan)
        } else {
            Cell::new(&column.name)
        };
        let mut row = vec![
            name,
            Cell::new(column.kind),
            right(column.count.to_string()),
            right(column.missing.to_string()).fg(if column.missing > 0 {
                Color::Yellow
            } else {
                Color::White
            }),
            right(column.valid.to_string()),
            right(column.unique.to_string()),
        ];
        let stats: Vec<Cell> = match &column.summary {
            Some(s) => [s.mean, s.std, s.min, s.q2, s.max, s.mode]
                .into_iter()
                .map(|v| right(format_stat(v)))
                .collect(),
            None => (0..6).map(|_| right("-".to_string())).collect(),
        };
        row.extend(stats);
        table.add_row(row);
    }
    table
}

/// Print the variable table, indented like the rest of the output
pub fn print_variable_table(columns: &[Variable]) {
    println!();
    println!(
        "    {} {}",
        style("📊").cyan(),
        style("VARIABLES").white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
    for line in variable_table(columns).to_string().lines() {
        println!("    {}", line);
    }
}

fn right(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

fn format_stat(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e12 {
        format!("{:.0}", value)
    } else {
        format!("{:.4}", value)
    }
}
