//! Query command implementation.

use super::{open, to_json, CliResult, OutputFormat};
use modeldb_core::{QueryResult, SqlValue};
use std::path::Path;

/// Runs the query command.
pub fn run(path: &Path, sql: &str, format: OutputFormat) -> CliResult<()> {
    let db = open(path)?;
    let result = db.query(sql, &[])?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows_as_json(&result))?),
        OutputFormat::Text => print!("{}", render_text(&result)),
    }
    Ok(())
}

/// One JSON object per row, keyed by column name.
pub fn rows_as_json(result: &QueryResult) -> serde_json::Value {
    let rows = (0..result.row_count())
        .map(|row| {
            let object: serde_json::Map<String, serde_json::Value> = result
                .iter()
                .map(|(name, values)| (name.to_string(), to_json(&values[row])))
                .collect();
            serde_json::Value::Object(object)
        })
        .collect();
    serde_json::Value::Array(rows)
}

/// Aligned text with a header line and a row count footer.
pub fn render_text(result: &QueryResult) -> String {
    let columns: Vec<(&str, Vec<String>)> = result
        .iter()
        .map(|(name, values)| (name, values.iter().map(SqlValue::to_string).collect()))
        .collect();
    let widths: Vec<usize> = columns
        .iter()
        .map(|(name, cells)| cells.iter().map(String::len).chain([name.len()]).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };
    if !columns.is_empty() {
        out.push_str(&line(columns.iter().map(|(name, _)| *name).collect()));
        out.push('\n');
        for row in 0..result.row_count() {
            out.push_str(&line(columns.iter().map(|(_, cells)| cells[row].as_str()).collect()));
            out.push('\n');
        }
    }
    out.push_str(&format!("({} row(s))\n", result.row_count()));
    out
}
