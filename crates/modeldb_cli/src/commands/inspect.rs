//! Inspect command implementation.

use super::{open, table_kind, CliResult, OutputFormat};
use modeldb_core::{Database, SqlValue};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Database inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Database file path.
    pub path: String,
    /// Database file size in bytes.
    pub file_size: u64,
    /// Total rows across entity tables.
    pub entity_rows: u64,
    /// Total rows across junction tables.
    pub junction_rows: u64,
    /// Per-table statistics.
    pub tables: Vec<TableStats>,
}

/// Statistics for a single table.
#[derive(Debug, Serialize)]
pub struct TableStats {
    /// Table name.
    pub name: String,
    /// `entity`, `junction` or `other`.
    pub kind: &'static str,
    /// Number of rows.
    pub rows: u64,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: OutputFormat) -> CliResult<()> {
    let db = open(path)?;
    let result = inspect(&db)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_text_output(&result),
    }
    Ok(())
}

/// Collects table statistics of an open database.
pub fn inspect(db: &Database) -> CliResult<InspectResult> {
    let file = db.path().map(Path::to_path_buf);
    let file_size = file
        .as_deref()
        .and_then(|f| std::fs::metadata(f).ok())
        .map_or(0, |m| m.len());

    let mut tables = Vec::new();
    for name in db.table_names()? {
        let count = db.query(&format!("SELECT COUNT(*) AS n FROM \"{name}\""), &[])?;
        let rows = count
            .column("n")
            .and_then(<[SqlValue]>::first)
            .and_then(SqlValue::as_i64)
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0);
        debug!(table = %name, rows, "counted rows");
        tables.push(TableStats {
            kind: table_kind(&name),
            name,
            rows,
        });
    }

    let total = |kind: &str| {
        tables
            .iter()
            .filter(|t| t.kind == kind)
            .map(|t| t.rows)
            .sum()
    };
    Ok(InspectResult {
        path: file.map_or_else(|| ":memory:".to_string(), |f| f.display().to_string()),
        file_size,
        entity_rows: total("entity"),
        junction_rows: total("junction"),
        tables,
    })
}

fn print_text_output(result: &InspectResult) {
    println!("Database: {}", result.path);
    println!("File size: {} bytes", result.file_size);
    println!("Entity rows: {}", result.entity_rows);
    println!("Junction rows: {}", result.junction_rows);
    println!();

    if result.tables.is_empty() {
        println!("No tables");
        return;
    }
    let width = result.tables.iter().map(|t| t.name.len()).max().unwrap_or(0);
    println!("{:<width$}  {:<8}  {:>8}", "TABLE", "KIND", "ROWS");
    for table in &result.tables {
        println!("{:<width$}  {:<8}  {:>8}", table.name, table.kind, table.rows);
    }
}
