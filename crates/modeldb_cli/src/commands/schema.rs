//! Schema command implementation.

use super::{open, CliError, CliResult};
use modeldb_core::Database;
use std::path::Path;

/// Runs the schema command.
pub fn run(path: &Path, table: Option<&str>) -> CliResult<()> {
    let db = open(path)?;
    for (name, sql) in definitions(&db, table)? {
        println!("-- {name}");
        println!("{sql};");
    }
    Ok(())
}

/// Stored definitions of `table`, or of every table.
pub fn definitions(db: &Database, table: Option<&str>) -> CliResult<Vec<(String, String)>> {
    let names = match table {
        Some(name) => vec![name.to_string()],
        None => db.table_names()?,
    };
    names
        .into_iter()
        .map(|name| match db.table_definition(&name)? {
            Some(sql) => Ok((name, sql)),
            None => Err(CliError::NoSuchTable(name)),
        })
        .collect()
}
