//! Exec command implementation.

use super::{open, CliResult};
use std::path::Path;
use tracing::info;

/// Runs the exec command.
pub fn run(path: &Path, sql: &str) -> CliResult<()> {
    let db = open(path)?;
    info!("Executing SQL against {:?}", path);
    db.execute(sql)?;
    println!("OK");
    Ok(())
}
