//! Verify command implementation.

use super::{open, CliError, CliResult};
use modeldb_core::{Database, SqlValue};
use std::path::Path;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Messages from the integrity check, other than `ok`.
    pub integrity_errors: Vec<String>,
    /// Rows whose foreign key points at no row.
    pub foreign_key_errors: Vec<String>,
}

impl VerifyResult {
    fn problems(&self) -> usize {
        self.integrity_errors.len() + self.foreign_key_errors.len()
    }
}

/// Runs the verify command.
pub fn run(path: &Path) -> CliResult<()> {
    println!("Verifying database at {:?}", path);
    println!();

    let db = open(path)?;
    let result = verify(&db)?;

    for error in &result.integrity_errors {
        println!("  integrity: {error}");
    }
    for error in &result.foreign_key_errors {
        println!("  foreign key: {error}");
    }

    println!();
    if result.problems() == 0 {
        println!("✓ Database verification passed");
        Ok(())
    } else {
        println!("✗ Database verification failed");
        Err(CliError::VerificationFailed(result.problems()))
    }
}

/// Runs the engine's integrity and foreign key checks.
pub fn verify(db: &Database) -> CliResult<VerifyResult> {
    let mut result = VerifyResult::default();

    let integrity = db.query("PRAGMA integrity_check", &[])?;
    if let Some((_, messages)) = integrity.iter().next() {
        result.integrity_errors = messages
            .iter()
            .map(SqlValue::to_string)
            .filter(|m| m != "ok")
            .collect();
    }

    let foreign_keys = db.query("PRAGMA foreign_key_check", &[])?;
    let tables = foreign_keys.column("table").unwrap_or_default();
    let rows = foreign_keys.column("rowid").unwrap_or_default();
    let parents = foreign_keys.column("parent").unwrap_or_default();
    for i in 0..foreign_keys.row_count() {
        let cell = |values: &[SqlValue]| values.get(i).map_or_else(String::new, SqlValue::to_string);
        result.foreign_key_errors.push(format!(
            "{} row {} references a missing row of {}",
            cell(tables),
            cell(rows),
            cell(parents)
        ));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modeldb_testkit::TestDatabase;

    #[test]
    fn clean_database_passes() {
        let db = TestDatabase::with_models();
        let result = verify(&db).unwrap();
        assert_eq!(result.problems(), 0);
    }

    #[test]
    fn dangling_references_are_reported() {
        let db = TestDatabase::with_models();
        db.execute("INSERT INTO Person_table (name, age, fk_address_id) VALUES ('Ada', 36, 7)")
            .unwrap();

        let result = verify(&db).unwrap();
        assert!(result.integrity_errors.is_empty());
        assert_eq!(result.foreign_key_errors.len(), 1);
        assert!(result.foreign_key_errors[0].starts_with("Person_table row 1"));
        assert!(result.foreign_key_errors[0].ends_with("Address_table"));
    }
}
