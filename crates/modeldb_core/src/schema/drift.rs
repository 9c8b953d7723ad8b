//! Schema drift detection.
//!
//! A table that already exists is compared against the DDL derived from its
//! declaration. Both statements are normalized first so that formatting and
//! the `IF NOT EXISTS` clause, which the engine drops when recording a
//! table, do not count as differences. Any remaining difference is fatal.

use crate::error::{CoreError, CoreResult};
use tracing::error;

/// Normalizes a `CREATE TABLE` statement for comparison.
///
/// Uppercases, collapses whitespace, removes `IF NOT EXISTS` and a trailing
/// semicolon, and strips whitespace around `(`, `)` and `,`.
#[must_use]
pub fn normalize(sql: &str) -> String {
    let collapsed = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    let upper = collapsed.to_ascii_uppercase();
    let trimmed = upper.trim_end_matches(';').trim_end();
    let without_clause = trimmed.replacen(" IF NOT EXISTS", "", 1);

    let mut out = String::with_capacity(without_clause.len());
    let mut chars = without_clause.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ' ' {
            let next_is_punct = matches!(chars.peek(), Some('(' | ')' | ','));
            let prev_is_punct = matches!(out.chars().last(), Some('(' | ')' | ','));
            if next_is_punct || prev_is_punct {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Fails with [`CoreError::SchemaDrift`] unless `expected` and `actual`
/// normalize to the same statement.
pub fn check(table: &str, expected: &str, actual: &str) -> CoreResult<()> {
    if normalize(expected) == normalize(actual) {
        return Ok(());
    }
    error!(table, "stored table definition differs from declaration");
    Err(CoreError::SchemaDrift {
        table: table.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}
