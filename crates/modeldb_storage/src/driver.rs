//! Storage driver trait.

use crate::error::StorageResult;
use crate::result::QueryResult;
use crate::value::SqlValue;

/// A synchronous connection to an embedded SQL engine.
///
/// Every method blocks until the engine returns and surfaces failures
/// immediately. Implementations must reject calls made outside their
/// [`ExecutionContext`](crate::ExecutionContext).
///
/// # Thread Safety
///
/// Implementations are `Send + Sync` so a driver can be shared behind an
/// `Arc`, but only threads of the execution context may actually use it.
pub trait StorageDriver: Send + Sync {
    /// Executes one or more statements without parameters.
    ///
    /// Blank input is a no-op.
    fn execute(&self, sql: &str) -> StorageResult<()>;

    /// Runs a parameterized query and returns its column map.
    fn query(&self, sql: &str, params: &[SqlValue]) -> StorageResult<QueryResult>;

    /// Runs a parameterized `INSERT`, `UPDATE` or `DELETE`.
    ///
    /// Returns the number of rows changed.
    fn update(&self, sql: &str, params: &[SqlValue]) -> StorageResult<usize>;

    /// Runs a parameterized `INSERT` and returns the id of the new row.
    ///
    /// Returns `None` if the statement inserted nothing, for example an
    /// `INSERT ... SELECT` whose source row does not exist.
    fn insert(&self, sql: &str, params: &[SqlValue]) -> StorageResult<Option<i64>>;

    /// Names of all user tables, sorted.
    fn table_names(&self) -> StorageResult<Vec<String>> {
        let result = self.query(
            "SELECT name FROM sqlite_master WHERE type = 'table' \
             AND name NOT LIKE 'sqlite_%' ORDER BY name",
            &[],
        )?;
        Ok(result
            .into_column("name")
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| match v {
                SqlValue::Text(name) => Some(name),
                _ => None,
            })
            .collect())
    }

    /// The stored `CREATE TABLE` statement of `table`, if it exists.
    fn table_sql(&self, table: &str) -> StorageResult<Option<String>> {
        let result = self.query(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?",
            &[SqlValue::from(table)],
        )?;
        Ok(result
            .into_column("sql")
            .unwrap_or_default()
            .into_iter()
            .find_map(|v| match v {
                SqlValue::Text(sql) => Some(sql),
                _ => None,
            }))
    }

    /// Returns true if `table` exists.
    fn table_exists(&self, table: &str) -> StorageResult<bool> {
        Ok(self.table_sql(table)?.is_some())
    }
}
