//! SQLite storage driver.

use crate::context::ExecutionContext;
use crate::driver::StorageDriver;
use crate::error::{StorageError, StorageResult};
use crate::result::QueryResult;
use crate::value::{ColumnType, SqlValue};
use parking_lot::Mutex;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;
use tracing::{debug, info};

/// A [`StorageDriver`] over a single SQLite connection.
///
/// # Thread Safety
///
/// The connection sits behind a mutex, and every call first checks the
/// calling thread against the driver's [`ExecutionContext`].
///
/// # Example
///
/// ```rust
/// use modeldb_storage::{ExecutionContext, SqliteDriver, StorageDriver};
///
/// let driver = SqliteDriver::open_in_memory(ExecutionContext::current()).unwrap();
/// driver.execute("CREATE TABLE t (id INTEGER PRIMARY KEY)").unwrap();
/// assert_eq!(driver.table_names().unwrap(), vec!["t".to_string()]);
/// ```
pub struct SqliteDriver {
    conn: Mutex<Connection>,
    context: ExecutionContext,
    location: String,
}

impl SqliteDriver {
    /// Opens (or creates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>, context: ExecutionContext) -> StorageResult<Self> {
        let path = path.as_ref();
        let location = path.display().to_string();
        let conn = Connection::open(path).map_err(|source| StorageError::Open {
            location: location.clone(),
            source,
        })?;
        info!(location = %location, "opened sqlite database");
        Ok(Self {
            conn: Mutex::new(conn),
            context,
            location,
        })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory(context: ExecutionContext) -> StorageResult<Self> {
        let location = ":memory:".to_string();
        let conn = Connection::open_in_memory().map_err(|source| StorageError::Open {
            location: location.clone(),
            source,
        })?;
        debug!("opened in-memory sqlite database");
        Ok(Self {
            conn: Mutex::new(conn),
            context,
            location,
        })
    }

    /// Turns foreign key enforcement on or off for this connection.
    pub fn set_foreign_keys(&self, enabled: bool) -> StorageResult<()> {
        let pragma = if enabled {
            "PRAGMA foreign_keys = ON"
        } else {
            "PRAGMA foreign_keys = OFF"
        };
        self.execute(pragma)
    }

    /// Where the database lives, or `:memory:`.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The threads allowed to use this driver.
    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }
}

impl StorageDriver for SqliteDriver {
    fn execute(&self, sql: &str) -> StorageResult<()> {
        self.context.check()?;
        if sql.trim().is_empty() {
            return Ok(());
        }
        debug!(sql, "execute");
        let conn = self.conn.lock();
        conn.execute_batch(sql)
            .map_err(|source| StorageError::sql(sql, source))
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> StorageResult<QueryResult> {
        self.context.check()?;
        debug!(sql, params = params.len(), "query");
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(sql)
            .map_err(|source| StorageError::sql(sql, source))?;

        let columns: Vec<(String, Option<ColumnType>)> = stmt
            .columns()
            .iter()
            .map(|c| {
                (
                    c.name().to_string(),
                    c.decl_type().and_then(ColumnType::from_declared),
                )
            })
            .collect();
        let mut result =
            QueryResult::with_columns(columns.iter().map(|(name, _)| name.clone()).collect());

        let mut rows = stmt
            .query(params_from_iter(params.iter()))
            .map_err(|source| StorageError::sql(sql, source))?;
        while let Some(row) = rows
            .next()
            .map_err(|source| StorageError::sql(sql, source))?
        {
            let mut values = Vec::with_capacity(columns.len());
            for (index, (name, column_type)) in columns.iter().enumerate() {
                let raw = row
                    .get_ref(index)
                    .map_err(|source| StorageError::sql(sql, source))?;
                let value = SqlValue::from_engine(raw, *column_type)
                    .ok_or_else(|| StorageError::InvalidText {
                        column: name.clone(),
                    })?;
                values.push(value);
            }
            result.push_row(values);
        }
        Ok(result)
    }

    fn update(&self, sql: &str, params: &[SqlValue]) -> StorageResult<usize> {
        self.context.check()?;
        debug!(sql, params = params.len(), "update");
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(sql)
            .map_err(|source| StorageError::sql(sql, source))?;
        stmt.execute(params_from_iter(params.iter()))
            .map_err(|source| StorageError::sql(sql, source))
    }

    fn insert(&self, sql: &str, params: &[SqlValue]) -> StorageResult<Option<i64>> {
        self.context.check()?;
        debug!(sql, params = params.len(), "insert");
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(sql)
            .map_err(|source| StorageError::sql(sql, source))?;
        let inserted = stmt
            .execute(params_from_iter(params.iter()))
            .map_err(|source| StorageError::sql(sql, source))?;
        Ok((inserted > 0).then(|| conn.last_insert_rowid()))
    }
}

impl std::fmt::Debug for SqliteDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDriver")
            .field("location", &self.location)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver() -> SqliteDriver {
        SqliteDriver::open_in_memory(ExecutionContext::current()).unwrap()
    }

    #[test]
    fn typed_extraction_follows_declared_types() {
        let d = driver();
        d.execute(
            "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, \
             flag BOOLEAN NOT NULL, ratio DOUBLE NOT NULL, name TEXT NOT NULL)",
        )
        .unwrap();
        d.update(
            "INSERT INTO t (flag, ratio, name) VALUES (?, ?, ?)",
            &[SqlValue::Bool(true), SqlValue::Integer(2), SqlValue::from("x")],
        )
        .unwrap();

        let r = d.query("SELECT * FROM t", &[]).unwrap();
        assert_eq!(r.column("id").unwrap(), &[SqlValue::Integer(1)]);
        assert_eq!(r.column("flag").unwrap(), &[SqlValue::Bool(true)]);
        assert_eq!(r.column("ratio").unwrap(), &[SqlValue::Real(2.0)]);
        assert_eq!(r.column("name").unwrap(), &[SqlValue::from("x")]);
    }

    #[test]
    fn expression_columns_use_storage_class() {
        let d = driver();
        let r = d.query("SELECT 1 + 1 AS two, 'a' AS a", &[]).unwrap();
        assert_eq!(r.column("two").unwrap(), &[SqlValue::Integer(2)]);
        assert_eq!(r.column("a").unwrap(), &[SqlValue::from("a")]);
    }

    #[test]
    fn update_reports_changed_rows() {
        let d = driver();
        d.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, v INTEGER)").unwrap();
        d.execute("INSERT INTO t (v) VALUES (1); INSERT INTO t (v) VALUES (2);")
            .unwrap();
        let changed = d
            .update("UPDATE t SET v = ? WHERE v > ?", &[SqlValue::Integer(9), SqlValue::Integer(0)])
            .unwrap();
        assert_eq!(changed, 2);
    }

    #[test]
    fn insert_returns_row_id() {
        let d = driver();
        d.execute("CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, v INTEGER NOT NULL)")
            .unwrap();
        let first = d.insert("INSERT INTO t (v) VALUES (?)", &[SqlValue::Integer(7)]).unwrap();
        let second = d.insert("INSERT INTO t DEFAULT VALUES", &[]);
        assert_eq!(first, Some(1));
        assert!(second.is_err());

        let copied = d
            .insert("INSERT INTO t (v) SELECT v FROM t WHERE id = ?", &[SqlValue::Integer(1)])
            .unwrap();
        assert_eq!(copied, Some(2));
        let none = d
            .insert("INSERT INTO t (v) SELECT v FROM t WHERE id = ?", &[SqlValue::Integer(99)])
            .unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn blank_execute_is_noop() {
        driver().execute("   ").unwrap();
    }

    #[test]
    fn bad_sql_names_the_statement() {
        let err = driver().execute("CREATE NONSENSE").unwrap_err();
        assert!(err.to_string().contains("CREATE NONSENSE"));
    }

    #[test]
    fn table_listing_and_sql() {
        let d = driver();
        d.execute("CREATE TABLE b (id INTEGER); CREATE TABLE a (id INTEGER);")
            .unwrap();
        assert_eq!(d.table_names().unwrap(), vec!["a", "b"]);
        assert_eq!(d.table_sql("a").unwrap().unwrap(), "CREATE TABLE a (id INTEGER)");
        assert!(!d.table_exists("c").unwrap());
    }

    #[test]
    fn use_from_other_thread_is_rejected() {
        let d = std::sync::Arc::new(driver());
        let shared = std::sync::Arc::clone(&d);
        let err = std::thread::spawn(move || shared.execute("CREATE TABLE t (id INTEGER)"))
            .join()
            .unwrap()
            .unwrap_err();
        assert!(err.is_context_violation());
        assert!(d.table_names().unwrap().is_empty());
        assert!(d.execute("CREATE TABLE t (id INTEGER)").is_ok());
    }
}
