//! # modeldb Storage
//!
//! Synchronous storage driver for modeldb.
//!
//! This crate is the lowest layer of modeldb. It owns the connection to the
//! embedded SQL engine and knows nothing about entities, tables or schemas:
//! it executes statements, runs parameterized queries and maps result rows to
//! typed [`SqlValue`]s.
//!
//! ## Design Principles
//!
//! - Every call is synchronous and blocking, with no retries
//! - Literal values always travel as bound parameters
//! - A connection belongs to an [`ExecutionContext`]; calls from any other
//!   thread are rejected with [`StorageError::ContextViolation`]
//!
//! ## Available Drivers
//!
//! - [`SqliteDriver::open_in_memory`] - For testing and ephemeral databases
//! - [`SqliteDriver::open`] - For file-backed databases
//!
//! ## Example
//!
//! ```rust
//! use modeldb_storage::{ExecutionContext, SqlValue, SqliteDriver, StorageDriver};
//!
//! let driver = SqliteDriver::open_in_memory(ExecutionContext::current()).unwrap();
//! driver.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)").unwrap();
//! driver
//!     .update("INSERT INTO t (name) VALUES (?)", &[SqlValue::from("a")])
//!     .unwrap();
//! let result = driver.query("SELECT name FROM t", &[]).unwrap();
//! assert_eq!(result.column("name").unwrap(), &[SqlValue::from("a")]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod context;
mod driver;
mod error;
mod result;
mod sqlite;
mod value;

pub use context::ExecutionContext;
pub use driver::StorageDriver;
pub use error::{StorageError, StorageResult};
pub use result::QueryResult;
pub use sqlite::SqliteDriver;
pub use value::{ColumnType, SqlValue};
