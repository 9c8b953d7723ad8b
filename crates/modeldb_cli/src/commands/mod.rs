//! CLI command implementations.

pub mod exec;
pub mod inspect;
pub mod query;
pub mod schema;
pub mod verify;

use clap::ValueEnum;
use modeldb_core::{Config, CoreError, Database, SqlValue};
use std::path::Path;
use thiserror::Error;

/// Errors reported by the CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The database could not be opened or a statement failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// JSON output could not be produced.
    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The requested table is not in the store.
    #[error("no table named {0}")]
    NoSuchTable(String),

    /// A check reported problems.
    #[error("verification failed with {0} problem(s)")]
    VerificationFailed(usize),
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned plain text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Opens an existing database. Never creates one.
pub fn open(path: &Path) -> CliResult<Database> {
    let config = Config::default().create_if_missing(false);
    Ok(Database::open_with_config(path, config)?)
}

/// Converts a stored value to JSON.
pub fn to_json(value: &SqlValue) -> serde_json::Value {
    match value {
        SqlValue::Null => serde_json::Value::Null,
        SqlValue::Integer(i) => serde_json::Value::from(*i),
        SqlValue::Real(r) => serde_json::Number::from_f64(*r)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        SqlValue::Text(s) => serde_json::Value::from(s.as_str()),
        SqlValue::Bool(b) => serde_json::Value::from(*b),
        SqlValue::Blob(bytes) => serde_json::Value::from(bytes.clone()),
    }
}

/// Kind of a table, judged by its name.
pub fn table_kind(name: &str) -> &'static str {
    if name.ends_with("_list_table") {
        "junction"
    } else if name.ends_with("_table") {
        "entity"
    } else {
        "other"
    }
}
