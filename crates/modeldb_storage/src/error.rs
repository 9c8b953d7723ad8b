//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The embedded SQL engine rejected a statement.
    #[error("SQL error in `{sql}`: {source}")]
    Sql {
        /// The statement that failed.
        sql: String,
        /// The engine error.
        #[source]
        source: rusqlite::Error,
    },

    /// The connection could not be opened.
    #[error("failed to open database at {location}: {source}")]
    Open {
        /// Where the database was expected.
        location: String,
        /// The engine error.
        #[source]
        source: rusqlite::Error,
    },

    /// The connection was used from a thread outside its execution context.
    #[error(
        "thread '{thread}' is not allowed to access the database; \
         it is owned by {expected}. Route the call through the owning thread"
    )]
    ContextViolation {
        /// Name of the offending thread.
        thread: String,
        /// Description of the authorized threads.
        expected: String,
    },

    /// A text column held bytes that are not valid UTF-8.
    #[error("column '{column}' holds invalid UTF-8 text")]
    InvalidText {
        /// The column that was being read.
        column: String,
    },
}

impl StorageError {
    /// Wraps an engine error together with the statement that caused it.
    pub fn sql(sql: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Sql {
            sql: sql.into(),
            source,
        }
    }

    /// Returns true if this error reports use from an unauthorized thread.
    #[must_use]
    pub fn is_context_violation(&self) -> bool {
        matches!(self, Self::ContextViolation { .. })
    }
}
