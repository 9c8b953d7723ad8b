//! Error types for modeldb core.

use modeldb_storage::StorageError;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in modeldb core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage driver error, including execution context violations.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // Schema definition errors
    /// An entity declaration is malformed.
    #[error("invalid declaration of entity '{entity}': {message}")]
    InvalidDeclaration {
        /// The entity being declared.
        entity: String,
        /// What is wrong with it.
        message: String,
    },

    /// An attribute refers to an entity type that is not part of the schema.
    #[error("attribute '{entity}.{attribute}' refers to unknown entity '{target}'")]
    UnknownEntityReference {
        /// The owning entity.
        entity: String,
        /// The attribute.
        attribute: String,
        /// The referenced type name.
        target: String,
    },

    /// An attribute is neither a supported scalar nor an entity reference.
    #[error("attribute '{entity}.{attribute}' has unsupported type '{type_name}'")]
    UnsupportedValueType {
        /// The owning entity.
        entity: String,
        /// The attribute.
        attribute: String,
        /// The declared type.
        type_name: String,
    },

    /// The foreign key graph contains a cycle.
    #[error("table {table} has a circular reference")]
    CyclicReference {
        /// A table on the cycle.
        table: String,
    },

    /// A name cannot be used as an SQL identifier.
    #[error("invalid name '{name}': expected [a-zA-Z_][a-zA-Z0-9_]*")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    // Schema drift
    /// A stored table definition disagrees with the declared entity.
    #[error("schema drift in table {table}: declared `{expected}` but stored `{actual}`")]
    SchemaDrift {
        /// The table.
        table: String,
        /// DDL derived from the declaration.
        expected: String,
        /// DDL recorded in the store.
        actual: String,
    },

    // Row level errors
    /// No row exists for the id.
    #[error("no row with id {id} in table {table}")]
    RowNotFound {
        /// The table searched.
        table: String,
        /// The missing id.
        id: i64,
    },

    /// More than one row exists for the id.
    #[error("found {count} rows with id {id} in table {table}")]
    DuplicateRows {
        /// The table searched.
        table: String,
        /// The duplicated id.
        id: i64,
        /// How many rows were found.
        count: usize,
    },

    /// A foreign key required to be set is null.
    #[error("foreign key {table}.{column} of row {id} is null")]
    ForeignKeyNull {
        /// The table.
        table: String,
        /// The row id.
        id: i64,
        /// The foreign key column.
        column: String,
    },

    /// A foreign key column holds something other than a valid row id.
    #[error("foreign key {table}.{column} of row {id} is invalid: {found}")]
    InvalidForeignKey {
        /// The table.
        table: String,
        /// The row id.
        id: i64,
        /// The foreign key column.
        column: String,
        /// What was found instead.
        found: String,
    },

    /// A column held a value of an unexpected type.
    #[error("column {table}.{column} of row {id} holds {found}, expected {expected}")]
    TypeMismatch {
        /// The table.
        table: String,
        /// The row id.
        id: i64,
        /// The column.
        column: String,
        /// The expected type.
        expected: &'static str,
        /// The type found.
        found: &'static str,
    },

    /// A value has no stored form, such as a NaN float.
    #[error("cannot store {value} in {table}.{column} of row {id}")]
    UnstorableValue {
        /// The table.
        table: String,
        /// The row id.
        id: i64,
        /// The column.
        column: String,
        /// The rejected value.
        value: String,
    },

    /// An insert or update statement failed.
    #[error("failed to write {table}.{column} of row {id}: {source}")]
    WriteFailed {
        /// The table.
        table: String,
        /// The row id.
        id: i64,
        /// The column or columns written.
        column: String,
        /// The driver error.
        #[source]
        source: StorageError,
    },

    /// Inserting a new row failed.
    #[error("failed to insert into {table}: {source}")]
    InsertFailed {
        /// The table.
        table: String,
        /// The driver error.
        #[source]
        source: StorageError,
    },

    /// The entity type has not been registered.
    #[error("entity '{name}' is not registered; call create_tables_for first")]
    UnknownEntity {
        /// Name of the entity type.
        name: String,
    },

    /// The table of a registered entity does not exist in the store.
    #[error("table {table} does not exist")]
    TableMissing {
        /// The missing table.
        table: String,
    },

    /// A row id is negative.
    #[error("invalid row id {id}")]
    InvalidId {
        /// The rejected id.
        id: i64,
    },

    /// An attribute name does not belong to the entity.
    #[error("entity '{entity}' has no attribute '{field}'")]
    UnknownField {
        /// The entity.
        entity: String,
        /// The attribute.
        field: String,
    },

    /// A collection index is out of range.
    #[error("index {index} out of bounds for collection of length {len}")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The collection length.
        len: usize,
    },

    // Unsupported
    /// The operation is deliberately not supported.
    #[error("operation not supported: {operation}")]
    Unsupported {
        /// Description of the operation.
        operation: String,
    },

    // Lifecycle
    /// Another process holds the database lock.
    #[error("database locked: another process has exclusive access")]
    DatabaseLocked,

    /// The database does not exist and may not be created.
    #[error("database does not exist: {path}")]
    DatabaseNotFound {
        /// Where the database was expected.
        path: String,
    },
}

impl CoreError {
    /// Creates an invalid declaration error.
    pub fn invalid_declaration(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDeclaration {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid name error.
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    /// Creates a row not found error.
    pub fn row_not_found(table: impl Into<String>, id: i64) -> Self {
        Self::RowNotFound {
            table: table.into(),
            id,
        }
    }

    /// Wraps a failed write of `column`.
    ///
    /// Context violations are passed through unchanged so they stay fatal.
    pub fn write_failed(
        table: impl Into<String>,
        id: i64,
        column: impl Into<String>,
        source: StorageError,
    ) -> Self {
        if source.is_context_violation() {
            return Self::Storage(source);
        }
        Self::WriteFailed {
            table: table.into(),
            id,
            column: column.into(),
            source,
        }
    }

    /// Wraps a failed insert into `table`.
    ///
    /// Context violations are passed through unchanged so they stay fatal.
    pub fn insert_failed(table: impl Into<String>, source: StorageError) -> Self {
        if source.is_context_violation() {
            return Self::Storage(source);
        }
        Self::InsertFailed {
            table: table.into(),
            source,
        }
    }

    /// Creates an unknown entity error.
    pub fn unknown_entity(name: impl Into<String>) -> Self {
        Self::UnknownEntity { name: name.into() }
    }

    /// Creates an unknown field error.
    pub fn unknown_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Creates an unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Returns true for errors that must abort schema initialization.
    ///
    /// These are the schema definition errors, schema drift, and use of the
    /// connection from an unauthorized thread.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::InvalidDeclaration { .. }
            | Self::UnknownEntityReference { .. }
            | Self::UnsupportedValueType { .. }
            | Self::CyclicReference { .. }
            | Self::InvalidName { .. }
            | Self::SchemaDrift { .. } => true,
            Self::Storage(e) => e.is_context_violation(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_errors_are_fatal() {
        assert!(CoreError::invalid_declaration("Food", "bad").is_fatal());
        assert!(CoreError::CyclicReference {
            table: "A_table".into()
        }
        .is_fatal());
        assert!(CoreError::SchemaDrift {
            table: "A_table".into(),
            expected: String::new(),
            actual: String::new(),
        }
        .is_fatal());
    }

    #[test]
    fn row_errors_are_not_fatal() {
        assert!(!CoreError::row_not_found("Food_table", 3).is_fatal());
        assert!(!CoreError::unsupported("sort").is_fatal());
    }

    #[test]
    fn context_violation_is_fatal() {
        let err = CoreError::from(StorageError::ContextViolation {
            thread: "ui".into(),
            expected: "'main'".into(),
        });
        assert!(err.is_fatal());
    }

    #[test]
    fn write_failures_keep_context_violations() {
        let violation = StorageError::ContextViolation {
            thread: "ui".into(),
            expected: "'main'".into(),
        };
        assert!(CoreError::write_failed("T", 1, "v", violation).is_fatal());

        let violation = StorageError::ContextViolation {
            thread: "ui".into(),
            expected: "'main'".into(),
        };
        assert!(matches!(
            CoreError::insert_failed("T", violation),
            CoreError::Storage(_)
        ));
    }

    #[test]
    fn messages_name_the_row() {
        let msg = CoreError::row_not_found("Food_table", 3).to_string();
        assert!(msg.contains("Food_table"));
        assert!(msg.contains('3'));
    }
}
