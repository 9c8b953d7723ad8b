//! Database configuration.

use modeldb_storage::ExecutionContext;

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the database if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether proxies returned by `create` and `select` write through on
    /// every `set`. When false, writes are buffered until `flush`.
    pub eager_properties: bool,

    /// Whether the engine enforces foreign key constraints.
    pub enforce_foreign_keys: bool,

    /// Whether `create_tables_for` compares existing tables against their
    /// declarations.
    pub verify_schema: bool,

    /// Threads allowed to use the connection. `None` means the thread that
    /// opens the database.
    pub execution_context: Option<ExecutionContext>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            eager_properties: true,
            enforce_foreign_keys: false,
            verify_schema: true,
            execution_context: None,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the database if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether properties write through immediately.
    #[must_use]
    pub const fn eager_properties(mut self, value: bool) -> Self {
        self.eager_properties = value;
        self
    }

    /// Sets whether foreign key constraints are enforced.
    #[must_use]
    pub const fn enforce_foreign_keys(mut self, value: bool) -> Self {
        self.enforce_foreign_keys = value;
        self
    }

    /// Sets whether existing tables are checked for drift.
    #[must_use]
    pub const fn verify_schema(mut self, value: bool) -> Self {
        self.verify_schema = value;
        self
    }

    /// Sets the threads allowed to use the connection.
    #[must_use]
    pub fn execution_context(mut self, context: ExecutionContext) -> Self {
        self.execution_context = Some(context);
        self
    }

    pub(crate) fn resolved_context(&self) -> ExecutionContext {
        self.execution_context
            .clone()
            .unwrap_or_else(ExecutionContext::current)
    }
}
