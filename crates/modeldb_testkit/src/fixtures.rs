//! Test fixtures and helpers.

use crate::models::all_declarations;
use modeldb_core::{Config, Database};
use std::path::Path;
use tempfile::TempDir;

/// A test database that cleans up after itself.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database,
    /// Temporary directory (for file-based databases).
    _temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Creates a new in-memory test database.
    #[must_use]
    pub fn memory() -> Self {
        Self::memory_with_config(Config::default())
    }

    /// Creates a new in-memory test database with custom configuration.
    #[must_use]
    pub fn memory_with_config(config: Config) -> Self {
        let db = Database::open_in_memory_with_config(config)
            .expect("failed to create in-memory database");
        Self {
            db,
            _temp_dir: None,
        }
    }

    /// Creates a new file-based test database in a temporary directory.
    #[must_use]
    pub fn file() -> Self {
        Self::file_with_config(Config::default())
    }

    /// Creates a new file-based test database with custom configuration.
    #[must_use]
    pub fn file_with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let db = Database::open_with_config(temp_dir.path().join("test_db"), config)
            .expect("failed to create file database");
        Self {
            db,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Creates an in-memory database with the tables of every sample model.
    #[must_use]
    pub fn with_models() -> Self {
        let test_db = Self::memory();
        test_db
            .db
            .create_tables_for(&all_declarations())
            .expect("failed to create sample tables");
        test_db
    }

    /// Returns the path to the temporary directory (if file-based).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self._temp_dir.as_ref().map(TempDir::path)
    }

    /// Returns a reference to the database.
    #[must_use]
    pub fn db(&self) -> &Database {
        &self.db
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

impl std::ops::DerefMut for TestDatabase {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.db
    }
}

/// Runs a test with a database holding every sample table.
pub fn with_models_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database) -> R,
{
    let test_db = TestDatabase::with_models();
    f(&test_db.db)
}

/// Runs a test with a temporary in-memory database.
pub fn with_temp_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database) -> R,
{
    let test_db = TestDatabase::memory();
    f(&test_db.db)
}

/// Runs a test with a temporary file-based database.
pub fn with_file_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database, &Path) -> R,
{
    let test_db = TestDatabase::file();
    let path = test_db.path().expect("file database has path").to_path_buf();
    f(&test_db.db, &path)
}
