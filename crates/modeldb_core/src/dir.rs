//! Database location management.
//!
//! A database lives either in an explicit `.db` file or in a directory:
//!
//! ```text
//! <db_path>/
//! ├─ LOCK        # Advisory lock for single-process access
//! └─ sqlite.db   # The SQL engine's database file
//! ```
//!
//! For an explicit `<name>.db` path the lock is taken on `<name>.db.lock`
//! next to it.

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const DATABASE_FILE: &str = "sqlite.db";
const DATABASE_EXTENSION: &str = "db";

/// Resolves a database location and holds its lock.
///
/// # Thread Safety
///
/// The `DatabaseDir` holds an exclusive lock on the location.
/// Only one `DatabaseDir` instance can exist per location at a time.
#[derive(Debug)]
pub struct DatabaseDir {
    /// Directory containing the database file.
    path: PathBuf,
    /// The database file.
    database_file: PathBuf,
    /// Lock file handle (held for exclusive access).
    _lock_file: File,
}

impl DatabaseDir {
    /// Resolves `location` and acquires its lock.
    ///
    /// A path with a `.db` extension names the database file itself; any
    /// other path names a directory holding `sqlite.db`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The location doesn't exist and `create_if_missing` is false
    /// - Another process holds the lock (returns `DatabaseLocked`)
    /// - I/O errors occur
    pub fn open(location: &Path, create_if_missing: bool) -> CoreResult<Self> {
        let (path, database_file, lock_path) = resolve(location);

        if !database_file.exists() && !create_if_missing {
            return Err(CoreError::DatabaseNotFound {
                path: database_file.display().to_string(),
            });
        }

        if !path.exists() {
            fs::create_dir_all(&path)?;
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::DatabaseLocked);
        }

        Ok(Self {
            path,
            database_file,
            _lock_file: lock_file,
        })
    }

    /// Returns the directory containing the database.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of the database file.
    #[must_use]
    pub fn database_file(&self) -> &Path {
        &self.database_file
    }
}

fn resolve(location: &Path) -> (PathBuf, PathBuf, PathBuf) {
    let is_file = location
        .extension()
        .is_some_and(|ext| ext == DATABASE_EXTENSION);
    if is_file {
        let dir = match location.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut lock = location.as_os_str().to_owned();
        lock.push(".lock");
        (dir, location.to_path_buf(), PathBuf::from(lock))
    } else {
        (
            location.to_path_buf(),
            location.join(DATABASE_FILE),
            location.join(LOCK_FILE),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn directory_location_holds_sqlite_db() {
        let temp = tempdir().unwrap();
        let db_path = temp.path().join("new_db");

        let dir = DatabaseDir::open(&db_path, true).unwrap();
        assert!(db_path.is_dir());
        assert_eq!(dir.database_file(), db_path.join("sqlite.db"));
        assert!(db_path.join("LOCK").exists());
    }

    #[test]
    fn db_extension_names_the_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("app.db");

        let dir = DatabaseDir::open(&file, true).unwrap();
        assert_eq!(dir.database_file(), file);
        assert_eq!(dir.path(), temp.path());
        assert!(temp.path().join("app.db.lock").exists());
    }

    #[test]
    fn open_fails_if_not_exists_and_no_create() {
        let temp = tempdir().unwrap();
        let result = DatabaseDir::open(&temp.path().join("nonexistent"), false);
        assert!(matches!(result, Err(CoreError::DatabaseNotFound { .. })));
    }

    #[test]
    fn lock_prevents_second_open() {
        let temp = tempdir().unwrap();
        let db_path = temp.path().join("locked_db");

        let _dir1 = DatabaseDir::open(&db_path, true).unwrap();
        let result = DatabaseDir::open(&db_path, true);
        assert!(matches!(result, Err(CoreError::DatabaseLocked)));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        let db_path = temp.path().join("reopen_db");

        {
            let _dir = DatabaseDir::open(&db_path, true).unwrap();
        }
        let _dir2 = DatabaseDir::open(&db_path, true).unwrap();
    }
}
