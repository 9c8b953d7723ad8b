//! Persistent properties.

use crate::database::Database;
use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::schema::ID;
use crate::value::{PropertyValue, ValueSite};
use modeldb_storage::SqlValue;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Type-erased view of a property cell, used by the owning proxy to flush
/// buffered values.
pub(crate) trait ErasedProperty: Send + Sync {
    fn column(&self) -> &str;

    /// The buffered value waiting to be written, if any.
    fn pending(&self) -> Option<SqlValue>;

    fn mark_flushed(&self);

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

struct PropertyState<T> {
    // Stored encoded so a buffered entity reference does not keep its proxy alive.
    pending: Option<SqlValue>,
    listeners: Vec<Listener<T>>,
}

pub(crate) struct PropertyCell<T> {
    db: Database,
    table: String,
    id: i64,
    column: String,
    eager: bool,
    state: Mutex<PropertyState<T>>,
}

impl<T: PropertyValue> PropertyCell<T> {
    pub(crate) fn new(db: Database, table: &str, id: i64, column: &str, eager: bool) -> Self {
        Self {
            db,
            table: table.to_string(),
            id,
            column: column.to_string(),
            eager,
            state: Mutex::new(PropertyState {
                pending: None,
                listeners: Vec::new(),
            }),
        }
    }
}

impl<T: PropertyValue> ErasedProperty for PropertyCell<T> {
    fn column(&self) -> &str {
        &self.column
    }

    fn pending(&self) -> Option<SqlValue> {
        self.state.lock().pending.clone()
    }

    fn mark_flushed(&self) {
        self.state.lock().pending = None;
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// The binding between one attribute of one row and its column.
///
/// Reads always go to the store, except for a lazy property holding a
/// buffered value. Writes of an eager property go straight to the store;
/// a lazy property buffers them until the owning entity is flushed.
///
/// Cloning a property yields another handle to the same binding, sharing
/// its listeners and buffered value.
pub struct Property<T: PropertyValue> {
    cell: Arc<PropertyCell<T>>,
}

impl<T: PropertyValue> Property<T> {
    pub(crate) fn from_cell(cell: Arc<PropertyCell<T>>) -> Self {
        Self { cell }
    }

    /// An eager property that belongs to no proxy.
    pub(crate) fn detached(db: Database, table: &str, id: i64, column: &str) -> Self {
        Self::from_cell(Arc::new(PropertyCell::new(db, table, id, column, true)))
    }

    /// Reads the current value.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::RowNotFound`] or [`CoreError::DuplicateRows`]
    /// unless exactly one row has the id, or with a conversion error if the
    /// stored value does not fit `T`.
    pub fn get(&self) -> CoreResult<T> {
        let raw = match self.buffered() {
            Some(raw) => raw,
            None => self.read()?,
        };
        T::decode(raw, &self.site())
    }

    /// Writes `value`.
    ///
    /// The previous value is read first; listeners are notified if it
    /// differs from `value`.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::UnstorableValue`] for a NaN float, if the
    /// previous value cannot be read, with [`CoreError::WriteFailed`] if
    /// the `UPDATE` fails, or with [`CoreError::RowNotFound`] if it changed
    /// no row.
    pub fn set(&self, value: impl Into<T>) -> CoreResult<()> {
        let value = value.into();
        if !value.is_storable() {
            return Err(CoreError::UnstorableValue {
                table: self.cell.table.to_string(),
                id: self.cell.id,
                column: self.cell.column.to_string(),
                value: value.encode().to_string(),
            });
        }
        let old = self.get()?;
        let raw = value.encode();

        if self.cell.eager {
            let sql = format!(
                "UPDATE {} SET {} = ? WHERE {ID} = ?",
                self.cell.table, self.cell.column
            );
            let changed = self
                .cell
                .db
                .run_update(&sql, &[raw, SqlValue::Integer(self.cell.id)])
                .map_err(|source| {
                    CoreError::write_failed(&self.cell.table, self.cell.id, &self.cell.column, source)
                })?;
            if changed == 0 {
                return Err(CoreError::row_not_found(&self.cell.table, self.cell.id));
            }
        } else {
            self.cell.state.lock().pending = Some(raw);
        }

        if old != value {
            let listeners = self.cell.state.lock().listeners.clone();
            for listener in &listeners {
                listener(&value);
            }
        }
        Ok(())
    }

    /// Registers a listener called after each `set` that changes the value.
    pub fn on_change<F>(&self, listener: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.cell.state.lock().listeners.push(Arc::new(listener));
    }

    /// Returns true if a lazy property holds a value not yet written.
    #[must_use]
    pub fn was_set(&self) -> bool {
        self.cell.state.lock().pending.is_some()
    }

    /// Returns true if writes go straight to the store.
    #[must_use]
    pub fn is_eager(&self) -> bool {
        self.cell.eager
    }

    /// The table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.cell.table
    }

    /// The row id.
    #[must_use]
    pub fn id(&self) -> i64 {
        self.cell.id
    }

    /// The column name.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.cell.column
    }

    fn buffered(&self) -> Option<SqlValue> {
        if self.cell.eager {
            return None;
        }
        self.cell.state.lock().pending.clone()
    }

    fn read(&self) -> CoreResult<SqlValue> {
        let cell = &self.cell;
        let sql = format!("SELECT {} FROM {} WHERE {ID} = ?", cell.column, cell.table);
        let result = cell.db.run_query(&sql, &[SqlValue::Integer(cell.id)])?;
        let mut values = result.into_column(&cell.column).unwrap_or_default();
        match values.len() {
            0 => Err(CoreError::row_not_found(&cell.table, cell.id)),
            1 => Ok(values.swap_remove(0)),
            count => Err(CoreError::DuplicateRows {
                table: cell.table.clone(),
                id: cell.id,
                count,
            }),
        }
    }

    fn site(&self) -> ValueSite<'_> {
        ValueSite {
            db: &self.cell.db,
            table: &self.cell.table,
            id: self.cell.id,
            column: &self.cell.column,
        }
    }
}

impl<M: Entity> Property<Option<M>> {
    /// Reads a foreign key that must be set.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::ForeignKeyNull`] if the column is `NULL`.
    pub fn require(&self) -> CoreResult<M> {
        self.get()?.ok_or_else(|| CoreError::ForeignKeyNull {
            table: self.cell.table.clone(),
            id: self.cell.id,
            column: self.cell.column.clone(),
        })
    }

    /// Sets the foreign key to `NULL`.
    ///
    /// # Errors
    ///
    /// See [`Property::set`].
    pub fn unset(&self) -> CoreResult<()> {
        self.set(None::<M>)
    }
}

impl<T: PropertyValue> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: PropertyValue> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("table", &self.cell.table)
            .field("id", &self.cell.id)
            .field("column", &self.cell.column)
            .field("eager", &self.cell.eager)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup(eager: bool) -> (Database, Property<String>) {
        let db = Database::open_in_memory().unwrap();
        db.execute(
            "CREATE TABLE T_table (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL); \
             INSERT INTO T_table (name) VALUES ('a');",
        )
        .unwrap();
        let cell = PropertyCell::new(db.clone(), "T_table", 1, "name", eager);
        (db, Property::from_cell(Arc::new(cell)))
    }

    fn stored_name(db: &Database) -> SqlValue {
        db.query("SELECT name FROM T_table WHERE id = 1", &[])
            .unwrap()
            .into_column("name")
            .unwrap()
            .remove(0)
    }

    #[test]
    fn eager_set_writes_through() {
        let (db, name) = setup(true);
        assert_eq!(name.get().unwrap(), "a");
        name.set("b").unwrap();
        assert_eq!(stored_name(&db), SqlValue::from("b"));
        assert!(!name.was_set());
    }

    #[test]
    fn lazy_set_is_buffered() {
        let (db, name) = setup(false);
        name.set("b").unwrap();
        assert!(name.was_set());
        assert_eq!(name.get().unwrap(), "b");
        assert_eq!(stored_name(&db), SqlValue::from("a"));
    }

    #[test]
    fn listeners_fire_only_on_change() {
        let (_db, name) = setup(true);
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        name.on_change(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        name.set("a").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        name.set("b").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        name.clone().set("c").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn missing_row() {
        let db = Database::open_in_memory().unwrap();
        db.execute("CREATE TABLE T_table (id INTEGER PRIMARY KEY, name TEXT)")
            .unwrap();
        let name: Property<String> = Property::detached(db, "T_table", 9, "name");
        assert!(matches!(
            name.get(),
            Err(CoreError::RowNotFound { id: 9, .. })
        ));
        assert!(name.set("x").is_err());
    }

    #[test]
    fn duplicate_rows() {
        let db = Database::open_in_memory().unwrap();
        db.execute(
            "CREATE TABLE T_table (id INTEGER, name TEXT); \
             INSERT INTO T_table VALUES (1, 'a'); INSERT INTO T_table VALUES (1, 'b');",
        )
        .unwrap();
        let name: Property<String> = Property::detached(db, "T_table", 1, "name");
        assert!(matches!(
            name.get(),
            Err(CoreError::DuplicateRows { count: 2, .. })
        ));
    }
}
