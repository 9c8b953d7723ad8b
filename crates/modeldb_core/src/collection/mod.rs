//! Persistent collections over junction tables.
//!
//! A [`Collection`] is the many-valued side of a relation: the ordered list
//! of rows of `N` related to one owning row. Every junction row is one
//! element; the list is loaded once and then kept in step with each
//! mutation.

use crate::database::Database;
use crate::entity::{Entity, EntityProxy};
use crate::error::{CoreError, CoreResult};
use crate::property::Property;
use crate::schema::{TableDescriptor, ID};
use modeldb_storage::SqlValue;
use parking_lot::Mutex;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JunctionRow {
    row_id: i64,
    target_id: i64,
}

/// Shared state of one loaded relation.
pub(crate) struct CollectionCell {
    db: Database,
    table: String,
    owner_column: String,
    target_column: String,
    owner_id: i64,
    eager: bool,
    rows: Mutex<Vec<JunctionRow>>,
}

impl CollectionCell {
    /// Loads the junction rows owned by `owner_id`, in insertion order.
    pub(crate) fn load(
        db: Database,
        junction: &TableDescriptor,
        owner_id: i64,
        eager: bool,
    ) -> CoreResult<Self> {
        let relation = junction
            .relation()
            .ok_or_else(|| CoreError::TableMissing {
                table: junction.name().to_string(),
            })?;
        let table = junction.name().to_string();
        let owner_column = relation.owner_column().to_string();
        let target_column = relation.target_column().to_string();

        let sql = format!(
            "SELECT {ID}, {target_column} FROM {table} WHERE {owner_column} = ? ORDER BY {ID}"
        );
        let result = db.run_query(&sql, &[SqlValue::Integer(owner_id)])?;
        let row_ids = result.column(ID).unwrap_or_default();
        let target_ids = result.column(&target_column).unwrap_or_default();

        let mut rows = Vec::with_capacity(row_ids.len());
        for (row_id, target_id) in row_ids.iter().zip(target_ids) {
            let (Some(row_id), Some(target_id)) = (row_id.as_i64(), target_id.as_i64()) else {
                return Err(CoreError::InvalidForeignKey {
                    table,
                    id: owner_id,
                    column: target_column,
                    found: format!("{} value {target_id}", target_id.kind()),
                });
            };
            rows.push(JunctionRow { row_id, target_id });
        }

        Ok(Self {
            db,
            table,
            owner_column,
            target_column,
            owner_id,
            eager,
            rows: Mutex::new(rows),
        })
    }

    pub(crate) fn target_ids(&self) -> Vec<i64> {
        self.rows.lock().iter().map(|r| r.target_id).collect()
    }

    /// Drops every element pointing at `target_id` from the loaded list
    /// without touching the store.
    pub(crate) fn forget_target(&self, target_id: i64) {
        self.rows.lock().retain(|r| r.target_id != target_id);
    }
}

/// The related rows of a many-valued attribute.
///
/// Element order is the order of insertion into the junction table;
/// [`Collection::add_at`] places an element at an index in the loaded list,
/// while a fresh load orders by junction row id. Reordering in place is not
/// supported: [`Collection::sort`] and [`Collection::dedup`] always fail.
///
/// Collections of a lazy proxy (see [`Entity::commit`]) are read-only.
/// A collection keeps its owner's proxy alive, so handles selected while it
/// lives share that proxy.
pub struct Collection<N> {
    // Keeps the owner cached so deletes of related rows reach this cell.
    _owner: Arc<EntityProxy>,
    cell: Arc<CollectionCell>,
    _marker: PhantomData<fn() -> N>,
}

impl<N: Entity> Collection<N> {
    pub(crate) fn from_cell(owner: Arc<EntityProxy>, cell: Arc<CollectionCell>) -> Self {
        Self {
            _owner: owner,
            cell,
            _marker: PhantomData,
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cell.rows.lock().len()
    }

    /// Returns true if there are no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cell.rows.lock().is_empty()
    }

    /// Ids of the related rows, in order.
    #[must_use]
    pub fn ids(&self) -> Vec<i64> {
        self.cell.target_ids()
    }

    /// The element at `index`, read through its junction row.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::IndexOutOfBounds`], or if the junction row or
    /// the related row cannot be read.
    pub fn get(&self, index: usize) -> CoreResult<N> {
        let row = self.row(index)?;
        Property::<Option<N>>::detached(
            self.cell.db.clone(),
            &self.cell.table,
            row.row_id,
            &self.cell.target_column,
        )
        .require()
    }

    /// Inserts `entity` at `index`, shifting later elements.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::IndexOutOfBounds`] if `index > len`, with
    /// [`CoreError::Unsupported`] on a lazy proxy, or with
    /// [`CoreError::InsertFailed`].
    pub fn add_at(&self, index: usize, entity: &N) -> CoreResult<()> {
        self.ensure_mutable()?;
        let cell = &self.cell;
        let mut rows = cell.rows.lock();
        if index > rows.len() {
            return Err(CoreError::IndexOutOfBounds {
                index,
                len: rows.len(),
            });
        }

        let target_id = entity.id();
        let sql = format!(
            "INSERT INTO {} ({}, {}) VALUES (?, ?)",
            cell.table, cell.owner_column, cell.target_column
        );
        let row_id = cell
            .db
            .run_insert(
                &sql,
                &[SqlValue::Integer(cell.owner_id), SqlValue::Integer(target_id)],
            )
            .map_err(|source| CoreError::insert_failed(&cell.table, source))?
            .ok_or_else(|| CoreError::row_not_found(&cell.table, cell.owner_id))?;
        rows.insert(index, JunctionRow { row_id, target_id });
        Ok(())
    }

    /// Appends `entity`.
    ///
    /// # Errors
    ///
    /// See [`Collection::add_at`].
    pub fn push(&self, entity: &N) -> CoreResult<()> {
        self.add_at(self.len(), entity)
    }

    /// Removes the element at `index`.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::IndexOutOfBounds`], with
    /// [`CoreError::Unsupported`] on a lazy proxy, or if the `DELETE` fails.
    pub fn remove_at(&self, index: usize) -> CoreResult<()> {
        self.ensure_mutable()?;
        let cell = &self.cell;
        let mut rows = cell.rows.lock();
        let row = *rows.get(index).ok_or(CoreError::IndexOutOfBounds {
            index,
            len: rows.len(),
        })?;

        let sql = format!(
            "DELETE FROM {} WHERE {ID} = ? AND {} = ? AND {} = ?",
            cell.table, cell.owner_column, cell.target_column
        );
        let deleted = cell.db.run_update(
            &sql,
            &[
                SqlValue::Integer(row.row_id),
                SqlValue::Integer(cell.owner_id),
                SqlValue::Integer(row.target_id),
            ],
        )?;
        if deleted == 0 {
            warn!(table = %cell.table, row = row.row_id, "junction row was already gone");
        }
        rows.remove(index);
        Ok(())
    }

    /// Replaces the element at `index` with `entity`.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::IndexOutOfBounds`], with
    /// [`CoreError::Unsupported`] on a lazy proxy, with
    /// [`CoreError::WriteFailed`], or with [`CoreError::RowNotFound`] if the
    /// junction row no longer exists.
    pub fn set_at(&self, index: usize, entity: &N) -> CoreResult<()> {
        self.ensure_mutable()?;
        let cell = &self.cell;
        let mut rows = cell.rows.lock();
        let len = rows.len();
        let row = rows
            .get_mut(index)
            .ok_or(CoreError::IndexOutOfBounds { index, len })?;

        let target_id = entity.id();
        let sql = format!(
            "UPDATE {} SET {} = ? WHERE {ID} = ?",
            cell.table, cell.target_column
        );
        let changed = cell
            .db
            .run_update(
                &sql,
                &[SqlValue::Integer(target_id), SqlValue::Integer(row.row_id)],
            )
            .map_err(|source| {
                CoreError::write_failed(&cell.table, row.row_id, &cell.target_column, source)
            })?;
        if changed == 0 {
            return Err(CoreError::row_not_found(&cell.table, row.row_id));
        }
        row.target_id = target_id;
        Ok(())
    }

    /// Removes every occurrence of `entity`. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// See [`Collection::remove_at`].
    pub fn remove(&self, entity: &N) -> CoreResult<usize> {
        let target = entity.id();
        let positions: Vec<usize> = self
            .ids()
            .iter()
            .enumerate()
            .filter(|(_, id)| **id == target)
            .map(|(index, _)| index)
            .collect();
        for index in positions.iter().rev() {
            self.remove_at(*index)?;
        }
        Ok(positions.len())
    }

    /// Removes every element.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::Unsupported`] on a lazy proxy, or if the
    /// `DELETE` fails.
    pub fn clear(&self) -> CoreResult<()> {
        self.ensure_mutable()?;
        let cell = &self.cell;
        let mut rows = cell.rows.lock();
        let sql = format!("DELETE FROM {} WHERE {} = ?", cell.table, cell.owner_column);
        cell.db.run_update(&sql, &[SqlValue::Integer(cell.owner_id)])?;
        rows.clear();
        Ok(())
    }

    /// Returns true if `entity` is an element.
    #[must_use]
    pub fn contains(&self, entity: &N) -> bool {
        self.index_of(entity).is_some()
    }

    /// Index of the first occurrence of `entity`.
    #[must_use]
    pub fn index_of(&self, entity: &N) -> Option<usize> {
        let target = entity.id();
        self.cell
            .rows
            .lock()
            .iter()
            .position(|r| r.target_id == target)
    }

    /// Every element, in order.
    ///
    /// # Errors
    ///
    /// Fails if a related row no longer exists.
    pub fn to_vec(&self) -> CoreResult<Vec<N>> {
        self.ids()
            .into_iter()
            .map(|id| self.cell.db.select::<N>(id))
            .collect()
    }

    /// Always fails: the order lives in the junction table.
    ///
    /// # Errors
    ///
    /// Always [`CoreError::Unsupported`].
    pub fn sort(&self) -> CoreResult<()> {
        Err(CoreError::unsupported("sorting a persistent collection"))
    }

    /// Always fails: duplicates are separate junction rows.
    ///
    /// # Errors
    ///
    /// Always [`CoreError::Unsupported`].
    pub fn dedup(&self) -> CoreResult<()> {
        Err(CoreError::unsupported("deduplicating a persistent collection"))
    }

    fn row(&self, index: usize) -> CoreResult<JunctionRow> {
        let rows = self.cell.rows.lock();
        rows.get(index).copied().ok_or(CoreError::IndexOutOfBounds {
            index,
            len: rows.len(),
        })
    }

    fn ensure_mutable(&self) -> CoreResult<()> {
        if self.cell.eager {
            Ok(())
        } else {
            Err(CoreError::unsupported(
                "modifying a collection of a lazy proxy",
            ))
        }
    }
}

impl<N> Clone for Collection<N> {
    fn clone(&self) -> Self {
        Self {
            _owner: Arc::clone(&self._owner),
            cell: Arc::clone(&self.cell),
            _marker: PhantomData,
        }
    }
}

impl<N> fmt::Debug for Collection<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("table", &self.cell.table)
            .field("owner", &self.cell.owner_id)
            .field("ids", &self.cell.target_ids())
            .finish()
    }
}
