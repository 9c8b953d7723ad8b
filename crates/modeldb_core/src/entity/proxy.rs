//! Entity proxies.

use super::model::{Attr, Entity, ListAttr};
use crate::collection::{Collection, CollectionCell};
use crate::database::Database;
use crate::error::{CoreError, CoreResult};
use crate::property::{ErasedProperty, Property, PropertyCell};
use crate::schema::{self, FieldKind, TableDescriptor, ID};
use crate::value::PropertyValue;
use modeldb_storage::SqlValue;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// The identity of a row: entity name and id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowIdentity {
    entity: String,
    id: i64,
}

impl RowIdentity {
    /// The entity name.
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// The row id.
    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }
}

impl fmt::Display for RowIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.entity, self.id)
    }
}

/// The live handle over one persisted row.
///
/// A proxy hands out one [`Property`] or [`Collection`] binding per
/// attribute and keeps it for its own lifetime, so listeners and buffered
/// values registered through one accessor call are seen by the next.
pub struct EntityProxy {
    db: Database,
    table: Arc<TableDescriptor>,
    id: i64,
    eager: bool,
    properties: Mutex<HashMap<&'static str, Arc<dyn ErasedProperty>>>,
    collections: Mutex<HashMap<&'static str, Arc<CollectionCell>>>,
}

impl EntityProxy {
    pub(crate) fn new(db: Database, table: Arc<TableDescriptor>, id: i64, eager: bool) -> Self {
        Self {
            db,
            table,
            id,
            eager,
            properties: Mutex::new(HashMap::new()),
            collections: Mutex::new(HashMap::new()),
        }
    }

    /// A lazy proxy for the same row that is not cached.
    pub(crate) fn detached_lazy(&self) -> Arc<Self> {
        Arc::new(Self::new(self.db.clone(), Arc::clone(&self.table), self.id, false))
    }

    /// The row id.
    #[must_use]
    pub fn id(&self) -> i64 {
        self.id
    }

    /// The entity name.
    #[must_use]
    pub fn entity_name(&self) -> &str {
        self.table.entity().unwrap_or_else(|| self.table.name())
    }

    /// The table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        self.table.name()
    }

    /// The table descriptor.
    #[must_use]
    pub fn table(&self) -> &TableDescriptor {
        &self.table
    }

    /// The row identity.
    #[must_use]
    pub fn identity(&self) -> RowIdentity {
        RowIdentity {
            entity: self.entity_name().to_string(),
            id: self.id,
        }
    }

    /// Returns true if property writes go straight to the store.
    #[must_use]
    pub fn is_eager(&self) -> bool {
        self.eager
    }

    /// The database the row lives in.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// The property bound to `attr`.
    pub fn property<M, T: PropertyValue>(&self, attr: Attr<M, T>) -> Property<T> {
        let mut cells = self.properties.lock();
        if let Some(cell) = cells.get(attr.name()) {
            if let Ok(cell) = Arc::clone(cell).into_any().downcast::<PropertyCell<T>>() {
                return Property::from_cell(cell);
            }
        }
        let cell = Arc::new(PropertyCell::new(
            self.db.clone(),
            self.table.name(),
            self.id,
            attr.column(),
            self.eager,
        ));
        cells.insert(attr.name(), Arc::clone(&cell) as Arc<dyn ErasedProperty>);
        Property::from_cell(cell)
    }

    /// The collection bound to the relation `attr`.
    ///
    /// The related ids are loaded on first access.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::UnknownField`] if the entity has no such
    /// relation to `N`, or if the related ids cannot be loaded.
    pub fn collection<M, N: Entity>(
        self: &Arc<Self>,
        attr: ListAttr<M, N>,
    ) -> CoreResult<Collection<N>> {
        let mut cells = self.collections.lock();
        if let Some(cell) = cells.get(attr.name()) {
            return Ok(Collection::from_cell(Arc::clone(self), Arc::clone(cell)));
        }

        let registry = self.db.registry();
        let junction = registry
            .junction(self.entity_name(), attr.name())
            .filter(|table| {
                table
                    .relation()
                    .is_some_and(|relation| relation.target() == N::ENTITY_NAME)
            })
            .ok_or_else(|| CoreError::unknown_field(self.entity_name(), attr.name()))?;
        let cell = Arc::new(CollectionCell::load(
            self.db.clone(),
            junction,
            self.id,
            self.eager,
        )?);
        cells.insert(attr.name(), Arc::clone(&cell));
        Ok(Collection::from_cell(Arc::clone(self), cell))
    }

    /// The collection cell of `attribute`, if it has been loaded.
    pub(crate) fn loaded_collection(&self, attribute: &str) -> Option<Arc<CollectionCell>> {
        self.collections.lock().get(attribute).cloned()
    }

    /// Writes every buffered property value in one `UPDATE`.
    pub(crate) fn flush(&self) -> CoreResult<()> {
        let cells: Vec<Arc<dyn ErasedProperty>> =
            self.properties.lock().values().cloned().collect();
        let mut writes: Vec<(String, SqlValue)> = cells
            .iter()
            .filter_map(|cell| cell.pending().map(|v| (cell.column().to_string(), v)))
            .collect();
        if writes.is_empty() {
            return Ok(());
        }
        writes.sort_by(|a, b| a.0.cmp(&b.0));

        let columns: Vec<&str> = writes.iter().map(|(c, _)| c.as_str()).collect();
        let assignments = columns
            .iter()
            .map(|c| format!("{c} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let written = columns.join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE {ID} = ?",
            self.table.name()
        );
        let mut params: Vec<SqlValue> = writes.iter().map(|(_, v)| v.clone()).collect();
        params.push(SqlValue::Integer(self.id));

        let changed = self
            .db
            .run_update(&sql, &params)
            .map_err(|source| CoreError::write_failed(self.table.name(), self.id, &written, source))?;
        if changed == 0 {
            return Err(CoreError::row_not_found(self.table.name(), self.id));
        }
        for cell in &cells {
            cell.mark_flushed();
        }
        debug!(table = self.table.name(), id = self.id, columns = %written, "flushed buffered properties");
        Ok(())
    }

    /// Renders the row as `Entity[id=1, attr=value, ...]`.
    pub(crate) fn describe(&self) -> CoreResult<String> {
        let table = self.table.name();
        let sql = format!("SELECT * FROM {table} WHERE {ID} = ?");
        let row = self.db.run_query(&sql, &[SqlValue::Integer(self.id)])?;
        match row.row_count() {
            0 => return Err(CoreError::row_not_found(table, self.id)),
            1 => {}
            count => {
                return Err(CoreError::DuplicateRows {
                    table: table.to_string(),
                    id: self.id,
                    count,
                })
            }
        }

        let mut parts = vec![format!("{ID}={}", self.id)];
        for field in self.table.fields() {
            let stored = row.column(field.column()).and_then(<[SqlValue]>::first);
            let target = field.target().unwrap_or_default();
            let rendered = match field.kind() {
                FieldKind::Id => continue,
                FieldKind::Value => stored.map_or_else(|| "null".to_string(), render_scalar),
                FieldKind::ForeignKey => match stored {
                    Some(SqlValue::Integer(id)) => format!("{target}#{id}"),
                    _ => "null".to_string(),
                },
                FieldKind::IntermediateTable => {
                    let ids = self.related_ids(field.attribute(), field.column(), target)?;
                    let items: Vec<String> = ids.iter().map(|id| format!("{target}#{id}")).collect();
                    format!("[{}]", items.join(", "))
                }
            };
            parts.push(format!("{}={rendered}", field.attribute()));
        }
        Ok(format!("{}[{}]", self.entity_name(), parts.join(", ")))
    }

    fn related_ids(&self, attribute: &str, junction: &str, target: &str) -> CoreResult<Vec<i64>> {
        if let Some(cell) = self.loaded_collection(attribute) {
            return Ok(cell.target_ids());
        }
        let owner_column = schema::junction_owner_column(self.table.name());
        let target_column = schema::junction_target_column(&schema::table_name(target));
        let sql = format!(
            "SELECT {target_column} FROM {junction} WHERE {owner_column} = ? ORDER BY {ID}"
        );
        let result = self.db.run_query(&sql, &[SqlValue::Integer(self.id)])?;
        Ok(result
            .into_column(&target_column)
            .unwrap_or_default()
            .iter()
            .filter_map(SqlValue::as_i64)
            .collect())
    }
}

fn render_scalar(value: &SqlValue) -> String {
    match value {
        SqlValue::Text(text) => format!("{text:?}"),
        SqlValue::Real(real) => format!("{real:?}"),
        SqlValue::Null => "null".to_string(),
        other => other.to_string(),
    }
}

impl fmt::Debug for EntityProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityProxy")
            .field("table", &self.table.name())
            .field("id", &self.id)
            .field("eager", &self.eager)
            .finish_non_exhaustive()
    }
}
