//! Database facade.

use crate::config::Config;
use crate::dir::DatabaseDir;
use crate::entity::{Entity, EntityProxy, ProxyCache};
use crate::error::{CoreError, CoreResult};
use crate::query::Where;
use crate::schema::{self, drift, EntityDecl, SchemaRegistry, TableDescriptor, ID};
use crate::stats::{DatabaseStats, StatsSnapshot};
use modeldb_storage::{QueryResult, SqlValue, SqliteDriver, StorageDriver, StorageResult};
use parking_lot::RwLock;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

struct DatabaseInner {
    config: Config,
    driver: Box<dyn StorageDriver>,
    registry: RwLock<Arc<SchemaRegistry>>,
    cache: ProxyCache,
    stats: DatabaseStats,
    /// Location and lock. None for in-memory databases and custom drivers.
    dir: Option<DatabaseDir>,
}

/// The main database handle.
///
/// `Database` owns the connection, the schema registry and the proxy
/// cache. It is cheap to clone; clones share all state, and every entity
/// handle keeps the database alive.
///
/// # Opening a Database
///
/// ```rust,ignore
/// use modeldb_core::Database;
///
/// let db = Database::open("kitchen.db")?;
/// db.create_tables_for(&[Food::declaration(), Ingredient::declaration()])?;
///
/// let rice = db.create::<Food>()?;
/// rice.name().set("Rice")?;
/// ```
///
/// # Execution Context
///
/// Only threads of the configured [`ExecutionContext`](modeldb_storage::ExecutionContext)
/// may use the database. Calls from any other thread fail with a context
/// violation.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// Opens a database at `path`.
    ///
    /// A path ending in `.db` names the database file; any other path names
    /// a directory holding `sqlite.db`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Another process has the database locked (`DatabaseLocked`)
    /// - The database does not exist and `create_if_missing` is false
    /// - The engine cannot open the file
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a database at `path` with custom configuration.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use modeldb_core::{Config, Database};
    ///
    /// let config = Config::default()
    ///     .enforce_foreign_keys(true)
    ///     .eager_properties(false);
    ///
    /// let db = Database::open_with_config("kitchen", config)?;
    /// ```
    pub fn open_with_config(path: impl AsRef<Path>, config: Config) -> CoreResult<Self> {
        let dir = DatabaseDir::open(path.as_ref(), config.create_if_missing)?;
        let driver = SqliteDriver::open(dir.database_file(), config.resolved_context())?;
        Self::assemble(config, Box::new(driver), Some(dir))
    }

    /// Opens a fresh in-memory database.
    ///
    /// Data is lost when the last handle is dropped.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_in_memory_with_config(Config::default())
    }

    /// Opens a fresh in-memory database with custom configuration.
    pub fn open_in_memory_with_config(config: Config) -> CoreResult<Self> {
        let driver = SqliteDriver::open_in_memory(config.resolved_context())?;
        Self::assemble(config, Box::new(driver), None)
    }

    /// Opens a database over an existing driver.
    ///
    /// The driver enforces its own execution context;
    /// `config.execution_context` is not consulted.
    pub fn open_with_driver(driver: Box<dyn StorageDriver>, config: Config) -> CoreResult<Self> {
        Self::assemble(config, driver, None)
    }

    fn assemble(
        config: Config,
        driver: Box<dyn StorageDriver>,
        dir: Option<DatabaseDir>,
    ) -> CoreResult<Self> {
        if config.enforce_foreign_keys {
            driver.execute("PRAGMA foreign_keys = ON")?;
        }
        info!(
            path = ?dir.as_ref().map(DatabaseDir::database_file),
            eager = config.eager_properties,
            "database opened"
        );
        Ok(Self {
            inner: Arc::new(DatabaseInner {
                config,
                driver,
                registry: RwLock::new(Arc::new(SchemaRegistry::new())),
                cache: ProxyCache::new(),
                stats: DatabaseStats::new(),
                dir,
            }),
        })
    }

    // ========================================================================
    // Schema
    // ========================================================================

    /// Registers `decls` and creates their tables.
    ///
    /// Existing tables are compared against their declarations first (if
    /// `verify_schema` is set); any difference aborts before a single table
    /// is created. Missing tables are then created so that referenced
    /// tables come first, junction tables last. Calling this again with the
    /// same declarations changes nothing.
    ///
    /// # Errors
    ///
    /// Fails with a schema definition error for malformed declarations,
    /// [`CoreError::CyclicReference`] for cyclic foreign keys, or
    /// [`CoreError::SchemaDrift`] if a stored table disagrees with its
    /// declaration. The registry is unchanged on failure.
    pub fn create_tables_for(&self, decls: &[EntityDecl]) -> CoreResult<()> {
        let merged = self.registry().merge(decls)?;

        let mut missing = Vec::new();
        for table in merged.creation_order() {
            match self.table_definition(table.name())? {
                Some(stored) if self.inner.config.verify_schema => {
                    drift::check(table.name(), &table.ddl(), &stored)?;
                }
                Some(_) => {}
                None => missing.push(table),
            }
        }

        for table in missing {
            self.run_execute(&table.ddl())?;
            info!(table = table.name(), "created table");
        }

        *self.inner.registry.write() = Arc::new(merged);
        Ok(())
    }

    /// Registers `M` and creates its tables. See [`Database::create_tables_for`].
    ///
    /// # Errors
    ///
    /// See [`Database::create_tables_for`].
    pub fn create_table<M: Entity>(&self) -> CoreResult<()> {
        self.create_tables_for(&[M::declaration()])
    }

    /// Drops the tables of `M`, junction tables first.
    ///
    /// # Errors
    ///
    /// See [`Database::drop_tables_for`].
    pub fn drop_table<M: Entity>(&self) -> CoreResult<()> {
        self.drop_tables_for(&[M::declaration()])
    }

    /// Drops the tables of `decls` if they exist, junction tables first.
    ///
    /// The entities stay registered.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::InvalidName`] for a declaration whose name
    /// is not a valid identifier, or if a `DROP` fails.
    pub fn drop_tables_for(&self, decls: &[EntityDecl]) -> CoreResult<()> {
        let junctions = decls.iter().flat_map(EntityDecl::junction_table_names);
        let entities = decls.iter().map(EntityDecl::table_name);
        let tables: Vec<String> = junctions.chain(entities).collect();

        for table in &tables {
            if !schema::is_valid_name(table) {
                return Err(CoreError::invalid_name(table.as_str()));
            }
        }
        for table in &tables {
            self.run_execute(&format!("DROP TABLE IF EXISTS {table}"))?;
            self.inner.cache.evict_table(table);
            info!(table = %table, "dropped table");
        }
        Ok(())
    }

    /// Drops every table in the store.
    ///
    /// Registered tables are dropped in reverse creation order, then any
    /// other table. The registry is kept; the proxy cache is cleared.
    ///
    /// # Errors
    ///
    /// Fails if a table cannot be listed or dropped.
    pub fn drop_all_tables(&self) -> CoreResult<()> {
        let registry = self.registry();
        for table in registry.creation_order().iter().rev() {
            if self.table_definition(table.name())?.is_some() {
                warn!(table = table.name(), "dropping table");
                self.run_execute(&format!("DROP TABLE IF EXISTS {}", table.name()))?;
            }
        }
        for table in self.table_names()? {
            warn!(table = %table, "dropping table");
            self.run_execute(&format!("DROP TABLE IF EXISTS {}", quote(&table)))?;
        }
        self.inner.cache.clear();
        Ok(())
    }

    /// The current schema registry.
    #[must_use]
    pub fn registry(&self) -> Arc<SchemaRegistry> {
        Arc::clone(&self.inner.registry.read())
    }

    // ========================================================================
    // Rows
    // ========================================================================

    /// Inserts a row of `M` with default values.
    ///
    /// Scalars start as `""`, `0`, `0.0` or `false`; foreign keys as
    /// `NULL`.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::UnknownEntity`] or [`CoreError::TableMissing`]
    /// if `M` has no table, or with [`CoreError::InsertFailed`].
    pub fn create<M: Entity>(&self) -> CoreResult<M> {
        let table = self.entity_table::<M>()?;
        self.ensure_table(&table)?;

        let defaults = table.insert_defaults();
        let sql = if defaults.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", table.name())
        } else {
            let columns: Vec<&str> = defaults.iter().map(|(c, _)| *c).collect();
            let placeholders = vec!["?"; columns.len()].join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({placeholders})",
                table.name(),
                columns.join(", ")
            )
        };
        let params: Vec<SqlValue> = defaults.into_iter().map(|(_, v)| v).collect();

        let id = self
            .run_insert(&sql, &params)
            .map_err(|source| CoreError::insert_failed(table.name(), source))?
            .ok_or_else(|| CoreError::row_not_found(table.name(), 0))?;
        self.inner.stats.record_create();
        debug!(table = table.name(), id, "created row");
        Ok(M::from_proxy(self.cache_proxy(&table, id)))
    }

    /// The row of `M` with `id`.
    ///
    /// While any handle for the row is alive, every call returns a handle
    /// sharing the same proxy.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::InvalidId`] for a negative id,
    /// [`CoreError::UnknownEntity`] if `M` is not registered,
    /// [`CoreError::TableMissing`] if its table does not exist, or
    /// [`CoreError::RowNotFound`] if there is no such row.
    pub fn select<M: Entity>(&self, id: i64) -> CoreResult<M> {
        if id < 0 {
            return Err(CoreError::InvalidId { id });
        }
        let table = self.entity_table::<M>()?;
        if let Some(proxy) = self.inner.cache.get(table.name(), id) {
            self.inner.stats.record_cache_hit();
            return Ok(M::from_proxy(proxy));
        }
        self.inner.stats.record_cache_miss();
        self.ensure_table(&table)?;
        self.ensure_row(&table, id)?;
        Ok(M::from_proxy(self.cache_proxy(&table, id)))
    }

    /// Every row of `M`, ordered by id.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::UnknownEntity`] if `M` is not registered, or
    /// if the query fails.
    pub fn select_all<M: Entity>(&self) -> CoreResult<Vec<M>> {
        self.select_where::<M>()?.as_list()
    }

    /// Starts a query over rows of `M`.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::UnknownEntity`] if `M` is not registered.
    pub fn select_where<M: Entity>(&self) -> CoreResult<Where<M>> {
        self.entity_table::<M>()?;
        Ok(Where::new(self.clone()))
    }

    /// Deletes the row of `entity`.
    ///
    /// Every junction row pointing at it is deleted first, and it is
    /// removed from the loaded collections of live owners. Junction rows it
    /// owns are deleted too. The statements do not run in a transaction.
    /// Live handles and loaded collections only change once the row itself
    /// is gone.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::RowNotFound`] if the row does not exist, or
    /// if a `DELETE` fails.
    pub fn delete<M: Entity>(&self, entity: &M) -> CoreResult<()> {
        let table = self.entity_table::<M>()?;
        let id = entity.id();
        self.ensure_row(&table, id)?;

        let registry = self.registry();
        let mut live_views = Vec::new();
        for junction in registry.junctions_targeting(M::ENTITY_NAME) {
            let Some(relation) = junction.relation() else {
                continue;
            };
            let owners_sql = format!(
                "SELECT DISTINCT {} FROM {} WHERE {} = ?",
                relation.owner_column(),
                junction.name(),
                relation.target_column()
            );
            let owners = self
                .run_query(&owners_sql, &[SqlValue::Integer(id)])?
                .into_column(relation.owner_column())
                .unwrap_or_default();
            let owner_table = schema::table_name(relation.owner());
            for owner_id in owners.iter().filter_map(SqlValue::as_i64) {
                let loaded = self
                    .inner
                    .cache
                    .get(&owner_table, owner_id)
                    .and_then(|proxy| proxy.loaded_collection(relation.attribute()));
                live_views.extend(loaded);
            }
            self.run_update(
                &format!(
                    "DELETE FROM {} WHERE {} = ?",
                    junction.name(),
                    relation.target_column()
                ),
                &[SqlValue::Integer(id)],
            )?;
        }

        for junction in registry.junctions_owned_by(M::ENTITY_NAME) {
            let Some(relation) = junction.relation() else {
                continue;
            };
            self.run_update(
                &format!(
                    "DELETE FROM {} WHERE {} = ?",
                    junction.name(),
                    relation.owner_column()
                ),
                &[SqlValue::Integer(id)],
            )?;
        }

        let deleted = self.run_update(
            &format!("DELETE FROM {} WHERE {ID} = ?", table.name()),
            &[SqlValue::Integer(id)],
        )?;
        if deleted == 0 {
            return Err(CoreError::row_not_found(table.name(), id));
        }
        self.inner.cache.evict(table.name(), id);
        for cell in live_views {
            cell.forget_target(id);
        }
        self.inner.stats.record_delete();
        debug!(table = table.name(), id, "deleted row");
        Ok(())
    }

    /// Inserts a copy of the row of `entity` and returns it.
    ///
    /// Scalars and foreign keys are copied; many-valued relations are not.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::RowNotFound`] if the source row does not
    /// exist, or with [`CoreError::InsertFailed`].
    pub fn duplicate<M: Entity>(&self, entity: &M) -> CoreResult<M> {
        let table = self.entity_table::<M>()?;
        let source = entity.id();
        let columns = table.copyable_columns();

        let inserted = if columns.is_empty() {
            self.ensure_row(&table, source)?;
            self.run_insert(&format!("INSERT INTO {} DEFAULT VALUES", table.name()), &[])
        } else {
            let columns = columns.join(", ");
            let sql = format!(
                "INSERT INTO {t} ({columns}) SELECT {columns} FROM {t} WHERE {ID} = ?",
                t = table.name()
            );
            self.run_insert(&sql, &[SqlValue::Integer(source)])
        };
        let id = inserted
            .map_err(|e| CoreError::insert_failed(table.name(), e))?
            .ok_or_else(|| CoreError::row_not_found(table.name(), source))?;
        self.inner.stats.record_create();
        debug!(table = table.name(), source, id, "duplicated row");
        Ok(M::from_proxy(self.cache_proxy(&table, id)))
    }

    // ========================================================================
    // Raw access
    // ========================================================================

    /// Executes raw SQL, possibly several statements.
    ///
    /// # Errors
    ///
    /// Fails if the engine rejects the SQL.
    pub fn execute(&self, sql: &str) -> CoreResult<()> {
        Ok(self.run_execute(sql)?)
    }

    /// Runs a raw parameterized query.
    ///
    /// # Errors
    ///
    /// Fails if the engine rejects the SQL.
    pub fn query(&self, sql: &str, params: &[SqlValue]) -> CoreResult<QueryResult> {
        Ok(self.run_query(sql, params)?)
    }

    /// Names of all tables in the store, sorted.
    ///
    /// # Errors
    ///
    /// Fails if the catalog cannot be read.
    pub fn table_names(&self) -> CoreResult<Vec<String>> {
        self.inner.stats.record_query();
        Ok(self.inner.driver.table_names()?)
    }

    /// The stored `CREATE TABLE` statement of `table`, if it exists.
    ///
    /// # Errors
    ///
    /// Fails if the catalog cannot be read.
    pub fn table_definition(&self, table: &str) -> CoreResult<Option<String>> {
        self.inner.stats.record_query();
        Ok(self.inner.driver.table_sql(table)?)
    }

    /// The stored `CREATE TABLE` statement of `M`'s table.
    ///
    /// # Errors
    ///
    /// Fails with [`CoreError::TableMissing`] if the table does not exist.
    pub fn table_sql<M: Entity>(&self) -> CoreResult<String> {
        let table = M::table_name();
        self.table_definition(&table)?
            .ok_or(CoreError::TableMissing { table })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Returns a snapshot of the database counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// The configuration the database was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// The database file, or `None` for in-memory databases.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.inner.dir.as_ref().map(DatabaseDir::database_file)
    }

    /// Number of live proxies in the identity cache.
    #[must_use]
    pub fn cached_proxies(&self) -> usize {
        self.inner.cache.live_count()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    pub(crate) fn run_query(&self, sql: &str, params: &[SqlValue]) -> StorageResult<QueryResult> {
        self.inner.stats.record_query();
        self.inner.driver.query(sql, params)
    }

    pub(crate) fn run_update(&self, sql: &str, params: &[SqlValue]) -> StorageResult<usize> {
        self.inner.stats.record_update();
        self.inner.driver.update(sql, params)
    }

    pub(crate) fn run_insert(&self, sql: &str, params: &[SqlValue]) -> StorageResult<Option<i64>> {
        self.inner.stats.record_update();
        self.inner.driver.insert(sql, params)
    }

    pub(crate) fn run_execute(&self, sql: &str) -> StorageResult<()> {
        self.inner.stats.record_execute();
        self.inner.driver.execute(sql)
    }

    /// The entity for a row id just returned by a query. The row is not
    /// checked again.
    pub(crate) fn resolve<M: Entity>(&self, id: i64) -> CoreResult<M> {
        let table = self.entity_table::<M>()?;
        if let Some(proxy) = self.inner.cache.get(table.name(), id) {
            self.inner.stats.record_cache_hit();
            return Ok(M::from_proxy(proxy));
        }
        self.inner.stats.record_cache_miss();
        Ok(M::from_proxy(self.cache_proxy(&table, id)))
    }

    fn entity_table<M: Entity>(&self) -> CoreResult<Arc<TableDescriptor>> {
        self.registry()
            .entity_table(M::ENTITY_NAME)
            .cloned()
            .ok_or_else(|| CoreError::unknown_entity(M::ENTITY_NAME))
    }

    fn ensure_table(&self, table: &TableDescriptor) -> CoreResult<()> {
        if self.table_definition(table.name())?.is_none() {
            return Err(CoreError::TableMissing {
                table: table.name().to_string(),
            });
        }
        Ok(())
    }

    fn ensure_row(&self, table: &TableDescriptor, id: i64) -> CoreResult<()> {
        let sql = format!("SELECT COUNT(*) AS n FROM {} WHERE {ID} = ?", table.name());
        let count = self
            .run_query(&sql, &[SqlValue::Integer(id)])?
            .column("n")
            .and_then(|values| values.first())
            .and_then(SqlValue::as_i64)
            .unwrap_or(0);
        match count {
            0 => Err(CoreError::row_not_found(table.name(), id)),
            1 => Ok(()),
            count => Err(CoreError::DuplicateRows {
                table: table.name().to_string(),
                id,
                count: usize::try_from(count).unwrap_or(usize::MAX),
            }),
        }
    }

    fn cache_proxy(&self, table: &Arc<TableDescriptor>, id: i64) -> Arc<EntityProxy> {
        let proxy = Arc::new(EntityProxy::new(
            self.clone(),
            Arc::clone(table),
            id,
            self.inner.config.eager_properties,
        ));
        self.inner.cache.insert(proxy)
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path())
            .field("config", &self.inner.config)
            .field("entities", &self.registry().entity_names().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
