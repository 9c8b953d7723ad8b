//! Weak identity cache of live proxies.

use super::proxy::EntityProxy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Per-table map from row id to the proxy currently handed out for it.
///
/// Entries are weak: a proxy lives as long as some handle holds it, after
/// which the entry is dead and the next lookup creates a fresh proxy.
#[derive(Default)]
pub(crate) struct ProxyCache {
    tables: RwLock<HashMap<String, HashMap<i64, Weak<EntityProxy>>>>,
}

/// Dead entries of a table are pruned when its map reaches this size, and
/// again at every doubling.
const PRUNE_THRESHOLD: usize = 64;

impl ProxyCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The live proxy for a row, if any.
    pub(crate) fn get(&self, table: &str, id: i64) -> Option<Arc<EntityProxy>> {
        self.tables.read().get(table)?.get(&id)?.upgrade()
    }

    /// Caches `proxy` unless a live proxy for the row is already cached.
    ///
    /// Returns the proxy that is cached afterwards.
    pub(crate) fn insert(&self, proxy: Arc<EntityProxy>) -> Arc<EntityProxy> {
        let mut tables = self.tables.write();
        let rows = tables.entry(proxy.table_name().to_string()).or_default();
        if let Some(existing) = rows.get(&proxy.id()).and_then(Weak::upgrade) {
            return existing;
        }
        rows.insert(proxy.id(), Arc::downgrade(&proxy));
        if rows.len() >= PRUNE_THRESHOLD && rows.len().is_power_of_two() {
            rows.retain(|_, entry| entry.strong_count() > 0);
        }
        proxy
    }

    pub(crate) fn evict(&self, table: &str, id: i64) {
        if let Some(rows) = self.tables.write().get_mut(table) {
            rows.remove(&id);
        }
    }

    pub(crate) fn evict_table(&self, table: &str) {
        self.tables.write().remove(table);
    }

    pub(crate) fn clear(&self) {
        self.tables.write().clear();
    }

    /// Number of cached proxies that are still alive.
    pub(crate) fn live_count(&self) -> usize {
        self.tables
            .read()
            .values()
            .flat_map(HashMap::values)
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntityDecl, SchemaRegistry};
    use crate::Database;

    fn proxy(db: &Database, id: i64) -> Arc<EntityProxy> {
        let registry = SchemaRegistry::new()
            .merge(&[EntityDecl::builder("Thing").build()])
            .unwrap();
        let table = Arc::clone(registry.entity_table("Thing").unwrap());
        Arc::new(EntityProxy::new(db.clone(), table, id, true))
    }

    #[test]
    fn returns_live_entry() {
        let db = Database::open_in_memory().unwrap();
        let cache = ProxyCache::new();
        let first = cache.insert(proxy(&db, 1));
        let second = cache.insert(proxy(&db, 1));

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&cache.get("Thing_table", 1).unwrap(), &first));
        assert_eq!(cache.live_count(), 1);
    }

    #[test]
    fn dropped_proxies_are_reclaimed() {
        let db = Database::open_in_memory().unwrap();
        let cache = ProxyCache::new();
        drop(cache.insert(proxy(&db, 1)));

        assert!(cache.get("Thing_table", 1).is_none());
        assert_eq!(cache.live_count(), 0);
    }

    #[test]
    fn eviction() {
        let db = Database::open_in_memory().unwrap();
        let cache = ProxyCache::new();
        let a = cache.insert(proxy(&db, 1));
        let b = cache.insert(proxy(&db, 2));

        cache.evict("Thing_table", 1);
        assert!(cache.get("Thing_table", 1).is_none());
        assert!(cache.get("Thing_table", 2).is_some());

        cache.evict_table("Thing_table");
        assert!(cache.get("Thing_table", 2).is_none());

        let c = cache.insert(proxy(&db, 3));
        cache.clear();
        assert_eq!(cache.live_count(), 0);
        drop((a, b, c));
    }

    #[test]
    fn dead_entries_are_pruned() {
        let db = Database::open_in_memory().unwrap();
        let cache = ProxyCache::new();
        let keep = cache.insert(proxy(&db, 0));
        for id in 1..(PRUNE_THRESHOLD as i64) {
            drop(cache.insert(proxy(&db, id)));
        }
        let rows = cache.tables.read().get("Thing_table").map_or(0, HashMap::len);
        assert!(rows < PRUNE_THRESHOLD);
        drop(keep);
    }
}
