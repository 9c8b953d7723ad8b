//! Database statistics.
//!
//! Counters for the statements a database issues and for its proxy cache.
//!
//! # Usage
//!
//! ```rust,ignore
//! let db = Database::open_in_memory()?;
//! let food = db.create::<Food>()?;
//! food.name().get()?;
//!
//! let stats = db.stats();
//! println!("Queries: {}", stats.queries);
//! println!("Cache hits: {}", stats.cache_hits);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Database statistics.
///
/// All counters are atomic and monotonically increasing.
#[derive(Debug, Default)]
pub struct DatabaseStats {
    // Statement counters
    queries: AtomicU64,
    updates: AtomicU64,
    executes: AtomicU64,

    // Proxy cache counters
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,

    // Row counters
    rows_created: AtomicU64,
    rows_deleted: AtomicU64,
}

impl DatabaseStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_execute(&self) {
        self.executes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_create(&self) {
        self.rows_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.rows_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of queries issued.
    pub fn queries(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    /// Returns the number of insert, update and delete statements issued.
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    /// Returns the number of unparameterized statement batches executed.
    pub fn executes(&self) -> u64 {
        self.executes.load(Ordering::Relaxed)
    }

    /// Returns how many lookups were answered by a live proxy.
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    /// Returns how many lookups had to build a new proxy.
    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Returns the number of rows created.
    pub fn rows_created(&self) -> u64 {
        self.rows_created.load(Ordering::Relaxed)
    }

    /// Returns the number of rows deleted.
    pub fn rows_deleted(&self) -> u64 {
        self.rows_deleted.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all stats.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            queries: self.queries(),
            updates: self.updates(),
            executes: self.executes(),
            cache_hits: self.cache_hits(),
            cache_misses: self.cache_misses(),
            rows_created: self.rows_created(),
            rows_deleted: self.rows_deleted(),
        }
    }
}

/// A point-in-time snapshot of database statistics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Queries issued.
    pub queries: u64,
    /// Insert, update and delete statements issued.
    pub updates: u64,
    /// Statement batches executed.
    pub executes: u64,
    /// Proxy cache hits.
    pub cache_hits: u64,
    /// Proxy cache misses.
    pub cache_misses: u64,
    /// Rows created.
    pub rows_created: u64,
    /// Rows deleted.
    pub rows_deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let stats = DatabaseStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn snapshot() {
        let stats = DatabaseStats::new();
        stats.record_query();
        stats.record_query();
        stats.record_update();
        stats.record_cache_hit();
        stats.record_cache_miss();
        stats.record_create();

        let snap = stats.snapshot();
        assert_eq!(snap.queries, 2);
        assert_eq!(snap.updates, 1);
        assert_eq!(snap.executes, 0);
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.cache_misses, 1);
        assert_eq!(snap.rows_created, 1);
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(DatabaseStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..100 {
                        s.record_cache_hit();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stats.cache_hits(), 800);
    }
}
