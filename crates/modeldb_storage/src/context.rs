//! Execution context guard.
//!
//! The embedded engine does not tolerate being driven from arbitrary threads,
//! so each driver is bound to an [`ExecutionContext`]: the set of threads
//! allowed to issue statements through it. Calls from any other thread fail
//! with [`StorageError::ContextViolation`] instead of silently succeeding.

use crate::error::{StorageError, StorageResult};
use std::thread::{self, Thread, ThreadId};

/// The threads permitted to use a connection.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    threads: Vec<(ThreadId, String)>,
}

impl ExecutionContext {
    /// A context owned by the calling thread.
    #[must_use]
    pub fn current() -> Self {
        Self::for_thread(&thread::current())
    }

    /// A context owned by the given thread.
    #[must_use]
    pub fn for_thread(owner: &Thread) -> Self {
        Self {
            threads: vec![(owner.id(), describe(owner))],
        }
    }

    /// Additionally authorizes `other`.
    #[must_use]
    pub fn with_thread(mut self, other: &Thread) -> Self {
        if !self.allows(other.id()) {
            self.threads.push((other.id(), describe(other)));
        }
        self
    }

    /// Returns true if `id` belongs to this context.
    #[must_use]
    pub fn allows(&self, id: ThreadId) -> bool {
        self.threads.iter().any(|(t, _)| *t == id)
    }

    /// Fails unless the calling thread belongs to this context.
    pub fn check(&self) -> StorageResult<()> {
        let current = thread::current();
        if self.allows(current.id()) {
            return Ok(());
        }
        Err(StorageError::ContextViolation {
            thread: describe(&current),
            expected: self.owners(),
        })
    }

    fn owners(&self) -> String {
        self.threads
            .iter()
            .map(|(_, name)| format!("'{name}'"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::current()
    }
}

fn describe(thread: &Thread) -> String {
    match thread.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", thread.id()),
    }
}
