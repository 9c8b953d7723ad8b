//! # modeldb Core
//!
//! Embedded entity persistence over SQLite.
//!
//! This crate provides:
//! - Schema derivation from entity declarations, with cycle detection,
//!   dependency-ordered table creation and drift detection
//! - Identity-preserving entity handles backed by a weak proxy cache
//! - Persistent properties and collections that read and write through to
//!   the store
//! - A typed query builder that compiles to parameterized SQL
//!
//! ## Example
//!
//! ```rust,ignore
//! use modeldb_core::{model, Database, Entity};
//!
//! model! {
//!     /// A dish.
//!     pub struct Food {
//!         NAME => name: value(String),
//!         CALORIES => calories: value(f64),
//!     }
//! }
//!
//! let db = Database::open_in_memory()?;
//! db.create_table::<Food>()?;
//!
//! let rice = db.create::<Food>()?;
//! rice.name().set("Rice")?;
//! assert!(rice.is_same_instance(&db.select::<Food>(rice.id())?));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod config;
mod database;
mod dir;
mod entity;
mod error;
mod macros;
mod property;
mod query;
pub mod schema;
mod stats;
mod value;

pub use collection::Collection;
pub use config::Config;
pub use database::Database;
pub use dir::DatabaseDir;
pub use entity::{Attr, Entity, EntityProxy, ListAttr, RowIdentity};
pub use error::{CoreError, CoreResult};
pub use property::Property;
pub use query::{Compare, Junction, Where};
pub use stats::{DatabaseStats, StatsSnapshot};
pub use value::{PropertyValue, ScalarValue, ValueSite};

pub use modeldb_storage::{
    ColumnType, ExecutionContext, QueryResult, SqlValue, StorageDriver, StorageError,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
