//! # modeldb Testkit
//!
//! Test utilities for modeldb.
//!
//! This crate provides:
//! - Test fixtures and database helpers
//! - A set of sample entity models covering every attribute kind
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use modeldb_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_database() {
//!     let db = TestDatabase::with_models();
//!     let rice = db.create::<Food>().unwrap();
//!     rice.name().set("Rice").unwrap();
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod models;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::models::*;
    pub use modeldb_core::{Database, Entity};
}

pub use fixtures::*;
pub use generators::*;
pub use models::*;
