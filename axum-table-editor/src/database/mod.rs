//! Database abstraction layer
//!
//! This module provides a database-agnostic interface for catalog discovery
//! and statement execution.

pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

// Re-export the main trait
pub use traits::{CatalogColumn, DatabaseError, DatabaseProvider};
