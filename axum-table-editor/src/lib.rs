//! # axum-table-editor
//!
//! A generic data-access layer for browsing and editing the tables of a SQL
//! database over REST, easily integrable as an Axum layer.
//!
//! ## Features
//!
//! - Table and column names are checked against the live catalog before any
//!   statement is built; values are always bound parameters
//! - Paginated browsing with case-insensitive substring filters and sorting
//! - Full export of filtered rows, optionally capped
//! - Insert, update and delete by primary key (or a conventional `id` column)
//! - Optional role check through a pluggable [`auth::Authenticator`]
//! - Support for SQLite and PostgreSQL
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use axum_table_editor::TableEditorLayer;
//! use sqlx::SqlitePool;
//!
//! #[tokio::main]
//! async fn main() {
//!     let pool = SqlitePool::connect("sqlite::memory:")
//!         .await
//!         .unwrap();
//!
//!     // Serves /api/tables, /api/tables/{name}/data, ...
//!     let app = Router::new()
//!         .route("/", get(|| async { "Hello, World!" }))
//!         .merge(TableEditorLayer::sqlite("", pool).into_router());
//!
//!     // Serve the application...
//! }
//! ```

// Public modules
pub mod api;
pub mod auth;
pub mod database;
pub mod filter;
pub mod identifier;
pub mod introspect;
pub mod layer;
pub mod pagination;
pub mod schema;
pub mod service;
pub mod statement;

#[cfg(test)]
mod testing;

// Public exports
pub use auth::{AccessRules, Authenticator, CurrentUser, Role};
pub use identifier::{TableVisibility, ValidatedColumn, ValidatedTable};
pub use layer::TableEditorLayer;
pub use pagination::{ExportPolicy, PageRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use schema::{ColumnDescriptor, ExportResponse, PageResult, RecordRow, Sort, SortOrder, TableInfo};
pub use service::TableService;

// Re-export database providers
pub use database::traits::{DatabaseError, DatabaseProvider};

#[cfg(feature = "sqlite")]
pub use database::sqlite::SqliteProvider;

#[cfg(feature = "postgres")]
pub use database::postgres::PostgresProvider;
