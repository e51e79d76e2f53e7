//! TableEditorLayer - Main Axum integration layer
//!
//! This module provides the main entry point for mounting the table API into
//! an Axum application.

use crate::api::create_api_router;
use crate::auth::{enforce_access, AccessGuard, AccessRules, Authenticator};
use crate::database::traits::DatabaseProvider;
use crate::identifier::TableVisibility;
use crate::pagination::ExportPolicy;
use crate::service::TableService;
use axum::{middleware, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[cfg(feature = "sqlite")]
use crate::database::sqlite::SqliteProvider;

#[cfg(feature = "postgres")]
use crate::database::postgres::PostgresProvider;

/// Main layer for integrating the table API into an Axum application
///
/// # Example
///
/// ```rust,no_run
/// use axum::Router;
/// use axum_table_editor::TableEditorLayer;
/// use sqlx::SqlitePool;
///
/// # async fn example() {
/// let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
/// let editor = TableEditorLayer::sqlite("/admin", pool).export_limit(Some(10_000));
/// let app = Router::new().merge(editor.into_router());
/// # }
/// ```
pub struct TableEditorLayer<DB: DatabaseProvider> {
    base_path: String,
    database: Arc<DB>,
    visibility: TableVisibility,
    export: ExportPolicy,
    access: Option<AccessGuard>,
}

impl<DB: DatabaseProvider> TableEditorLayer<DB> {
    /// Create a new table editor at the given base path
    ///
    /// # Arguments
    ///
    /// * `base_path` - The URL path the API is mounted under; routes live at
    ///   `{base_path}/api/*`, so `""` yields `/api/tables`
    /// * `database` - The database provider implementation
    pub fn new(base_path: impl Into<String>, database: DB) -> Self {
        Self {
            base_path: base_path.into(),
            database: Arc::new(database),
            visibility: TableVisibility::default(),
            export: ExportPolicy::unlimited(),
            access: None,
        }
    }

    /// Tables starting with `prefix` are neither listed nor reachable.
    /// `None` exposes every table.
    pub fn hidden_table_prefix(mut self, prefix: Option<String>) -> Self {
        self.visibility = TableVisibility::new(prefix);
        self
    }

    /// Cap the number of rows a single export may return
    pub fn export_limit(mut self, max_rows: Option<u64>) -> Self {
        self.export = ExportPolicy::new(max_rows);
        self
    }

    /// Require an authenticated role for reads and writes
    pub fn access_control(mut self, authenticator: Arc<dyn Authenticator>, rules: AccessRules) -> Self {
        self.access = Some(AccessGuard::new(authenticator, rules));
        self
    }

    /// Shared provider, e.g. for health checks in the embedding application
    pub fn database(&self) -> &Arc<DB> {
        &self.database
    }

    /// Convert into an Axum Router that can be merged
    ///
    /// This method consumes the layer and returns a Router that can be merged
    /// into your main application router.
    ///
    /// The returned router includes:
    /// - API endpoints at `{base_path}/api/*`
    /// - The access middleware, if configured
    /// - Request tracing and permissive CORS
    pub fn into_router(self) -> Router {
        let service = Arc::new(TableService::new(self.database, self.visibility, self.export));

        let mut api_router = create_api_router(service);
        if let Some(guard) = self.access {
            tracing::info!(rules = ?guard.rules(), "table API access control enabled");
            api_router = api_router.layer(middleware::from_fn_with_state(guard, enforce_access));
        }

        let api_path = format!("{}/api", self.base_path.trim_end_matches('/'));

        Router::new().nest(&api_path, api_router).layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
    }
}

#[cfg(feature = "sqlite")]
impl TableEditorLayer<SqliteProvider> {
    /// Create a new table editor for SQLite
    ///
    /// # Arguments
    ///
    /// * `base_path` - The URL path where the API will be mounted
    /// * `pool` - The SQLite connection pool
    pub fn sqlite(base_path: impl Into<String>, pool: sqlx::SqlitePool) -> Self {
        Self::new(base_path, SqliteProvider::new(pool))
    }
}

#[cfg(feature = "postgres")]
impl TableEditorLayer<PostgresProvider> {
    /// Create a new table editor for one PostgreSQL schema
    ///
    /// # Arguments
    ///
    /// * `base_path` - The URL path where the API will be mounted
    /// * `pool` - The PostgreSQL connection pool
    /// * `schema` - Schema whose tables are managed, usually `public`
    pub fn postgres(base_path: impl Into<String>, pool: sqlx::PgPool, schema: impl Into<String>) -> Self {
        Self::new(base_path, PostgresProvider::with_schema(pool, schema))
    }
}
