//! REST API endpoints
//!
//! This module contains all API endpoint handlers for the table editor.

use axum::{
    routing::{get, put},
    Router,
};
use std::sync::Arc;

use crate::database::traits::DatabaseProvider;
use crate::service::TableService;

pub mod export;
pub mod rows;
pub mod tables;

// Re-export handlers for convenience
pub use export::export_rows_handler;
pub use rows::{create_row_handler, delete_row_handler, get_rows_handler, update_row_handler};
pub use tables::{get_table_schema_handler, list_tables_handler};

/// Create the API router with all endpoints
///
/// # Arguments
///
/// * `service` - Arc-wrapped table service
///
/// # Returns
///
/// An Axum Router configured with all API routes
pub fn create_api_router<DB: DatabaseProvider>(service: Arc<TableService<DB>>) -> Router {
    // Note: Axum 0.8 uses {param} syntax instead of :param
    Router::new()
        .route("/tables", get(list_tables_handler::<DB>))
        .route("/tables/{name}/schema", get(get_table_schema_handler::<DB>))
        .route(
            "/tables/{name}/data",
            get(get_rows_handler::<DB>).post(create_row_handler::<DB>),
        )
        .route(
            "/tables/{name}/data/{id}",
            put(update_row_handler::<DB>).delete(delete_row_handler::<DB>),
        )
        .route("/tables/{name}/export", get(export_rows_handler::<DB>))
        .with_state(service)
}
