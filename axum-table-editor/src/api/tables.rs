//! Table listing and schema endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

use crate::database::traits::DatabaseProvider;
use crate::service::TableService;

/// Handler for GET /tables
///
/// Returns every visible table of the managed namespace.
///
/// Response:
/// ```json
/// [{ "name": "items" }, { "name": "orders" }]
/// ```
pub async fn list_tables_handler<DB: DatabaseProvider>(
    State(service): State<Arc<TableService<DB>>>,
) -> Response {
    match service.list_tables().await {
        Ok(tables) => (StatusCode::OK, Json(tables)).into_response(),
        Err(error) => {
            tracing::warn!(%error, "failed to list tables");
            error.into_response()
        }
    }
}

/// Handler for GET /tables/{name}/schema
///
/// Returns the table's columns in ordinal order. The row key column is
/// flagged with `isPrimaryKey`, and with `primaryKeyInferred` when the table
/// has no primary key constraint.
///
/// # Arguments
///
/// * `service` - Table service from state
/// * `table_name` - Name of the table to describe
pub async fn get_table_schema_handler<DB: DatabaseProvider>(
    State(service): State<Arc<TableService<DB>>>,
    Path(table_name): Path<String>,
) -> Response {
    match service.describe(&table_name).await {
        Ok(columns) => (StatusCode::OK, Json(columns)).into_response(),
        Err(error) => {
            tracing::warn!(table = %table_name, %error, "failed to get table schema");
            error.into_response()
        }
    }
}
