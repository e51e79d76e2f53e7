//! Bulk export endpoint

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

use crate::database::traits::DatabaseProvider;
use crate::filter::parse_filters;
use crate::schema::DataQuery;
use crate::service::TableService;

/// Handler for GET /tables/{name}/export
///
/// Returns every row matching `filters`, with no pagination. `limit` and
/// `offset` are ignored. If the server caps export size, exceeding the cap
/// answers 413 rather than truncating.
///
/// Response:
/// ```json
/// {
///   "columns": ["id", "name", "price"],
///   "data": [{ "id": 1, "name": "Widget", "price": 9.99 }]
/// }
/// ```
pub async fn export_rows_handler<DB: DatabaseProvider>(
    State(service): State<Arc<TableService<DB>>>,
    Path(table_name): Path<String>,
    Query(query): Query<DataQuery>,
) -> Response {
    let filters = parse_filters(query.filters.as_deref());
    let sort = query.sort();

    match service.export_all(&table_name, &filters, sort.as_ref()).await {
        Ok(export) => (StatusCode::OK, Json(export)).into_response(),
        Err(error) => {
            tracing::warn!(table = %table_name, %error, "failed to export rows");
            error.into_response()
        }
    }
}
