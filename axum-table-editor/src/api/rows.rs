//! Row endpoints: paginated browsing, create, update and delete

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;

use crate::database::traits::DatabaseProvider;
use crate::filter::parse_filters;
use crate::pagination::PageRequest;
use crate::schema::{DataQuery, DeleteResponse, RecordRow};
use crate::service::TableService;

/// Handler for GET /tables/{name}/data
///
/// Fetches one page of rows with filtering and optional sorting.
///
/// Query parameters:
/// - limit: Maximum rows to return (default: 30, max: 500)
/// - offset: Starting row offset (default: 0)
/// - page: Zero-based page index of `limit` rows, instead of offset
/// - filters: JSON object of column -> case-insensitive substring; malformed
///   JSON is treated as no filters
/// - sortBy: Column name to sort by (optional, defaults to the primary key)
/// - sortOrder: "ascending" or "descending" (optional)
///
/// Response:
/// ```json
/// {
///   "rows": [{ "id": 1, "name": "Widget", "price": 9.99 }],
///   "total": 1,
///   "limit": 30,
///   "offset": 0,
///   "page": 0,
///   "totalPages": 1,
///   "hasMore": false
/// }
/// ```
pub async fn get_rows_handler<DB: DatabaseProvider>(
    State(service): State<Arc<TableService<DB>>>,
    Path(table_name): Path<String>,
    Query(query): Query<DataQuery>,
) -> Response {
    let page = match PageRequest::from_query(query.limit, query.offset, query.page) {
        Ok(page) => page,
        Err(error) => return error.into_response(),
    };
    let filters = parse_filters(query.filters.as_deref());
    let sort = query.sort();

    match service.list(&table_name, page, &filters, sort.as_ref()).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(error) => {
            tracing::warn!(table = %table_name, %error, "failed to get rows");
            error.into_response()
        }
    }
}

/// Handler for POST /tables/{name}/data
///
/// Inserts the JSON body as a new row. Every key must be a column of the
/// table. Responds with 201 and the row as stored, including values the
/// database filled in.
pub async fn create_row_handler<DB: DatabaseProvider>(
    State(service): State<Arc<TableService<DB>>>,
    Path(table_name): Path<String>,
    Json(record): Json<RecordRow>,
) -> Response {
    match service.insert(&table_name, record).await {
        Ok(row) => (StatusCode::CREATED, Json(row)).into_response(),
        Err(error) => {
            tracing::warn!(table = %table_name, %error, "failed to create record");
            error.into_response()
        }
    }
}

/// Handler for PUT /tables/{name}/data/{id}
///
/// Updates the given columns of the row whose primary key is `id`.
pub async fn update_row_handler<DB: DatabaseProvider>(
    State(service): State<Arc<TableService<DB>>>,
    Path((table_name, id)): Path<(String, String)>,
    Json(record): Json<RecordRow>,
) -> Response {
    match service.update(&table_name, &id, record).await {
        Ok(row) => (StatusCode::OK, Json(row)).into_response(),
        Err(error) => {
            tracing::warn!(table = %table_name, id = %id, %error, "failed to update record");
            error.into_response()
        }
    }
}

/// Handler for DELETE /tables/{name}/data/{id}
pub async fn delete_row_handler<DB: DatabaseProvider>(
    State(service): State<Arc<TableService<DB>>>,
    Path((table_name, id)): Path<(String, String)>,
) -> Response {
    match service.delete_one(&table_name, &id).await {
        Ok(record) => (
            StatusCode::OK,
            Json(DeleteResponse {
                message: "Record deleted successfully".to_string(),
                record,
            }),
        )
            .into_response(),
        Err(error) => {
            tracing::warn!(table = %table_name, id = %id, %error, "failed to delete record");
            error.into_response()
        }
    }
}
