//! Database provider trait
//!
//! This trait defines the catalog and execution capabilities every database
//! backend must provide. Statement text is never built here: providers answer
//! catalog lookups with bound parameters and execute statements produced by
//! [`crate::statement`].

use crate::identifier::ValidatedTable;
use crate::schema::{RecordRow, TableInfo};
use crate::statement::{Dialect, Statement};
use async_trait::async_trait;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use sqlx::error::ErrorKind;
use thiserror::Error;

/// Column metadata as reported by the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogColumn {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub max_length: Option<i32>,

    /// 1-based ordinal position
    pub ordinal: i32,

    /// Storage type as `(schema, type name)`, for backends that need explicit
    /// parameter casts
    pub storage_type: Option<(String, String)>,
}

/// Database provider trait for catalog discovery and statement execution
///
/// Implementations are scoped to a single namespace (a PostgreSQL schema, the
/// SQLite `main` database). Tables outside it are invisible.
#[async_trait]
pub trait DatabaseProvider: Send + Sync + 'static {
    /// SQL dialect used when building statements for this backend
    fn dialect(&self) -> Dialect;

    /// The namespace every table lives in
    fn namespace(&self) -> &str;

    /// List all user tables in the namespace, ordered by name
    async fn list_tables(&self) -> Result<Vec<TableInfo>, DatabaseError>;

    /// Look up a table by exact name
    ///
    /// # Returns
    ///
    /// Every catalog entry matching `name`; callers accept exactly one
    async fn find_table(&self, name: &str) -> Result<Vec<String>, DatabaseError>;

    /// Column metadata for a table, in any order
    async fn table_columns(&self, table: &ValidatedTable) -> Result<Vec<CatalogColumn>, DatabaseError>;

    /// Primary key column names in key order (empty if there is no constraint)
    async fn primary_key_columns(&self, table: &ValidatedTable) -> Result<Vec<String>, DatabaseError>;

    /// Execute a statement returning table rows
    async fn fetch_rows(&self, statement: &Statement) -> Result<Vec<RecordRow>, DatabaseError>;

    /// Execute a statement returning a single count
    async fn fetch_count(&self, statement: &Statement) -> Result<u64, DatabaseError>;
}

/// Seconds a client should wait before retrying an `Unavailable` response
const RETRY_AFTER_SECONDS: &str = "1";

/// Database error type
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Table not found in the managed namespace
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// No row with the given primary key
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Column not present in the live schema
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Unique constraint violation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Catalog or storage unreachable, or the pool is exhausted
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    /// Malformed request (bad pagination bounds, empty update, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Export would exceed the configured cap
    #[error("Result set too large (max {0} rows)")]
    ExportTooLarge(u64),

    /// Generic database error
    #[error("Database error: {0}")]
    Query(String),
}

impl DatabaseError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            DatabaseError::TableNotFound(_) | DatabaseError::RecordNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            DatabaseError::UnknownColumn(_) | DatabaseError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            DatabaseError::Conflict(_) => StatusCode::CONFLICT,
            DatabaseError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DatabaseError::ExportTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            DatabaseError::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to clients
    ///
    /// Driver messages and statement text stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            DatabaseError::Conflict(_) => {
                "A record with the same unique value already exists".to_string()
            }
            DatabaseError::Unavailable(_) => {
                "Database is temporarily unavailable, please retry".to_string()
            }
            DatabaseError::Query(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether retrying the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, DatabaseError::Unavailable(_))
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_) => DatabaseError::Unavailable(error.to_string()),
            sqlx::Error::Database(database_error) => match database_error.kind() {
                ErrorKind::UniqueViolation => {
                    DatabaseError::Conflict(database_error.message().to_string())
                }
                ErrorKind::NotNullViolation => DatabaseError::InvalidRequest(
                    "record is missing a required column".to_string(),
                ),
                ErrorKind::ForeignKeyViolation => DatabaseError::InvalidRequest(
                    "record references a row that does not exist".to_string(),
                ),
                ErrorKind::CheckViolation => DatabaseError::InvalidRequest(
                    "record violates a check constraint".to_string(),
                ),
                // SQLSTATE class 22: a value could not be converted to the column type
                _ if database_error
                    .code()
                    .is_some_and(|code| code.len() == 5 && code.starts_with("22")) =>
                {
                    DatabaseError::InvalidRequest(
                        "a value does not match its column type".to_string(),
                    )
                }
                _ => DatabaseError::Query(error.to_string()),
            },
            _ => DatabaseError::Query(error.to_string()),
        }
    }
}

impl IntoResponse for DatabaseError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let mut response = (
            status,
            Json(serde_json::json!({
                "error": self.public_message()
            })),
        )
            .into_response();

        if self.is_retryable() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECONDS));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            DatabaseError::TableNotFound("items".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DatabaseError::UnknownColumn("colour".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            DatabaseError::Conflict("dup".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            DatabaseError::ExportTooLarge(10).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            DatabaseError::Unavailable("timeout".to_string()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_public_message_hides_driver_text() {
        let error = DatabaseError::Query("near \"SELEC\": syntax error".to_string());
        assert_eq!(error.public_message(), "Internal server error");

        let error = DatabaseError::Conflict("UNIQUE constraint failed: items.name".to_string());
        assert!(!error.public_message().contains("items.name"));

        let error = DatabaseError::RecordNotFound("42".to_string());
        assert_eq!(error.public_message(), "Record not found: 42");
    }

    #[test]
    fn test_pool_errors_are_retryable() {
        let error = DatabaseError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(error, DatabaseError::Unavailable(_)));
        assert!(error.is_retryable());
        assert!(!DatabaseError::from(sqlx::Error::RowNotFound).is_retryable());
    }

    #[test]
    fn test_retry_after_only_when_retryable() {
        let response = DatabaseError::Unavailable("pool timed out".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], RETRY_AFTER_SECONDS);

        let response = DatabaseError::Conflict("dup".to_string()).into_response();
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
    }
}
