//! Schema and payload types for dynamic table access
//!
//! These types represent table information discovered at runtime and the JSON
//! payloads exchanged with the browser client.

use serde::{Deserialize, Serialize};

/// A single record keyed by column name, in catalog column order
pub type RecordRow = serde_json::Map<String, serde_json::Value>;

/// Information about a table (for listing)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    /// Table name
    pub name: String,
}

/// Information about a single column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,

    /// SQL data type as reported by the catalog (e.g., "integer", "TEXT", "VARCHAR(255)")
    pub data_type: String,

    /// Whether the column allows NULL values
    pub nullable: bool,

    /// Default value expression (if any)
    pub default_value: Option<String>,

    /// Maximum character length for bounded character types
    pub max_length: Option<i32>,

    /// 1-based position of the column in the table
    pub ordinal: i32,

    /// Whether this column is used as the row identifier for updates and deletes
    pub is_primary_key: bool,

    /// Set when the table has no primary key constraint and this column was
    /// picked by naming convention instead
    pub primary_key_inferred: bool,
}

/// Query parameters for browsing and exporting rows
///
/// `filters` is a JSON-encoded object mapping column names to substring
/// patterns. It is kept as a raw string here because malformed JSON must not
/// reject the request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQuery {
    /// Maximum number of rows to return
    pub limit: Option<i64>,

    /// Starting offset for pagination
    pub offset: Option<i64>,

    /// Zero-based page index, an alternative to `offset`
    pub page: Option<i64>,

    /// JSON object of column -> pattern
    pub filters: Option<String>,

    /// Column name to sort by
    pub sort_by: Option<String>,

    /// Sort order
    pub sort_order: Option<SortOrder>,
}

impl DataQuery {
    /// Requested ordering, if a sort column was given
    pub fn sort(&self) -> Option<Sort> {
        self.sort_by.as_ref().map(|column| Sort {
            column: column.clone(),
            order: self.sort_order.unwrap_or(SortOrder::Ascending),
        })
    }
}

/// Sort order for row queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    #[serde(alias = "asc")]
    Ascending,
    #[serde(alias = "desc")]
    Descending,
}

/// A requested ordering by an unvalidated column name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub column: String,
    pub order: SortOrder,
}

/// One page of rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    /// The rows returned
    pub rows: Vec<RecordRow>,

    /// Number of rows matching the filter (not the unfiltered table size)
    pub total: u64,

    /// Limit used for this query
    pub limit: u64,

    /// Current offset
    pub offset: u64,

    /// Zero-based index of the page starting at `offset`
    pub page: u64,

    /// Number of pages of `limit` rows needed to show `total`
    pub total_pages: u64,

    /// Whether there are more rows available
    pub has_more: bool,
}

/// Full filtered result set for bulk export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    /// Column names in display order
    pub columns: Vec<String>,

    /// Every row matching the filter
    pub data: Vec<RecordRow>,
}

/// Confirmation returned after deleting a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub message: String,

    /// The row as it was before deletion
    pub record: RecordRow,
}
