//! SQLite database provider implementation

use crate::database::traits::{CatalogColumn, DatabaseError, DatabaseProvider};
use crate::identifier::ValidatedTable;
use crate::schema::{RecordRow, TableInfo};
use crate::statement::{BindValue, Dialect, Statement};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Column, Row, SqlitePool, TypeInfo, ValueRef};
use std::time::Instant;

/// Tables of the main database, excluding SQLite's internal ones
const USER_TABLES: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND substr(name, 1, 7) <> 'sqlite_'";

/// SQLite database provider
pub struct SqliteProvider {
    pool: SqlitePool,
}

impl SqliteProvider {
    /// Create a new SQLite provider
    ///
    /// # Arguments
    ///
    /// * `pool` - SQLite connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn bind_params<'q>(
        mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
        params: &'q [BindValue],
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        for param in params {
            query = match param {
                BindValue::Null => query.bind(None::<String>),
                BindValue::Bool(flag) => query.bind(*flag),
                BindValue::Int(integer) => query.bind(*integer),
                BindValue::Float(float) => query.bind(*float),
                BindValue::Text(text) => query.bind(text.as_str()),
            };
        }
        query
    }

    /// Convert a SQLite row to a JSON object, keeping column order
    fn row_to_json(row: &SqliteRow) -> Result<RecordRow, DatabaseError> {
        let mut map = RecordRow::new();

        for column in row.columns() {
            let value = Self::extract_column_value(row, column)?;
            map.insert(column.name().to_string(), value);
        }

        Ok(map)
    }

    /// Extract a column value from a SQLite row and convert to JSON
    ///
    /// SQLite is dynamically typed, so the storage class of the value itself
    /// decides the JSON type. The declared column type only matters for
    /// booleans, which SQLite stores as integers.
    fn extract_column_value(
        row: &SqliteRow,
        column: &sqlx::sqlite::SqliteColumn,
    ) -> Result<Value, DatabaseError> {
        let index = column.ordinal();
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }

        let storage_class = raw.type_info().name().to_string();
        let declared = column.type_info().name().to_ascii_uppercase();

        let value = match storage_class.as_str() {
            "INTEGER" => {
                let integer: i64 = row.try_get_unchecked(index)?;
                if declared == "BOOLEAN" || declared == "BOOL" {
                    Value::Bool(integer != 0)
                } else {
                    Value::Number(integer.into())
                }
            }
            "REAL" => {
                let float: f64 = row.try_get_unchecked(index)?;
                serde_json::Number::from_f64(float)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
            "BLOB" => {
                let bytes: Vec<u8> = row.try_get_unchecked(index)?;
                Value::String(format!("[BLOB: {} bytes]", bytes.len()))
            }
            _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
        };

        Ok(value)
    }
}

/// Length limit of a declared type such as `VARCHAR(255)`
fn declared_max_length(data_type: &str) -> Option<i32> {
    let upper = data_type.to_ascii_uppercase();
    if !upper.contains("CHAR") {
        return None;
    }
    let (_, rest) = upper.split_once('(')?;
    let (length, _) = rest.split_once(')')?;
    length.trim().parse().ok()
}

#[async_trait]
impl DatabaseProvider for SqliteProvider {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn namespace(&self) -> &str {
        "main"
    }

    async fn list_tables(&self) -> Result<Vec<TableInfo>, DatabaseError> {
        let query = format!("{} ORDER BY name", USER_TABLES);
        let names: Vec<String> = sqlx::query_scalar(&query).fetch_all(&self.pool).await?;

        Ok(names.into_iter().map(|name| TableInfo { name }).collect())
    }

    async fn find_table(&self, name: &str) -> Result<Vec<String>, DatabaseError> {
        let query = format!("{} AND name = ?", USER_TABLES);
        let names = sqlx::query_scalar(&query)
            .bind(name)
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    async fn table_columns(&self, table: &ValidatedTable) -> Result<Vec<CatalogColumn>, DatabaseError> {
        let rows = sqlx::query(
            "SELECT cid, name, type, \"notnull\", dflt_value FROM pragma_table_info(?)",
        )
        .bind(table.name())
        .fetch_all(&self.pool)
        .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let column_id: i64 = row.try_get("cid")?;
            let data_type: String = row.try_get("type")?;
            let not_null: i64 = row.try_get("notnull")?;

            columns.push(CatalogColumn {
                name: row.try_get("name")?,
                max_length: declared_max_length(&data_type),
                data_type,
                nullable: not_null == 0,
                default_value: row.try_get("dflt_value")?,
                ordinal: column_id as i32 + 1,
                storage_type: None,
            });
        }

        Ok(columns)
    }

    async fn primary_key_columns(&self, table: &ValidatedTable) -> Result<Vec<String>, DatabaseError> {
        let names = sqlx::query_scalar("SELECT name FROM pragma_table_info(?) WHERE pk > 0 ORDER BY pk")
            .bind(table.name())
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    async fn fetch_rows(&self, statement: &Statement) -> Result<Vec<RecordRow>, DatabaseError> {
        let start = Instant::now();
        let rows = Self::bind_params(sqlx::query(statement.sql()), statement.params())
            .fetch_all(&self.pool)
            .await?;
        tracing::debug!(
            sql = statement.sql(),
            rows = rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "sqlite statement executed"
        );

        rows.iter().map(Self::row_to_json).collect()
    }

    async fn fetch_count(&self, statement: &Statement) -> Result<u64, DatabaseError> {
        let start = Instant::now();
        let row = Self::bind_params(sqlx::query(statement.sql()), statement.params())
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get(0)?;
        tracing::debug!(
            sql = statement.sql(),
            count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "sqlite count executed"
        );

        Ok(count.max(0) as u64)
    }
}
