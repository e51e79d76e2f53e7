//! PostgreSQL database provider implementation

use crate::database::traits::{CatalogColumn, DatabaseError, DatabaseProvider};
use crate::identifier::ValidatedTable;
use crate::schema::{RecordRow, TableInfo};
use crate::statement::{BindValue, Dialect, Statement};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;
use sqlx::{PgPool, Row};
use std::time::Instant;

/// PostgreSQL database provider
///
/// Scoped to one schema, `public` unless configured otherwise.
pub struct PostgresProvider {
    pool: PgPool,
    schema: String,
}

impl PostgresProvider {
    /// Create a new PostgreSQL provider for the `public` schema
    ///
    /// # Arguments
    ///
    /// * `pool` - PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self::with_schema(pool, "public")
    }

    /// Create a provider managing the tables of `schema`
    pub fn with_schema(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn bind_params<'q>(
        mut query: Query<'q, Postgres, PgArguments>,
        params: &'q [BindValue],
    ) -> Query<'q, Postgres, PgArguments> {
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
}

/// Row statements project each row as one JSON object named `row`, so column
/// types are converted by the server rather than decoded type by type here
fn into_record(value: Value) -> Result<RecordRow, DatabaseError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DatabaseError::Query(format!(
            "expected a JSON object per row, got {}",
            other
        ))),
    }
}

#[async_trait]
impl DatabaseProvider for PostgresProvider {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn namespace(&self) -> &str {
        &self.schema
    }

    async fn list_tables(&self) -> Result<Vec<TableInfo>, DatabaseError> {
        let query = r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = $1
              AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let names: Vec<String> = sqlx::query_scalar(query)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?;

        Ok(names.into_iter().map(|name| TableInfo { name }).collect())
    }

    async fn find_table(&self, name: &str) -> Result<Vec<String>, DatabaseError> {
        let query = r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = $1
              AND table_type = 'BASE TABLE'
              AND table_name = $2
        "#;

        let names = sqlx::query_scalar(query)
            .bind(&self.schema)
            .bind(name)
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    async fn table_columns(&self, table: &ValidatedTable) -> Result<Vec<CatalogColumn>, DatabaseError> {
        let query = r#"
            SELECT
                column_name::text AS column_name,
                data_type::text AS data_type,
                is_nullable::text AS is_nullable,
                column_default::text AS column_default,
                character_maximum_length::int4 AS character_maximum_length,
                ordinal_position::int4 AS ordinal_position,
                udt_schema::text AS udt_schema,
                udt_name::text AS udt_name
            FROM information_schema.columns
            WHERE table_schema = $1
              AND table_name = $2
            ORDER BY ordinal_position
        "#;

        let rows = sqlx::query(query)
            .bind(table.namespace())
            .bind(table.name())
            .fetch_all(&self.pool)
            .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let is_nullable: String = row.try_get("is_nullable")?;
            let udt_schema: String = row.try_get("udt_schema")?;
            let udt_name: String = row.try_get("udt_name")?;

            columns.push(CatalogColumn {
                name: row.try_get("column_name")?,
                data_type: row.try_get("data_type")?,
                nullable: is_nullable == "YES",
                default_value: row.try_get("column_default")?,
                max_length: row.try_get("character_maximum_length")?,
                ordinal: row.try_get("ordinal_position")?,
                storage_type: Some((udt_schema, udt_name)),
            });
        }

        Ok(columns)
    }

    async fn primary_key_columns(&self, table: &ValidatedTable) -> Result<Vec<String>, DatabaseError> {
        let query = r#"
            SELECT kcu.column_name::text
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
              AND tc.table_schema = kcu.table_schema
              AND tc.table_name = kcu.table_name
            WHERE tc.table_schema = $1
              AND tc.table_name = $2
              AND tc.constraint_type = 'PRIMARY KEY'
            ORDER BY kcu.ordinal_position
        "#;

        let names = sqlx::query_scalar(query)
            .bind(table.namespace())
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
            "postgres statement executed"
        );

        rows.iter()
            .map(|row| into_record(row.try_get::<Value, _>("row")?))
            .collect()
    }

    async fn fetch_count(&self, statement: &Statement) -> Result<u64, DatabaseError> {
        let start = Instant::now();
        let row = Self::bind_params(sqlx::query(statement.sql()), statement.params())
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("count")?;
        tracing::debug!(
            sql = statement.sql(),
            count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "postgres count executed"
        );

        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_record_keeps_column_order() {
        let record = into_record(json!({ "id": 7, "name": "Widget", "price": null })).unwrap();
        let keys: Vec<&str> = record.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "name", "price"]);
    }

    #[test]
    fn test_into_record_rejects_non_objects() {
        assert!(matches!(
            into_record(json!([1, 2])),
            Err(DatabaseError::Query(_))
        ));
    }
}
