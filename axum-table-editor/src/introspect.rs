//! Schema introspection
//!
//! Resolves a table name into its validated identity, its ordered columns and
//! the column used as the row key. Nothing is cached: every request sees the
//! catalog as it is now.

use crate::database::traits::{CatalogColumn, DatabaseError, DatabaseProvider};
use crate::identifier::{validate_table, ColumnSet, TableVisibility, ValidatedColumn, ValidatedTable};
use crate::schema::ColumnDescriptor;

/// Column used as the row key when a table has no primary key constraint
pub const CONVENTIONAL_PRIMARY_KEY: &str = "id";

/// The column identifying a row for updates and deletes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    column: ValidatedColumn,
    inferred: bool,
}

impl PrimaryKey {
    pub fn column(&self) -> &ValidatedColumn {
        &self.column
    }

    /// `true` when picked by naming convention rather than a constraint
    pub fn is_inferred(&self) -> bool {
        self.inferred
    }
}

/// A table confirmed by the catalog together with its live schema
#[derive(Debug, Clone)]
pub struct ResolvedTable {
    table: ValidatedTable,
    columns: Vec<CatalogColumn>,
    column_set: ColumnSet,
    primary_key: Option<PrimaryKey>,
}

impl ResolvedTable {
    pub fn table(&self) -> &ValidatedTable {
        &self.table
    }

    pub fn column_set(&self) -> &ColumnSet {
        &self.column_set
    }

    /// Column names in ordinal order
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    /// The row key, or `None` if there is neither a constraint nor an `id` column
    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        self.primary_key.as_ref()
    }

    /// The row key, for operations that cannot work without one
    pub fn require_primary_key(&self) -> Result<&PrimaryKey, DatabaseError> {
        self.primary_key.as_ref().ok_or_else(|| {
            DatabaseError::InvalidRequest(format!(
                "table {} has no primary key and no {} column",
                self.table.name(),
                CONVENTIONAL_PRIMARY_KEY
            ))
        })
    }

    /// Public column descriptors, in ordinal order
    pub fn descriptors(&self) -> Vec<ColumnDescriptor> {
        self.columns
            .iter()
            .map(|column| {
                let key = self
                    .primary_key
                    .as_ref()
                    .filter(|key| key.column.name() == column.name);
                ColumnDescriptor {
                    name: column.name.clone(),
                    data_type: column.data_type.clone(),
                    nullable: column.nullable,
                    default_value: column.default_value.clone(),
                    max_length: column.max_length,
                    ordinal: column.ordinal,
                    is_primary_key: key.is_some(),
                    primary_key_inferred: key.is_some_and(PrimaryKey::is_inferred),
                }
            })
            .collect()
    }
}

/// Ordered column metadata of a validated table
///
/// # Errors
///
/// `TableNotFound` if the catalog reports no columns (the table was dropped
/// after validation). Catalog failures propagate, never as an empty list.
pub async fn describe_table<DB>(
    database: &DB,
    table: &ValidatedTable,
) -> Result<Vec<CatalogColumn>, DatabaseError>
where
    DB: DatabaseProvider + ?Sized,
{
    let mut columns = database.table_columns(table).await?;
    if columns.is_empty() {
        return Err(DatabaseError::TableNotFound(table.name().to_string()));
    }
    columns.sort_by_key(|column| column.ordinal);
    Ok(columns)
}

/// The row key of a validated table
///
/// Uses the first primary key column (by key position) when a constraint
/// exists, and falls back to a column named [`CONVENTIONAL_PRIMARY_KEY`]
/// otherwise. The fallback is only used if that column really exists.
pub async fn primary_key_of<DB>(
    database: &DB,
    table: &ValidatedTable,
    columns: &ColumnSet,
) -> Result<Option<PrimaryKey>, DatabaseError>
where
    DB: DatabaseProvider + ?Sized,
{
    let key_columns = database.primary_key_columns(table).await?;

    if let Some(first) = key_columns.first() {
        if key_columns.len() > 1 {
            tracing::debug!(
                table = table.name(),
                columns = ?key_columns,
                "composite primary key, using first column as row key"
            );
        }
        let column = columns
            .get(first)
            .cloned()
            .ok_or_else(|| DatabaseError::UnknownColumn(first.clone()))?;
        return Ok(Some(PrimaryKey {
            column,
            inferred: false,
        }));
    }

    Ok(columns
        .get(CONVENTIONAL_PRIMARY_KEY)
        .cloned()
        .map(|column| PrimaryKey {
            column,
            inferred: true,
        }))
}

/// Validate `name` and load its schema
pub async fn resolve_table<DB>(
    database: &DB,
    visibility: &TableVisibility,
    name: &str,
) -> Result<ResolvedTable, DatabaseError>
where
    DB: DatabaseProvider + ?Sized,
{
    let table = validate_table(database, visibility, name).await?;
    let columns = describe_table(database, &table).await?;
    let column_set = ColumnSet::new(
        columns
            .iter()
            .map(|column| ValidatedColumn::new(column.name.clone(), column.storage_type.clone()))
            .collect(),
    );
    let primary_key = primary_key_of(database, &table, &column_set).await?;

    Ok(ResolvedTable {
        table,
        columns,
        column_set,
        primary_key,
    })
}
