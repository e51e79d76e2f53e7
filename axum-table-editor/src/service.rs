//! Table operations over a database provider
//!
//! Every operation resolves the table against the live catalog first, then
//! builds its statement from validated identifiers only, with every literal
//! bound as a parameter. A name that fails validation never reaches a
//! statement.

use crate::database::traits::{DatabaseError, DatabaseProvider};
use crate::filter::{compile, FilterSpec};
use crate::identifier::{TableVisibility, ValidatedColumn};
use crate::introspect::{resolve_table, ResolvedTable};
use crate::pagination::{ExportPolicy, PageRequest};
use crate::schema::{ColumnDescriptor, ExportResponse, PageResult, RecordRow, Sort, SortOrder, TableInfo};
use crate::statement::{self, BindValue, OrderBy};
use std::sync::Arc;

/// Generic table browser and editor
pub struct TableService<DB: DatabaseProvider> {
    database: Arc<DB>,
    visibility: TableVisibility,
    export: ExportPolicy,
}

impl<DB: DatabaseProvider> TableService<DB> {
    pub fn new(database: Arc<DB>, visibility: TableVisibility, export: ExportPolicy) -> Self {
        Self {
            database,
            visibility,
            export,
        }
    }

    pub fn database(&self) -> &Arc<DB> {
        &self.database
    }

    async fn resolve(&self, name: &str) -> Result<ResolvedTable, DatabaseError> {
        resolve_table(self.database.as_ref(), &self.visibility, name).await
    }

    /// Visible tables of the namespace, ordered by name
    pub async fn list_tables(&self) -> Result<Vec<TableInfo>, DatabaseError> {
        let tables = self.database.list_tables().await?;
        Ok(tables
            .into_iter()
            .filter(|table| self.visibility.is_visible(&table.name))
            .collect())
    }

    /// Ordered column descriptors of a table
    pub async fn describe(&self, name: &str) -> Result<Vec<ColumnDescriptor>, DatabaseError> {
        Ok(self.resolve(name).await?.descriptors())
    }

    /// One page of filtered rows plus the filtered total
    ///
    /// The page and the count are two statements built from the same compiled
    /// filter. They are not run in one transaction.
    pub async fn list(
        &self,
        name: &str,
        page: PageRequest,
        filters: &FilterSpec,
        sort: Option<&Sort>,
    ) -> Result<PageResult, DatabaseError> {
        let resolved = self.resolve(name).await?;
        let filter = compile(resolved.column_set(), filters);
        let order = Self::ordering(&resolved, sort)?;
        let dialect = self.database.dialect();
        tracing::debug!(
            table = name,
            filtered = ?filter.columns().collect::<Vec<_>>(),
            page = page.page_index(),
            "listing rows"
        );

        let select = statement::select_page(dialect, resolved.table(), &filter, order.as_ref(), &page);
        let rows = self.database.fetch_rows(&select).await?;

        let count = statement::count(dialect, resolved.table(), &filter);
        let total = self.database.fetch_count(&count).await?;

        Ok(PageResult::new(rows, total, &page))
    }

    /// Every filtered row, without pagination
    ///
    /// # Errors
    ///
    /// `ExportTooLarge` if an export cap is configured and exceeded.
    pub async fn export_all(
        &self,
        name: &str,
        filters: &FilterSpec,
        sort: Option<&Sort>,
    ) -> Result<ExportResponse, DatabaseError> {
        let resolved = self.resolve(name).await?;
        let filter = compile(resolved.column_set(), filters);
        let order = Self::ordering(&resolved, sort)?;

        let select = statement::select_all(
            self.database.dialect(),
            resolved.table(),
            &filter,
            order.as_ref(),
            self.export.fetch_limit(),
        );
        let rows = self.database.fetch_rows(&select).await?;
        self.export.check(rows.len())?;

        tracing::debug!(table = name, rows = rows.len(), "exported rows");
        Ok(ExportResponse {
            columns: resolved.column_names(),
            data: rows,
        })
    }

    /// Insert a record and return it as persisted
    ///
    /// Keys must all be columns of the table.
    pub async fn insert(&self, name: &str, record: RecordRow) -> Result<RecordRow, DatabaseError> {
        let resolved = self.resolve(name).await?;
        let values = Self::bind_record(&resolved, &record)?;

        let insert = statement::insert(self.database.dialect(), resolved.table(), values);
        let row = self
            .database
            .fetch_rows(&insert)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::Query(format!("insert into {} returned no row", name)))?;

        tracing::info!(table = name, "record created");
        Ok(row)
    }

    /// Update the record with primary key `id` and return it as persisted
    pub async fn update(&self, name: &str, id: &str, record: RecordRow) -> Result<RecordRow, DatabaseError> {
        let resolved = self.resolve(name).await?;
        if record.is_empty() {
            return Err(DatabaseError::InvalidRequest("no columns to update".to_string()));
        }

        let key = resolved.require_primary_key()?.column().clone();
        let values = Self::bind_record(&resolved, &record)?;

        let update = statement::update(
            self.database.dialect(),
            resolved.table(),
            values,
            &key,
            BindValue::from_path_id(id),
        );
        let row = self
            .database
            .fetch_rows(&update)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::RecordNotFound(id.to_string()))?;

        tracing::info!(table = name, id, "record updated");
        Ok(row)
    }

    /// Delete the record with primary key `id` and return it
    pub async fn delete_one(&self, name: &str, id: &str) -> Result<RecordRow, DatabaseError> {
        let resolved = self.resolve(name).await?;
        let key = resolved.require_primary_key()?.column().clone();

        let delete = statement::delete(
            self.database.dialect(),
            resolved.table(),
            &key,
            BindValue::from_path_id(id),
        );
        let row = self
            .database
            .fetch_rows(&delete)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::RecordNotFound(id.to_string()))?;

        tracing::info!(table = name, id, "record deleted");
        Ok(row)
    }

    /// Pair every record value with its validated column
    fn bind_record(
        resolved: &ResolvedTable,
        record: &RecordRow,
    ) -> Result<Vec<(ValidatedColumn, BindValue)>, DatabaseError> {
        let columns = resolved
            .column_set()
            .validate(record.keys().map(String::as_str))?;
        Ok(columns
            .into_iter()
            .zip(record.values().map(BindValue::from_json))
            .collect())
    }

    /// Requested ordering, else the row key so that pages are stable
    fn ordering(resolved: &ResolvedTable, sort: Option<&Sort>) -> Result<Option<OrderBy>, DatabaseError> {
        match sort {
            Some(sort) => {
                let column = resolved
                    .column_set()
                    .get(&sort.column)
                    .cloned()
                    .ok_or_else(|| DatabaseError::UnknownColumn(sort.column.clone()))?;
                Ok(Some(OrderBy {
                    column,
                    descending: sort.order == SortOrder::Descending,
                }))
            }
            None => Ok(resolved.primary_key().map(|key| OrderBy {
                column: key.column().clone(),
                descending: false,
            })),
        }
    }
}
