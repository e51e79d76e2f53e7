//! In-memory catalog stub for unit tests
//!
//! Serves catalog lookups from a fixed table list and records the text of
//! every statement it is asked to execute.

use crate::database::traits::{CatalogColumn, DatabaseError, DatabaseProvider};
use crate::identifier::ValidatedTable;
use crate::schema::{RecordRow, TableInfo};
use crate::statement::{Dialect, Statement};
use async_trait::async_trait;
use std::sync::Mutex;

pub(crate) struct StubTable {
    pub name: String,
    pub columns: Vec<CatalogColumn>,
    pub primary_key: Vec<String>,
}

impl StubTable {
    pub fn new(name: &str, columns: &[&str], primary_key: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns
                .iter()
                .enumerate()
                .map(|(index, column)| catalog_column(column, "TEXT", index as i32 + 1))
                .collect(),
            primary_key: primary_key.iter().map(|column| column.to_string()).collect(),
        }
    }
}

pub(crate) fn catalog_column(name: &str, data_type: &str, ordinal: i32) -> CatalogColumn {
    CatalogColumn {
        name: name.to_string(),
        data_type: data_type.to_string(),
        nullable: true,
        default_value: None,
        max_length: None,
        ordinal,
        storage_type: None,
    }
}

/// `items (id INTEGER PRIMARY KEY, name TEXT, price REAL)`
pub(crate) fn items_table() -> StubTable {
    StubTable {
        name: "items".to_string(),
        columns: vec![
            catalog_column("id", "INTEGER", 1),
            catalog_column("name", "TEXT", 2),
            catalog_column("price", "REAL", 3),
        ],
        primary_key: vec!["id".to_string()],
    }
}

pub(crate) struct RecordingProvider {
    tables: Vec<StubTable>,
    rows: Vec<RecordRow>,
    count: u64,
    executed: Mutex<Vec<String>>,
}

impl RecordingProvider {
    pub fn new(tables: Vec<StubTable>) -> Self {
        Self {
            tables,
            rows: Vec::new(),
            count: 0,
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Rows returned by every row-producing statement
    pub fn with_rows(mut self, rows: Vec<RecordRow>) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    /// SQL text of every executed statement, in order
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    fn record(&self, statement: &Statement) {
        self.executed
            .lock()
            .unwrap()
            .push(statement.sql().to_string());
    }

    fn table(&self, table: &ValidatedTable) -> Option<&StubTable> {
        self.tables.iter().find(|stub| stub.name == table.name())
    }
}

#[async_trait]
impl DatabaseProvider for RecordingProvider {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn namespace(&self) -> &str {
        "main"
    }

    async fn list_tables(&self) -> Result<Vec<TableInfo>, DatabaseError> {
        let mut names: Vec<String> = self.tables.iter().map(|table| table.name.clone()).collect();
        names.sort();
        Ok(names.into_iter().map(|name| TableInfo { name }).collect())
    }

    async fn find_table(&self, name: &str) -> Result<Vec<String>, DatabaseError> {
        Ok(self
            .tables
            .iter()
            .filter(|table| table.name == name)
            .map(|table| table.name.clone())
            .collect())
    }

    async fn table_columns(&self, table: &ValidatedTable) -> Result<Vec<CatalogColumn>, DatabaseError> {
        Ok(self
            .table(table)
            .map(|stub| stub.columns.clone())
            .unwrap_or_default())
    }

    async fn primary_key_columns(&self, table: &ValidatedTable) -> Result<Vec<String>, DatabaseError> {
        Ok(self
            .table(table)
            .map(|stub| stub.primary_key.clone())
            .unwrap_or_default())
    }

    async fn fetch_rows(&self, statement: &Statement) -> Result<Vec<RecordRow>, DatabaseError> {
        self.record(statement);
        Ok(self.rows.clone())
    }

    async fn fetch_count(&self, statement: &Statement) -> Result<u64, DatabaseError> {
        self.record(statement);
        Ok(self.count)
    }
}
