//! Catalog-backed identifier validation
//!
//! Table and column names cannot be passed as bound parameters, so they are
//! spliced into statement text. The only way to get a name into a statement is
//! through [`ValidatedTable`] and [`ValidatedColumn`], and values of those types
//! are only created from catalog lookups in this crate. The catalog is the
//! single source of truth for what a legal identifier is; there is no regex
//! filtering.

use crate::database::traits::{DatabaseError, DatabaseProvider};

/// Prefix of tables hidden from the browser unless configured otherwise
pub const DEFAULT_HIDDEN_PREFIX: &str = "z_";

/// A table name confirmed present in the managed namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTable {
    namespace: String,
    name: String,
}

impl ValidatedTable {
    pub(crate) fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A column name confirmed present in a freshly introspected table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedColumn {
    name: String,
    storage_type: Option<(String, String)>,
}

impl ValidatedColumn {
    pub(crate) fn new(name: impl Into<String>, storage_type: Option<(String, String)>) -> Self {
        Self {
            name: name.into(),
            storage_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Catalog storage type as `(schema, type name)`, when the backend reports one
    pub(crate) fn storage_type(&self) -> Option<(&str, &str)> {
        self.storage_type
            .as_ref()
            .map(|(schema, name)| (schema.as_str(), name.as_str()))
    }
}

/// The validated columns of one table, in ordinal order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSet {
    columns: Vec<ValidatedColumn>,
}

impl ColumnSet {
    pub(crate) fn new(columns: Vec<ValidatedColumn>) -> Self {
        Self { columns }
    }

    /// Find a column by exact name
    pub fn get(&self, name: &str) -> Option<&ValidatedColumn> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidatedColumn> {
        self.columns.iter()
    }

    /// Validate every name against this set
    ///
    /// Fails on the first name that is not a column of the table.
    pub fn validate<'a, I>(&self, names: I) -> Result<Vec<ValidatedColumn>, DatabaseError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .map(|name| {
                self.get(name)
                    .cloned()
                    .ok_or_else(|| DatabaseError::UnknownColumn(name.to_string()))
            })
            .collect()
    }
}

/// Which tables of the namespace the browser may see
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableVisibility {
    hidden_prefix: Option<String>,
}

impl TableVisibility {
    /// Hide tables whose name starts with `hidden_prefix` (a literal prefix)
    pub fn new(hidden_prefix: Option<String>) -> Self {
        Self {
            hidden_prefix: hidden_prefix.filter(|prefix| !prefix.is_empty()),
        }
    }

    /// Every table in the namespace is visible
    pub fn all() -> Self {
        Self::new(None)
    }

    pub fn is_visible(&self, table: &str) -> bool {
        match &self.hidden_prefix {
            Some(prefix) => !table.starts_with(prefix.as_str()),
            None => true,
        }
    }
}

impl Default for TableVisibility {
    fn default() -> Self {
        Self::new(Some(DEFAULT_HIDDEN_PREFIX.to_string()))
    }
}

/// Confirm that `name` is a visible table of the provider's namespace
///
/// # Errors
///
/// `TableNotFound` unless the catalog returns exactly one entry equal to
/// `name`. Catalog failures propagate unchanged.
pub async fn validate_table<DB>(
    database: &DB,
    visibility: &TableVisibility,
    name: &str,
) -> Result<ValidatedTable, DatabaseError>
where
    DB: DatabaseProvider + ?Sized,
{
    if name.is_empty() || !visibility.is_visible(name) {
        return Err(DatabaseError::TableNotFound(name.to_string()));
    }

    let matches = database.find_table(name).await?;
    match matches.as_slice() {
        [found] if found == name => Ok(ValidatedTable::new(database.namespace(), found.clone())),
        _ => Err(DatabaseError::TableNotFound(name.to_string())),
    }
}
