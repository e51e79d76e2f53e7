//! Statement construction from validated identifiers
//!
//! Every statement is assembled by [`StatementBuilder`], which only accepts
//! identifiers as [`ValidatedTable`] / [`ValidatedColumn`] and pushes every
//! literal as a bound parameter. Identifiers are quoted as well, but quoting is
//! not what makes them safe: validation is.

use crate::filter::CompiledFilter;
use crate::identifier::{ValidatedColumn, ValidatedTable};
use crate::pagination::PageRequest;
use serde_json::Value;

/// Alias of the target table in PostgreSQL statements, used for whole-row
/// references (`to_json("__row")`)
const ROW_ALIAS: &str = "__row";

/// SQL dialect of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `?` placeholders, dynamically typed parameters, `*` projections
    Sqlite,

    /// `$n` placeholders, column-bound parameters sent as text and cast to the
    /// column's catalog type, rows projected as a single JSON value
    Postgres,
}

impl Dialect {
    /// Quote an identifier, doubling embedded quotes
    pub fn quote_identifier(identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    /// Placeholder for the `index`-th (1-based) parameter
    pub(crate) fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Sqlite => "?".to_string(),
            Dialect::Postgres => format!("${}", index),
        }
    }

    /// Clause that makes `LIKE` treat backslashes literally
    ///
    /// PostgreSQL escapes with `\` unless told otherwise; SQLite has no
    /// default escape character.
    pub(crate) fn like_escape(self) -> &'static str {
        match self {
            Dialect::Sqlite => "",
            Dialect::Postgres => " ESCAPE ''",
        }
    }
}

/// A literal value bound to a statement parameter
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl BindValue {
    /// Convert a JSON value from a request body
    ///
    /// Objects and arrays are bound as their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => BindValue::Null,
            Value::Bool(flag) => BindValue::Bool(*flag),
            Value::Number(number) => match number.as_i64() {
                Some(integer) => BindValue::Int(integer),
                None => number
                    .as_f64()
                    .map(BindValue::Float)
                    .unwrap_or_else(|| BindValue::Text(number.to_string())),
            },
            Value::String(text) => BindValue::Text(text.clone()),
            other => BindValue::Text(other.to_string()),
        }
    }

    /// Convert a row id taken from a URL path segment
    ///
    /// Always text: `"007"` must still match a text key. Integer key columns
    /// convert the operand through their affinity (SQLite) or the statement's
    /// cast (PostgreSQL).
    pub fn from_path_id(id: &str) -> Self {
        BindValue::Text(id.to_string())
    }

    /// Text form used where the statement casts the parameter itself
    fn into_text(self) -> Self {
        match self {
            BindValue::Null => BindValue::Null,
            BindValue::Bool(flag) => BindValue::Text(flag.to_string()),
            BindValue::Int(integer) => BindValue::Text(integer.to_string()),
            BindValue::Float(float) => BindValue::Text(float.to_string()),
            BindValue::Text(text) => BindValue::Text(text),
        }
    }
}

/// Ordering by a validated column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: ValidatedColumn,
    pub descending: bool,
}

/// Finished statement text plus its parameters, in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<BindValue>,
}

impl Statement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[BindValue] {
        &self.params
    }
}

/// Incremental statement builder
pub struct StatementBuilder {
    dialect: Dialect,
    sql: String,
    params: Vec<BindValue>,
}

impl StatementBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Append fixed SQL text
    ///
    /// Only called with literals from this crate, never with request data.
    fn push_sql(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Append `"namespace"."table"`, aliased for whole-row references where needed
    pub fn push_table(&mut self, table: &ValidatedTable) -> &mut Self {
        let qualified = format!(
            "{}.{}",
            Dialect::quote_identifier(table.namespace()),
            Dialect::quote_identifier(table.name())
        );
        self.sql.push_str(&qualified);
        if self.dialect == Dialect::Postgres {
            self.sql.push_str(" AS ");
            self.sql.push_str(&Dialect::quote_identifier(ROW_ALIAS));
        }
        self
    }

    pub fn push_column(&mut self, column: &ValidatedColumn) -> &mut Self {
        self.sql.push_str(&Dialect::quote_identifier(column.name()));
        self
    }

    /// Bind a value as-is and append its placeholder
    pub fn push_value(&mut self, value: BindValue) -> &mut Self {
        self.params.push(value);
        let placeholder = self.dialect.placeholder(self.params.len());
        self.sql.push_str(&placeholder);
        self
    }

    /// Bind a value destined for `column` and append its placeholder
    ///
    /// PostgreSQL receives the value as text and casts it to the column's
    /// catalog type, so that one code path serves every column type.
    pub fn push_column_value(&mut self, column: &ValidatedColumn, value: BindValue) -> &mut Self {
        match (self.dialect, column.storage_type()) {
            (Dialect::Postgres, Some((type_schema, type_name))) => {
                self.params.push(value.into_text());
                let placeholder = self.dialect.placeholder(self.params.len());
                self.sql.push_str(&format!(
                    "CAST({} AS {}.{})",
                    placeholder,
                    Dialect::quote_identifier(type_schema),
                    Dialect::quote_identifier(type_name)
                ));
                self
            }
            _ => self.push_value(value),
        }
    }

    /// Append ` WHERE <predicate>` when the filter has terms
    pub fn push_filter(&mut self, filter: &CompiledFilter) -> &mut Self {
        if filter.is_empty() {
            return self;
        }
        let (fragment, params) = filter.render(self.dialect, self.params.len() + 1);
        self.sql.push_str(" WHERE ");
        self.sql.push_str(&fragment);
        self.params.extend(params);
        self
    }

    pub fn push_order(&mut self, order: Option<&OrderBy>) -> &mut Self {
        if let Some(order) = order {
            self.push_sql(" ORDER BY ").push_column(&order.column);
            self.push_sql(if order.descending { " DESC" } else { " ASC" });
        }
        self
    }

    fn push_row_projection(&mut self) -> &mut Self {
        match self.dialect {
            Dialect::Sqlite => self.push_sql("*"),
            Dialect::Postgres => {
                let projection = format!(
                    "to_json({}) AS \"row\"",
                    Dialect::quote_identifier(ROW_ALIAS)
                );
                self.push_sql(&projection)
            }
        }
    }

    fn push_returning(&mut self) -> &mut Self {
        self.push_sql(" RETURNING ").push_row_projection()
    }

    pub fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
        }
    }
}

fn select_rows(
    dialect: Dialect,
    table: &ValidatedTable,
    filter: &CompiledFilter,
    order: Option<&OrderBy>,
) -> StatementBuilder {
    let mut builder = StatementBuilder::new(dialect);
    builder
        .push_sql("SELECT ")
        .push_row_projection()
        .push_sql(" FROM ")
        .push_table(table)
        .push_filter(filter)
        .push_order(order);
    builder
}

/// One page of filtered rows
pub fn select_page(
    dialect: Dialect,
    table: &ValidatedTable,
    filter: &CompiledFilter,
    order: Option<&OrderBy>,
    page: &PageRequest,
) -> Statement {
    let mut builder = select_rows(dialect, table, filter, order);
    builder
        .push_sql(" LIMIT ")
        .push_value(BindValue::Int(page.limit() as i64))
        .push_sql(" OFFSET ")
        .push_value(BindValue::Int(page.offset() as i64));
    builder.finish()
}

/// Every filtered row, optionally bounded by `limit`
pub fn select_all(
    dialect: Dialect,
    table: &ValidatedTable,
    filter: &CompiledFilter,
    order: Option<&OrderBy>,
    limit: Option<u64>,
) -> Statement {
    let mut builder = select_rows(dialect, table, filter, order);
    if let Some(limit) = limit {
        builder
            .push_sql(" LIMIT ")
            .push_value(BindValue::Int(limit as i64));
    }
    builder.finish()
}

/// Count of filtered rows
pub fn count(dialect: Dialect, table: &ValidatedTable, filter: &CompiledFilter) -> Statement {
    let mut builder = StatementBuilder::new(dialect);
    builder
        .push_sql("SELECT COUNT(*) AS \"count\" FROM ")
        .push_table(table)
        .push_filter(filter);
    builder.finish()
}

/// Insert one row, returning it as persisted
pub fn insert(
    dialect: Dialect,
    table: &ValidatedTable,
    values: Vec<(ValidatedColumn, BindValue)>,
) -> Statement {
    let mut builder = StatementBuilder::new(dialect);
    builder.push_sql("INSERT INTO ").push_table(table);

    if values.is_empty() {
        builder.push_sql(" DEFAULT VALUES");
    } else {
        builder.push_sql(" (");
        for (index, (column, _)) in values.iter().enumerate() {
            if index > 0 {
                builder.push_sql(", ");
            }
            builder.push_column(column);
        }
        builder.push_sql(") VALUES (");
        for (index, (column, value)) in values.into_iter().enumerate() {
            if index > 0 {
                builder.push_sql(", ");
            }
            builder.push_column_value(&column, value);
        }
        builder.push_sql(")");
    }

    builder.push_returning();
    builder.finish()
}

/// Update the row whose `key` equals `id`, returning it as persisted
///
/// The id is always the last parameter.
pub fn update(
    dialect: Dialect,
    table: &ValidatedTable,
    values: Vec<(ValidatedColumn, BindValue)>,
    key: &ValidatedColumn,
    id: BindValue,
) -> Statement {
    let mut builder = StatementBuilder::new(dialect);
    builder.push_sql("UPDATE ").push_table(table).push_sql(" SET ");
    for (index, (column, value)) in values.into_iter().enumerate() {
        if index > 0 {
            builder.push_sql(", ");
        }
        builder
            .push_column(&column)
            .push_sql(" = ")
            .push_column_value(&column, value);
    }
    builder
        .push_sql(" WHERE ")
        .push_column(key)
        .push_sql(" = ")
        .push_column_value(key, id)
        .push_returning();
    builder.finish()
}

/// Delete the row whose `key` equals `id`, returning it
pub fn delete(
    dialect: Dialect,
    table: &ValidatedTable,
    key: &ValidatedColumn,
    id: BindValue,
) -> Statement {
    let mut builder = StatementBuilder::new(dialect);
    builder
        .push_sql("DELETE FROM ")
        .push_table(table)
        .push_sql(" WHERE ")
        .push_column(key)
        .push_sql(" = ")
        .push_column_value(key, id)
        .push_returning();
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{compile, FilterSpec};
    use crate::identifier::ColumnSet;
    use serde_json::json;

    fn items() -> ValidatedTable {
        ValidatedTable::new("main", "items")
    }

    fn column(name: &str) -> ValidatedColumn {
        ValidatedColumn::new(name, None)
    }

    fn typed_column(name: &str, type_name: &str) -> ValidatedColumn {
        ValidatedColumn::new(name, Some(("pg_catalog".to_string(), type_name.to_string())))
    }

    fn name_filter(columns: &ColumnSet) -> CompiledFilter {
        let mut filters = FilterSpec::new();
        filters.insert("name".to_string(), "wid".to_string());
        compile(columns, &filters)
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(Dialect::quote_identifier("users"), "\"users\"");
        assert_eq!(Dialect::quote_identifier("table\"name"), "\"table\"\"name\"");
    }

    #[test]
    fn test_bind_value_from_json() {
        assert_eq!(BindValue::from_json(&json!(null)), BindValue::Null);
        assert_eq!(BindValue::from_json(&json!(true)), BindValue::Bool(true));
        assert_eq!(BindValue::from_json(&json!(42)), BindValue::Int(42));
        assert_eq!(BindValue::from_json(&json!(9.99)), BindValue::Float(9.99));
        assert_eq!(BindValue::from_json(&json!("Widget")), BindValue::Text("Widget".to_string()));
        assert_eq!(
            BindValue::from_json(&json!({"a": 1})),
            BindValue::Text("{\"a\":1}".to_string())
        );
    }

    #[test]
    fn test_bind_value_from_path_id() {
        assert_eq!(BindValue::from_path_id("17"), BindValue::Text("17".to_string()));
        assert_eq!(BindValue::from_path_id("007"), BindValue::Text("007".to_string()));
        assert_eq!(
            BindValue::from_path_id("3f2a-uuid"),
            BindValue::Text("3f2a-uuid".to_string())
        );
    }

    #[test]
    fn test_select_page_sqlite() {
        let columns = ColumnSet::new(vec![column("id"), column("name")]);
        let order = OrderBy {
            column: column("id"),
            descending: false,
        };
        let page = PageRequest::new(30, 60).unwrap();
        let statement = select_page(Dialect::Sqlite, &items(), &name_filter(&columns), Some(&order), &page);

        assert_eq!(
            statement.sql(),
            "SELECT * FROM \"main\".\"items\" WHERE LOWER(CAST(\"name\" AS TEXT)) LIKE LOWER(?) ORDER BY \"id\" ASC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            statement.params(),
            &[
                BindValue::Text("%wid%".to_string()),
                BindValue::Int(30),
                BindValue::Int(60)
            ]
        );
    }

    #[test]
    fn test_select_page_postgres_numbers_placeholders() {
        let columns = ColumnSet::new(vec![column("id"), column("name")]);
        let page = PageRequest::new(10, 0).unwrap();
        let table = ValidatedTable::new("esker", "items");
        let statement = select_page(Dialect::Postgres, &table, &name_filter(&columns), None, &page);

        assert_eq!(
            statement.sql(),
            "SELECT to_json(\"__row\") AS \"row\" FROM \"esker\".\"items\" AS \"__row\" WHERE LOWER(CAST(\"name\" AS TEXT)) LIKE LOWER($1) ESCAPE '' LIMIT $2 OFFSET $3"
        );
    }

    #[test]
    fn test_count_shares_predicate_with_select() {
        let columns = ColumnSet::new(vec![column("id"), column("name")]);
        let filter = name_filter(&columns);
        let page = PageRequest::new(30, 0).unwrap();

        let select = select_page(Dialect::Postgres, &items(), &filter, None, &page);
        let count = count(Dialect::Postgres, &items(), &filter);

        assert_eq!(
            count.sql(),
            "SELECT COUNT(*) AS \"count\" FROM \"main\".\"items\" AS \"__row\" WHERE LOWER(CAST(\"name\" AS TEXT)) LIKE LOWER($1) ESCAPE ''"
        );
        assert_eq!(count.params(), &select.params()[..1]);
    }

    #[test]
    fn test_select_all_without_limit() {
        let statement = select_all(Dialect::Sqlite, &items(), &CompiledFilter::default(), None, None);
        assert_eq!(statement.sql(), "SELECT * FROM \"main\".\"items\"");
        assert!(statement.params().is_empty());

        let capped = select_all(Dialect::Sqlite, &items(), &CompiledFilter::default(), None, Some(101));
        assert_eq!(capped.sql(), "SELECT * FROM \"main\".\"items\" LIMIT ?");
        assert_eq!(capped.params(), &[BindValue::Int(101)]);
    }

    #[test]
    fn test_insert_sqlite() {
        let statement = insert(
            Dialect::Sqlite,
            &items(),
            vec![
                (column("name"), BindValue::Text("Widget".to_string())),
                (column("price"), BindValue::Float(9.99)),
            ],
        );
        assert_eq!(
            statement.sql(),
            "INSERT INTO \"main\".\"items\" (\"name\", \"price\") VALUES (?, ?) RETURNING *"
        );
        assert_eq!(
            statement.params(),
            &[BindValue::Text("Widget".to_string()), BindValue::Float(9.99)]
        );
    }

    #[test]
    fn test_insert_without_values_uses_defaults() {
        let statement = insert(Dialect::Sqlite, &items(), Vec::new());
        assert_eq!(
            statement.sql(),
            "INSERT INTO \"main\".\"items\" DEFAULT VALUES RETURNING *"
        );
    }

    #[test]
    fn test_insert_postgres_casts_to_column_type() {
        let table = ValidatedTable::new("esker", "items");
        let statement = insert(
            Dialect::Postgres,
            &table,
            vec![
                (typed_column("name", "varchar"), BindValue::Text("Widget".to_string())),
                (typed_column("price", "numeric"), BindValue::Float(9.99)),
                (typed_column("note", "text"), BindValue::Null),
            ],
        );
        assert_eq!(
            statement.sql(),
            "INSERT INTO \"esker\".\"items\" AS \"__row\" (\"name\", \"price\", \"note\") VALUES (CAST($1 AS \"pg_catalog\".\"varchar\"), CAST($2 AS \"pg_catalog\".\"numeric\"), CAST($3 AS \"pg_catalog\".\"text\")) RETURNING to_json(\"__row\") AS \"row\""
        );
        assert_eq!(
            statement.params(),
            &[
                BindValue::Text("Widget".to_string()),
                BindValue::Text("9.99".to_string()),
                BindValue::Null
            ]
        );
    }

    #[test]
    fn test_update_appends_id_last() {
        let statement = update(
            Dialect::Sqlite,
            &items(),
            vec![
                (column("name"), BindValue::Text("Gadget".to_string())),
                (column("price"), BindValue::Float(19.5)),
            ],
            &column("id"),
            BindValue::Int(7),
        );
        assert_eq!(
            statement.sql(),
            "UPDATE \"main\".\"items\" SET \"name\" = ?, \"price\" = ? WHERE \"id\" = ? RETURNING *"
        );
        assert_eq!(statement.params().last(), Some(&BindValue::Int(7)));
    }

    #[test]
    fn test_delete_postgres() {
        let table = ValidatedTable::new("esker", "items");
        let statement = delete(
            Dialect::Postgres,
            &table,
            &typed_column("id", "int4"),
            BindValue::Int(7),
        );
        assert_eq!(
            statement.sql(),
            "DELETE FROM \"esker\".\"items\" AS \"__row\" WHERE \"id\" = CAST($1 AS \"pg_catalog\".\"int4\") RETURNING to_json(\"__row\") AS \"row\""
        );
        assert_eq!(statement.params(), &[BindValue::Text("7".to_string())]);
    }

    #[test]
    fn test_descending_order() {
        let order = OrderBy {
            column: column("price"),
            descending: true,
        };
        let statement = select_all(Dialect::Sqlite, &items(), &CompiledFilter::default(), Some(&order), None);
        assert_eq!(
            statement.sql(),
            "SELECT * FROM \"main\".\"items\" ORDER BY \"price\" DESC"
        );
    }
}
