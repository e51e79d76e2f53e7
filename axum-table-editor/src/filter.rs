//! Column filter compilation
//!
//! Filters are case-insensitive substring matches, AND-joined. Column names are
//! checked against the table's validated columns and unknown ones are dropped
//! rather than rejected, so stale client-side filter state never fails a
//! request. Patterns are always bound as parameters.

use crate::identifier::{ColumnSet, ValidatedColumn};
use crate::statement::{BindValue, Dialect};
use serde_json::Value;
use std::collections::BTreeMap;

/// Column name -> substring pattern, as sent by the client
pub type FilterSpec = BTreeMap<String, String>;

/// Parse the `filters` query parameter
///
/// Malformed JSON or a non-object value yields no filters. Numbers and
/// booleans are accepted as their text form; other values are ignored.
pub fn parse_filters(raw: Option<&str>) -> FilterSpec {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return FilterSpec::new();
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map
            .into_iter()
            .filter_map(|(column, value)| match value {
                Value::String(pattern) => Some((column, pattern)),
                Value::Number(number) => Some((column, number.to_string())),
                Value::Bool(flag) => Some((column, flag.to_string())),
                _ => None,
            })
            .collect(),
        Ok(_) => {
            tracing::warn!("ignoring filters that are not a JSON object");
            FilterSpec::new()
        }
        Err(error) => {
            tracing::warn!(%error, "ignoring malformed filters JSON");
            FilterSpec::new()
        }
    }
}

/// One retained filter: a validated column and its `%pattern%` parameter
#[derive(Debug, Clone, PartialEq, Eq)]
struct FilterTerm {
    column: ValidatedColumn,
    pattern: String,
}

/// A predicate over validated columns, ready to be rendered into a statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledFilter {
    terms: Vec<FilterTerm>,
}

impl CompiledFilter {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Names of the columns that are actually filtered, in column order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|term| term.column.name())
    }

    /// Render the predicate fragment and its parameters
    ///
    /// `first_placeholder` is the 1-based index of the first parameter, for
    /// dialects with numbered placeholders. An empty filter renders as an
    /// empty fragment with no parameters.
    pub fn render(&self, dialect: Dialect, first_placeholder: usize) -> (String, Vec<BindValue>) {
        let mut conditions = Vec::with_capacity(self.terms.len());
        let mut params = Vec::with_capacity(self.terms.len());

        for (offset, term) in self.terms.iter().enumerate() {
            let placeholder = dialect.placeholder(first_placeholder + offset);
            conditions.push(format!(
                "LOWER(CAST({} AS TEXT)) LIKE LOWER({}){}",
                Dialect::quote_identifier(term.column.name()),
                placeholder,
                dialect.like_escape()
            ));
            params.push(BindValue::Text(term.pattern.clone()));
        }

        (conditions.join(" AND "), params)
    }
}

/// Compile client filters against a table's columns
///
/// Blank patterns and unknown columns are dropped. Terms follow column
/// ordinal order.
pub fn compile(columns: &ColumnSet, filters: &FilterSpec) -> CompiledFilter {
    for column in filters.keys().filter(|column| !columns.contains(column)) {
        tracing::debug!(column = %column, "dropping filter on unknown column");
    }

    let terms = columns
        .iter()
        .filter_map(|column| {
            let pattern = filters.get(column.name())?;
            if pattern.trim().is_empty() {
                return None;
            }
            Some(FilterTerm {
                column: column.clone(),
                pattern: format!("%{}%", pattern),
            })
        })
        .collect();

    CompiledFilter { terms }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> ColumnSet {
        ColumnSet::new(vec![
            ValidatedColumn::new("id", None),
            ValidatedColumn::new("name", None),
            ValidatedColumn::new("price", None),
        ])
    }

    fn spec(pairs: &[(&str, &str)]) -> FilterSpec {
        pairs
            .iter()
            .map(|(column, pattern)| (column.to_string(), pattern.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_filters() {
        let filters = parse_filters(Some(r#"{"name":"wid","price":9,"active":true,"tags":[1]}"#));
        assert_eq!(filters.get("name").map(String::as_str), Some("wid"));
        assert_eq!(filters.get("price").map(String::as_str), Some("9"));
        assert_eq!(filters.get("active").map(String::as_str), Some("true"));
        assert!(!filters.contains_key("tags"));
    }

    #[test]
    fn test_parse_malformed_filters_is_empty() {
        assert!(parse_filters(Some("{not json")).is_empty());
        assert!(parse_filters(Some("[\"name\"]")).is_empty());
        assert!(parse_filters(Some("")).is_empty());
        assert!(parse_filters(None).is_empty());
    }

    #[test]
    fn test_compile_empty() {
        let filter = compile(&columns(), &FilterSpec::new());
        assert!(filter.is_empty());
        let (fragment, params) = filter.render(Dialect::Postgres, 1);
        assert!(fragment.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn test_compile_drops_blank_and_unknown() {
        let filter = compile(
            &columns(),
            &spec(&[("name", "  "), ("ghost", "x"), ("id) OR 1=1 --", "x")]),
        );
        assert!(filter.is_empty());
    }

    #[test]
    fn test_compile_follows_column_order() {
        let filter = compile(&columns(), &spec(&[("price", "9"), ("name", "Wid")]));
        assert_eq!(filter.columns().collect::<Vec<_>>(), vec!["name", "price"]);

        let (fragment, params) = filter.render(Dialect::Postgres, 1);
        assert_eq!(
            fragment,
            "LOWER(CAST(\"name\" AS TEXT)) LIKE LOWER($1) ESCAPE '' AND LOWER(CAST(\"price\" AS TEXT)) LIKE LOWER($2) ESCAPE ''"
        );
        assert_eq!(
            params,
            vec![
                BindValue::Text("%Wid%".to_string()),
                BindValue::Text("%9%".to_string())
            ]
        );
    }

    #[test]
    fn test_backslash_is_matched_literally() {
        let filter = compile(&columns(), &spec(&[("name", "C:\\")]));

        let (fragment, params) = filter.render(Dialect::Postgres, 1);
        assert!(fragment.ends_with(" ESCAPE ''"));
        assert_eq!(params, vec![BindValue::Text("%C:\\%".to_string())]);

        let (fragment, _) = filter.render(Dialect::Sqlite, 1);
        assert!(!fragment.contains("ESCAPE"));
    }

    #[test]
    fn test_render_respects_first_placeholder() {
        let filter = compile(&columns(), &spec(&[("name", "a")]));
        let (fragment, _) = filter.render(Dialect::Postgres, 4);
        assert!(fragment.ends_with("LIKE LOWER($4) ESCAPE ''"));

        let (fragment, _) = filter.render(Dialect::Sqlite, 4);
        assert!(fragment.ends_with("LIKE LOWER(?)"));
    }
}
