use crate::Value;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single row of fetched data, positionally matched to the page's
/// column list.
pub type Row = Vec<Value>;

/// Metadata for a result column.
///
/// Supplied by the remote fetch collaborator and immutable for the
/// lifetime of a table view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Column name as returned by the database.
    pub name: String,

    /// Database-specific declared type (e.g., "varchar", "int4", "jsonb").
    pub type_name: String,

    /// Whether the column allows NULL values.
    pub nullable: bool,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: true,
        }
    }

    /// True for columns whose declared type is JSON-shaped (json, jsonb).
    pub fn is_json_typed(&self) -> bool {
        self.type_name.to_lowercase().contains("json")
    }
}

/// One server page of table rows, as returned by the fetch collaborator.
#[derive(Debug, Clone)]
pub struct TablePage {
    /// Metadata for each column, defining row cell order.
    pub columns: Vec<ColumnMeta>,

    /// Row data, each row matching `columns` order.
    pub rows: Vec<Row>,

    /// Name of the primary key column, if the table has one.
    /// Tables without a primary key are read-only for editing purposes.
    pub primary_key: Option<String>,

    /// 1-based page number this data was fetched for.
    pub page: u64,

    /// Total rows in the table under the current filters.
    pub total_rows: u64,

    /// Total pages at the page size the fetch used.
    pub total_pages: u64,

    /// Wall-clock time the remote fetch took.
    pub execution_time: Duration,
}

impl TablePage {
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            primary_key: None,
            page: 1,
            total_rows: 0,
            total_pages: 0,
            execution_time: Duration::ZERO,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn value_at(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// Primary key value of a row, if the page has a primary key column
    /// and the row holds a non-null value for it.
    pub fn primary_key_value(&self, row: usize) -> Option<&Value> {
        let pk = self.primary_key.as_deref()?;
        let value = self.value_at(row, pk)?;
        if value.is_null() { None } else { Some(value) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> TablePage {
        TablePage {
            columns: vec![ColumnMeta::new("id", "integer"), ColumnMeta::new("name", "text")],
            rows: vec![
                vec![Value::Int(1), Value::Text("Alice".to_string())],
                vec![Value::Null, Value::Text("Bob".to_string())],
            ],
            primary_key: Some("id".to_string()),
            page: 1,
            total_rows: 2,
            total_pages: 1,
            execution_time: Duration::ZERO,
        }
    }

    #[test]
    fn value_lookup_by_column_name() {
        let page = page();
        assert_eq!(page.value_at(0, "name"), Some(&Value::Text("Alice".to_string())));
        assert_eq!(page.value_at(0, "missing"), None);
        assert_eq!(page.value_at(9, "name"), None);
    }

    #[test]
    fn primary_key_value_requires_non_null() {
        let page = page();
        assert_eq!(page.primary_key_value(0), Some(&Value::Int(1)));
        assert_eq!(page.primary_key_value(1), None);
    }

    #[test]
    fn json_typed_detection() {
        assert!(ColumnMeta::new("payload", "jsonb").is_json_typed());
        assert!(ColumnMeta::new("payload", "JSON").is_json_typed());
        assert!(!ColumnMeta::new("payload", "text").is_json_typed());
    }
}
