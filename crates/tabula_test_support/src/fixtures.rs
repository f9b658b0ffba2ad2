use std::time::Duration;
use tabula_core::{ColumnMeta, ForeignKey, Row, TablePage, TableRef, Value};

pub fn column(name: impl Into<String>, type_name: impl Into<String>) -> ColumnMeta {
    ColumnMeta::new(name, type_name)
}

pub fn int_cell(value: i64) -> Value {
    Value::Int(value)
}

pub fn text_cell(value: impl Into<String>) -> Value {
    Value::Text(value.into())
}

pub fn json_cell(value: serde_json::Value) -> Value {
    Value::Json(value)
}

pub fn page(columns: Vec<ColumnMeta>, rows: Vec<Row>) -> TablePage {
    let total_rows = rows.len() as u64;
    TablePage {
        columns,
        rows,
        primary_key: Some("id".to_string()),
        page: 1,
        total_rows,
        total_pages: 1,
        execution_time: Duration::from_millis(1),
    }
}

pub fn page_without_primary_key(columns: Vec<ColumnMeta>, rows: Vec<Row>) -> TablePage {
    TablePage {
        primary_key: None,
        ..page(columns, rows)
    }
}

/// Canonical three-column fixture: users(id, name, account_id) where
/// account_id references accounts(id).
pub fn users_page() -> TablePage {
    page(
        vec![
            column("id", "integer"),
            column("name", "text"),
            column("account_id", "integer"),
        ],
        vec![
            vec![int_cell(1), text_cell("Alice, Inc."), int_cell(10)],
            vec![int_cell(2), Value::Null, int_cell(20)],
            vec![int_cell(3), text_cell("malice"), int_cell(10)],
        ],
    )
}

pub fn users_table() -> TableRef {
    TableRef::with_schema("public", "users")
}

pub fn users_account_fk() -> ForeignKey {
    ForeignKey::new(
        users_table(),
        "account_id",
        TableRef::with_schema("public", "accounts"),
        "id",
    )
}
