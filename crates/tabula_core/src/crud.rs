use crate::Value;

/// Unique identification of a row for update/delete operations.
///
/// Holds the primary key column and its value. Rows without a usable
/// primary key value are read-only for editing purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowKey {
    pub column: String,
    pub value: Value,
}

impl RowKey {
    pub fn new(column: impl Into<String>, value: Value) -> Self {
        Self {
            column: column.into(),
            value,
        }
    }
}

/// A single column change, carrying the declared type so the remote
/// collaborator can bind the value correctly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellChange {
    pub column: String,
    pub value: Value,
    pub column_type: String,
}

/// Changes to apply to a single row via UPDATE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowUpdate {
    /// Unique identification of the row to update.
    pub key: RowKey,

    /// Column changes to apply.
    pub changes: Vec<CellChange>,
}

impl RowUpdate {
    pub fn new(key: RowKey, changes: Vec<CellChange>) -> Self {
        Self { key, changes }
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Values for a new row, in (column, value) pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowInsert {
    pub values: Vec<(String, Value)>,
}

impl RowInsert {
    pub fn new(values: Vec<(String, Value)>) -> Self {
        Self { values }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
