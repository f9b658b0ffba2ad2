use crate::TableRef;
use serde::{Deserialize, Serialize};

/// A foreign key edge between two tables.
///
/// Immutable snapshot supplied by the schema collaborator, fetched once
/// per connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub source_schema: Option<String>,
    pub source_table: String,
    pub source_column: String,

    pub target_schema: Option<String>,
    pub target_table: String,
    pub target_column: String,
}

impl ForeignKey {
    pub fn new(
        source: TableRef,
        source_column: impl Into<String>,
        target: TableRef,
        target_column: impl Into<String>,
    ) -> Self {
        Self {
            source_schema: source.schema,
            source_table: source.name,
            source_column: source_column.into(),
            target_schema: target.schema,
            target_table: target.name,
            target_column: target_column.into(),
        }
    }

    pub fn source(&self) -> TableRef {
        TableRef {
            schema: self.source_schema.clone(),
            name: self.source_table.clone(),
        }
    }

    pub fn target(&self) -> TableRef {
        TableRef {
            schema: self.target_schema.clone(),
            name: self.target_table.clone(),
        }
    }

    /// True if this edge originates from `column` of `table`.
    pub fn sources_from(&self, table: &TableRef, column: &str) -> bool {
        self.source_schema == table.schema
            && self.source_table == table.name
            && self.source_column == column
    }
}
