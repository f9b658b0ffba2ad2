use crate::traits::RelationSource;
use indexmap::IndexMap;
use std::collections::HashMap;
use tabula_core::{ForeignKey, GridError, TableRef, Uuid, Value};

/// Risk classification of a column for edit gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRisk {
    /// The row-identifying column. Editing it changes row identity.
    Primary,
    /// References another table through a foreign key.
    Foreign,
    Normal,
}

impl ColumnRisk {
    pub fn needs_confirmation(&self) -> bool {
        !matches!(self, Self::Normal)
    }
}

/// Foreign-key lookup across all tables of a connection, keyed by
/// (schema, table, column).
#[derive(Debug, Clone, Default)]
pub struct RelationIndex {
    edges: IndexMap<(Option<String>, String, String), ForeignKey>,
}

impl RelationIndex {
    pub fn build(foreign_keys: &[ForeignKey]) -> Self {
        let mut edges = IndexMap::new();
        for fk in foreign_keys {
            edges.insert(
                (
                    fk.source_schema.clone(),
                    fk.source_table.clone(),
                    fk.source_column.clone(),
                ),
                fk.clone(),
            );
        }
        Self { edges }
    }

    pub fn lookup(&self, table: &TableRef, column: &str) -> Option<&ForeignKey> {
        self.edges
            .get(&(table.schema.clone(), table.name.clone(), column.to_string()))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Foreign-key lookup scoped to one browsed table: column name → edge.
#[derive(Debug, Clone, Default)]
pub struct RelationMap {
    columns: IndexMap<String, ForeignKey>,
}

impl RelationMap {
    /// Build the scoped map from the connection-wide edge list, keeping
    /// only edges whose source matches `table`.
    pub fn for_table(foreign_keys: &[ForeignKey], table: &TableRef) -> Self {
        let mut columns = IndexMap::new();
        for fk in foreign_keys {
            if fk.source_schema == table.schema && fk.source_table == table.name {
                columns.insert(fk.source_column.clone(), fk.clone());
            }
        }
        Self { columns }
    }

    pub fn relation_for(&self, column: &str) -> Option<&ForeignKey> {
        self.columns.get(column)
    }

    /// Classify a column. Primary takes precedence over foreign if a
    /// column is (unusually) both.
    pub fn classify(&self, column: &str, primary_key: Option<&str>) -> ColumnRisk {
        if primary_key == Some(column) {
            ColumnRisk::Primary
        } else if self.columns.contains_key(column) {
            ColumnRisk::Foreign
        } else {
            ColumnRisk::Normal
        }
    }
}

/// Where a foreign-key cell points: pure data, no navigation side effect.
/// The caller decides what to do with it (open a view, copy, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationTarget {
    pub table: TableRef,
    pub column: String,
    pub value: Value,
}

pub fn resolve_target(fk: &ForeignKey, value: &Value) -> RelationTarget {
    RelationTarget {
        table: fk.target(),
        column: fk.target_column.clone(),
        value: value.clone(),
    }
}

/// Session cache of foreign-key snapshots, one per connection.
///
/// Relations change far less often than rows; they are fetched once per
/// connection and reused for every table browsed on it.
#[derive(Default)]
pub struct RelationCatalog {
    cache: HashMap<Uuid, Vec<ForeignKey>>,
}

impl RelationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_fetch(
        &mut self,
        connection_id: Uuid,
        source: &dyn RelationSource,
    ) -> Result<&[ForeignKey], GridError> {
        if !self.cache.contains_key(&connection_id) {
            let foreign_keys = source.foreign_keys(connection_id)?;
            log::debug!(
                "cached {} foreign keys for connection {}",
                foreign_keys.len(),
                connection_id
            );
            self.cache.insert(connection_id, foreign_keys);
        }

        Ok(self
            .cache
            .get(&connection_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }

    pub fn invalidate(&mut self, connection_id: Uuid) {
        self.cache.remove(&connection_id);
    }
}
