use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tabula_core::{GridError, PreferenceStore, TableRef, Uuid};

/// Per-column display preference: visibility and position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    pub visible: bool,
    pub order: u32,
}

impl ColumnConfig {
    pub fn new(name: impl Into<String>, order: u32) -> Self {
        Self {
            name: name.into(),
            visible: true,
            order,
        }
    }
}

/// Merge a stored configuration against the live column set.
///
/// Live columns keep their stored entry when one exists; newly
/// discovered columns are appended visible, ordered after everything
/// stored; stored entries for columns that no longer exist are dropped
/// (schema drift).
pub fn reconcile(stored: &[ColumnConfig], live_columns: &[String]) -> Vec<ColumnConfig> {
    let max_order = stored.iter().map(|c| c.order).max().map_or(0, |o| o + 1);
    let mut next_order = max_order;

    live_columns
        .iter()
        .map(|name| {
            if let Some(entry) = stored.iter().find(|c| &c.name == name) {
                entry.clone()
            } else {
                let entry = ColumnConfig::new(name.clone(), next_order);
                next_order += 1;
                entry
            }
        })
        .collect()
}

/// Visible column names, sorted by `order` ascending.
pub fn display_columns(config: &[ColumnConfig]) -> Vec<String> {
    let mut visible: Vec<&ColumnConfig> = config.iter().filter(|c| c.visible).collect();
    visible.sort_by_key(|c| c.order);
    visible.into_iter().map(|c| c.name.clone()).collect()
}

/// Flip a column's visibility. Returns false if the column is unknown.
pub fn toggle_visibility(config: &mut [ColumnConfig], name: &str) -> bool {
    match config.iter_mut().find(|c| c.name == name) {
        Some(entry) => {
            entry.visible = !entry.visible;
            true
        }
        None => false,
    }
}

/// Move a column to `position` within the order-sorted list, renumbering
/// orders to 0..n. Returns false if the column is unknown.
pub fn move_column(config: &mut [ColumnConfig], name: &str, position: usize) -> bool {
    if !config.iter().any(|c| c.name == name) {
        return false;
    }

    let mut ordered: Vec<String> = {
        let mut by_order: Vec<&ColumnConfig> = config.iter().collect();
        by_order.sort_by_key(|c| c.order);
        by_order.into_iter().map(|c| c.name.clone()).collect()
    };

    let from = ordered.iter().position(|n| n == name).unwrap_or(0);
    let moved = ordered.remove(from);
    let to = position.min(ordered.len());
    ordered.insert(to, moved);

    for entry in config.iter_mut() {
        if let Some(idx) = ordered.iter().position(|n| n == &entry.name) {
            entry.order = idx as u32;
        }
    }

    true
}

/// Persistence wrapper for column configurations, keyed per
/// (connection, schema, table).
///
/// Every mutation is written back before the in-memory config is
/// considered authoritative; a failed write surfaces as an error.
#[derive(Clone)]
pub struct ColumnConfigStore {
    store: Arc<dyn PreferenceStore>,
}

impl ColumnConfigStore {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    pub fn key(connection_id: Uuid, table: &TableRef) -> String {
        format!(
            "column_config_{}_{}_{}",
            connection_id,
            table.schema_str(),
            table.name
        )
    }

    /// Load the stored configuration, if any. Unreadable payloads are
    /// logged and treated as absent so the view can fall back to
    /// defaults; only writes are strict.
    pub fn load(
        &self,
        connection_id: Uuid,
        table: &TableRef,
    ) -> Result<Option<Vec<ColumnConfig>>, GridError> {
        let key = Self::key(connection_id, table);
        let Some(raw) = self.store.get(&key)? else {
            return Ok(None);
        };

        match serde_json::from_value(raw) {
            Ok(config) => Ok(Some(config)),
            Err(e) => {
                log::warn!("discarding unreadable column config under {}: {}", key, e);
                Ok(None)
            }
        }
    }

    pub fn save(
        &self,
        connection_id: Uuid,
        table: &TableRef,
        config: &[ColumnConfig],
    ) -> Result<(), GridError> {
        let key = Self::key(connection_id, table);
        let value = serde_json::to_value(config)
            .map_err(|e| GridError::PreferenceStore(e.to_string()))?;
        self.store.set(&key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::MemoryStore;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reconcile_synthesizes_defaults_on_first_visit() {
        let config = reconcile(&[], &names(&["id", "name"]));

        assert_eq!(config.len(), 2);
        assert!(config.iter().all(|c| c.visible));
        assert_eq!(config[0].order, 0);
        assert_eq!(config[1].order, 1);
    }

    #[test]
    fn reconcile_keeps_stored_entries_and_drops_stale_ones() {
        let stored = vec![
            ColumnConfig {
                name: "name".to_string(),
                visible: false,
                order: 0,
            },
            ColumnConfig {
                name: "dropped".to_string(),
                visible: true,
                order: 1,
            },
        ];

        let config = reconcile(&stored, &names(&["id", "name"]));

        assert_eq!(config.len(), 2);
        assert!(!config.iter().any(|c| c.name == "dropped"));

        let name_entry = config.iter().find(|c| c.name == "name").unwrap();
        assert!(!name_entry.visible);

        // New column appended after everything stored.
        let id_entry = config.iter().find(|c| c.name == "id").unwrap();
        assert!(id_entry.order > 1);
    }

    #[test]
    fn display_columns_filters_and_sorts() {
        let config = vec![
            ColumnConfig {
                name: "b".to_string(),
                visible: true,
                order: 10,
            },
            ColumnConfig {
                name: "a".to_string(),
                visible: true,
                order: 3,
            },
            ColumnConfig {
                name: "hidden".to_string(),
                visible: false,
                order: 0,
            },
        ];

        assert_eq!(display_columns(&config), names(&["a", "b"]));
    }

    #[test]
    fn move_column_renumbers_contiguously() {
        let mut config = reconcile(&[], &names(&["a", "b", "c"]));
        assert!(move_column(&mut config, "c", 0));

        assert_eq!(display_columns(&config), names(&["c", "a", "b"]));
        let orders: Vec<u32> = {
            let mut sorted = config.clone();
            sorted.sort_by_key(|c| c.order);
            sorted.iter().map(|c| c.order).collect()
        };
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn store_round_trips_per_table_key() {
        let store = ColumnConfigStore::new(Arc::new(MemoryStore::new()));
        let connection = Uuid::new_v4();
        let orders = TableRef::with_schema("public", "orders");
        let users = TableRef::with_schema("public", "users");

        let config = reconcile(&[], &names(&["id"]));
        store.save(connection, &orders, &config).unwrap();

        assert_eq!(store.load(connection, &orders).unwrap(), Some(config));
        assert_eq!(store.load(connection, &users).unwrap(), None);
    }

    #[test]
    fn save_failure_surfaces_error() {
        let store = ColumnConfigStore::new(Arc::new(MemoryStore::with_write_error("disk full")));
        let err = store
            .save(Uuid::new_v4(), &TableRef::new("t"), &[])
            .unwrap_err();

        assert!(matches!(err, GridError::PreferenceStore(_)));
    }

    #[test]
    fn unreadable_stored_payload_falls_back_to_defaults() {
        let backing = Arc::new(MemoryStore::new());
        let connection = Uuid::new_v4();
        let table = TableRef::new("t");
        backing
            .set(
                &ColumnConfigStore::key(connection, &table),
                serde_json::json!("not a config"),
            )
            .unwrap();

        let store = ColumnConfigStore::new(backing);
        assert_eq!(store.load(connection, &table).unwrap(), None);
    }
}
