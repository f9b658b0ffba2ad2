use std::sync::Arc;
use std::time::Duration;
use tabula_core::{GridError, MemoryStore, TablePage, Uuid, Value};
use tabula_grid::{
    CellRef, ColumnRisk, DataGrid, EditStart, RelationCatalog, SaveOutcome, SortKey, TableFetcher,
};
use tabula_test_support::{
    FakeBackend, column, int_cell, page, page_without_primary_key, text_cell, users_account_fk,
    users_page, users_table,
};

fn grid_with(store: Arc<MemoryStore>) -> DataGrid {
    // Stable connection id so preferences persist across instances.
    DataGrid::new(Uuid::nil(), users_table(), store, &[users_account_fk()])
}

fn grid() -> DataGrid {
    grid_with(Arc::new(MemoryStore::new()))
}

fn numbered_page(number: u64, total_pages: u64, names: &[&str]) -> TablePage {
    let rows = names
        .iter()
        .enumerate()
        .map(|(i, name)| vec![int_cell(i as i64 + 1), text_cell(*name), int_cell(10)])
        .collect();

    TablePage {
        page: number,
        total_pages,
        total_rows: total_pages * names.len() as u64,
        execution_time: Duration::from_millis(1),
        ..users_page_with_rows(rows)
    }
}

fn users_page_with_rows(rows: Vec<Vec<Value>>) -> TablePage {
    page(
        vec![
            column("id", "integer"),
            column("name", "text"),
            column("account_id", "integer"),
        ],
        rows,
    )
}

#[test]
fn refresh_loads_page_and_defaults_columns() {
    let backend = FakeBackend::new().with_default_page(users_page());
    let mut grid = grid();

    assert!(grid.refresh(&backend).unwrap());
    assert_eq!(grid.page().unwrap().row_count(), 3);
    assert_eq!(grid.visible_columns(), vec!["id", "name", "account_id"]);
    assert_eq!(grid.total_pages(), Some(1));
}

#[test]
fn column_preferences_survive_a_new_grid_instance() {
    let store = Arc::new(MemoryStore::new());
    let backend = FakeBackend::new().with_default_page(users_page());

    let mut first = grid_with(store.clone());
    first.refresh(&backend).unwrap();
    first.toggle_column("name").unwrap();
    assert_eq!(first.visible_columns(), vec!["id", "account_id"]);

    let mut second = grid_with(store);
    second.refresh(&backend).unwrap();
    assert_eq!(second.visible_columns(), vec!["id", "account_id"]);
}

#[test]
fn stale_fetch_response_is_discarded() {
    let backend = FakeBackend::new()
        .with_page(1, numbered_page(1, 3, &["a", "b"]))
        .with_page(2, numbered_page(2, 3, &["c", "d"]));
    let mut grid = grid();

    grid.refresh(&backend).unwrap();
    assert_eq!(grid.page().unwrap().page, 1);

    // A page-2 fetch goes out, then the user sorts before the response
    // lands. The sort supersedes the in-flight fetch.
    grid.go_to_page(2);
    let ticket = grid.begin_fetch();
    let late_response = backend.fetch_page(grid.table(), &ticket.options);
    grid.toggle_sort("name");

    assert!(!grid.apply_fetch(ticket, late_response).unwrap());
    assert_eq!(grid.page().unwrap().page, 1, "stale page must not apply");
}

#[test]
fn fetch_failure_keeps_last_good_page_and_is_retryable() {
    let backend = FakeBackend::new().with_default_page(users_page());
    let mut grid = grid();

    grid.refresh(&backend).unwrap();

    backend.set_fetch_error(Some("connection reset".to_string()));
    let err = grid.refresh(&backend).unwrap_err();
    assert!(matches!(err, GridError::Fetch(_)));
    assert_eq!(grid.page().unwrap().row_count(), 3, "last good page kept");

    backend.set_fetch_error(None);
    assert!(grid.refresh(&backend).unwrap());
}

#[test]
fn go_to_page_clamps_once_totals_are_known() {
    let backend = FakeBackend::new().with_default_page(numbered_page(1, 3, &["a"]));
    let mut grid = grid();

    grid.go_to_page(99);
    assert_eq!(grid.options().page, 99, "unclamped before the first fetch");

    grid.refresh(&backend).unwrap();
    grid.go_to_page(99);
    assert_eq!(grid.options().page, 3);
}

#[test]
fn sort_cycle_resets_page_and_invalidates() {
    let mut grid = grid();

    grid.go_to_page(5);
    grid.toggle_sort("name");
    assert_eq!(grid.options().sort, Some(SortKey::asc("name")));
    assert_eq!(grid.options().page, 1);

    grid.toggle_sort("name");
    assert_eq!(grid.options().sort, Some(SortKey::desc("name")));

    grid.toggle_sort("name");
    assert_eq!(grid.options().sort, None);
}

#[test]
fn search_tracks_visible_columns() {
    let backend = FakeBackend::new().with_default_page(users_page());
    let mut grid = grid();
    grid.refresh(&backend).unwrap();

    grid.set_search_query("ali");
    assert!(grid.search().is_highlighting());
    assert_eq!(grid.search().match_count(), 2);
    assert_eq!(grid.next_match().map(|m| m.row), Some(2));
    assert_eq!(grid.next_match().map(|m| m.row), Some(0));

    // Hiding the matched column recomputes the match set.
    grid.toggle_column("name").unwrap();
    assert!(!grid.search().is_highlighting());
}

#[test]
fn foreign_key_edit_requires_confirmation_then_commits() {
    let backend = FakeBackend::new().with_default_page(users_page());
    let mut grid = grid();
    grid.refresh(&backend).unwrap();

    assert_eq!(grid.column_risk("id"), ColumnRisk::Primary);
    assert_eq!(grid.column_risk("account_id"), ColumnRisk::Foreign);
    assert_eq!(grid.column_risk("name"), ColumnRisk::Normal);

    let start = grid.begin_edit(0, "account_id").unwrap();
    assert_eq!(start, EditStart::NeedsConfirmation(ColumnRisk::Foreign));

    assert!(grid.confirm_edit());
    assert!(grid.stage_edit_text("30"));
    assert!(grid.commit_edit(&backend).unwrap());

    let stats = backend.stats();
    assert_eq!(stats.updates.len(), 1);
    assert_eq!(stats.updates[0].key.column, "id");
    assert_eq!(stats.updates[0].key.value, Value::Int(1));
    assert_eq!(stats.updates[0].changes[0].column, "account_id");
    assert_eq!(stats.updates[0].changes[0].column_type, "integer");

    // Committed value lands in the cached row.
    assert_eq!(
        grid.page().unwrap().value_at(0, "account_id"),
        Some(&Value::Text("30".to_string()))
    );
    assert!(grid.active_edit().is_none());
}

#[test]
fn noop_edit_produces_no_remote_call() {
    let backend = FakeBackend::new().with_default_page(users_page());
    let mut grid = grid();
    grid.refresh(&backend).unwrap();

    grid.begin_edit(0, "name").unwrap();
    assert_eq!(grid.save_edit().unwrap(), SaveOutcome::NoOp);
    assert!(backend.stats().updates.is_empty());
    assert!(grid.active_edit().is_none());
}

#[test]
fn failed_commit_reopens_editor() {
    let backend = FakeBackend::new()
        .with_default_page(users_page())
        .with_mutation_error("deadlock detected");
    let mut grid = grid();
    grid.refresh(&backend).unwrap();

    grid.begin_edit(0, "name").unwrap();
    grid.stage_edit_text("Renamed");

    let err = grid.commit_edit(&backend).unwrap_err();
    assert!(matches!(err, GridError::Mutation(_)));

    let active = grid.active_edit().unwrap();
    assert_eq!(active.cell, CellRef::new(0, "name"));
    assert_eq!(active.staged, "Renamed");

    // The cached row still shows the original value.
    assert_eq!(
        grid.page().unwrap().value_at(0, "name"),
        Some(&Value::Text("Alice, Inc.".to_string()))
    );
}

#[test]
fn editing_without_primary_key_is_refused() {
    let backend = FakeBackend::new().with_default_page(page_without_primary_key(
        vec![column("id", "integer"), column("name", "text")],
        vec![vec![int_cell(1), text_cell("a")]],
    ));
    let mut grid = grid();
    grid.refresh(&backend).unwrap();

    grid.begin_edit(0, "name").unwrap();
    grid.stage_edit_text("changed");

    let err = grid.save_edit().unwrap_err();
    assert!(matches!(err, GridError::MissingPrimaryKey));
    assert_eq!(err.to_string(), "Cannot update: No primary key found");
    assert!(backend.stats().updates.is_empty());
}

#[test]
fn selection_exports_visible_columns_in_ascending_order() {
    let backend = FakeBackend::new().with_default_page(users_page());
    let mut grid = grid();
    grid.refresh(&backend).unwrap();

    grid.toggle_row_selection(2);
    grid.toggle_row_selection(0);
    assert_eq!(grid.selected_rows(), vec![0, 2]);

    let csv = grid.selection_to_csv(true).unwrap();
    assert_eq!(
        csv,
        "id,name,account_id\n1,\"Alice, Inc.\",10\n3,malice,10\n"
    );
}

#[test]
fn paste_matches_known_columns_and_reports_the_rest() {
    let backend = FakeBackend::new().with_default_page(users_page());
    let mut grid = grid();
    grid.refresh(&backend).unwrap();

    let report = grid
        .paste_and_insert("name,email\nBob,bob@example.com\nCarol,\n", &backend)
        .unwrap();

    assert_eq!(report.skipped_columns, vec!["email"]);
    assert_eq!(report.populated_cells, 2);
    assert_eq!(report.rows.len(), 2);

    let stats = backend.stats();
    assert_eq!(stats.inserts.len(), 2);
    assert_eq!(
        stats.inserts[0].values,
        vec![("name".to_string(), Value::Text("Bob".to_string()))]
    );
}

#[test]
fn delete_selection_uses_primary_keys() {
    let backend = FakeBackend::new().with_default_page(users_page());
    let mut grid = grid();
    grid.refresh(&backend).unwrap();

    grid.toggle_row_selection(1);
    grid.toggle_row_selection(2);

    assert_eq!(grid.delete_selection(&backend).unwrap(), 2);
    assert!(grid.selected_rows().is_empty());

    let stats = backend.stats();
    assert_eq!(stats.deletes.len(), 2);
    assert_eq!(stats.deletes[0].value, Value::Int(2));
    assert_eq!(stats.deletes[1].value, Value::Int(3));
}

#[test]
fn relation_catalog_fetches_once_per_connection() {
    let backend = FakeBackend::new().with_foreign_keys(vec![users_account_fk()]);
    let mut catalog = RelationCatalog::new();
    let connection = Uuid::new_v4();

    assert_eq!(catalog.get_or_fetch(connection, &backend).unwrap().len(), 1);
    assert_eq!(catalog.get_or_fetch(connection, &backend).unwrap().len(), 1);
    assert_eq!(backend.stats().relation_fetches, 1);
}

#[test]
fn relation_target_resolves_without_side_effects() {
    let backend = FakeBackend::new().with_default_page(users_page());
    let mut grid = grid();
    grid.refresh(&backend).unwrap();

    let target = grid.relation_target(0, "account_id").unwrap();
    assert_eq!(target.table.name, "accounts");
    assert_eq!(target.column, "id");
    assert_eq!(target.value, Value::Int(10));

    assert!(grid.relation_target(0, "name").is_none());
}

#[test]
fn persistence_failure_surfaces_and_keeps_old_config() {
    let store = Arc::new(MemoryStore::with_write_error("disk full"));
    let backend = FakeBackend::new().with_default_page(users_page());
    let mut grid = grid_with(store);
    grid.refresh(&backend).unwrap();

    let err = grid.toggle_column("name").unwrap_err();
    assert!(matches!(err, GridError::PreferenceStore(_)));

    // The failed write never became authoritative.
    assert_eq!(grid.visible_columns(), vec!["id", "name", "account_id"]);
}
