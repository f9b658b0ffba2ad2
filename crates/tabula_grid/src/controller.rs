use crate::column_config::{self, ColumnConfig, ColumnConfigStore};
use crate::edit::{
    CellEdit, CellRef, ClickAction, ClickArbiter, ClickToken, CommitResolution, EditGuard,
    EditStart, SaveOutcome, parse_staged,
};
use crate::query_options::{FilterCondition, FilterId, FilterIdAllocator, QueryOptions};
use crate::relation_map::{ColumnRisk, RelationMap, RelationTarget, resolve_target};
use crate::search::{SearchMatch, TableSearch};
use crate::traits::{TableFetcher, TableMutator};
use std::collections::BTreeSet;
use std::sync::Arc;
use tabula_core::{
    ForeignKey, GridError, PreferenceStore, Row, RowInsert, RowKey, TablePage, TableRef, Uuid,
    Value,
};
use tabula_export::{ExportError, parse_csv, rows_to_csv};

/// Snapshot handed out for one fetch. A later option transition makes
/// the ticket stale; [`DataGrid::apply_fetch`] then discards the
/// response, so a late page can never overwrite a newer view.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    seq: u64,
    pub options: QueryOptions,
}

/// What a cell press resolved to after click disambiguation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellInteraction {
    /// Single click armed; call [`DataGrid::on_click_timer`] when the
    /// embedding's timer fires.
    Pending(ClickToken),
    /// Double click: an edit attempt started.
    Edit(EditStart),
    /// The press did not land on a loaded cell.
    Ignored,
}

/// Result of pasting CSV text over the grid.
#[derive(Debug, Clone, Default)]
pub struct PasteReport {
    /// One insert per CSV data row, restricted to matching columns.
    pub rows: Vec<RowInsert>,
    /// Cells that produced a value (best-effort count for the UI).
    pub populated_cells: usize,
    /// CSV header names with no live column counterpart.
    pub skipped_columns: Vec<String>,
}

/// Orchestrates one table view: paging, column preferences, in-page
/// search, edit gating, selection, and CSV interop.
///
/// State is owned exclusively by this instance for one
/// (connection, schema, table) context; no cross-table sharing.
pub struct DataGrid {
    connection_id: Uuid,
    table: TableRef,

    options: QueryOptions,
    total_pages: Option<u64>,
    page: Option<TablePage>,

    config: Vec<ColumnConfig>,
    config_store: ColumnConfigStore,

    relations: RelationMap,
    search: TableSearch,
    edits: EditGuard,
    clicks: ClickArbiter,
    filter_ids: FilterIdAllocator,

    selection: BTreeSet<usize>,
    fetch_seq: u64,
}

impl DataGrid {
    pub fn new(
        connection_id: Uuid,
        table: TableRef,
        store: Arc<dyn PreferenceStore>,
        foreign_keys: &[ForeignKey],
    ) -> Self {
        let relations = RelationMap::for_table(foreign_keys, &table);

        Self {
            connection_id,
            table,
            options: QueryOptions::default(),
            total_pages: None,
            page: None,
            config: Vec::new(),
            config_store: ColumnConfigStore::new(store),
            relations,
            search: TableSearch::new(),
            edits: EditGuard::new(),
            clicks: ClickArbiter::new(),
            filter_ids: FilterIdAllocator::new(),
            selection: BTreeSet::new(),
            fetch_seq: 0,
        }
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn page(&self) -> Option<&TablePage> {
        self.page.as_ref()
    }

    pub fn total_pages(&self) -> Option<u64> {
        self.total_pages
    }

    // === Fetch sequencing ===

    /// Snapshot the current options for a fetch. The caller runs the
    /// fetch collaborator (possibly on a background executor) and feeds
    /// the outcome to [`apply_fetch`](Self::apply_fetch).
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.fetch_seq += 1;
        FetchTicket {
            seq: self.fetch_seq,
            options: self.options.clone(),
        }
    }

    /// Apply a fetch outcome. Returns `Ok(false)` when the ticket went
    /// stale and the response was discarded. On error the last good page
    /// stays displayed; the fetch can be retried with a fresh ticket.
    pub fn apply_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<TablePage, GridError>,
    ) -> Result<bool, GridError> {
        if ticket.seq != self.fetch_seq {
            log::info!(
                "discarding stale fetch response for {} (seq {} != {})",
                self.table.qualified_name(),
                ticket.seq,
                self.fetch_seq
            );
            return Ok(false);
        }

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                log::error!("fetch failed for {}: {}", self.table.qualified_name(), e);
                return Err(e);
            }
        };

        self.total_pages = Some(page.total_pages);
        self.reconcile_config(&page);
        self.page = Some(page);
        self.selection.clear();
        self.rerun_search();

        Ok(true)
    }

    /// Synchronous fetch driver: snapshot, fetch, apply.
    pub fn refresh(&mut self, fetcher: &dyn TableFetcher) -> Result<bool, GridError> {
        let ticket = self.begin_fetch();
        let result = fetcher.fetch_page(&self.table, &ticket.options);
        self.apply_fetch(ticket, result)
    }

    /// Merge persisted column preferences with the live column set.
    ///
    /// Reload persistence is best effort: the failure is logged, the
    /// reconciled config stays usable. Explicit user mutations go through
    /// [`toggle_column`](Self::toggle_column) / [`move_column`](Self::move_column),
    /// which surface store failures.
    fn reconcile_config(&mut self, page: &TablePage) {
        let live = page.column_names();

        let base = if self.config.is_empty() {
            match self.config_store.load(self.connection_id, &self.table) {
                Ok(stored) => stored.unwrap_or_default(),
                Err(e) => {
                    log::warn!("failed to load column config: {}", e);
                    Vec::new()
                }
            }
        } else {
            std::mem::take(&mut self.config)
        };

        let reconciled = column_config::reconcile(&base, &live);
        if reconciled != base
            && let Err(e) =
                self.config_store
                    .save(self.connection_id, &self.table, &reconciled)
        {
            log::warn!("failed to persist reconciled column config: {}", e);
        }

        self.config = reconciled;
    }

    // === Query option transitions ===
    //
    // Each transition invalidates outstanding fetch tickets; the
    // embedding follows up with begin_fetch + the remote call.

    pub fn go_to_page(&mut self, page: u64) {
        self.options = self.options.go_to_page(page, self.total_pages);
        self.invalidate_fetches();
    }

    pub fn toggle_sort(&mut self, column: &str) {
        self.options = self.options.toggle_sort(column);
        self.invalidate_fetches();
    }

    /// Replace the filter list. Conditions referencing unknown columns or
    /// carrying the wrong value shape are dropped with a warning.
    pub fn set_filters(&mut self, filters: Vec<FilterCondition>) {
        let filters = match &self.page {
            Some(page) => {
                let known = page.column_names();
                filters
                    .into_iter()
                    .filter(|f| {
                        let valid = f.is_valid_for(&known);
                        if !valid {
                            log::warn!("dropping invalid filter on column {:?}", f.column);
                        }
                        valid
                    })
                    .collect()
            }
            None => filters,
        };

        self.options = self.options.set_filters(filters);
        self.invalidate_fetches();
    }

    pub fn clear_filters(&mut self) {
        self.options = self.options.clear_filters();
        self.invalidate_fetches();
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        self.options = self.options.set_page_size(page_size);
        self.invalidate_fetches();
    }

    /// Fresh id for a filter editor row, scoped to this grid instance.
    pub fn next_filter_id(&mut self) -> FilterId {
        self.filter_ids.next_id()
    }

    fn invalidate_fetches(&mut self) {
        self.fetch_seq += 1;
    }

    // === Column configuration ===

    pub fn column_config(&self) -> &[ColumnConfig] {
        &self.config
    }

    /// Visible column names in display order.
    pub fn visible_columns(&self) -> Vec<String> {
        column_config::display_columns(&self.config)
    }

    pub fn toggle_column(&mut self, name: &str) -> Result<(), GridError> {
        let mut next = self.config.clone();
        if !column_config::toggle_visibility(&mut next, name) {
            return Ok(());
        }
        self.persist_config(next)
    }

    pub fn move_column(&mut self, name: &str, position: usize) -> Result<(), GridError> {
        let mut next = self.config.clone();
        if !column_config::move_column(&mut next, name, position) {
            return Ok(());
        }
        self.persist_config(next)
    }

    /// Write-through: the store is updated first; only a successful write
    /// makes the new config authoritative.
    fn persist_config(&mut self, next: Vec<ColumnConfig>) -> Result<(), GridError> {
        self.config_store
            .save(self.connection_id, &self.table, &next)?;
        self.config = next;
        self.rerun_search();
        Ok(())
    }

    /// Visible columns paired with their cell index in the loaded rows.
    fn visible_cell_columns(&self) -> Vec<(usize, String)> {
        let Some(page) = &self.page else {
            return Vec::new();
        };

        self.visible_columns()
            .into_iter()
            .filter_map(|name| page.column_index(&name).map(|idx| (idx, name)))
            .collect()
    }

    // === Search ===

    pub fn set_search_query(&mut self, query: &str) {
        let columns = self.visible_cell_columns();
        let rows: &[Row] = self.page.as_ref().map(|p| p.rows.as_slice()).unwrap_or(&[]);
        self.search.update(query, rows, &columns);
    }

    fn rerun_search(&mut self) {
        if !self.search.query().is_empty() {
            let query = self.search.query().to_string();
            self.set_search_query(&query);
        }
    }

    pub fn search(&self) -> &TableSearch {
        &self.search
    }

    pub fn next_match(&mut self) -> Option<SearchMatch> {
        self.search.next().cloned()
    }

    pub fn previous_match(&mut self) -> Option<SearchMatch> {
        self.search.previous().cloned()
    }

    // === Relations ===

    pub fn column_risk(&self, column: &str) -> ColumnRisk {
        let primary_key = self.page.as_ref().and_then(|p| p.primary_key.as_deref());
        self.relations.classify(column, primary_key)
    }

    /// Where a foreign-key cell points, if the column carries a relation.
    pub fn relation_target(&self, row: usize, column: &str) -> Option<RelationTarget> {
        let fk = self.relations.relation_for(column)?;
        let value = self.page.as_ref()?.value_at(row, column)?;
        Some(resolve_target(fk, value))
    }

    // === Cell interaction ===

    pub fn on_cell_press(&mut self, row: usize, column: &str) -> CellInteraction {
        let cell_exists = self
            .page
            .as_ref()
            .and_then(|p| p.value_at(row, column))
            .is_some();
        if !cell_exists {
            return CellInteraction::Ignored;
        }

        match self.clicks.press(CellRef::new(row, column)) {
            ClickAction::ArmSingle(token) => CellInteraction::Pending(token),
            ClickAction::Double(cell) => match self.begin_edit(cell.row, &cell.column) {
                Some(start) => CellInteraction::Edit(start),
                None => CellInteraction::Ignored,
            },
        }
    }

    /// The embedding's single-click timer fired. Returns the cell to
    /// treat as single-clicked (cursor placement), or `None` if the
    /// token went stale.
    pub fn on_click_timer(&mut self, token: ClickToken) -> Option<CellRef> {
        self.clicks.timer_fired(token)
    }

    pub fn begin_edit(&mut self, row: usize, column: &str) -> Option<EditStart> {
        let page = self.page.as_ref()?;
        let original = page.value_at(row, column)?.clone();
        let risk = self.column_risk(column);

        Some(self.edits.begin(CellRef::new(row, column), original, risk))
    }

    pub fn confirm_edit(&mut self) -> bool {
        self.edits.confirm()
    }

    pub fn cancel_edit(&mut self) {
        self.edits.cancel();
    }

    pub fn stage_edit_text(&mut self, text: impl Into<String>) -> bool {
        self.edits.stage(text)
    }

    pub fn active_edit(&self) -> Option<&CellEdit> {
        self.edits.active()
    }

    /// Try to save the open editor, producing the mutation request for
    /// the remote collaborator. `Ok(SaveOutcome::NoOp)` means the editor
    /// closed with nothing to send.
    pub fn save_edit(&mut self) -> Result<SaveOutcome, GridError> {
        let Some(edit) = self.edits.active() else {
            return Err(GridError::Mutation("no edit in progress".to_string()));
        };
        let cell = edit.cell.clone();

        let Some(page) = &self.page else {
            return Err(GridError::Mutation("no page loaded".to_string()));
        };
        let Some(column) = page.column(&cell.column).cloned() else {
            return Err(GridError::Mutation(format!(
                "unknown column {:?}",
                cell.column
            )));
        };

        let key = page
            .primary_key
            .as_ref()
            .zip(page.primary_key_value(cell.row))
            .map(|(name, value)| RowKey::new(name.clone(), value.clone()));

        self.edits.save(&column, key)
    }

    /// Report the remote outcome of a commit produced by
    /// [`save_edit`](Self::save_edit). On success the committed value is
    /// written into the cached row and search is recomputed.
    pub fn finish_commit(&mut self, cell: &CellRef, success: bool) -> CommitResolution {
        let resolution = self.edits.finish_commit(cell, success);

        if let CommitResolution::Applied(value) = &resolution {
            self.write_cell(cell, value.clone());
            self.rerun_search();
        }

        resolution
    }

    /// Synchronous edit driver: save, run the mutator, resolve. Returns
    /// `Ok(true)` when a row was changed remotely, `Ok(false)` for a
    /// no-op save.
    pub fn commit_edit(&mut self, mutator: &dyn TableMutator) -> Result<bool, GridError> {
        let Some(edit) = self.edits.active() else {
            return Err(GridError::Mutation("no edit in progress".to_string()));
        };
        let cell = edit.cell.clone();

        let update = match self.save_edit()? {
            SaveOutcome::NoOp => return Ok(false),
            SaveOutcome::Commit(update) => update,
        };

        let outcome = mutator.update_row(&self.table, &update);
        match outcome {
            Ok(true) => {
                self.finish_commit(&cell, true);
                Ok(true)
            }
            Ok(false) => {
                self.finish_commit(&cell, false);
                Err(GridError::Mutation("update was rejected".to_string()))
            }
            Err(e) => {
                self.finish_commit(&cell, false);
                Err(e)
            }
        }
    }

    fn write_cell(&mut self, cell: &CellRef, value: Value) {
        let Some(page) = &mut self.page else {
            return;
        };
        let Some(idx) = page.column_index(&cell.column) else {
            return;
        };
        if let Some(row) = page.rows.get_mut(cell.row)
            && let Some(slot) = row.get_mut(idx)
        {
            *slot = value;
        }
    }

    // === Selection ===

    pub fn toggle_row_selection(&mut self, row: usize) {
        let in_range = self.page.as_ref().is_some_and(|p| row < p.row_count());
        if !in_range {
            return;
        }

        if !self.selection.remove(&row) {
            self.selection.insert(row);
        }
    }

    pub fn select_all(&mut self) {
        let count = self.page.as_ref().map_or(0, TablePage::row_count);
        self.selection = (0..count).collect();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Selected row indices, ascending.
    pub fn selected_rows(&self) -> Vec<usize> {
        self.selection.iter().copied().collect()
    }

    // === CSV interop ===

    /// Encode the selected rows (ascending index order), restricted to
    /// the visible columns in display order.
    pub fn selection_to_csv(&self, include_header: bool) -> Result<String, ExportError> {
        let Some(page) = &self.page else {
            return rows_to_csv(&[], &[], include_header);
        };

        let columns = self.visible_cell_columns();
        let names: Vec<String> = columns.iter().map(|(_, name)| name.clone()).collect();

        let rows: Vec<Row> = self
            .selection
            .iter()
            .filter_map(|row_idx| page.rows.get(*row_idx))
            .map(|row| {
                columns
                    .iter()
                    .map(|(idx, _)| row.get(*idx).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        rows_to_csv(&names, &rows, include_header)
    }

    /// Decode pasted CSV text into insert requests, matching header
    /// names against live columns. Best effort by contract: unknown
    /// columns and unparseable cells are skipped, never an error.
    pub fn paste_rows(&self, text: &str) -> PasteReport {
        let Some(page) = &self.page else {
            return PasteReport::default();
        };

        let decoded = parse_csv(text);
        let mut report = PasteReport::default();

        let matched: Vec<Option<&tabula_core::ColumnMeta>> = decoded
            .columns
            .iter()
            .map(|name| page.column(name))
            .collect();

        for (name, column) in decoded.columns.iter().zip(&matched) {
            if column.is_none() {
                report.skipped_columns.push(name.clone());
            }
        }

        for csv_row in &decoded.rows {
            let mut values = Vec::new();
            for (cell, column) in csv_row.iter().zip(&matched) {
                let Some(column) = column else {
                    continue;
                };
                match parse_staged(cell, column) {
                    Ok(value) => {
                        values.push((column.name.clone(), value));
                        report.populated_cells += 1;
                    }
                    Err(e) => {
                        log::warn!("skipping unparseable pasted cell for {}: {}", column.name, e);
                    }
                }
            }
            report.rows.push(RowInsert::new(values));
        }

        report
    }

    /// Paste and insert in one step: decode, then insert each non-empty
    /// row through the mutation collaborator. The caller refreshes the
    /// page afterwards.
    pub fn paste_and_insert(
        &mut self,
        text: &str,
        mutator: &dyn TableMutator,
    ) -> Result<PasteReport, GridError> {
        let report = self.paste_rows(text);

        for insert in report.rows.iter().filter(|r| !r.is_empty()) {
            if !mutator.insert_row(&self.table, insert)? {
                return Err(GridError::Mutation("insert was rejected".to_string()));
            }
        }

        Ok(report)
    }

    // === Deletion ===

    /// Row keys for the selected rows. Any selected row without a usable
    /// primary key value aborts the whole plan.
    pub fn delete_selection_plan(&self) -> Result<Vec<RowKey>, GridError> {
        let Some(page) = &self.page else {
            return Ok(Vec::new());
        };
        let Some(pk_name) = page.primary_key.clone() else {
            return Err(GridError::MissingPrimaryKey);
        };

        self.selection
            .iter()
            .map(|row_idx| {
                page.primary_key_value(*row_idx)
                    .map(|value| RowKey::new(pk_name.clone(), value.clone()))
                    .ok_or(GridError::MissingPrimaryKey)
            })
            .collect()
    }

    /// Delete the selected rows through the mutation collaborator.
    /// Returns the number of rows deleted; the caller refreshes the page
    /// afterwards. Stops at the first failure.
    pub fn delete_selection(&mut self, mutator: &dyn TableMutator) -> Result<usize, GridError> {
        let keys = self.delete_selection_plan()?;
        let mut deleted = 0;

        for key in &keys {
            match mutator.delete_row(&self.table, key)? {
                true => deleted += 1,
                false => {
                    return Err(GridError::Mutation(format!(
                        "delete was rejected after {} rows",
                        deleted
                    )));
                }
            }
        }

        self.selection.clear();
        log::info!(
            "deleted {} rows from {}",
            deleted,
            self.table.qualified_name()
        );
        Ok(deleted)
    }
}
