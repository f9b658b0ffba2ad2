use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tabula_core::{
    ForeignKey, GridError, RowInsert, RowKey, RowUpdate, TablePage, TableRef, Uuid,
};
use tabula_grid::{QueryOptions, RelationSource, TableFetcher, TableMutator};

#[derive(Debug, Clone, Default)]
pub struct FakeBackendStats {
    pub fetched_options: Vec<QueryOptions>,
    pub updates: Vec<RowUpdate>,
    pub inserts: Vec<RowInsert>,
    pub deletes: Vec<RowKey>,
    pub relation_fetches: usize,
}

#[derive(Default)]
struct FakeBackendState {
    pages: RwLock<HashMap<u64, TablePage>>,
    default_page: RwLock<Option<TablePage>>,
    fetch_error: RwLock<Option<String>>,
    mutation_error: RwLock<Option<String>>,
    reject_mutations: RwLock<bool>,
    foreign_keys: RwLock<Vec<ForeignKey>>,

    fetched_options: Mutex<Vec<QueryOptions>>,
    updates: Mutex<Vec<RowUpdate>>,
    inserts: Mutex<Vec<RowInsert>>,
    deletes: Mutex<Vec<RowKey>>,
    relation_fetches: Mutex<usize>,
}

/// Scripted stand-in for the remote fetch/mutation/schema collaborators.
///
/// Pages are keyed by page number; mutations succeed unless an error or
/// rejection is injected. Every call is recorded for assertions.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<FakeBackendState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, page_number: u64, page: TablePage) -> Self {
        rwlock_write(&self.state.pages).insert(page_number, page);
        self
    }

    pub fn with_default_page(self, page: TablePage) -> Self {
        *rwlock_write(&self.state.default_page) = Some(page);
        self
    }

    pub fn with_fetch_error(self, message: impl Into<String>) -> Self {
        *rwlock_write(&self.state.fetch_error) = Some(message.into());
        self
    }

    pub fn with_mutation_error(self, message: impl Into<String>) -> Self {
        *rwlock_write(&self.state.mutation_error) = Some(message.into());
        self
    }

    /// Make mutations return `Ok(false)` (remote rejected, no error).
    pub fn with_rejected_mutations(self) -> Self {
        *rwlock_write(&self.state.reject_mutations) = true;
        self
    }

    pub fn with_foreign_keys(self, foreign_keys: Vec<ForeignKey>) -> Self {
        *rwlock_write(&self.state.foreign_keys) = foreign_keys;
        self
    }

    pub fn set_fetch_error(&self, message: Option<String>) {
        *rwlock_write(&self.state.fetch_error) = message;
    }

    pub fn set_page(&self, page_number: u64, page: TablePage) {
        rwlock_write(&self.state.pages).insert(page_number, page);
    }

    pub fn stats(&self) -> FakeBackendStats {
        FakeBackendStats {
            fetched_options: mutex_lock(&self.state.fetched_options).clone(),
            updates: mutex_lock(&self.state.updates).clone(),
            inserts: mutex_lock(&self.state.inserts).clone(),
            deletes: mutex_lock(&self.state.deletes).clone(),
            relation_fetches: *mutex_lock(&self.state.relation_fetches),
        }
    }

    fn mutation_outcome(&self) -> Result<bool, GridError> {
        if let Some(message) = rwlock_read(&self.state.mutation_error).clone() {
            return Err(GridError::Mutation(message));
        }
        Ok(!*rwlock_read(&self.state.reject_mutations))
    }
}

impl TableFetcher for FakeBackend {
    fn fetch_page(
        &self,
        _table: &TableRef,
        options: &QueryOptions,
    ) -> Result<TablePage, GridError> {
        mutex_lock(&self.state.fetched_options).push(options.clone());

        if let Some(message) = rwlock_read(&self.state.fetch_error).clone() {
            return Err(GridError::Fetch(message));
        }

        if let Some(page) = rwlock_read(&self.state.pages).get(&options.page) {
            return Ok(page.clone());
        }

        if let Some(page) = rwlock_read(&self.state.default_page).clone() {
            return Ok(page);
        }

        Ok(TablePage::empty())
    }
}

impl TableMutator for FakeBackend {
    fn insert_row(&self, _table: &TableRef, insert: &RowInsert) -> Result<bool, GridError> {
        mutex_lock(&self.state.inserts).push(insert.clone());
        self.mutation_outcome()
    }

    fn update_row(&self, _table: &TableRef, update: &RowUpdate) -> Result<bool, GridError> {
        mutex_lock(&self.state.updates).push(update.clone());
        self.mutation_outcome()
    }

    fn delete_row(&self, _table: &TableRef, key: &RowKey) -> Result<bool, GridError> {
        mutex_lock(&self.state.deletes).push(key.clone());
        self.mutation_outcome()
    }
}

impl RelationSource for FakeBackend {
    fn foreign_keys(&self, _connection_id: Uuid) -> Result<Vec<ForeignKey>, GridError> {
        *mutex_lock(&self.state.relation_fetches) += 1;
        Ok(rwlock_read(&self.state.foreign_keys).clone())
    }
}

fn rwlock_read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().expect("fake backend lock poisoned")
}

fn rwlock_write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().expect("fake backend lock poisoned")
}

fn mutex_lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().expect("fake backend lock poisoned")
}
