use crate::query_options::QueryOptions;
use tabula_core::{ForeignKey, GridError, RowInsert, RowKey, RowUpdate, TablePage, TableRef, Uuid};

/// Remote fetch collaborator.
///
/// Implementations issue the paged SELECT and shape the result. Must be
/// idempotent and side-effect-free; the engine may call it again with
/// the same options to retry a failed fetch. `Send + Sync` so the
/// embedding can run it on a background executor.
pub trait TableFetcher: Send + Sync {
    fn fetch_page(&self, table: &TableRef, options: &QueryOptions)
    -> Result<TablePage, GridError>;
}

/// Remote mutation collaborator.
///
/// The boolean result is the remote's success flag; failure detail
/// travels in the error. Concurrent updates to different cells of the
/// same row are merged remotely, not by this engine.
pub trait TableMutator: Send + Sync {
    fn insert_row(&self, table: &TableRef, insert: &RowInsert) -> Result<bool, GridError>;
    fn update_row(&self, table: &TableRef, update: &RowUpdate) -> Result<bool, GridError>;
    fn delete_row(&self, table: &TableRef, key: &RowKey) -> Result<bool, GridError>;
}

/// Schema collaborator supplying foreign-key edges for a connection.
/// Fetched once per connection and cached for the session.
pub trait RelationSource: Send + Sync {
    fn foreign_keys(&self, connection_id: Uuid) -> Result<Vec<ForeignKey>, GridError>;
}
