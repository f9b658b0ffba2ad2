mod crud;
mod error;
mod page;
mod schema;
mod store;
mod table;
mod value;

pub use crud::{CellChange, RowInsert, RowKey, RowUpdate};
pub use error::GridError;
pub use page::{ColumnMeta, Row, TablePage};
pub use schema::ForeignKey;
pub use store::{JsonFileStore, MemoryStore, PreferenceStore};
pub use table::{SortDirection, TableRef};
pub use value::Value;

pub use uuid::Uuid;
