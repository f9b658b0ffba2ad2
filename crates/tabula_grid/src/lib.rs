mod column_config;
mod controller;
mod edit;
mod query_options;
mod relation_map;
mod search;
mod traits;

pub use column_config::{
    ColumnConfig, ColumnConfigStore, display_columns, move_column, reconcile, toggle_visibility,
};
pub use controller::{CellInteraction, DataGrid, FetchTicket, PasteReport};
pub use edit::{
    CellEdit, CellRef, ClickAction, ClickArbiter, ClickToken, CommitResolution, EditGuard,
    EditPhase, EditStart, SaveOutcome, parse_staged,
};
pub use query_options::{
    DEFAULT_PAGE_SIZE, FilterArity, FilterCondition, FilterId, FilterIdAllocator, FilterOperator,
    FilterValue, PAGE_SIZES, QueryOptions, SortKey,
};
pub use relation_map::{
    ColumnRisk, RelationCatalog, RelationIndex, RelationMap, RelationTarget, resolve_target,
};
pub use search::{SearchMatch, TableSearch, search_rows};
pub use traits::{RelationSource, TableFetcher, TableMutator};
