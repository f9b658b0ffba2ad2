use tabula_core::SortDirection;

/// Page sizes the grid offers.
pub const PAGE_SIZES: &[u32] = &[10, 25, 50, 100, 250, 500];

pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Active sort column and direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Closed set of filter operators the fetch collaborator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    In,
    IsNull,
    IsNotNull,
}

impl FilterOperator {
    /// The value shape this operator expects.
    pub fn arity(&self) -> FilterArity {
        match self {
            Self::In => FilterArity::List,
            Self::IsNull | Self::IsNotNull => FilterArity::None,
            _ => FilterArity::Single,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterArity {
    None,
    Single,
    List,
}

/// Operand of a filter condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    None,
    Single(String),
    List(Vec<String>),
}

impl FilterValue {
    fn arity(&self) -> FilterArity {
        match self {
            Self::None => FilterArity::None,
            Self::Single(_) => FilterArity::Single,
            Self::List(_) => FilterArity::List,
        }
    }
}

/// Identifier for a filter row in the filter editor.
///
/// Allocated by a [`FilterIdAllocator`] owned by the grid instance, so
/// ids stay stable within one table view without any global counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterId(pub u32);

#[derive(Debug, Default)]
pub struct FilterIdAllocator {
    next: u32,
}

impl FilterIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> FilterId {
        let id = FilterId(self.next);
        self.next += 1;
        id
    }
}

/// One filter condition on the browsed table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCondition {
    pub id: FilterId,
    pub column: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl FilterCondition {
    pub fn new(
        id: FilterId,
        column: impl Into<String>,
        operator: FilterOperator,
        value: FilterValue,
    ) -> Self {
        Self {
            id,
            column: column.into(),
            operator,
            value,
        }
    }

    /// A condition is usable when its column is known and its value shape
    /// matches the operator.
    pub fn is_valid_for(&self, known_columns: &[String]) -> bool {
        known_columns.iter().any(|c| c == &self.column)
            && self.operator.arity() == self.value.arity()
    }
}

/// Query options for the remote fetch: pagination, sorting, filtering.
///
/// Every transition is a pure function from the current state to a new
/// one; the manager performs no I/O. The fetch collaborator consumes the
/// resulting state wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub page: u64,
    pub page_size: u32,
    pub sort: Option<SortKey>,
    pub filters: Vec<FilterCondition>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: None,
            filters: Vec::new(),
        }
    }
}

impl QueryOptions {
    /// Jump to a page, clamped to `[1, total_pages]` once the total is
    /// known. Before the first fetch any page ≥ 1 is accepted; the fetch
    /// collaborator reports an empty page if it is out of range.
    pub fn go_to_page(&self, page: u64, total_pages: Option<u64>) -> Self {
        let mut page = page.max(1);
        if let Some(total) = total_pages
            && total > 0
        {
            page = page.min(total);
        }

        Self {
            page,
            ..self.clone()
        }
    }

    /// Cycle the sort state for a column: unsorted → ascending →
    /// descending → unsorted. Clicking a different column starts over at
    /// ascending. Any change resets to page 1, since reordering
    /// invalidates the current page.
    pub fn toggle_sort(&self, column: &str) -> Self {
        let sort = match &self.sort {
            Some(key) if key.column == column => match key.direction {
                SortDirection::Ascending => Some(SortKey::desc(column)),
                SortDirection::Descending => None,
            },
            _ => Some(SortKey::asc(column)),
        };

        Self {
            page: 1,
            sort,
            ..self.clone()
        }
    }

    /// Replace the filter list wholesale. Resets to page 1, since
    /// changing the result set invalidates the current page.
    pub fn set_filters(&self, filters: Vec<FilterCondition>) -> Self {
        Self {
            page: 1,
            filters,
            ..self.clone()
        }
    }

    pub fn clear_filters(&self) -> Self {
        self.set_filters(Vec::new())
    }

    /// Change the page size and reset to page 1. Sizes outside
    /// [`PAGE_SIZES`] leave the state unchanged.
    pub fn set_page_size(&self, page_size: u32) -> Self {
        if !PAGE_SIZES.contains(&page_size) {
            return self.clone();
        }

        Self {
            page: 1,
            page_size,
            ..self.clone()
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.page_size as u64
    }
}
