use tabula_core::Row;

/// One cell found to contain the search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    /// Index of the row within the currently loaded page.
    pub row: usize,
    pub column: String,
    /// Canonical text of the matched cell.
    pub value: String,
}

/// Scan rows for a case-insensitive substring match.
///
/// `columns` pairs each visible column's cell index with its name, in
/// display order. Matches come out in row-major order (outer loop over
/// rows, inner loop over the given column order) so "next match" moves
/// monotonically down the grid. Null cells are skipped.
pub fn search_rows(rows: &[Row], columns: &[(usize, String)], query: &str) -> Vec<SearchMatch> {
    if query.is_empty() {
        return Vec::new();
    }

    let needle = query.to_lowercase();
    let mut matches = Vec::new();

    for (row_idx, row) in rows.iter().enumerate() {
        for (cell_idx, name) in columns {
            let Some(value) = row.get(*cell_idx) else {
                continue;
            };
            if value.is_null() {
                continue;
            }

            let text = value.canonical_text();
            if text.to_lowercase().contains(&needle) {
                matches.push(SearchMatch {
                    row: row_idx,
                    column: name.clone(),
                    value: text,
                });
            }
        }
    }

    matches
}

/// In-page search state with cyclic match navigation.
///
/// Recomputed whenever the query text or the visible row/column set
/// changes; never persisted. `current` is `None` exactly when there are
/// no matches.
#[derive(Debug, Clone, Default)]
pub struct TableSearch {
    query: String,
    matches: Vec<SearchMatch>,
    current: Option<usize>,
}

impl TableSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute matches for a new query and/or row set. An empty query
    /// resets to the cleared state.
    pub fn update(&mut self, query: &str, rows: &[Row], columns: &[(usize, String)]) {
        if query.is_empty() {
            self.clear();
            return;
        }

        self.query = query.to_string();
        self.matches = search_rows(rows, columns, query);
        self.current = if self.matches.is_empty() { None } else { Some(0) };
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.matches.clear();
        self.current = None;
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn current(&self) -> Option<&SearchMatch> {
        self.current.and_then(|idx| self.matches.get(idx))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn is_highlighting(&self) -> bool {
        !self.matches.is_empty()
    }

    /// Advance to the next match, wrapping past the end.
    pub fn next(&mut self) -> Option<&SearchMatch> {
        let len = self.matches.len();
        if len == 0 {
            return None;
        }

        let next = match self.current {
            Some(idx) => (idx + 1) % len,
            None => 0,
        };
        self.current = Some(next);
        self.matches.get(next)
    }

    /// Step back to the previous match, wrapping from the start to the
    /// end of the list.
    pub fn previous(&mut self) -> Option<&SearchMatch> {
        let len = self.matches.len();
        if len == 0 {
            return None;
        }

        let prev = match self.current {
            Some(idx) if idx > 0 => idx - 1,
            _ => len - 1,
        };
        self.current = Some(prev);
        self.matches.get(prev)
    }
}
