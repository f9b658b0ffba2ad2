use crate::relation_map::ColumnRisk;
use std::collections::HashMap;
use tabula_core::{CellChange, ColumnMeta, GridError, RowKey, RowUpdate, Value};

/// Identifies a cell within the currently loaded page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub row: usize,
    pub column: String,
}

impl CellRef {
    pub fn new(row: usize, column: impl Into<String>) -> Self {
        Self {
            row,
            column: column.into(),
        }
    }
}

/// Where a cell-edit attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPhase {
    /// Waiting for the user to acknowledge the primary/foreign-key
    /// warning. Advisory, not blocking: confirming always proceeds.
    WarningPending,
    Editing,
}

/// A staged, not-yet-committed edit of a single cell.
#[derive(Debug, Clone)]
pub struct CellEdit {
    pub cell: CellRef,
    pub original: Value,
    /// Text form being edited; parsed only on save.
    pub staged: String,
    pub risk: ColumnRisk,
    pub phase: EditPhase,
}

/// Outcome of an edit gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStart {
    Opened,
    /// Primary/foreign column: an explicit confirmation is required
    /// before the editor opens.
    NeedsConfirmation(ColumnRisk),
    /// A commit for this same cell is still in flight.
    CommitInFlight,
}

/// Outcome of a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Staged value equals the original; the editor closes and no
    /// mutation request is produced.
    NoOp,
    /// Hand this to the mutation collaborator, then report back through
    /// [`EditGuard::finish_commit`].
    Commit(RowUpdate),
}

/// Resolution of an in-flight commit.
#[derive(Debug, Clone)]
pub enum CommitResolution {
    /// Committed; the caller should write `value` into its cached row.
    Applied(Value),
    /// Commit failed and the editor reopened with the staged text intact.
    Reopened,
    /// Commit failed while another cell was being edited; the failed edit
    /// is handed back for the caller to surface.
    Abandoned(CellEdit),
    /// No commit was tracked for that cell.
    Unknown,
}

/// Parse staged cell text according to the column's declared type.
///
/// The empty string normalizes to null. JSON-typed columns and
/// JSON-shaped text (`{…}`/`[…]`) must parse as JSON; anything else
/// passes through as raw text for the remote collaborator to bind.
pub fn parse_staged(text: &str, column: &ColumnMeta) -> Result<Value, GridError> {
    if text.is_empty() {
        return Ok(Value::Null);
    }

    let trimmed = text.trim();
    let json_shaped = trimmed.starts_with('{') || trimmed.starts_with('[');

    if column.is_json_typed() || json_shaped {
        return serde_json::from_str::<serde_json::Value>(trimmed)
            .map(Value::from_json)
            .map_err(|e| GridError::InvalidJson(e.to_string()));
    }

    Ok(Value::Text(text.to_string()))
}

/// Per-cell edit state machine.
///
/// One editor can be open at a time, but commits are tracked per cell:
/// a commit in flight blocks re-entrant edits of that cell only, while
/// other cells stay editable.
#[derive(Debug, Default)]
pub struct EditGuard {
    active: Option<CellEdit>,
    committing: HashMap<CellRef, (CellEdit, Value)>,
}

impl EditGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&CellEdit> {
        self.active.as_ref()
    }

    pub fn is_committing(&self, cell: &CellRef) -> bool {
        self.committing.contains_key(cell)
    }

    /// Start an edit attempt. Primary/foreign columns route through a
    /// confirmation step first; normal columns open directly. Replaces
    /// any previously open editor.
    pub fn begin(&mut self, cell: CellRef, original: Value, risk: ColumnRisk) -> EditStart {
        if self.is_committing(&cell) {
            return EditStart::CommitInFlight;
        }

        let phase = if risk.needs_confirmation() {
            EditPhase::WarningPending
        } else {
            EditPhase::Editing
        };

        let staged = original.canonical_text();
        self.active = Some(CellEdit {
            cell,
            original,
            staged,
            risk,
            phase,
        });

        match phase {
            EditPhase::Editing => EditStart::Opened,
            EditPhase::WarningPending => EditStart::NeedsConfirmation(risk),
        }
    }

    /// Acknowledge the risk warning and open the editor.
    pub fn confirm(&mut self) -> bool {
        match &mut self.active {
            Some(edit) if edit.phase == EditPhase::WarningPending => {
                edit.phase = EditPhase::Editing;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) -> Option<CellEdit> {
        self.active.take()
    }

    /// Replace the staged text of the open editor.
    pub fn stage(&mut self, text: impl Into<String>) -> bool {
        match &mut self.active {
            Some(edit) if edit.phase == EditPhase::Editing => {
                edit.staged = text.into();
                true
            }
            _ => false,
        }
    }

    /// Try to save the open editor.
    ///
    /// - Unparseable JSON keeps the editor open, staged text intact.
    /// - A staged value whose canonical text equals the original's is a
    ///   no-op: the editor closes and no mutation request is produced.
    /// - A missing row key aborts without a remote call; the editor stays
    ///   open so the text is not lost.
    /// - Otherwise the edit moves to committing and a [`RowUpdate`] is
    ///   returned for the mutation collaborator.
    pub fn save(
        &mut self,
        column: &ColumnMeta,
        key: Option<RowKey>,
    ) -> Result<SaveOutcome, GridError> {
        let Some(edit) = self.active.take() else {
            return Err(GridError::Mutation("no edit in progress".to_string()));
        };
        if edit.phase != EditPhase::Editing {
            self.active = Some(edit);
            return Err(GridError::Mutation("edit not confirmed".to_string()));
        }

        let parsed = match parse_staged(&edit.staged, column) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.active = Some(edit);
                return Err(e);
            }
        };

        if parsed.canonical_text() == edit.original.canonical_text() {
            return Ok(SaveOutcome::NoOp);
        }

        let Some(key) = key else {
            self.active = Some(edit);
            return Err(GridError::MissingPrimaryKey);
        };

        let update = RowUpdate::new(
            key,
            vec![CellChange {
                column: edit.cell.column.clone(),
                value: parsed.clone(),
                column_type: column.type_name.clone(),
            }],
        );
        self.committing.insert(edit.cell.clone(), (edit, parsed));

        Ok(SaveOutcome::Commit(update))
    }

    /// Report the result of an in-flight commit.
    pub fn finish_commit(&mut self, cell: &CellRef, success: bool) -> CommitResolution {
        let Some((mut edit, parsed)) = self.committing.remove(cell) else {
            return CommitResolution::Unknown;
        };

        if success {
            return CommitResolution::Applied(parsed);
        }

        if self.active.is_none() {
            edit.phase = EditPhase::Editing;
            self.active = Some(edit);
            CommitResolution::Reopened
        } else {
            CommitResolution::Abandoned(edit)
        }
    }
}

/// Token identifying one armed single-click. Stale tokens (superseded by
/// a double-click or a newer press) are ignored when the timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickToken(u64);

/// What a press resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
    /// First press: arm a single click and start the caller's timer.
    ArmSingle(ClickToken),
    /// Second press on the same cell before the timer: a double click.
    Double(CellRef),
}

/// Explicit two-click/double-click disambiguation.
///
/// The caller owns the actual timer; this machine only decides which
/// press wins: `Idle → PendingSingle(token) → committed single (timer
/// fires with a live token) | superseded (second press arrives first)`.
#[derive(Debug, Default)]
pub struct ClickArbiter {
    seq: u64,
    pending: Option<(CellRef, ClickToken)>,
}

impl ClickArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, cell: CellRef) -> ClickAction {
        if let Some((pending_cell, _)) = &self.pending
            && pending_cell == &cell
        {
            self.pending = None;
            return ClickAction::Double(cell);
        }

        self.seq += 1;
        let token = ClickToken(self.seq);
        self.pending = Some((cell, token));
        ClickAction::ArmSingle(token)
    }

    /// The caller's single-click timer fired. Returns the cell to treat
    /// as single-clicked, or `None` if the token went stale.
    pub fn timer_fired(&mut self, token: ClickToken) -> Option<CellRef> {
        match &self.pending {
            Some((_, pending_token)) if *pending_token == token => {
                self.pending.take().map(|(cell, _)| cell)
            }
            _ => None,
        }
    }
}
