//! Local, editable view of one customer's quote.
//!
//! A [`QuoteSheet`] keeps every material line next to the last value the store
//! confirmed for it. Edits are applied locally first ([`QuoteSheet::begin`]),
//! then committed by the engine; the resulting [`MutationOutcome`] is fed back
//! through [`QuoteSheet::settle`]. Whether a failed edit is rolled back is the
//! caller's decision ([`QuoteSheet::rollback`]).

use rust_decimal::Decimal;

use fieldquote_core::entity::{find_by_id, position_of};
use fieldquote_core::{DomainError, DomainResult, Entity, MaterialLineId};

use crate::customer::CustomerRecord;
use crate::line::{LineEdit, MaterialLine, compute_total};

const ENTITY: &str = "material line";

/// Per-line synchronisation marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Local value equals the last confirmed value.
    Persisted,
    /// Applied locally, commit not yet answered.
    Dirty,
    /// The last commit failed; the local value was kept.
    Failed,
}

/// A material line with its last confirmed snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedLine {
    line: MaterialLine,
    confirmed: MaterialLine,
    sync: SyncState,
}

impl TrackedLine {
    fn persisted(line: MaterialLine) -> Self {
        Self {
            confirmed: line.clone(),
            line,
            sync: SyncState::Persisted,
        }
    }

    pub fn line(&self) -> &MaterialLine {
        &self.line
    }

    pub fn confirmed(&self) -> &MaterialLine {
        &self.confirmed
    }

    pub fn sync(&self) -> SyncState {
        self.sync
    }
}

impl Entity for TrackedLine {
    type Id = MaterialLineId;

    fn id(&self) -> &Self::Id {
        self.line.id()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingChange {
    Edit(LineEdit),
    /// The line was taken out of the sheet at `index`.
    Remove { removed: TrackedLine, index: usize },
}

/// A change already applied to the sheet and awaiting commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    line_id: MaterialLineId,
    change: PendingChange,
}

impl PendingMutation {
    pub fn line_id(&self) -> MaterialLineId {
        self.line_id
    }

    pub fn change(&self) -> &PendingChange {
        &self.change
    }
}

/// Result of the two-phase mutation cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Applied locally; no answer from the store yet.
    AppliedLocally(PendingMutation),
    /// The store accepted the change. `stored` is the row it returned for edits.
    Confirmed {
        pending: PendingMutation,
        stored: Option<MaterialLine>,
    },
    /// The store rejected or could not apply the change.
    Failed {
        pending: PendingMutation,
        reason: DomainError,
    },
}

impl MutationOutcome {
    pub fn pending(&self) -> &PendingMutation {
        match self {
            MutationOutcome::AppliedLocally(pending)
            | MutationOutcome::Confirmed { pending, .. }
            | MutationOutcome::Failed { pending, .. } => pending,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, MutationOutcome::Confirmed { .. })
    }

    pub fn failure(&self) -> Option<&DomainError> {
        match self {
            MutationOutcome::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

impl From<PendingMutation> for MutationOutcome {
    fn from(pending: PendingMutation) -> Self {
        MutationOutcome::AppliedLocally(pending)
    }
}

/// One customer with its material lines, as held by the editing UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteSheet {
    customer: CustomerRecord,
    lines: Vec<TrackedLine>,
}

impl QuoteSheet {
    /// Build a sheet from confirmed store state.
    pub fn new(customer: CustomerRecord, lines: Vec<MaterialLine>) -> Self {
        Self {
            customer,
            lines: lines.into_iter().map(TrackedLine::persisted).collect(),
        }
    }

    pub fn customer(&self) -> &CustomerRecord {
        &self.customer
    }

    pub fn set_customer(&mut self, customer: CustomerRecord) {
        self.customer = customer;
    }

    pub fn lines(&self) -> &[TrackedLine] {
        &self.lines
    }

    pub fn line(&self, id: MaterialLineId) -> Option<&TrackedLine> {
        find_by_id(&self.lines, &id)
    }

    pub fn material_lines(&self) -> impl Iterator<Item = &MaterialLine> {
        self.lines.iter().map(|t| &t.line)
    }

    /// Order total over the current local values.
    pub fn total(&self) -> Decimal {
        compute_total(self.material_lines())
    }

    /// Append a line the store has already confirmed.
    pub(crate) fn push_confirmed(&mut self, line: MaterialLine) {
        self.lines.push(TrackedLine::persisted(line));
    }

    fn index_of(&self, id: MaterialLineId) -> DomainResult<usize> {
        position_of(&self.lines, &id).ok_or_else(|| DomainError::not_found(ENTITY, id.get()))
    }

    /// Apply `edit` locally and mark the line dirty.
    pub fn begin(&mut self, id: MaterialLineId, edit: LineEdit) -> DomainResult<PendingMutation> {
        let index = self.index_of(id)?;
        let edit = edit.normalized();
        let tracked = &mut self.lines[index];
        edit.apply_to(&mut tracked.line);
        tracked.sync = SyncState::Dirty;
        Ok(PendingMutation {
            line_id: id,
            change: PendingChange::Edit(edit),
        })
    }

    /// Take the line out of the sheet, keeping it in the pending mutation.
    pub fn begin_remove(&mut self, id: MaterialLineId) -> DomainResult<PendingMutation> {
        let index = self.index_of(id)?;
        let mut removed = self.lines.remove(index);
        removed.sync = SyncState::Dirty;
        Ok(PendingMutation {
            line_id: id,
            change: PendingChange::Remove { removed, index },
        })
    }

    /// Record the store's answer. Failed edits keep their local value.
    ///
    /// A confirmation only settles the column its edit touched. Other edits
    /// still staged or failed on the same line keep their local values, and
    /// the line stays marked until those are answered too.
    pub fn settle(&mut self, outcome: &MutationOutcome) {
        let Some(index) = position_of(&self.lines, &outcome.pending().line_id) else {
            return;
        };
        let tracked = &mut self.lines[index];
        match outcome {
            MutationOutcome::AppliedLocally(_) => tracked.sync = SyncState::Dirty,
            MutationOutcome::Confirmed { pending, stored } => {
                let PendingChange::Edit(edit) = &pending.change else {
                    return;
                };
                let stored = stored.clone().unwrap_or_else(|| {
                    let mut line = tracked.confirmed.clone();
                    edit.apply_to(&mut line);
                    line
                });
                if edit.is_applied_to(&tracked.line) {
                    edit.copy_field(&stored, &mut tracked.line);
                }
                edit.copy_field(&stored, &mut tracked.confirmed);
                if tracked.line == tracked.confirmed {
                    tracked.sync = SyncState::Persisted;
                }
            }
            MutationOutcome::Failed { .. } => tracked.sync = SyncState::Failed,
        }
    }

    /// Restore the last confirmed state touched by `pending`.
    pub fn rollback(&mut self, pending: &PendingMutation) {
        match &pending.change {
            PendingChange::Edit(_) => {
                if let Some(index) = position_of(&self.lines, &pending.line_id) {
                    let tracked = &mut self.lines[index];
                    tracked.line = tracked.confirmed.clone();
                    tracked.sync = SyncState::Persisted;
                }
            }
            PendingChange::Remove { removed, index } => {
                if self.line(pending.line_id).is_none() {
                    let restored = TrackedLine::persisted(removed.confirmed.clone());
                    let at = (*index).min(self.lines.len());
                    self.lines.insert(at, restored);
                }
            }
        }
        tracing::debug!(line_id = %pending.line_id, "local change rolled back");
    }
}
