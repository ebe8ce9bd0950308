//! Selection state machine
//!
//! Owns the [`ProjectState`] of an open project together with the undo
//! history and an in-memory index of each card's printings. Every operation
//! that changes a card's selection state records the previous state first;
//! browsing and navigation do not.

use crate::filter::{candidates, CandidateList, FilterConfiguration};
use crate::models::{sort_newest_first, CardIdentity, PrintingId, PrintingRecord};
use crate::project::ProjectState;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Selection state of one card
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    /// Position in the card's current candidate list. `None` until browsing
    /// starts, and whenever the candidate list is empty.
    pub cursor_index: Option<usize>,
    /// Chosen printing; kept even if it no longer passes the filters
    pub selected_printing: Option<PrintingId>,
    /// Ignore the global filters for this card
    pub all_prints_override: bool,
}

/// Coarse view of a [`SelectionState`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionPhase {
    Unselected,
    Browsing(usize),
    Selected(PrintingId),
}

impl SelectionState {
    pub fn phase(&self) -> SelectionPhase {
        match (&self.selected_printing, self.cursor_index) {
            (Some(id), _) => SelectionPhase::Selected(id.clone()),
            (None, Some(cursor)) => SelectionPhase::Browsing(cursor),
            (None, None) => SelectionPhase::Unselected,
        }
    }

    pub fn is_selected(&self) -> bool {
        self.selected_printing.is_some()
    }
}

/// Snapshot taken before a mutating operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoEntry {
    pub card_identity: CardIdentity,
    pub previous: SelectionState,
}

/// Result of [`Selector::undo`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    Restored(CardIdentity),
    NothingToUndo,
}

/// Result of [`Selector::select_current`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    Selected(PrintingId),
    /// The candidate list is empty; nothing changed
    NoCandidates,
}

/// Selected / total card counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub selected: usize,
    pub total: usize,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.selected == self.total
    }
}

/// Bounded stack of selection snapshots; the oldest entry is dropped when
/// full
#[derive(Debug, Clone)]
struct UndoStack {
    entries: VecDeque<UndoEntry>,
    limit: usize,
}

impl UndoStack {
    fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    fn push(&mut self, entry: UndoEntry) {
        if self.limit == 0 {
            return;
        }
        if self.entries.len() == self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    fn pop(&mut self) -> Option<UndoEntry> {
        self.entries.pop_back()
    }
}

/// Map a cursor from one candidate list onto another: stay on the same
/// printing if it is still offered, otherwise clamp
fn reanchor(old: &CandidateList, new: &CandidateList, cursor: Option<usize>) -> Option<usize> {
    if new.is_empty() {
        return None;
    }
    let cursor = cursor?;
    old.get(cursor)
        .and_then(|p| new.position(&p.id()))
        .or(Some(cursor.min(new.len() - 1)))
}

fn clamp(list: &CandidateList, cursor: Option<usize>) -> Option<usize> {
    if list.is_empty() {
        None
    } else {
        cursor.map(|c| c.min(list.len() - 1))
    }
}

/// Interactive selection over an open project
#[derive(Debug, Clone)]
pub struct Selector {
    state: ProjectState,
    printings: HashMap<CardIdentity, Vec<PrintingRecord>>,
    undo: UndoStack,
}

impl Selector {
    pub fn new(state: ProjectState, undo_limit: usize) -> Self {
        Self {
            state,
            printings: HashMap::new(),
            undo: UndoStack::new(undo_limit),
        }
    }

    pub fn state(&self) -> &ProjectState {
        &self.state
    }

    pub fn into_state(self) -> ProjectState {
        self.state
    }

    /// Number of undo entries available
    pub fn undo_depth(&self) -> usize {
        self.undo.entries.len()
    }

    pub fn selection(&self, identity: &CardIdentity) -> &SelectionState {
        self.state
            .selections
            .get(identity)
            .unwrap_or_else(|| panic!("unknown card identity: {}", identity))
    }

    fn selection_mut(&mut self, identity: &CardIdentity) -> &mut SelectionState {
        self.state
            .selections
            .get_mut(identity)
            .unwrap_or_else(|| panic!("unknown card identity: {}", identity))
    }

    pub fn has_printings(&self, identity: &CardIdentity) -> bool {
        self.printings.contains_key(identity)
    }

    /// Known printings of a card; empty until loaded
    pub fn printings(&self, identity: &CardIdentity) -> &[PrintingRecord] {
        self.printings.get(identity).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Install a card's printing list (after a cache load or refresh) and
    /// re-anchor its cursor
    pub fn set_printings(&mut self, identity: &CardIdentity, mut printings: Vec<PrintingRecord>) {
        sort_newest_first(&mut printings);
        let old = self.candidates(identity);
        let selection = self.selection(identity);
        if let Some(id) = &selection.selected_printing {
            if !printings.iter().any(|p| &p.id() == id) {
                log::warn!("Selected printing {} of {} is no longer listed", id, identity);
            }
        }
        self.printings.insert(identity.clone(), printings);
        let new = self.candidates(identity);
        let selection = self.selection_mut(identity);
        selection.cursor_index = reanchor(&old, &new, selection.cursor_index);
    }

    /// Candidate list currently offered for a card
    pub fn candidates(&self, identity: &CardIdentity) -> CandidateList {
        let selection = self.selection(identity);
        candidates(
            &self.state.filters,
            self.printings(identity),
            selection.all_prints_override,
        )
    }

    /// Printing under the cursor; the first candidate before browsing starts
    pub fn current_candidate(&self, identity: &CardIdentity) -> Option<PrintingRecord> {
        let list = self.candidates(identity);
        let cursor = self.selection(identity).cursor_index.unwrap_or(0);
        list.get(cursor).cloned()
    }

    /// Move the browse cursor by `delta`, wrapping at both ends. Not
    /// recorded for undo. Returns the new cursor, `None` if there is nothing
    /// to browse.
    pub fn move_cursor(&mut self, identity: &CardIdentity, delta: isize) -> Option<usize> {
        let len = self.candidates(identity).len();
        let selection = self.selection_mut(identity);
        if len == 0 {
            selection.cursor_index = None;
            return None;
        }
        let base = selection.cursor_index.unwrap_or(0).min(len - 1) as isize;
        let next = (base + delta).rem_euclid(len as isize) as usize;
        selection.cursor_index = Some(next);
        Some(next)
    }

    fn record(&mut self, identity: &CardIdentity) {
        let previous = self.selection(identity).clone();
        self.undo.push(UndoEntry {
            card_identity: identity.clone(),
            previous,
        });
    }

    /// Select the printing under the cursor, then move on to the next card
    pub fn select_current(&mut self, identity: &CardIdentity) -> SelectOutcome {
        let list = self.candidates(identity);
        let cursor = self.selection(identity).cursor_index.unwrap_or(0);
        let Some(printing) = list.get(cursor) else {
            log::debug!("No candidates to select for {}", identity);
            return SelectOutcome::NoCandidates;
        };
        let id = printing.id();

        self.record(identity);
        let selection = self.selection_mut(identity);
        selection.cursor_index = Some(cursor);
        selection.selected_printing = Some(id.clone());
        log::info!("Selected {} for {}", id, identity);

        if let Some(position) = self.state.position_of(identity) {
            self.go_to(position + 1);
        }
        SelectOutcome::Selected(id)
    }

    /// Forget a card's selection. Returns `false` (and records nothing) if
    /// the card had none.
    pub fn clear_selection(&mut self, identity: &CardIdentity) -> bool {
        if !self.selection(identity).is_selected() {
            return false;
        }
        self.record(identity);
        let selection = self.selection_mut(identity);
        selection.selected_printing = None;
        selection.cursor_index = None;
        true
    }

    /// Flip the all-prints override; the selection is kept either way.
    /// Returns the new override value.
    pub fn toggle_all_prints(&mut self, identity: &CardIdentity) -> bool {
        self.record(identity);
        let old = self.candidates(identity);
        let selection = self.selection_mut(identity);
        selection.all_prints_override = !selection.all_prints_override;
        let enabled = selection.all_prints_override;

        let new = self.candidates(identity);
        let selection = self.selection_mut(identity);
        selection.cursor_index = reanchor(&old, &new, selection.cursor_index);
        enabled
    }

    /// Restore the most recent snapshot and make its card the active one
    pub fn undo(&mut self) -> UndoOutcome {
        let Some(entry) = self.undo.pop() else {
            return UndoOutcome::NothingToUndo;
        };
        let identity = entry.card_identity;
        *self.selection_mut(&identity) = entry.previous;

        // Candidates may have changed since the snapshot was taken
        let list = self.candidates(&identity);
        let selection = self.selection_mut(&identity);
        selection.cursor_index = clamp(&list, selection.cursor_index);

        if let Some(position) = self.state.position_of(&identity) {
            self.state.active_card_index = position;
        }
        UndoOutcome::Restored(identity)
    }

    /// Replace the global filters, re-anchoring every cursor. Selections
    /// are untouched. Not recorded for undo.
    pub fn set_filters(&mut self, filters: FilterConfiguration) {
        let identities: Vec<CardIdentity> = self.state.selections.keys().cloned().collect();
        let old: Vec<CandidateList> = identities.iter().map(|id| self.candidates(id)).collect();
        self.state.filters = filters;
        for (identity, old) in identities.iter().zip(old) {
            let new = self.candidates(identity);
            let selection = self.selection_mut(identity);
            selection.cursor_index = reanchor(&old, &new, selection.cursor_index);
        }
    }

    pub fn filters(&self) -> &FilterConfiguration {
        &self.state.filters
    }

    pub fn active_identity(&self) -> Option<CardIdentity> {
        self.state.active_card().map(|c| c.identity())
    }

    /// Make card `index` active, clamped to the deck
    pub fn go_to(&mut self, index: usize) -> usize {
        let last = self.state.cards.len().saturating_sub(1);
        self.state.active_card_index = index.min(last);
        self.state.active_card_index
    }

    pub fn next_card(&mut self) -> usize {
        self.go_to(self.state.active_card_index + 1)
    }

    pub fn previous_card(&mut self) -> usize {
        self.go_to(self.state.active_card_index.saturating_sub(1))
    }

    pub fn progress(&self) -> Progress {
        Progress {
            selected: self
                .state
                .selections
                .values()
                .filter(|s| s.is_selected())
                .count(),
            total: self.state.cards.len(),
        }
    }
}

#[cfg(test)]
#[path = "selection_tests.rs"]
mod tests;
