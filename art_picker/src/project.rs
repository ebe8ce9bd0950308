//! Project persistence
//!
//! A project directory holds `project.json` (the [`ProjectState`] wrapped in
//! a versioned envelope) and the `cache/` subtree owned by the cache store.
//! Losing the cache only costs re-fetching; losing or corrupting
//! `project.json` is reported and never papered over with defaults.

use crate::error::{PickerError, Result};
use crate::filter::FilterConfiguration;
use crate::fsutil::write_atomic;
use crate::models::{CardEntry, CardIdentity};
use crate::selection::SelectionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Schema version written by this build
pub const PROJECT_VERSION: u64 = 1;

/// Name of the canonical state file inside a project directory
pub const PROJECT_FILE: &str = "project.json";

/// Name of the cache subtree inside a project directory
pub const CACHE_DIR: &str = "cache";

/// Everything persisted about a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectState {
    /// Unique cards in decklist order
    pub cards: Vec<CardEntry>,
    pub filters: FilterConfiguration,
    /// Exactly one entry per card
    pub selections: BTreeMap<CardIdentity, SelectionState>,
    /// Card currently being browsed
    pub active_card_index: usize,
}

impl ProjectState {
    /// Fresh state with every card unselected
    pub fn new(cards: Vec<CardEntry>, filters: FilterConfiguration) -> Self {
        let selections = cards
            .iter()
            .map(|card| (card.identity(), SelectionState::default()))
            .collect();
        Self {
            cards,
            filters,
            selections,
            active_card_index: 0,
        }
    }

    pub fn position_of(&self, identity: &CardIdentity) -> Option<usize> {
        self.cards.iter().position(|c| &c.identity() == identity)
    }

    pub fn card(&self, identity: &CardIdentity) -> Option<&CardEntry> {
        self.cards.iter().find(|c| &c.identity() == identity)
    }

    pub fn active_card(&self) -> Option<&CardEntry> {
        self.cards.get(self.active_card_index)
    }

    /// Check structural invariants, returning what is wrong
    fn validate(&self) -> std::result::Result<(), String> {
        let mut seen = BTreeMap::new();
        for (index, card) in self.cards.iter().enumerate() {
            if card.requested_quantity == 0 {
                return Err(format!("card {:?} has quantity 0", card.name));
            }
            if let Some(first) = seen.insert(card.identity(), index) {
                return Err(format!(
                    "cards {} and {} are the same card {:?}",
                    first, index, card.name
                ));
            }
            if !self.selections.contains_key(&card.identity()) {
                return Err(format!("no selection state for {:?}", card.name));
            }
        }
        if let Some(orphan) = self.selections.keys().find(|k| !seen.contains_key(*k)) {
            return Err(format!("selection state for unknown card {:?}", orphan.as_str()));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct ProjectFileRef<'a> {
    version: u64,
    saved_at: DateTime<Utc>,
    state: &'a ProjectState,
}

pub fn project_file(dir: &Path) -> PathBuf {
    dir.join(PROJECT_FILE)
}

pub fn cache_dir(dir: &Path) -> PathBuf {
    dir.join(CACHE_DIR)
}

/// Whether `dir` looks like a project directory
pub fn is_project(dir: &Path) -> bool {
    project_file(dir).is_file()
}

/// Save state atomically: the previous file stays intact until the new one
/// is completely written.
pub fn save(state: &ProjectState, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let file = ProjectFileRef {
        version: PROJECT_VERSION,
        saved_at: Utc::now(),
        state,
    };
    let content = serde_json::to_vec_pretty(&file)?;
    write_atomic(&project_file(dir), &content)?;
    log::debug!("Saved project {:?}", dir);
    Ok(())
}

/// Load a project directory.
///
/// Fails with [`PickerError::UnsupportedVersion`] for unknown schema
/// versions and [`PickerError::UnrecoverableProject`] for anything missing,
/// truncated or inconsistent.
pub fn load(dir: &Path) -> Result<ProjectState> {
    let path = project_file(dir);
    let unrecoverable = |reason: String| PickerError::UnrecoverableProject {
        path: path.clone(),
        reason,
    };

    let content = std::fs::read(&path).map_err(|e| unrecoverable(format!("cannot read: {}", e)))?;
    let mut document: Value = serde_json::from_slice(&content)
        .map_err(|e| unrecoverable(format!("not valid JSON: {}", e)))?;

    let version = document
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| unrecoverable("missing version tag".to_string()))?;
    if version != PROJECT_VERSION {
        return Err(PickerError::UnsupportedVersion {
            found: version,
            supported: PROJECT_VERSION,
        });
    }

    let state_value = document
        .get_mut("state")
        .map(Value::take)
        .ok_or_else(|| unrecoverable("missing state".to_string()))?;
    let mut state: ProjectState = serde_json::from_value(state_value)
        .map_err(|e| unrecoverable(format!("invalid state: {}", e)))?;
    state.validate().map_err(unrecoverable)?;

    if state.active_card_index >= state.cards.len() && !state.cards.is_empty() {
        log::warn!(
            "Active card {} out of range in {:?}, resetting to the last card",
            state.active_card_index,
            path
        );
        state.active_card_index = state.cards.len() - 1;
    }

    log::info!("Loaded project {:?} ({} cards)", dir, state.cards.len());
    Ok(state)
}
