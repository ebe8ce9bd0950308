//! Open project: selection state, cache store and autosave in one place
//!
//! Every mutating call saves `project.json` before returning, so a crash
//! loses at most the operation in progress.

use crate::cache::CacheStore;
use crate::catalog::Catalog;
use crate::config::Settings;
use crate::decklist::{parse_decklist, ParseWarning};
use crate::error::{PickerError, Result};
use crate::export::{self, CancelFlag, ExportOptions, ExportSummary, MissingSelectionPolicy};
use crate::filter::{CandidateList, FilterConfiguration};
use crate::models::{CardEntry, CardIdentity};
use crate::project::{self, ProjectState};
use crate::selection::{Progress, SelectOutcome, Selector, UndoOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Result of warming the cache for one card
#[derive(Debug)]
pub struct PrefetchItem {
    pub card_name: String,
    /// Number of printings on success
    pub result: Result<usize>,
}

pub struct ProjectSession<C> {
    dir: PathBuf,
    settings: Settings,
    store: Arc<CacheStore<C>>,
    selector: Selector,
}

impl<C: Catalog + 'static> ProjectSession<C> {
    fn with_state(dir: &Path, state: ProjectState, catalog: C, settings: Settings) -> Self {
        let store = Arc::new(CacheStore::new(catalog, project::cache_dir(dir)));
        let mut session = Self {
            dir: dir.to_path_buf(),
            selector: Selector::new(state, settings.undo_limit),
            settings,
            store,
        };
        session.load_cached_printings();
        session
    }

    /// Start a new project in `dir` from decklist text.
    ///
    /// Refuses to overwrite an existing project. Unparseable lines are
    /// returned as warnings.
    pub fn create(
        dir: &Path,
        decklist: &str,
        catalog: C,
        settings: Settings,
    ) -> Result<(Self, Vec<ParseWarning>)> {
        if project::is_project(dir) {
            return Err(PickerError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already contains a project", dir.display()),
            )));
        }
        let parsed = parse_decklist(decklist);
        log::info!(
            "Creating project {:?} with {} cards ({} warnings)",
            dir,
            parsed.entries.len(),
            parsed.warnings.len()
        );
        let state = ProjectState::new(parsed.entries, FilterConfiguration::default());
        project::save(&state, dir)?;
        Ok((Self::with_state(dir, state, catalog, settings), parsed.warnings))
    }

    /// Open an existing project directory
    pub fn open(dir: &Path, catalog: C, settings: Settings) -> Result<Self> {
        let state = project::load(dir)?;
        Ok(Self::with_state(dir, state, catalog, settings))
    }

    /// Install printing lists already on disk, without any network access
    fn load_cached_printings(&mut self) {
        let identities: Vec<CardIdentity> =
            self.selector.state().cards.iter().map(|c| c.identity()).collect();
        for identity in identities {
            if let Some(entry) = self.store.cached(&identity) {
                self.selector.set_printings(&identity, entry.printings);
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn state(&self) -> &ProjectState {
        self.selector.state()
    }

    pub fn store(&self) -> &Arc<CacheStore<C>> {
        &self.store
    }

    pub fn progress(&self) -> Progress {
        self.selector.progress()
    }

    /// Identity of the card at decklist position `index`
    pub fn identity_at(&self, index: usize) -> Option<CardIdentity> {
        self.state().cards.get(index).map(CardEntry::identity)
    }

    fn card(&self, identity: &CardIdentity) -> CardEntry {
        self.state()
            .card(identity)
            .cloned()
            .unwrap_or_else(|| panic!("unknown card identity: {}", identity))
    }

    pub fn save(&self) -> Result<()> {
        project::save(self.selector.state(), &self.dir)
    }

    /// Fetch printing lists for every card not cached yet, on the prefetch
    /// worker pool. Failures are reported per card.
    pub async fn warm_cache(&mut self) -> Result<Vec<PrefetchItem>> {
        let semaphore = Arc::new(Semaphore::new(self.settings.prefetch_workers.max(1)));
        let mut handles = Vec::new();
        for card in &self.selector.state().cards {
            if self.selector.has_printings(&card.identity()) {
                continue;
            }
            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&semaphore);
            let card = card.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = store.get(&card).await;
                (card, result)
            }));
        }

        let mut items = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok((card, Ok(entry))) => {
                    let count = entry.printings.len();
                    self.selector.set_printings(&card.identity(), entry.printings);
                    items.push(PrefetchItem {
                        card_name: card.name,
                        result: Ok(count),
                    });
                }
                Ok((card, Err(e))) => {
                    log::warn!("Could not fetch printings for {}: {}", card.name, e);
                    items.push(PrefetchItem {
                        card_name: card.name,
                        result: Err(e),
                    });
                }
                Err(e) => log::error!("Prefetch task failed: {}", e),
            }
        }
        self.save()?;
        Ok(items)
    }

    /// Make sure a card's printings are loaded and return its candidates
    pub async fn load_card(&mut self, identity: &CardIdentity) -> Result<CandidateList> {
        if !self.selector.has_printings(identity) {
            let card = self.card(identity);
            let entry = self.store.get(&card).await?;
            self.selector.set_printings(identity, entry.printings);
            self.save()?;
        }
        Ok(self.selector.candidates(identity))
    }

    /// Re-fetch a card's printings; the cached list stays if this fails
    pub async fn refresh(&mut self, identity: &CardIdentity) -> Result<usize> {
        let card = self.card(identity);
        let entry = self.store.refresh(&card).await?;
        let count = entry.printings.len();
        self.selector.set_printings(identity, entry.printings);
        self.save()?;
        Ok(count)
    }

    pub fn move_cursor(&mut self, identity: &CardIdentity, delta: isize) -> Result<Option<usize>> {
        let cursor = self.selector.move_cursor(identity, delta);
        self.save()?;
        Ok(cursor)
    }

    pub fn select_current(&mut self, identity: &CardIdentity) -> Result<SelectOutcome> {
        let outcome = self.selector.select_current(identity);
        if outcome != SelectOutcome::NoCandidates {
            self.save()?;
        }
        Ok(outcome)
    }

    pub fn clear_selection(&mut self, identity: &CardIdentity) -> Result<bool> {
        let cleared = self.selector.clear_selection(identity);
        if cleared {
            self.save()?;
        }
        Ok(cleared)
    }

    pub fn toggle_all_prints(&mut self, identity: &CardIdentity) -> Result<bool> {
        let enabled = self.selector.toggle_all_prints(identity);
        self.save()?;
        Ok(enabled)
    }

    pub fn undo(&mut self) -> Result<UndoOutcome> {
        let outcome = self.selector.undo();
        if outcome != UndoOutcome::NothingToUndo {
            self.save()?;
        }
        Ok(outcome)
    }

    pub fn set_filters(&mut self, filters: FilterConfiguration) -> Result<()> {
        self.selector.set_filters(filters);
        self.save()
    }

    pub fn go_to(&mut self, index: usize) -> Result<usize> {
        let index = self.selector.go_to(index);
        self.save()?;
        Ok(index)
    }

    pub fn next_card(&mut self) -> Result<usize> {
        let index = self.selector.next_card();
        self.save()?;
        Ok(index)
    }

    pub fn previous_card(&mut self) -> Result<usize> {
        let index = self.selector.previous_card();
        self.save()?;
        Ok(index)
    }

    /// Export options for `target_dir` using the configured worker count
    pub fn export_options(&self, target_dir: &Path) -> ExportOptions {
        ExportOptions {
            target_dir: target_dir.to_path_buf(),
            workers: self.settings.export_workers,
            missing: MissingSelectionPolicy::default(),
            one_file_per_copy: false,
        }
    }

    /// Export the current selections
    pub async fn export(&self, options: &ExportOptions, cancel: &CancelFlag) -> Result<ExportSummary> {
        export::export(Arc::clone(&self.store), self.selector.state(), options, cancel).await
    }
}
