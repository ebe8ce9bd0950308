//! MTG Art Picker
//!
//! Resolves every card of a decklist to one concrete printing, keeps the
//! printing metadata and artwork cached inside the project directory, and
//! exports the chosen images.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod console;
pub mod decklist;
pub mod error;
pub mod export;
pub mod filter;
pub mod fsutil;
pub mod models;
pub mod project;
pub mod selection;
pub mod session;

pub use cache::{CacheStore, CardCacheEntry, MaterializedImage};
pub use catalog::{Catalog, ScryfallCatalog};
pub use config::{RecentProjects, Settings};
pub use decklist::{parse_decklist, read_decklist, ParseWarning, ParsedDecklist};
pub use error::{PickerError, Result};
pub use export::{
    CancelFlag, ExportItem, ExportOptions, ExportOutcome, ExportSummary, MissingSelectionPolicy,
    SkipReason,
};
pub use filter::{candidates, BorderFilter, CandidateBasis, CandidateList, FilterConfiguration};
pub use models::{CardEntry, CardIdentity, ImageFormat, PrintingId, PrintingRecord};
pub use project::ProjectState;
pub use selection::{
    Progress, SelectOutcome, SelectionPhase, SelectionState, Selector, UndoOutcome,
};
pub use session::{PrefetchItem, ProjectSession};
