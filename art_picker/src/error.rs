//! Error types for art_picker

use mtg_common::CatalogError;
use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for art_picker operations
#[derive(Debug, Error)]
pub enum PickerError {
    /// Catalog lookup or image download failed (network, timeout, not found)
    #[error("Fetch failed: {0}")]
    FetchFailure(#[from] CatalogError),
    /// The printing has neither a PNG nor a large JPG image
    #[error("No image available for {card} [{printing}]")]
    NoImage { card: String, printing: String },
    /// The requested printing is not among the card's cached printings
    #[error("Unknown printing {printing} for card {card}")]
    UnknownPrinting { card: String, printing: String },
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to encode or decode JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The project file is missing, truncated or structurally invalid
    #[error("Unrecoverable project state in {path}: {reason}")]
    UnrecoverableProject { path: PathBuf, reason: String },
    /// The project file was written by an unknown schema version
    #[error("Unsupported project version {found} (this build reads version {supported})")]
    UnsupportedVersion { found: u64, supported: u64 },
    /// Export aborted before starting because some cards have no selection
    #[error("Export aborted: {} card(s) have no selected printing", .cards.len())]
    MissingSelections { cards: Vec<String> },
}

impl PickerError {
    /// Whether this failure stops a project from being opened
    pub fn is_project_fatal(&self) -> bool {
        matches!(
            self,
            PickerError::UnrecoverableProject { .. } | PickerError::UnsupportedVersion { .. }
        )
    }
}

/// Result alias for art_picker operations
pub type Result<T> = std::result::Result<T, PickerError>;
