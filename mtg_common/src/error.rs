//! Error types for catalog lookups

use thiserror::Error;

/// Failure talking to the card catalog.
///
/// Cloneable so a single failed fetch can be reported to every caller that
/// was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The catalog has no card with this name
    #[error("Card not found in catalog: {0}")]
    NotFound(String),
    /// Network error, timeout, bad status or unreadable response
    #[error("Catalog request failed: {0}")]
    Transient(String),
}

impl CatalogError {
    /// Whether retrying later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, CatalogError::Transient(_))
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        CatalogError::Transient(err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Transient(format!("invalid response body: {}", err))
    }
}

/// Result alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
