//! Runtime settings and the recent-projects list

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Scryfall REST API root
pub const SCRYFALL_API_BASE: &str = "https://api.scryfall.com";

/// Maximum number of undo entries kept per session
pub const UNDO_STACK_LIMIT: usize = 50;

/// Maximum number of remembered project folders
pub const RECENT_PROJECTS_LIMIT: usize = 15;

/// Engine settings shared by the catalog client, cache and export
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_base_url: String,
    pub user_agent: String,
    /// Minimum spacing between two catalog API calls
    pub api_min_interval: Duration,
    pub undo_limit: usize,
    /// Worker pool size for batch export
    pub export_workers: usize,
    /// Worker pool size for warming the metadata cache
    pub prefetch_workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: SCRYFALL_API_BASE.to_string(),
            user_agent: format!("MTGArtPicker/{}", env!("CARGO_PKG_VERSION")),
            // Scryfall asks for 50-100ms between requests
            api_min_interval: Duration::from_millis(120),
            undo_limit: UNDO_STACK_LIMIT,
            export_workers: 4,
            prefetch_workers: 2,
        }
    }
}

/// Most-recently-opened project folders, newest first
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecentProjects {
    projects: Vec<PathBuf>,
}

impl RecentProjects {
    /// Default file location: ~/.local/share/art_picker/recent_projects.json
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("art_picker")
            .join("recent_projects.json")
    }

    /// Load the list, or start empty if the file is missing or unreadable
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(list) => list,
                Err(e) => {
                    log::warn!("Failed to parse recent projects, starting fresh: {}", e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        crate::fsutil::write_atomic(path, content.as_bytes())?;
        Ok(())
    }

    /// Move `folder` to the front, dropping duplicates and the oldest overflow
    pub fn touch(&mut self, folder: &Path) {
        self.projects.retain(|p| p != folder);
        self.projects.insert(0, folder.to_path_buf());
        self.projects.truncate(RECENT_PROJECTS_LIMIT);
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.projects.iter()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
