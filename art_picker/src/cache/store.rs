//! On-disk printing and image cache
//!
//! Layout under the cache root:
//!
//! ```text
//! meta/<card key>.json             one CardCacheEntry per card
//! images/<card key>/<SET_CN>.png   materialized artwork (or .jpg)
//! ```
//!
//! Entries are never evicted. Every file is written atomically, so a failed
//! or interrupted fetch leaves the previous entry intact.

use super::inflight::InFlight;
use crate::catalog::Catalog;
use crate::error::{PickerError, Result};
use crate::fsutil::{cache_key, write_atomic};
use crate::models::{
    sort_newest_first, CardEntry, CardIdentity, ImageFormat, PrintingId, PrintingRecord,
};
use chrono::{DateTime, Utc};
use mtg_common::CatalogError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// A materialized image recorded in a cache entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBlob {
    /// Path relative to the cache root
    pub path: PathBuf,
    pub format: ImageFormat,
}

/// Cached printing list of one card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardCacheEntry {
    pub card_identity: CardIdentity,
    pub card_name: String,
    /// Newest release first
    pub printings: Vec<PrintingRecord>,
    pub fetched_at: DateTime<Utc>,
    /// Materialized images keyed by [`PrintingId::file_key`]
    #[serde(default)]
    pub images: BTreeMap<String, ImageBlob>,
}

impl CardCacheEntry {
    pub fn printing(&self, id: &PrintingId) -> Option<&PrintingRecord> {
        self.printings.iter().find(|p| &p.id() == id)
    }
}

/// Local copy of a printing's artwork
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedImage {
    pub path: PathBuf,
    pub format: ImageFormat,
}

/// Failure handed to every caller waiting on a coalesced fetch
#[derive(Debug, Clone)]
enum SharedFailure {
    Catalog(CatalogError),
    Io { kind: io::ErrorKind, message: String },
}

impl From<CatalogError> for SharedFailure {
    fn from(e: CatalogError) -> Self {
        SharedFailure::Catalog(e)
    }
}

impl From<io::Error> for SharedFailure {
    fn from(e: io::Error) -> Self {
        SharedFailure::Io {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for SharedFailure {
    fn from(e: serde_json::Error) -> Self {
        SharedFailure::Io {
            kind: io::ErrorKind::InvalidData,
            message: e.to_string(),
        }
    }
}

impl From<SharedFailure> for PickerError {
    fn from(e: SharedFailure) -> Self {
        match e {
            SharedFailure::Catalog(e) => PickerError::FetchFailure(e),
            SharedFailure::Io { kind, message } => PickerError::Io(io::Error::new(kind, message)),
        }
    }
}

type SharedResult<T> = std::result::Result<T, SharedFailure>;

/// Read-through cache in front of a [`Catalog`]
pub struct CacheStore<C> {
    catalog: C,
    root: PathBuf,
    /// Serialises read-modify-write of meta files
    meta_lock: Mutex<()>,
    printing_fetches: InFlight<CardIdentity, CardCacheEntry, SharedFailure>,
    image_fetches: InFlight<(CardIdentity, PrintingId), MaterializedImage, SharedFailure>,
}

impl<C: Catalog> CacheStore<C> {
    /// Create a store rooted at `root`; directories are created on first write
    pub fn new(catalog: C, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        log::debug!("Cache root: {:?}", root);
        Self {
            catalog,
            root,
            meta_lock: Mutex::new(()),
            printing_fetches: InFlight::new(),
            image_fetches: InFlight::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    fn meta_path(&self, identity: &CardIdentity) -> PathBuf {
        self.root
            .join("meta")
            .join(format!("{}.json", cache_key(identity.as_str())))
    }

    fn image_relative_path(identity: &CardIdentity, id: &PrintingId, format: ImageFormat) -> PathBuf {
        Path::new("images")
            .join(cache_key(identity.as_str()))
            .join(format!("{}.{}", id.file_key(), format.extension()))
    }

    /// Cached entry for a card, without contacting the catalog.
    ///
    /// An unreadable meta file counts as a miss.
    pub fn cached(&self, identity: &CardIdentity) -> Option<CardCacheEntry> {
        let path = self.meta_path(identity);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<CardCacheEntry>(&content) {
            Ok(entry) if &entry.card_identity == identity => Some(entry),
            Ok(entry) => {
                log::warn!(
                    "Cache file {:?} belongs to {}, not {}",
                    path,
                    entry.card_identity,
                    identity
                );
                None
            }
            Err(e) => {
                log::warn!("Ignoring unreadable cache entry {:?}: {}", path, e);
                None
            }
        }
    }

    fn write_meta(&self, entry: &CardCacheEntry) -> SharedResult<()> {
        let path = self.meta_path(&entry.card_identity);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_vec_pretty(entry)?;
        write_atomic(&path, &content)?;
        Ok(())
    }

    /// Fetch a card's printings and replace its meta file, carrying over
    /// images of printings that still exist
    async fn fetch_printings(
        &self,
        card: &CardEntry,
        identity: &CardIdentity,
    ) -> SharedResult<CardCacheEntry> {
        let mut printings = self.catalog.lookup_printings(&card.name).await?;
        sort_newest_first(&mut printings);

        let _guard = self.meta_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut images = self
            .cached(identity)
            .map(|previous| previous.images)
            .unwrap_or_default();
        images.retain(|key, _| printings.iter().any(|p| &p.id().file_key() == key));

        let entry = CardCacheEntry {
            card_identity: identity.clone(),
            card_name: card.name.clone(),
            printings,
            fetched_at: Utc::now(),
            images,
        };
        self.write_meta(&entry)?;
        log::debug!(
            "Cached {} printings for {}",
            entry.printings.len(),
            card.name
        );
        Ok(entry)
    }

    /// Printing list of a card: from disk if cached, otherwise fetched from
    /// the catalog and stored first
    pub async fn get(&self, card: &CardEntry) -> Result<CardCacheEntry> {
        let identity = card.identity();
        if let Some(entry) = self.cached(&identity) {
            log::debug!("Printing cache hit for {}", card.name);
            return Ok(entry);
        }

        log::info!("Printing cache miss for {}, fetching from catalog", card.name);
        let key = identity.clone();
        let identity = &identity;
        let entry = self
            .printing_fetches
            .run(key, || async move {
                // Another caller may have finished the same fetch meanwhile
                if let Some(entry) = self.cached(identity) {
                    return Ok(entry);
                }
                self.fetch_printings(card, identity).await
            })
            .await?;
        Ok(entry)
    }

    /// Re-fetch a card's printing list. On failure the existing entry is
    /// left as it was.
    pub async fn refresh(&self, card: &CardEntry) -> Result<CardCacheEntry> {
        log::info!("Refreshing printings for {}", card.name);
        let identity = card.identity();
        let key = identity.clone();
        let identity = &identity;
        match self
            .printing_fetches
            .run(key, || self.fetch_printings(card, identity))
            .await
        {
            Ok(entry) => Ok(entry),
            Err(e) => {
                let err = PickerError::from(e);
                log::warn!("Could not refresh {}: {}", card.name, err);
                Err(err)
            }
        }
    }

    fn image_on_disk(
        &self,
        identity: &CardIdentity,
        id: &PrintingId,
        format: ImageFormat,
    ) -> Option<MaterializedImage> {
        let path = self
            .root
            .join(Self::image_relative_path(identity, id, format));
        path.is_file().then_some(MaterializedImage { path, format })
    }

    fn record_image(&self, identity: &CardIdentity, id: &PrintingId, blob: ImageBlob) -> SharedResult<()> {
        let _guard = self.meta_lock.lock().unwrap_or_else(PoisonError::into_inner);
        match self.cached(identity) {
            Some(mut entry) => {
                entry.images.insert(id.file_key(), blob);
                self.write_meta(&entry)
            }
            None => Ok(()),
        }
    }

    async fn fetch_image(
        &self,
        identity: &CardIdentity,
        printing: &PrintingRecord,
        format: ImageFormat,
    ) -> SharedResult<MaterializedImage> {
        let id = printing.id();
        let bytes = self.catalog.fetch_image_bytes(printing, format).await?;

        let relative = Self::image_relative_path(identity, &id, format);
        let path = self.root.join(&relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_atomic(&path, &bytes)?;
        self.record_image(
            identity,
            &id,
            ImageBlob {
                path: relative,
                format,
            },
        )?;
        log::debug!("Cached image {} ({} bytes)", id, bytes.len());
        Ok(MaterializedImage { path, format })
    }

    /// Local path of a printing's best image, fetching it on a miss.
    ///
    /// PNG is used when the printing has one, otherwise the large JPG.
    pub async fn materialize_image(
        &self,
        card: &CardEntry,
        printing_id: &PrintingId,
    ) -> Result<MaterializedImage> {
        let entry = self.get(card).await?;
        let printing = entry
            .printing(printing_id)
            .ok_or_else(|| PickerError::UnknownPrinting {
                card: card.name.clone(),
                printing: printing_id.to_string(),
            })?;
        let (_, format) = printing.image_uris.best().ok_or_else(|| PickerError::NoImage {
            card: card.name.clone(),
            printing: printing_id.to_string(),
        })?;

        let identity = &entry.card_identity;
        if let Some(image) = self.image_on_disk(identity, printing_id, format) {
            log::debug!("Image cache hit for {} [{}]", card.name, printing_id);
            return Ok(image);
        }

        log::info!(
            "Image cache miss for {} [{}], fetching from catalog",
            card.name,
            printing_id
        );
        let key = (identity.clone(), printing_id.clone());
        let image = self
            .image_fetches
            .run(key, || async move {
                if let Some(image) = self.image_on_disk(identity, printing_id, format) {
                    return Ok(image);
                }
                self.fetch_image(identity, printing, format).await
            })
            .await?;
        Ok(image)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
