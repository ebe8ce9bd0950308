//! Batch export of selected artwork
//!
//! Each selected card is resolved through the cache store and copied to
//! `<target>/<Card Name> [<SET> <CN>].<png|jpg>`. Cards run on a bounded
//! worker pool; one card failing never stops the others. Cancellation stops
//! cards that have not started yet, while cards already being written
//! finish normally.

use crate::cache::{CacheStore, MaterializedImage};
use crate::catalog::Catalog;
use crate::error::{PickerError, Result};
use crate::fsutil::{safe_filename, write_atomic};
use crate::models::{CardEntry, ImageFormat, PrintingId};
use crate::project::ProjectState;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// What to do with cards that have no selected printing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingSelectionPolicy {
    /// Report them as skipped and export the rest
    #[default]
    Skip,
    /// Export nothing and return [`PickerError::MissingSelections`]
    Abort,
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub target_dir: PathBuf,
    pub workers: usize,
    pub missing: MissingSelectionPolicy,
    /// Write `<Name> (<i>) [...]` once per requested copy
    pub one_file_per_copy: bool,
}

/// Cooperative cancellation signal shared with running exports
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoSelection,
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoSelection => write!(f, "no printing selected"),
            SkipReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written { paths: Vec<PathBuf> },
    Skipped(SkipReason),
    Failed(String),
}

/// Result for one card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportItem {
    pub card_name: String,
    pub printing: Option<PrintingId>,
    pub outcome: ExportOutcome,
}

/// Per-card results in decklist order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub items: Vec<ExportItem>,
    pub cancelled: bool,
}

impl ExportSummary {
    fn count(&self, pred: impl Fn(&ExportOutcome) -> bool) -> usize {
        self.items.iter().filter(|item| pred(&item.outcome)).count()
    }

    pub fn written(&self) -> usize {
        self.count(|o| matches!(o, ExportOutcome::Written { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ExportOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ExportOutcome::Failed(_)))
    }

    pub fn item(&self, card_name: &str) -> Option<&ExportItem> {
        self.items.iter().find(|i| i.card_name == card_name)
    }
}

/// `Lightning Bolt [LEA 161].png`
pub fn export_filename(card_name: &str, printing: &PrintingId, format: ImageFormat) -> String {
    format!(
        "{} [{}].{}",
        safe_filename(card_name),
        safe_filename(&printing.to_string()),
        format.extension()
    )
}

/// `Lightning Bolt (2) [LEA 161].png`
pub fn copy_filename(
    card_name: &str,
    copy: u32,
    printing: &PrintingId,
    format: ImageFormat,
) -> String {
    format!(
        "{} ({}) [{}].{}",
        safe_filename(card_name),
        copy,
        safe_filename(&printing.to_string()),
        format.extension()
    )
}

fn destination_names(card: &CardEntry, printing: &PrintingId, format: ImageFormat, per_copy: bool) -> Vec<String> {
    if per_copy && card.requested_quantity > 1 {
        (1..=card.requested_quantity)
            .map(|copy| copy_filename(&card.name, copy, printing, format))
            .collect()
    } else {
        vec![export_filename(&card.name, printing, format)]
    }
}

/// Copy a cached image into place. Existing files are left alone.
fn place_image(image: &MaterializedImage, dest: &Path) -> std::io::Result<bool> {
    if dest.exists() {
        return Ok(false);
    }
    let bytes = std::fs::read(&image.path)?;
    write_atomic(dest, &bytes)?;
    Ok(true)
}

async fn export_card<C: Catalog>(
    store: &CacheStore<C>,
    card: &CardEntry,
    printing: &PrintingId,
    target_dir: &Path,
    per_copy: bool,
) -> ExportOutcome {
    let image = match store.materialize_image(card, printing).await {
        Ok(image) => image,
        Err(e) => {
            log::error!("Export of {} [{}] failed: {}", card.name, printing, e);
            return ExportOutcome::Failed(e.to_string());
        }
    };

    let mut paths = Vec::new();
    for name in destination_names(card, printing, image.format, per_copy) {
        let dest = target_dir.join(name);
        match place_image(&image, &dest) {
            Ok(true) => log::debug!("Wrote {:?}", dest),
            Ok(false) => log::debug!("{:?} already exists, leaving it", dest),
            Err(e) => {
                log::error!("Writing {:?} failed: {}", dest, e);
                return ExportOutcome::Failed(format!("cannot write {}: {}", dest.display(), e));
            }
        }
        paths.push(dest);
    }
    ExportOutcome::Written { paths }
}

/// Export every selected card of `state` into `options.target_dir`.
///
/// Returns `Err` only when the policy is [`MissingSelectionPolicy::Abort`]
/// and some cards are unselected, or the target directory cannot be
/// created; per-card problems end up in the summary.
pub async fn export<C: Catalog + 'static>(
    store: Arc<CacheStore<C>>,
    state: &ProjectState,
    options: &ExportOptions,
    cancel: &CancelFlag,
) -> Result<ExportSummary> {
    let missing: Vec<String> = state
        .cards
        .iter()
        .filter(|card| {
            state
                .selections
                .get(&card.identity())
                .map_or(true, |s| !s.is_selected())
        })
        .map(|card| card.name.clone())
        .collect();
    if options.missing == MissingSelectionPolicy::Abort && !missing.is_empty() {
        log::warn!(
            "Export aborted, no printing selected for: {}",
            missing.join(", ")
        );
        return Err(PickerError::MissingSelections { cards: missing });
    }

    std::fs::create_dir_all(&options.target_dir)?;
    log::info!(
        "Exporting {} cards to {:?} with {} workers",
        state.cards.len() - missing.len(),
        options.target_dir,
        options.workers.max(1)
    );

    let semaphore = Arc::new(Semaphore::new(options.workers.max(1)));
    let mut pending = Vec::with_capacity(state.cards.len());

    for card in &state.cards {
        let printing = state
            .selections
            .get(&card.identity())
            .and_then(|s| s.selected_printing.clone());
        let Some(printing) = printing else {
            pending.push((card.name.clone(), None, None));
            continue;
        };

        let store = Arc::clone(&store);
        let semaphore = Arc::clone(&semaphore);
        let cancel = cancel.clone();
        let card = card.clone();
        let target_dir = options.target_dir.clone();
        let per_copy = options.one_file_per_copy;
        let task_printing = printing.clone();
        let name = card.name.clone();

        let handle = tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return ExportOutcome::Skipped(SkipReason::Cancelled);
            };
            if cancel.is_cancelled() {
                return ExportOutcome::Skipped(SkipReason::Cancelled);
            }
            export_card(&store, &card, &task_printing, &target_dir, per_copy).await
        });
        pending.push((name, Some(printing), Some(handle)));
    }

    let mut summary = ExportSummary::default();
    for (card_name, printing, handle) in pending {
        let outcome = match handle {
            None => ExportOutcome::Skipped(SkipReason::NoSelection),
            Some(handle) => match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!("Export task for {} failed: {}", card_name, e);
                    ExportOutcome::Failed(format!("export task failed: {}", e))
                }
            },
        };
        summary.items.push(ExportItem {
            card_name,
            printing,
            outcome,
        });
    }
    summary.cancelled = cancel.is_cancelled();

    log::info!(
        "Export finished: {} written, {} skipped, {} failed",
        summary.written(),
        summary.skipped(),
        summary.failed()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_filename_contract() {
        assert_eq!(
            export_filename("Lightning Bolt", &PrintingId::new("lea", "161"), ImageFormat::Png),
            "Lightning Bolt [LEA 161].png"
        );
        assert_eq!(
            export_filename("Sol Ring", &PrintingId::new("C21", "263"), ImageFormat::Jpg),
            "Sol Ring [C21 263].jpg"
        );
    }

    #[test]
    fn test_export_filename_sanitises_card_name() {
        assert_eq!(
            export_filename("Fire // Ice", &PrintingId::new("MH2", "290"), ImageFormat::Png),
            "Fire __ Ice [MH2 290].png"
        );
    }

    #[test]
    fn test_per_copy_names() {
        let card = CardEntry {
            name: "Island".into(),
            requested_quantity: 3,
        };
        let id = PrintingId::new("UNH", "137");
        assert_eq!(
            destination_names(&card, &id, ImageFormat::Png, true),
            vec![
                "Island (1) [UNH 137].png",
                "Island (2) [UNH 137].png",
                "Island (3) [UNH 137].png"
            ]
        );
        assert_eq!(
            destination_names(&card, &id, ImageFormat::Png, false),
            vec!["Island [UNH 137].png"]
        );
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!flag.is_cancelled());
        clone.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_summary_counts() {
        let summary = ExportSummary {
            items: vec![
                ExportItem {
                    card_name: "A".into(),
                    printing: None,
                    outcome: ExportOutcome::Skipped(SkipReason::NoSelection),
                },
                ExportItem {
                    card_name: "B".into(),
                    printing: Some(PrintingId::new("LEA", "1")),
                    outcome: ExportOutcome::Failed("boom".into()),
                },
                ExportItem {
                    card_name: "C".into(),
                    printing: Some(PrintingId::new("LEA", "2")),
                    outcome: ExportOutcome::Written { paths: vec![] },
                },
            ],
            cancelled: false,
        };
        assert_eq!(
            (summary.written(), summary.skipped(), summary.failed()),
            (1, 1, 1)
        );
        assert_eq!(summary.item("B").unwrap().printing, Some(PrintingId::new("LEA", "1")));
    }
}
