//! Shared helpers for integration tests: an in-memory catalog and printing
//! builders

#![allow(dead_code)]

use art_picker::models::{BorderColor, FrameYear, PrintingImages};
use art_picker::{CancelFlag, CardIdentity, Catalog, ImageFormat, PrintingRecord};
use chrono::NaiveDate;
use mtg_common::{CatalogError, CatalogResult};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Catalog backed by a map, counting every call
#[derive(Default)]
pub struct FakeCatalog {
    printings: HashMap<CardIdentity, Vec<PrintingRecord>>,
    pub lookups: AtomicUsize,
    pub image_fetches: AtomicUsize,
    pub offline: AtomicBool,
    /// Set codes whose image downloads fail
    pub broken_sets: Mutex<HashSet<String>>,
    /// Signalled when the first image download starts
    pub cancel_on_image: Mutex<Option<CancelFlag>>,
    pub delay: Duration,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self {
            delay: Duration::from_millis(10),
            ..Default::default()
        }
    }

    pub fn with_card(mut self, name: &str, printings: Vec<PrintingRecord>) -> Self {
        self.printings
            .insert(CardIdentity::from_name(name), printings);
        self
    }

    pub fn break_set(&self, set_code: &str) {
        self.broken_sets
            .lock()
            .unwrap()
            .insert(set_code.to_uppercase());
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn image_count(&self) -> usize {
        self.image_fetches.load(Ordering::SeqCst)
    }
}

impl Catalog for FakeCatalog {
    async fn lookup_printings(&self, card_name: &str) -> CatalogResult<Vec<PrintingRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.offline.load(Ordering::SeqCst) {
            return Err(CatalogError::Transient("connection refused".into()));
        }
        self.printings
            .get(&CardIdentity::from_name(card_name))
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(card_name.to_string()))
    }

    async fn fetch_image_bytes(
        &self,
        printing: &PrintingRecord,
        format: ImageFormat,
    ) -> CatalogResult<Vec<u8>> {
        self.image_fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(flag) = self.cancel_on_image.lock().unwrap().take() {
            flag.cancel();
        }
        tokio::time::sleep(self.delay).await;
        if self.offline.load(Ordering::SeqCst)
            || self.broken_sets.lock().unwrap().contains(&printing.set_code)
        {
            return Err(CatalogError::Transient(format!(
                "image download for {} timed out",
                printing.id()
            )));
        }
        Ok(format!("{}|{}", printing.id(), format.extension()).into_bytes())
    }
}

/// Black-bordered 2015-frame printing with PNG and JPG images
pub fn printing(set: &str, cn: &str, released: &str) -> PrintingRecord {
    PrintingRecord {
        set_code: set.to_uppercase(),
        set_name: format!("{} set", set.to_uppercase()),
        collector_number: cn.to_string(),
        release_date: NaiveDate::parse_from_str(released, "%Y-%m-%d").ok(),
        border: BorderColor::Black,
        frame_year: Some(FrameYear::Y2015),
        frame_effects: BTreeSet::new(),
        finishes: BTreeSet::new(),
        is_full_art: false,
        is_hi_res: true,
        is_default: true,
        is_atypical: false,
        security_stamp: None,
        is_universes_beyond: false,
        image_uris: PrintingImages {
            png: Some(format!("https://img.example/{}/{}.png", set, cn)),
            large_jpg: Some(format!("https://img.example/{}/{}.jpg", set, cn)),
            normal: None,
        },
        scryfall_uri: None,
    }
}

pub fn borderless(mut p: PrintingRecord) -> PrintingRecord {
    p.border = BorderColor::Borderless;
    p.is_default = false;
    p.is_atypical = true;
    p
}

pub fn jpg_only(mut p: PrintingRecord) -> PrintingRecord {
    p.image_uris.png = None;
    p
}

/// Catalog with a few well-known cards
pub fn standard_catalog() -> FakeCatalog {
    FakeCatalog::new()
        .with_card(
            "Lightning Bolt",
            vec![
                printing("lea", "161", "1993-08-05"),
                printing("m10", "146", "2009-07-17"),
            ],
        )
        .with_card(
            "Sol Ring",
            vec![
                borderless(printing("sld", "1512", "2023-02-03")),
                jpg_only(printing("c21", "263", "2021-04-23")),
            ],
        )
        .with_card("Counterspell", vec![printing("lea", "54", "1993-08-05")])
}
