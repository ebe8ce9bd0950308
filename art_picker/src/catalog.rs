//! Card catalog: the source of truth for printings and image bytes
//!
//! [`Catalog`] is the seam the cache store reads through. [`ScryfallCatalog`]
//! implements it against the Scryfall REST API using async reqwest.

use crate::config::Settings;
use crate::models::{
    sort_newest_first, BorderColor, FrameYear, ImageFormat, PrintingImages, PrintingRecord, Stamp,
};
use chrono::NaiveDate;
use mtg_common::{CatalogError, CatalogResult, ScryfallCard, ScryfallError, SearchList};
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Remote catalog of printings and artwork.
///
/// Both calls may be slow and may fail; timeouts are reported as
/// [`CatalogError::Transient`] like any other failure.
pub trait Catalog: Send + Sync {
    /// All printings of a card, newest release first
    fn lookup_printings(
        &self,
        card_name: &str,
    ) -> impl Future<Output = CatalogResult<Vec<PrintingRecord>>> + Send;

    /// Image bytes of one printing in the requested format
    fn fetch_image_bytes(
        &self,
        printing: &PrintingRecord,
        format: ImageFormat,
    ) -> impl Future<Output = CatalogResult<Vec<u8>>> + Send;
}

/// Frame effects that make a printing non-default
const ATYPICAL_FRAME_EFFECTS: &[&str] = &["showcase", "extendedart", "inverted", "etched"];

/// Convert a Scryfall card object into a printing record.
///
/// Returns `None` for printings without any images.
pub fn printing_from_scryfall(card: &ScryfallCard) -> Option<PrintingRecord> {
    let images = card.images()?;
    let border = card
        .border_color
        .as_deref()
        .map(BorderColor::parse)
        .unwrap_or(BorderColor::Unknown);
    let is_default = !card.variation
        && !card.promo
        && !card.oversized
        && !card.full_art
        && border != BorderColor::Borderless
        && !card
            .frame_effects
            .iter()
            .any(|fx| ATYPICAL_FRAME_EFFECTS.contains(&fx.as_str()));

    Some(PrintingRecord {
        set_code: card.set.to_uppercase(),
        set_name: card.set_name.clone(),
        collector_number: card.collector_number.clone(),
        release_date: card
            .released_at
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
        border,
        frame_year: card.frame.as_deref().and_then(FrameYear::parse),
        frame_effects: card.frame_effects.iter().cloned().collect(),
        finishes: card.finishes.iter().cloned().collect(),
        is_full_art: card.full_art,
        is_hi_res: card.highres_image,
        is_default,
        is_atypical: !is_default,
        security_stamp: card.security_stamp.as_deref().and_then(Stamp::parse),
        is_universes_beyond: card.is_universes_beyond(),
        image_uris: PrintingImages {
            png: images.png.clone(),
            large_jpg: images.large.clone(),
            normal: images.normal.clone(),
        },
        scryfall_uri: card.scryfall_uri.clone(),
    })
}

/// Scryfall API client
pub struct ScryfallCatalog {
    client: reqwest::Client,
    base_url: String,
    min_interval: Duration,
    next_request: Mutex<Instant>,
}

impl ScryfallCatalog {
    pub fn new(settings: &Settings) -> CatalogResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            min_interval: settings.api_min_interval,
            next_request: Mutex::new(Instant::now()),
        })
    }

    /// Space API calls at least `min_interval` apart
    async fn throttle(&self) {
        let mut next = self.next_request.lock().await;
        let now = Instant::now();
        if *next > now {
            tokio::time::sleep_until(*next).await;
        }
        *next = Instant::now() + self.min_interval;
    }

    /// Fetch one search page; `None` when Scryfall reports no matches
    async fn search_page(
        &self,
        url: &str,
        query: Option<&[(&str, String)]>,
    ) -> CatalogResult<Option<SearchList>> {
        self.throttle().await;
        let mut request = self.client.get(url);
        if let Some(query) = query {
            request = request.query(query);
        }
        let response = request.send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json::<SearchList>().await?)),
            status => {
                let reason = match response.json::<ScryfallError>().await {
                    Ok(body) => format!("{} ({})", body.details, body.code),
                    Err(_) => format!("from {}", url),
                };
                Err(CatalogError::Transient(format!("HTTP {} {}", status, reason)))
            }
        }
    }
}

impl Catalog for ScryfallCatalog {
    async fn lookup_printings(&self, card_name: &str) -> CatalogResult<Vec<PrintingRecord>> {
        log::debug!("Looking up printings on Scryfall: {}", card_name);

        let query = [
            ("q", format!("!\"{}\"", card_name)),
            ("unique", "prints".to_string()),
            ("order", "released".to_string()),
            ("dir", "desc".to_string()),
        ];
        let mut url = format!("{}/cards/search", self.base_url);
        let mut first_page = true;
        let mut printings = Vec::new();

        loop {
            let params = if first_page { Some(&query[..]) } else { None };
            let page = match self.search_page(&url, params).await? {
                Some(page) => page,
                None if first_page => return Err(CatalogError::NotFound(card_name.to_string())),
                None => break,
            };
            if first_page {
                if let Some(total) = page.total_cards {
                    log::debug!("Scryfall reports {} printings of {}", total, card_name);
                }
            }
            first_page = false;

            printings.extend(page.data.iter().filter_map(printing_from_scryfall));

            match (page.has_more, page.next_page) {
                (true, Some(next)) => url = next,
                _ => break,
            }
        }

        sort_newest_first(&mut printings);
        log::info!("Found {} printings for {}", printings.len(), card_name);
        Ok(printings)
    }

    async fn fetch_image_bytes(
        &self,
        printing: &PrintingRecord,
        format: ImageFormat,
    ) -> CatalogResult<Vec<u8>> {
        let url = match format {
            ImageFormat::Png => printing.image_uris.png.as_deref(),
            ImageFormat::Jpg => printing.image_uris.large_jpg.as_deref(),
        }
        .ok_or_else(|| {
            CatalogError::NotFound(format!(
                "{} image for {}",
                format.extension(),
                printing.id()
            ))
        })?;

        log::debug!("Fetching image from URL: {}", url);
        let response = self.client.get(url).send().await?;
        if response.status().is_success() {
            Ok(response.bytes().await?.to_vec())
        } else {
            Err(CatalogError::Transient(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )))
        }
    }
}

#[cfg(test)]
#[path = "scryfall_tests.rs"]
mod tests;
