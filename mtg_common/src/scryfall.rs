//! Scryfall API wire types
//!
//! Only the fields MTG tooling actually reads are modelled; everything else in
//! the Scryfall payload is ignored by serde.

use serde::{Deserialize, Serialize};

/// Scryfall card object (one printing)
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScryfallCard {
    pub name: String,
    #[serde(default)]
    pub set: String,
    #[serde(default)]
    pub set_name: String,
    #[serde(default)]
    pub collector_number: String,
    /// Release date as `YYYY-MM-DD`
    #[serde(default)]
    pub released_at: Option<String>,
    #[serde(default)]
    pub border_color: Option<String>,
    /// Frame edition: "1993", "1997", "2003", "2015" or "future"
    #[serde(default)]
    pub frame: Option<String>,
    #[serde(default)]
    pub frame_effects: Vec<String>,
    #[serde(default)]
    pub finishes: Vec<String>,
    #[serde(default)]
    pub full_art: bool,
    #[serde(default)]
    pub highres_image: bool,
    #[serde(default)]
    pub promo: bool,
    #[serde(default)]
    pub variation: bool,
    #[serde(default)]
    pub oversized: bool,
    #[serde(default)]
    pub promo_types: Vec<String>,
    #[serde(default)]
    pub security_stamp: Option<String>,
    #[serde(default)]
    pub scryfall_uri: Option<String>,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
    /// For double-faced cards, images are in card_faces
    #[serde(default)]
    pub card_faces: Option<Vec<CardFace>>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct ImageUris {
    pub small: Option<String>,
    pub normal: Option<String>,
    pub large: Option<String>,
    pub png: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CardFace {
    pub name: String,
    #[serde(default)]
    pub image_uris: Option<ImageUris>,
}

impl ScryfallCard {
    /// Image URIs of the card, falling back to the front face for
    /// double-faced cards
    pub fn images(&self) -> Option<&ImageUris> {
        if let Some(ref uris) = self.image_uris {
            return Some(uris);
        }
        self.card_faces
            .as_ref()
            .and_then(|faces| faces.first())
            .and_then(|face| face.image_uris.as_ref())
    }

    /// Whether Scryfall marks this printing with the Universes Beyond triangle
    /// stamp or promo type
    pub fn is_universes_beyond(&self) -> bool {
        self.security_stamp.as_deref() == Some("triangle")
            || self.promo_types.iter().any(|p| p == "universesbeyond")
    }
}

/// Paginated list returned by `/cards/search`
#[derive(Debug, Deserialize)]
pub struct SearchList {
    #[serde(default)]
    pub data: Vec<ScryfallCard>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub total_cards: Option<u64>,
}

/// Scryfall API error response
#[derive(Debug, Deserialize)]
pub struct ScryfallError {
    pub status: u16,
    pub code: String,
    pub details: String,
}
