//! Core data model: card identities, deck entries and printings

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalized card name used as the cache and selection key.
///
/// Case, surrounding/repeated whitespace, diacritics and the `Æ` ligature do
/// not affect identity: "Lim-Dûl's Vault" and "lim-dul's  vault" are the same
/// card, as are "Æther Vial" and "Aether Vial".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardIdentity(String);

impl CardIdentity {
    pub fn from_name(name: &str) -> Self {
        let folded: String = name
            .nfkd()
            .filter(|c| !is_combining_mark(*c))
            .collect::<String>()
            .to_lowercase()
            // Older printings spell "Aether" with the ligature
            .replace('æ', "ae");
        CardIdentity(folded.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One unique card of the decklist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardEntry {
    /// Name as first written in the decklist
    pub name: String,
    pub requested_quantity: u32,
}

impl CardEntry {
    pub fn identity(&self) -> CardIdentity {
        CardIdentity::from_name(&self.name)
    }
}

/// Identity of a printing within one card: set code plus collector number
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrintingId {
    pub set_code: String,
    pub collector_number: String,
}

impl PrintingId {
    pub fn new(set_code: &str, collector_number: &str) -> Self {
        Self {
            set_code: set_code.trim().to_uppercase(),
            collector_number: collector_number.trim().to_string(),
        }
    }

    /// Key used for file names and JSON maps, e.g. `LEA_161`
    pub fn file_key(&self) -> String {
        crate::fsutil::safe_filename(&format!("{}_{}", self.set_code, self.collector_number))
    }
}

impl fmt::Display for PrintingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.set_code, self.collector_number)
    }
}

/// Border colour of a printing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderColor {
    Black,
    White,
    Borderless,
    Silver,
    Gold,
    Yellow,
    #[serde(other)]
    Unknown,
}

impl BorderColor {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "black" => BorderColor::Black,
            "white" => BorderColor::White,
            "borderless" => BorderColor::Borderless,
            "silver" => BorderColor::Silver,
            "gold" => BorderColor::Gold,
            "yellow" => BorderColor::Yellow,
            _ => BorderColor::Unknown,
        }
    }
}

/// Frame edition of a printing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameYear {
    #[serde(rename = "1993")]
    Y1993,
    #[serde(rename = "1997")]
    Y1997,
    #[serde(rename = "2003")]
    Y2003,
    #[serde(rename = "2015")]
    Y2015,
    #[serde(rename = "future")]
    Future,
}

impl FrameYear {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "1993" => Some(FrameYear::Y1993),
            "1997" => Some(FrameYear::Y1997),
            "2003" => Some(FrameYear::Y2003),
            "2015" => Some(FrameYear::Y2015),
            "future" => Some(FrameYear::Future),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FrameYear::Y1993 => "1993",
            FrameYear::Y1997 => "1997",
            FrameYear::Y2003 => "2003",
            FrameYear::Y2015 => "2015",
            FrameYear::Future => "future",
        }
    }
}

/// Security stamp printed on a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stamp {
    Oval,
    Acorn,
    Triangle,
    Arena,
    Circle,
    Heart,
}

impl Stamp {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "oval" => Some(Stamp::Oval),
            "acorn" => Some(Stamp::Acorn),
            "triangle" => Some(Stamp::Triangle),
            "arena" => Some(Stamp::Arena),
            "circle" => Some(Stamp::Circle),
            "heart" => Some(Stamp::Heart),
            _ => None,
        }
    }
}

/// Image file format of a materialized printing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpg,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpg => "jpg",
        }
    }
}

/// Image URLs of a printing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintingImages {
    pub png: Option<String>,
    pub large_jpg: Option<String>,
    /// Preview size, not used for export
    pub normal: Option<String>,
}

impl PrintingImages {
    /// Best export-quality image: PNG preferred, large JPG fallback
    pub fn best(&self) -> Option<(&str, ImageFormat)> {
        if let Some(ref url) = self.png {
            return Some((url.as_str(), ImageFormat::Png));
        }
        self.large_jpg
            .as_deref()
            .map(|url| (url, ImageFormat::Jpg))
    }
}

/// One printing of a card as supplied by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintingRecord {
    pub set_code: String,
    #[serde(default)]
    pub set_name: String,
    pub collector_number: String,
    pub release_date: Option<NaiveDate>,
    pub border: BorderColor,
    pub frame_year: Option<FrameYear>,
    #[serde(default)]
    pub frame_effects: BTreeSet<String>,
    #[serde(default)]
    pub finishes: BTreeSet<String>,
    pub is_full_art: bool,
    pub is_hi_res: bool,
    pub is_default: bool,
    pub is_atypical: bool,
    pub security_stamp: Option<Stamp>,
    pub is_universes_beyond: bool,
    pub image_uris: PrintingImages,
    #[serde(default)]
    pub scryfall_uri: Option<String>,
}

impl PrintingRecord {
    pub fn id(&self) -> PrintingId {
        PrintingId::new(&self.set_code, &self.collector_number)
    }
}

/// Leading numeric part of a collector number ("12a" -> 12), for ordering
fn collector_sort_key(cn: &str) -> (u32, &str) {
    let digits: String = cn.chars().take_while(|c| c.is_ascii_digit()).collect();
    (digits.parse().unwrap_or(u32::MAX), cn)
}

/// Newest release first; undated printings last; ties by ascending
/// collector number
pub fn newest_first(a: &PrintingRecord, b: &PrintingRecord) -> Ordering {
    let by_date = match (a.release_date, b.release_date) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_date.then_with(|| {
        collector_sort_key(&a.collector_number).cmp(&collector_sort_key(&b.collector_number))
    })
}

/// Stable sort into the canonical newest-first order
pub fn sort_newest_first(printings: &mut [PrintingRecord]) {
    printings.sort_by(newest_first);
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Plain black-bordered printing with a PNG, for tests
    pub fn printing(set: &str, cn: &str, released: &str) -> PrintingRecord {
        PrintingRecord {
            set_code: set.to_uppercase(),
            set_name: format!("{} set", set),
            collector_number: cn.to_string(),
            release_date: NaiveDate::parse_from_str(released, "%Y-%m-%d").ok(),
            border: BorderColor::Black,
            frame_year: Some(FrameYear::Y2015),
            frame_effects: BTreeSet::new(),
            finishes: ["nonfoil".to_string()].into_iter().collect(),
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
}
