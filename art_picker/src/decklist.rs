//! Decklist parsing
//!
//! Turns pasted decklist text into one [`CardEntry`] per unique card name.
//! Each line is `<qty>x <name>`, `<qty> x <name>`, `<qty> <name>` or a bare
//! `<name>`; set and collector annotations exported by deck builders are
//! stripped since printings are chosen later. Bad lines become warnings and never stop the
//! rest of the list from parsing.

use crate::models::{CardEntry, CardIdentity};
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

lazy_static! {
    /// `4 Bolt`, `4x Bolt`, `4 x Bolt`; a lone `x` after the count is only a
    /// marker when a name follows it, so `1 X` is the card "X"
    static ref QUANTITY_LINE: Regex =
        Regex::new(r"^(\d+)(?:\s*[xX]\s+(\S.*)|\s+(.*)|[xX])?$").unwrap();
    /// `(M10)`, `(M10) 146`, `[LEA]`, `[LEA:161]` at the end of a line
    static ref TRAILING_SET_ANNOTATION: Regex =
        Regex::new(r"\s*(?:\([^()]*\)|\[[^\[\]]*\])(?:\s+[0-9][0-9A-Za-z★†\-]*)?\s*$").unwrap();
    /// `*F*`, `*Foil*`, `*E*` markers
    static ref TRAILING_FINISH_MARKER: Regex = Regex::new(r"\s*\*[^*]*\*\s*$").unwrap();
}

const SECTION_HEADERS: &[&str] = &[
    "deck",
    "main",
    "mainboard",
    "sideboard",
    "commander",
    "companion",
    "maybeboard",
];

/// Why a line could not be turned into a card entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarningKind {
    /// A quantity with nothing after it, e.g. `4x`
    MissingName,
    /// Quantity of zero or too large to represent
    InvalidQuantity,
    /// Starts like a quantity but is not `<n>` / `<n>x` followed by a space
    MalformedQuantity,
    /// Nothing resembling a card name is left after stripping annotations
    NoCardName,
}

/// A decklist line that was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// 1-based line number in the input
    pub line_number: usize,
    pub line: String,
    pub kind: ParseWarningKind,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.kind {
            ParseWarningKind::MissingName => "quantity without a card name",
            ParseWarningKind::InvalidQuantity => "quantity must be between 1 and 4294967295",
            ParseWarningKind::MalformedQuantity => "malformed quantity",
            ParseWarningKind::NoCardName => "no card name found",
        };
        write!(f, "Line {}: {} ({:?})", self.line_number, reason, self.line)
    }
}

/// Parsed decklist: unique cards in order of first appearance plus warnings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDecklist {
    pub entries: Vec<CardEntry>,
    pub warnings: Vec<ParseWarning>,
}

enum Line {
    Skip,
    Card { quantity: u32, name: String },
    Invalid(ParseWarningKind),
}

/// Strip deck-builder annotations from the end of a card name
fn strip_annotations(name: &str) -> &str {
    let mut current = name.trim();
    loop {
        let before = current.len();
        for re in [&*TRAILING_FINISH_MARKER, &*TRAILING_SET_ANNOTATION] {
            if let Some(m) = re.find(current) {
                current = current[..m.start()].trim_end();
            }
        }
        if current.len() == before {
            return current;
        }
    }
}

fn is_section_header(line: &str) -> bool {
    let header = line.trim_end_matches(':').trim().to_lowercase();
    SECTION_HEADERS.contains(&header.as_str())
}

fn classify_line(raw: &str) -> Line {
    let line = raw.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
        return Line::Skip;
    }
    if is_section_header(line) {
        return Line::Skip;
    }

    let (quantity, rest) = if let Some(caps) = QUANTITY_LINE.captures(line) {
        let quantity = match caps[1].parse::<u32>() {
            Ok(q) if q >= 1 => q,
            _ => return Line::Invalid(ParseWarningKind::InvalidQuantity),
        };
        match caps.get(2).or_else(|| caps.get(3)) {
            Some(rest) if !rest.as_str().trim().is_empty() => (quantity, rest.as_str()),
            _ => return Line::Invalid(ParseWarningKind::MissingName),
        }
    } else if line.starts_with(|c: char| c.is_ascii_digit()) {
        return Line::Invalid(ParseWarningKind::MalformedQuantity);
    } else {
        (1, line)
    };

    let name = strip_annotations(rest);
    if !name.chars().any(char::is_alphabetic) {
        return Line::Invalid(ParseWarningKind::NoCardName);
    }
    Line::Card {
        quantity,
        name: name.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

/// Parse decklist text.
///
/// Duplicate names (after normalization) are merged by summing their
/// quantities; the first spelling and position win.
pub fn parse_decklist(text: &str) -> ParsedDecklist {
    let mut parsed = ParsedDecklist::default();
    let mut positions: HashMap<CardIdentity, usize> = HashMap::new();

    for (index, raw) in text.lines().enumerate() {
        let line_number = index + 1;
        match classify_line(raw) {
            Line::Skip => {}
            Line::Invalid(kind) => {
                let warning = ParseWarning {
                    line_number,
                    line: raw.to_string(),
                    kind,
                };
                warn!("{}", warning);
                parsed.warnings.push(warning);
            }
            Line::Card { quantity, name } => {
                let identity = CardIdentity::from_name(&name);
                match positions.get(&identity) {
                    Some(&pos) => {
                        let entry = &mut parsed.entries[pos];
                        entry.requested_quantity = entry.requested_quantity.saturating_add(quantity);
                        debug!("Merged duplicate line {} into {}", line_number, entry.name);
                    }
                    None => {
                        positions.insert(identity, parsed.entries.len());
                        parsed.entries.push(CardEntry {
                            name,
                            requested_quantity: quantity,
                        });
                    }
                }
            }
        }
    }

    parsed
}

/// Read and parse a decklist file. Invalid UTF-8 is replaced rather than
/// rejected.
pub fn read_decklist(path: &Path) -> std::io::Result<ParsedDecklist> {
    let bytes = std::fs::read(path)?;
    Ok(parse_decklist(&String::from_utf8_lossy(&bytes)))
}

#[cfg(test)]
#[path = "decklist_tests.rs"]
mod tests;
