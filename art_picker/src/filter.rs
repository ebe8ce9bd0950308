//! Printing filter engine
//!
//! Pure functions that narrow a card's printings down to the candidates
//! offered for browsing. No I/O happens here.

use crate::models::{newest_first, BorderColor, FrameYear, PrintingId, PrintingRecord, Stamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Border requirement of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderFilter {
    #[default]
    Any,
    Borderless,
    Black,
    White,
    Silver,
}

impl BorderFilter {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "any" => Some(BorderFilter::Any),
            "borderless" => Some(BorderFilter::Borderless),
            "black" => Some(BorderFilter::Black),
            "white" => Some(BorderFilter::White),
            "silver" => Some(BorderFilter::Silver),
            _ => None,
        }
    }

    fn accepts(&self, border: BorderColor) -> bool {
        match self {
            BorderFilter::Any => true,
            BorderFilter::Borderless => border == BorderColor::Borderless,
            BorderFilter::Black => border == BorderColor::Black,
            BorderFilter::White => border == BorderColor::White,
            BorderFilter::Silver => border == BorderColor::Silver,
        }
    }
}

/// Global filter options, applied to every card without an all-prints
/// override. All active predicates must hold (logical AND).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfiguration {
    /// Required border colour
    pub border: BorderFilter,
    /// Required frame edition
    pub frame_year: Option<FrameYear>,
    /// Every listed frame effect must be present on the printing
    pub frame_effects: BTreeSet<String>,
    /// With `border` Any or Borderless: offer only borderless printings when
    /// the card has any, otherwise ignore the border entirely
    pub prefer_borderless: bool,
    pub full_art_only: bool,
    pub hi_res_only: bool,
    pub default_only: bool,
    pub atypical_only: bool,
    pub exclude_universes_beyond: bool,
    /// Required security stamp
    pub stamp: Option<Stamp>,
}

impl FilterConfiguration {
    /// Whether `prefer_borderless` turns the border into a soft preference
    fn borderless_is_soft(&self) -> bool {
        self.prefer_borderless
            && matches!(self.border, BorderFilter::Any | BorderFilter::Borderless)
    }

    fn accepts(&self, p: &PrintingRecord, border: BorderFilter) -> bool {
        border.accepts(p.border)
            && self.frame_year.map_or(true, |fy| p.frame_year == Some(fy))
            && self
                .frame_effects
                .iter()
                .all(|fx| p.frame_effects.iter().any(|e| e.eq_ignore_ascii_case(fx)))
            && (!self.full_art_only || p.is_full_art)
            && (!self.hi_res_only || p.is_hi_res)
            && (!self.default_only || p.is_default)
            && (!self.atypical_only || p.is_atypical)
            && (!self.exclude_universes_beyond || !p.is_universes_beyond)
            && self.stamp.map_or(true, |s| p.security_stamp == Some(s))
    }
}

/// Which rule produced a candidate list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateBasis {
    /// All-prints override: filters bypassed
    AllPrints,
    /// Regular filter evaluation
    Filtered,
    /// Borderless preference satisfied
    PreferredBorderless,
    /// No borderless printing passed; border ignored instead
    BorderlessFallback,
}

/// Ordered printings offered for one card, newest release first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateList {
    pub printings: Vec<PrintingRecord>,
    pub basis: CandidateBasis,
}

impl CandidateList {
    /// An empty list means "no printings match", which is not an error
    pub fn is_empty(&self) -> bool {
        self.printings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.printings.len()
    }

    pub fn get(&self, index: usize) -> Option<&PrintingRecord> {
        self.printings.get(index)
    }

    pub fn position(&self, id: &PrintingId) -> Option<usize> {
        self.printings.iter().position(|p| &p.id() == id)
    }
}

fn ordered(mut printings: Vec<PrintingRecord>) -> Vec<PrintingRecord> {
    printings.sort_by(newest_first);
    printings
}

fn select(config: &FilterConfiguration, printings: &[PrintingRecord], border: BorderFilter) -> Vec<PrintingRecord> {
    ordered(
        printings
            .iter()
            .filter(|p| config.accepts(p, border))
            .cloned()
            .collect(),
    )
}

/// Compute the candidate list for one card.
///
/// `printings` is the card's full printing list in newest-first order.
pub fn candidates(
    config: &FilterConfiguration,
    printings: &[PrintingRecord],
    all_prints: bool,
) -> CandidateList {
    if all_prints {
        return CandidateList {
            printings: ordered(printings.to_vec()),
            basis: CandidateBasis::AllPrints,
        };
    }

    if config.borderless_is_soft() {
        let preferred = select(config, printings, BorderFilter::Borderless);
        if !preferred.is_empty() {
            return CandidateList {
                printings: preferred,
                basis: CandidateBasis::PreferredBorderless,
            };
        }
        return CandidateList {
            printings: select(config, printings, BorderFilter::Any),
            basis: CandidateBasis::BorderlessFallback,
        };
    }

    CandidateList {
        printings: select(config, printings, config.border),
        basis: CandidateBasis::Filtered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::printing;

    fn borderless(mut p: PrintingRecord) -> PrintingRecord {
        p.border = BorderColor::Borderless;
        p
    }

    fn sample() -> Vec<PrintingRecord> {
        vec![
            borderless(printing("sld", "1", "2022-01-01")),
            printing("m10", "146", "2009-07-17"),
            printing("lea", "161", "1993-08-05"),
        ]
    }

    fn ids(list: &CandidateList) -> Vec<String> {
        list.printings.iter().map(|p| p.id().to_string()).collect()
    }

    #[test]
    fn default_config_keeps_everything() {
        let list = candidates(&FilterConfiguration::default(), &sample(), false);
        assert_eq!(ids(&list), vec!["SLD 1", "M10 146", "LEA 161"]);
        assert_eq!(list.basis, CandidateBasis::Filtered);
    }

    #[test]
    fn border_predicate() {
        let config = FilterConfiguration {
            border: BorderFilter::Black,
            ..Default::default()
        };
        let list = candidates(&config, &sample(), false);
        assert_eq!(ids(&list), vec!["M10 146", "LEA 161"]);
    }

    #[test]
    fn predicates_are_conjunctive() {
        let mut printings = sample();
        printings[1].is_full_art = true;
        printings[2].is_full_art = true;
        printings[2].frame_year = Some(FrameYear::Y1993);

        let config = FilterConfiguration {
            full_art_only: true,
            frame_year: Some(FrameYear::Y1993),
            ..Default::default()
        };
        let list = candidates(&config, &printings, false);
        assert_eq!(ids(&list), vec!["LEA 161"]);
    }

    #[test]
    fn frame_effects_require_all_listed() {
        let mut printings = sample();
        printings[0].frame_effects = ["showcase".to_string(), "legendary".to_string()]
            .into_iter()
            .collect();
        printings[1].frame_effects = ["legendary".to_string()].into_iter().collect();

        let config = FilterConfiguration {
            frame_effects: ["Legendary".to_string(), "showcase".to_string()]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        let list = candidates(&config, &printings, false);
        assert_eq!(ids(&list), vec!["SLD 1"]);
    }

    #[test]
    fn flags_stamp_and_universes_beyond() {
        let mut printings = sample();
        printings[0].security_stamp = Some(Stamp::Triangle);
        printings[0].is_universes_beyond = true;
        printings[1].security_stamp = Some(Stamp::Oval);
        printings[2].is_default = false;
        printings[2].is_atypical = true;

        let no_ub = FilterConfiguration {
            exclude_universes_beyond: true,
            ..Default::default()
        };
        assert_eq!(ids(&candidates(&no_ub, &printings, false)), vec!["M10 146", "LEA 161"]);

        let oval = FilterConfiguration {
            stamp: Some(Stamp::Oval),
            ..Default::default()
        };
        assert_eq!(ids(&candidates(&oval, &printings, false)), vec!["M10 146"]);

        let atypical = FilterConfiguration {
            atypical_only: true,
            ..Default::default()
        };
        assert_eq!(ids(&candidates(&atypical, &printings, false)), vec!["LEA 161"]);

        let default_only = FilterConfiguration {
            default_only: true,
            ..Default::default()
        };
        assert_eq!(
            ids(&candidates(&default_only, &printings, false)),
            vec!["SLD 1", "M10 146"]
        );
    }

    #[test]
    fn all_prints_bypasses_filters() {
        let config = FilterConfiguration {
            border: BorderFilter::Silver,
            hi_res_only: true,
            ..Default::default()
        };
        assert!(candidates(&config, &sample(), false).is_empty());

        let list = candidates(&config, &sample(), true);
        assert_eq!(ids(&list), vec!["SLD 1", "M10 146", "LEA 161"]);
        assert_eq!(list.basis, CandidateBasis::AllPrints);
    }

    #[test]
    fn prefer_borderless_picks_borderless_when_present() {
        let config = FilterConfiguration {
            prefer_borderless: true,
            ..Default::default()
        };
        let list = candidates(&config, &sample(), false);
        assert_eq!(ids(&list), vec!["SLD 1"]);
        assert_eq!(list.basis, CandidateBasis::PreferredBorderless);
    }

    #[test]
    fn prefer_borderless_falls_back_when_none_borderless() {
        let printings: Vec<_> = sample().into_iter().skip(1).collect();
        for border in [BorderFilter::Any, BorderFilter::Borderless] {
            let config = FilterConfiguration {
                border,
                prefer_borderless: true,
                ..Default::default()
            };
            let list = candidates(&config, &printings, false);
            assert_eq!(ids(&list), vec!["M10 146", "LEA 161"]);
            assert_eq!(list.basis, CandidateBasis::BorderlessFallback);
        }
    }

    #[test]
    fn prefer_borderless_ignored_with_explicit_other_border() {
        let config = FilterConfiguration {
            border: BorderFilter::White,
            prefer_borderless: true,
            ..Default::default()
        };
        let list = candidates(&config, &sample(), false);
        assert!(list.is_empty());
        assert_eq!(list.basis, CandidateBasis::Filtered);
    }

    #[test]
    fn prefer_borderless_fallback_keeps_other_predicates() {
        let mut printings = sample();
        printings[0].is_hi_res = false;
        printings[2].is_hi_res = false;
        let config = FilterConfiguration {
            prefer_borderless: true,
            hi_res_only: true,
            ..Default::default()
        };
        let list = candidates(&config, &printings, false);
        assert_eq!(ids(&list), vec!["M10 146"]);
        assert_eq!(list.basis, CandidateBasis::BorderlessFallback);
    }

    #[test]
    fn ties_broken_by_collector_number() {
        let printings = vec![
            printing("sld", "20", "2021-01-01"),
            printing("sld", "3", "2021-01-01"),
        ];
        let list = candidates(&FilterConfiguration::default(), &printings, false);
        assert_eq!(ids(&list), vec!["SLD 3", "SLD 20"]);
    }

    #[test]
    fn config_roundtrips_through_partial_json() {
        let config: FilterConfiguration =
            serde_json::from_str(r#"{ "border": "borderless", "stamp": "acorn" }"#).unwrap();
        assert_eq!(config.border, BorderFilter::Borderless);
        assert_eq!(config.stamp, Some(Stamp::Acorn));
        assert!(!config.prefer_borderless);
    }

    #[test]
    fn position_finds_printing() {
        let list = candidates(&FilterConfiguration::default(), &sample(), false);
        assert_eq!(list.position(&PrintingId::new("m10", "146")), Some(1));
        assert_eq!(list.position(&PrintingId::new("xxx", "1")), None);
    }
}
