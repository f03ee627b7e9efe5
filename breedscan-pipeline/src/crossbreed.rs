//! Crossbreed Analyzer
//!
//! Decides from a breed distribution whether the subject is a single breed
//! or a mix of two parent breeds, and names known crosses.
//!
//! Rules, evaluated in order on the top entry and the highest-ranked entry
//! of a different canonical breed ("second"):
//! 1. no such second entry: never a crossbreed
//! 2. `second > second_threshold`: crossbreed
//! 3. `top < purebred_confidence` and `top - second < max_gap`: crossbreed
//! 4. otherwise: single breed
//!
//! Reported confidence is `mean(top, second)` for a crossbreed and `top`
//! otherwise.

use crate::distribution::Distribution;
use crate::types::CrossbreedInfo;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use thiserror::Error;

/// Threshold validation error
#[derive(Debug, Error, PartialEq)]
pub enum ThresholdError {
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f64 },
}

/// Thresholds for crossbreed detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossbreedThresholds {
    /// Second-ranked probability above which the subject is a crossbreed (default 0.35)
    pub second_threshold: f64,
    /// Top probability below which a close race indicates a crossbreed (default 0.75)
    pub purebred_confidence: f64,
    /// Top/second gap below which a close race indicates a crossbreed (default 0.30)
    pub max_gap: f64,
}

impl Default for CrossbreedThresholds {
    fn default() -> Self {
        Self {
            second_threshold: 0.35,
            purebred_confidence: 0.75,
            max_gap: 0.30,
        }
    }
}

impl CrossbreedThresholds {
    /// Check every threshold lies in [0, 1]
    pub fn validate(&self) -> Result<(), ThresholdError> {
        for (name, value) in [
            ("crossbreed_second_threshold", self.second_threshold),
            ("purebred_confidence_threshold", self.purebred_confidence),
            ("crossbreed_gap_threshold", self.max_gap),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ThresholdError::OutOfRange { name, value });
            }
        }
        Ok(())
    }
}

/// Which rule classified the distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossbreedRule {
    /// Fewer than two entries
    InsufficientEntries,
    /// Second-ranked probability above threshold
    StrongSecond,
    /// Weak top prediction with a narrow gap
    NarrowMargin,
    /// Dominant top prediction
    Purebred,
}

/// Result of analysing one distribution
#[derive(Debug, Clone, PartialEq)]
pub struct CrossbreedAnalysis {
    pub is_crossbreed: bool,
    pub info: Option<CrossbreedInfo>,
    /// Category confidence (see module docs); 0.0 for an empty distribution
    pub confidence: f64,
    pub rule: CrossbreedRule,
}

/// Crossbreed Analyzer
#[derive(Debug, Clone, Default)]
pub struct CrossbreedAnalyzer {
    thresholds: CrossbreedThresholds,
}

impl CrossbreedAnalyzer {
    /// Create analyzer with validated thresholds
    pub fn new(thresholds: CrossbreedThresholds) -> Result<Self, ThresholdError> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &CrossbreedThresholds {
        &self.thresholds
    }

    /// Analyse a ranked breed distribution
    pub fn analyze(&self, distribution: &Distribution) -> CrossbreedAnalysis {
        // Variants of the top breed (`toy_poodle` under `poodle`) are not a second parent
        let second = distribution.top().and_then(|top| {
            let top_breed = canonical_label(&top.label);
            distribution
                .iter()
                .skip(1)
                .find(|e| canonical_label(&e.label) != top_breed)
        });

        let (top, second) = match (distribution.top(), second) {
            (Some(top), Some(second)) => (top, second),
            (top, _) => {
                return CrossbreedAnalysis {
                    is_crossbreed: false,
                    info: None,
                    confidence: top.map(|e| e.probability).unwrap_or(0.0),
                    rule: CrossbreedRule::InsufficientEntries,
                }
            }
        };

        let t = &self.thresholds;
        let (p1, p2) = (top.probability, second.probability);
        let gap = p1 - p2;

        let (rule, reasoning) = if p2 > t.second_threshold {
            (
                CrossbreedRule::StrongSecond,
                format!(
                    "second-ranked {} at {:.2} exceeds {:.2} (top {} at {:.2})",
                    second.label, p2, t.second_threshold, top.label, p1
                ),
            )
        } else if p1 < t.purebred_confidence && gap < t.max_gap {
            (
                CrossbreedRule::NarrowMargin,
                format!(
                    "top {} at {:.2} is below {:.2} and leads {} at {:.2} by only {:.2} (< {:.2})",
                    top.label, p1, t.purebred_confidence, second.label, p2, gap, t.max_gap
                ),
            )
        } else {
            return CrossbreedAnalysis {
                is_crossbreed: false,
                info: None,
                confidence: p1,
                rule: CrossbreedRule::Purebred,
            };
        };

        let info = CrossbreedInfo {
            parent_labels: [top.label.clone(), second.label.clone()],
            common_name: lookup_common_name(&top.label, &second.label).map(str::to_string),
            reasoning,
        };

        CrossbreedAnalysis {
            is_crossbreed: true,
            info: Some(info),
            confidence: (p1 + p2) / 2.0,
            rule,
        }
    }
}

// ============================================================================
// Parent-pair lookup
// ============================================================================

/// Known crosses, keyed by canonical parent labels
const KNOWN_CROSSES: &[(&str, &str, &str)] = &[
    ("golden_retriever", "poodle", "Goldendoodle"),
    ("labrador_retriever", "poodle", "Labradoodle"),
    ("cocker_spaniel", "poodle", "Cockapoo"),
    ("cavalier_king_charles_spaniel", "poodle", "Cavapoo"),
    ("maltese", "poodle", "Maltipoo"),
    ("bernese_mountain_dog", "poodle", "Bernedoodle"),
    ("old_english_sheepdog", "poodle", "Sheepadoodle"),
    ("australian_shepherd", "poodle", "Aussiedoodle"),
    ("schnauzer", "poodle", "Schnoodle"),
    ("yorkshire_terrier", "poodle", "Yorkipoo"),
    ("pug", "beagle", "Puggle"),
    ("pomeranian", "siberian_husky", "Pomsky"),
    ("chihuahua", "dachshund", "Chiweenie"),
    ("shih_tzu", "yorkshire_terrier", "Shorkie"),
    ("maltese", "yorkshire_terrier", "Morkie"),
    ("golden_retriever", "labrador_retriever", "Goldador"),
    ("german_shepherd", "siberian_husky", "Shepsky"),
    ("american_pit_bull_terrier", "siberian_husky", "Pitsky"),
    ("jack_russell_terrier", "pug", "Jug"),
    ("cavalier_king_charles_spaniel", "bichon_frise", "Cavachon"),
];

/// Label aliases mapped to the canonical names used in [`KNOWN_CROSSES`]
const ALIASES: &[(&str, &str)] = &[
    ("labrador", "labrador_retriever"),
    ("lab", "labrador_retriever"),
    ("golden", "golden_retriever"),
    ("standard_poodle", "poodle"),
    ("miniature_poodle", "poodle"),
    ("toy_poodle", "poodle"),
    ("husky", "siberian_husky"),
    ("english_cocker_spaniel", "cocker_spaniel"),
    ("american_cocker_spaniel", "cocker_spaniel"),
    ("blenheim_spaniel", "cavalier_king_charles_spaniel"),
    ("cavalier", "cavalier_king_charles_spaniel"),
    ("miniature_schnauzer", "schnauzer"),
    ("standard_schnauzer", "schnauzer"),
    ("giant_schnauzer", "schnauzer"),
    ("yorkie", "yorkshire_terrier"),
    ("maltese_dog", "maltese"),
    ("bernese", "bernese_mountain_dog"),
    ("german_shepherd_dog", "german_shepherd"),
    ("pit_bull", "american_pit_bull_terrier"),
    ("bichon", "bichon_frise"),
];

type PairKey = (String, String);

static CROSS_TABLE: Lazy<HashMap<PairKey, &'static str>> = Lazy::new(|| {
    KNOWN_CROSSES
        .iter()
        .map(|(a, b, name)| (pair_key(a, b), *name))
        .collect()
});

static ALIAS_TABLE: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| ALIASES.iter().copied().collect());

/// Canonical form of a breed label
///
/// Lower-cases, maps spaces and hyphens to underscores, then resolves aliases.
pub fn canonical_label(label: &str) -> String {
    let normalized: String = label
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect();

    match ALIAS_TABLE.get(normalized.as_str()) {
        Some(canonical) => canonical.to_string(),
        None => normalized,
    }
}

fn pair_key(a: &str, b: &str) -> PairKey {
    let (a, b) = (canonical_label(a), canonical_label(b));
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Common name for a parent pair, independent of argument order
pub fn lookup_common_name(a: &str, b: &str) -> Option<&'static str> {
    CROSS_TABLE.get(&pair_key(a, b)).copied()
}
