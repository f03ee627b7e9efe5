//! Ranked probability distributions
//!
//! A [`Distribution`] is a list of (label, probability) pairs ordered by
//! descending probability. Ordering is established once at construction, so
//! every consumer can rely on `entries()[0]` being the top prediction.
//! Probabilities need not sum to 1 (classifiers return top-K truncations).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One classifier prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityEntry {
    pub label: String,
    pub probability: f64,
}

impl ProbabilityEntry {
    pub fn new(label: impl Into<String>, probability: f64) -> Self {
        Self {
            label: label.into(),
            probability,
        }
    }
}

/// Ranked, monotonically non-increasing list of predictions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ProbabilityEntry>", into = "Vec<ProbabilityEntry>")]
pub struct Distribution {
    entries: Vec<ProbabilityEntry>,
}

impl Distribution {
    /// Build a distribution from arbitrary classifier output
    ///
    /// Normalisation:
    /// - entries with empty labels or non-finite probabilities are dropped
    /// - probabilities are clamped to [0, 1]
    /// - duplicate labels keep their highest probability
    /// - entries are stably sorted by descending probability
    pub fn from_entries(entries: impl IntoIterator<Item = ProbabilityEntry>) -> Self {
        let mut merged: Vec<ProbabilityEntry> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for entry in entries {
            let label = entry.label.trim();
            if label.is_empty() || !entry.probability.is_finite() {
                continue;
            }
            let probability = entry.probability.clamp(0.0, 1.0);

            match index.get(label) {
                Some(&i) => {
                    if probability > merged[i].probability {
                        merged[i].probability = probability;
                    }
                }
                None => {
                    index.insert(label.to_string(), merged.len());
                    merged.push(ProbabilityEntry::new(label, probability));
                }
            }
        }

        merged.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        Self { entries: merged }
    }

    /// Convenience constructor from (label, probability) pairs
    pub fn from_pairs<L: Into<String>>(pairs: impl IntoIterator<Item = (L, f64)>) -> Self {
        Self::from_entries(
            pairs
                .into_iter()
                .map(|(label, p)| ProbabilityEntry::new(label, p)),
        )
    }

    /// Ranked entries
    pub fn entries(&self) -> &[ProbabilityEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProbabilityEntry> {
        self.entries.iter()
    }

    /// Highest-ranked entry
    pub fn top(&self) -> Option<&ProbabilityEntry> {
        self.entries.first()
    }

    /// Keep only the `k` highest-ranked entries
    pub fn truncated(&self, k: usize) -> Self {
        Self {
            entries: self.entries.iter().take(k).cloned().collect(),
        }
    }
}

impl From<Vec<ProbabilityEntry>> for Distribution {
    fn from(entries: Vec<ProbabilityEntry>) -> Self {
        Self::from_entries(entries)
    }
}

impl From<Distribution> for Vec<ProbabilityEntry> {
    fn from(distribution: Distribution) -> Self {
        distribution.entries
    }
}

impl<'a> IntoIterator for &'a Distribution {
    type Item = &'a ProbabilityEntry;
    type IntoIter = std::slice::Iter<'a, ProbabilityEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_entries_sorts_descending() {
        let d = Distribution::from_pairs([("b", 0.2), ("a", 0.7), ("c", 0.1)]);
        let labels: Vec<_> = d.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let d = Distribution::from_pairs([("x", 0.3), ("y", 0.3), ("z", 0.3)]);
        let labels: Vec<_> = d.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_invalid_entries_dropped_and_clamped() {
        let d = Distribution::from_pairs([
            ("ok", 0.5),
            ("", 0.9),
            ("nan", f64::NAN),
            ("inf", f64::INFINITY),
            ("high", 1.4),
            ("neg", -0.2),
        ]);
        assert_eq!(d.len(), 3);
        assert_eq!(d.top().unwrap().label, "high");
        assert_eq!(d.top().unwrap().probability, 1.0);
        assert_eq!(d.entries()[2].label, "neg");
        assert_eq!(d.entries()[2].probability, 0.0);
    }

    #[test]
    fn test_duplicate_labels_keep_max() {
        let d = Distribution::from_pairs([("beagle", 0.2), ("pug", 0.3), ("beagle", 0.6)]);
        assert_eq!(d.len(), 2);
        assert_eq!(d.top().unwrap().label, "beagle");
        assert_eq!(d.top().unwrap().probability, 0.6);
    }

    #[test]
    fn test_truncated_keeps_ranking() {
        let d = Distribution::from_pairs([("a", 0.1), ("b", 0.5), ("c", 0.3), ("d", 0.05)]);
        let t = d.truncated(2);
        assert_eq!(t.len(), 2);
        let labels: Vec<_> = t.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["b", "c"]);
    }

    #[test]
    fn test_deserialize_normalizes() {
        let json = r#"[{"label":"cat","probability":0.1},{"label":"dog","probability":0.85}]"#;
        let d: Distribution = serde_json::from_str(json).unwrap();
        assert_eq!(d.top().unwrap().label, "dog");

        let back = serde_json::to_value(&d).unwrap();
        assert_eq!(back[0]["label"], "dog");
    }
}
