//! Core types for the classification pipeline
//!
//! Every value here is created once per request and never mutated after the
//! stage that produced it hands it on.

use crate::distribution::Distribution;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Stage verdicts
// ============================================================================

/// Stage 1 output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    /// Whether the image may be processed
    pub is_safe: bool,
    /// Unsafe-content score (0.0-1.0)
    pub score: f64,
}

impl SafetyVerdict {
    /// Derive a verdict from an unsafe-content score
    ///
    /// Scores at or above `threshold` are unsafe.
    pub fn from_score(score: f64, threshold: f64) -> Self {
        let score = if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            1.0
        };
        Self {
            is_safe: score < threshold,
            score,
        }
    }
}

/// Stage 2 output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesVerdict {
    /// Normalised (lower-case) species label
    pub species: String,
    /// Probability of the detected species
    pub confidence: f64,
    /// Full species distribution
    pub distribution: Distribution,
}

impl SpeciesVerdict {
    /// Build a verdict from the top entry of a species distribution
    pub fn from_distribution(distribution: Distribution) -> Option<Self> {
        let top = distribution.top()?;
        Some(Self {
            species: normalize_species(&top.label),
            confidence: top.probability,
            distribution: distribution.clone(),
        })
    }
}

/// Lower-case, trimmed species label
pub fn normalize_species(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Stage 3 output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreedVerdict {
    /// Top breed label (first parent for crossbreeds)
    pub primary_label: String,
    /// Category confidence: mean of the top two for crossbreeds, top-1 otherwise
    pub confidence: f64,
    /// Raw breed distribution from the classifier
    pub distribution: Distribution,
    /// Present only for detected crossbreeds
    pub crossbreed: Option<CrossbreedInfo>,
}

impl BreedVerdict {
    pub fn is_crossbreed(&self) -> bool {
        self.crossbreed.is_some()
    }

    /// Human-facing label: common cross name, "A x B", or the primary label
    pub fn display_label(&self) -> String {
        match &self.crossbreed {
            Some(info) => match &info.common_name {
                Some(name) => name.clone(),
                None => format!("{} x {}", info.parent_labels[0], info.parent_labels[1]),
            },
            None => self.primary_label.clone(),
        }
    }
}

/// Crossbreed interpretation of a breed distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossbreedInfo {
    /// The two highest-ranked distinct labels
    pub parent_labels: [String; 2],
    /// Known name of the cross, if the pair is in the lookup table
    pub common_name: Option<String>,
    /// Which rule fired and with what probabilities
    pub reasoning: String,
}

// ============================================================================
// Enrichment and description
// ============================================================================

/// Knowledge-base context for a breed or parent-breed pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentContext {
    /// Labels the context was retrieved for
    pub subject_labels: Vec<String>,
    pub description: String,
    pub care_summary: String,
    pub health_summary: String,
    /// Deduplicated source identifiers, first-seen order
    pub sources: Vec<String>,
}

/// Observed traits of the pictured individual
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservedTraits {
    pub size: String,
    pub energy_level: String,
    pub temperament: String,
}

/// Stage 5 output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualObservation {
    pub description: String,
    pub traits: ObservedTraits,
    #[serde(default)]
    pub health_observations: Vec<String>,
}

// ============================================================================
// Result
// ============================================================================

/// Terminal artifact of a successful request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Per-request identifier (also attached to log records)
    pub request_id: Uuid,
    pub species: SpeciesVerdict,
    pub breed: BreedVerdict,
    /// `None` when enrichment failed or found nothing
    pub enrichment: Option<EnrichmentContext>,
    pub observation: VisualObservation,
    pub analyzed_at: DateTime<Utc>,
    /// Wall-clock time spent in the pipeline
    pub elapsed_ms: u64,
}

impl PipelineResult {
    pub fn is_crossbreed(&self) -> bool {
        self.breed.is_crossbreed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safety_from_score() {
        assert!(SafetyVerdict::from_score(0.1, 0.7).is_safe);
        assert!(!SafetyVerdict::from_score(0.85, 0.7).is_safe);
        // At the threshold counts as unsafe
        assert!(!SafetyVerdict::from_score(0.7, 0.7).is_safe);
        assert!(!SafetyVerdict::from_score(f64::NAN, 0.7).is_safe);
    }

    #[test]
    fn test_species_from_distribution() {
        let d = Distribution::from_pairs([(" Dog ", 0.87), ("cat", 0.1)]);
        let verdict = SpeciesVerdict::from_distribution(d).unwrap();
        assert_eq!(verdict.species, "dog");
        assert_eq!(verdict.confidence, 0.87);

        assert!(SpeciesVerdict::from_distribution(Distribution::default()).is_none());
    }

    #[test]
    fn test_display_label() {
        let mut verdict = BreedVerdict {
            primary_label: "golden_retriever".into(),
            confidence: 0.415,
            distribution: Distribution::default(),
            crossbreed: Some(CrossbreedInfo {
                parent_labels: ["golden_retriever".into(), "poodle".into()],
                common_name: Some("Goldendoodle".into()),
                reasoning: String::new(),
            }),
        };
        assert_eq!(verdict.display_label(), "Goldendoodle");

        if let Some(info) = verdict.crossbreed.as_mut() {
            info.common_name = None;
        }
        assert_eq!(verdict.display_label(), "golden_retriever x poodle");

        verdict.crossbreed = None;
        assert_eq!(verdict.display_label(), "golden_retriever");
    }
}
