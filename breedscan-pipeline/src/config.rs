//! Runtime configuration for the classification pipeline
//!
//! Thresholds are fixed when the orchestrator is constructed; nothing is
//! read from global state afterwards.

use crate::crossbreed::{CrossbreedThresholds, ThresholdError};
use breedscan_common::config::PipelineSettings;
use std::time::Duration;
use thiserror::Error;

/// Configuration validation error
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfRange { name: &'static str, value: f64 },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("supported_species must name at least one species")]
    NoSpecies,
}

impl From<ThresholdError> for ConfigError {
    fn from(err: ThresholdError) -> Self {
        match err {
            ThresholdError::OutOfRange { name, value } => ConfigError::OutOfRange { name, value },
        }
    }
}

impl From<ConfigError> for breedscan_common::Error {
    fn from(err: ConfigError) -> Self {
        breedscan_common::Error::Config(err.to_string())
    }
}

/// Immutable pipeline configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Minimum species confidence, inclusive (default 0.60)
    pub species_confidence_floor: f64,
    /// Minimum breed confidence, inclusive (default 0.40)
    pub breed_confidence_floor: f64,
    /// Crossbreed detection thresholds
    pub crossbreed: CrossbreedThresholds,
    /// Breed labels requested from the classifier (default 5)
    pub breed_top_k: usize,
    /// Accepted species, lower-case (default dog, cat)
    pub supported_species: Vec<String>,
    /// Timeout applied to every classifier and knowledge call (default 15 s)
    pub stage_timeout: Duration,
    /// Timeout applied to image preparation and description (default 30 s)
    pub description_timeout: Duration,
    /// Run safety and species checks concurrently (default false)
    pub concurrent_screening: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            species_confidence_floor: 0.60,
            breed_confidence_floor: 0.40,
            crossbreed: CrossbreedThresholds::default(),
            breed_top_k: 5,
            supported_species: vec!["dog".to_string(), "cat".to_string()],
            stage_timeout: Duration::from_secs(15),
            description_timeout: Duration::from_secs(30),
            concurrent_screening: false,
        }
    }
}

impl PipelineConfig {
    /// Overlay TOML settings onto the defaults and validate
    pub fn from_settings(settings: &PipelineSettings) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let crossbreed = CrossbreedThresholds {
            second_threshold: settings
                .crossbreed_second_threshold
                .unwrap_or(defaults.crossbreed.second_threshold),
            purebred_confidence: settings
                .purebred_confidence_threshold
                .unwrap_or(defaults.crossbreed.purebred_confidence),
            max_gap: settings
                .crossbreed_gap_threshold
                .unwrap_or(defaults.crossbreed.max_gap),
        };

        let config = Self {
            species_confidence_floor: settings
                .species_confidence_floor
                .unwrap_or(defaults.species_confidence_floor),
            breed_confidence_floor: settings
                .breed_confidence_floor
                .unwrap_or(defaults.breed_confidence_floor),
            crossbreed,
            breed_top_k: settings.breed_top_k.unwrap_or(defaults.breed_top_k),
            supported_species: settings
                .supported_species
                .as_ref()
                .map(|list| {
                    list.iter()
                        .map(|s| crate::types::normalize_species(s))
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.supported_species),
            stage_timeout: settings
                .stage_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.stage_timeout),
            description_timeout: settings
                .description_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.description_timeout),
            concurrent_screening: settings
                .concurrent_screening
                .unwrap_or(defaults.concurrent_screening),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check ranges and non-empty settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("species_confidence_floor", self.species_confidence_floor),
            ("breed_confidence_floor", self.breed_confidence_floor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { name, value });
            }
        }
        self.crossbreed.validate()?;

        if self.breed_top_k == 0 {
            return Err(ConfigError::Zero("breed_top_k"));
        }
        if self.stage_timeout.is_zero() {
            return Err(ConfigError::Zero("stage_timeout"));
        }
        if self.description_timeout.is_zero() {
            return Err(ConfigError::Zero("description_timeout"));
        }
        if self.supported_species.is_empty() {
            return Err(ConfigError::NoSpecies);
        }
        Ok(())
    }

    /// Whether `species` (already normalised) is accepted
    pub fn supports_species(&self, species: &str) -> bool {
        self.supported_species.iter().any(|s| s == species)
    }
}
