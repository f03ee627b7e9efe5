//! Classification Gateway
//!
//! Request/response access to the three independent classifiers
//! (content-safety, species, breed). The gateway returns raw verdicts only:
//! crossbreed interpretation and threshold policy belong to the pipeline.
//! No retries are performed here.

pub mod http;

use crate::distribution::Distribution;
use crate::error::UnavailableError;
use crate::image::ImageData;
use crate::types::{SafetyVerdict, SpeciesVerdict};
use async_trait::async_trait;

pub use http::{HttpClassificationGateway, HttpGatewayConfig};

/// Access to the classifier sub-service
#[async_trait]
pub trait ClassificationGateway: Send + Sync {
    /// Content-safety check
    async fn check_safety(&self, image: &ImageData) -> Result<SafetyVerdict, UnavailableError>;

    /// Species detection
    async fn detect_species(&self, image: &ImageData) -> Result<SpeciesVerdict, UnavailableError>;

    /// Top-K breed distribution for an already-detected species
    async fn classify_breed(
        &self,
        image: &ImageData,
        species: &str,
        top_k: usize,
    ) -> Result<Distribution, UnavailableError>;
}
