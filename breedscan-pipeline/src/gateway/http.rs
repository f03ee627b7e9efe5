//! HTTP client for the classifier sub-service
//!
//! Endpoints (all `POST`, JSON):
//! - `{base}/safety`  `{image, mime_type}`
//! - `{base}/species` `{image, mime_type}`
//! - `{base}/breed`   `{image, mime_type, species, top_k}`
//!
//! Each returns `{"predictions": [{"label", "probability"}, ...]}`.

use super::ClassificationGateway;
use crate::distribution::{Distribution, ProbabilityEntry};
use crate::error::UnavailableError;
use crate::http::{build_client, endpoint, post_json};
use crate::image::ImageData;
use crate::types::{SafetyVerdict, SpeciesVerdict};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const SERVICE: &str = "classifier";

/// Labels the safety classifier uses for acceptable content
const SAFE_LABELS: [&str; 4] = ["safe", "sfw", "normal", "neutral"];

/// Gateway client settings
#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// Classifier sub-service base URL
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Unsafe score at or above which an image is unsafe (default 0.70)
    pub safety_threshold: f64,
}

impl HttpGatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
            safety_threshold: 0.70,
        }
    }
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    image: String,
    mime_type: &'a str,
}

#[derive(Debug, Serialize)]
struct BreedRequest<'a> {
    image: String,
    mime_type: &'a str,
    species: &'a str,
    top_k: usize,
}

/// Classifier response body
#[derive(Debug, Deserialize)]
pub struct PredictionResponse {
    pub predictions: Vec<ProbabilityEntry>,
}

/// HTTP implementation of [`ClassificationGateway`]
pub struct HttpClassificationGateway {
    http_client: Client,
    config: HttpGatewayConfig,
}

impl HttpClassificationGateway {
    pub fn new(config: HttpGatewayConfig) -> Result<Self, UnavailableError> {
        Ok(Self {
            http_client: build_client(SERVICE, config.timeout)?,
            config,
        })
    }

    async fn predict<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Distribution, UnavailableError> {
        let url = endpoint(&self.config.base_url, path);
        let response: PredictionResponse =
            post_json(&self.http_client, SERVICE, self.config.timeout, &url, body).await?;
        Ok(Distribution::from_entries(response.predictions))
    }
}

/// Unsafe score: combined probability of every non-safe label, capped at 1
pub fn unsafe_score(distribution: &Distribution) -> f64 {
    distribution
        .iter()
        .filter(|e| {
            !SAFE_LABELS
                .iter()
                .any(|safe| e.label.eq_ignore_ascii_case(safe))
        })
        .map(|e| e.probability)
        .sum::<f64>()
        .min(1.0)
}

#[async_trait]
impl ClassificationGateway for HttpClassificationGateway {
    async fn check_safety(&self, image: &ImageData) -> Result<SafetyVerdict, UnavailableError> {
        let body = ImageRequest {
            image: image.to_base64(),
            mime_type: image.mime_type(),
        };
        let distribution = self.predict("safety", &body).await?;
        if distribution.is_empty() {
            return Err(UnavailableError::InvalidResponse {
                service: SERVICE,
                message: "safety classifier returned no predictions".to_string(),
            });
        }

        let score = unsafe_score(&distribution);
        debug!(score = score, "Safety classifier responded");
        Ok(SafetyVerdict::from_score(score, self.config.safety_threshold))
    }

    async fn detect_species(&self, image: &ImageData) -> Result<SpeciesVerdict, UnavailableError> {
        let body = ImageRequest {
            image: image.to_base64(),
            mime_type: image.mime_type(),
        };
        let distribution = self.predict("species", &body).await?;

        let verdict = SpeciesVerdict::from_distribution(distribution).ok_or_else(|| {
            UnavailableError::InvalidResponse {
                service: SERVICE,
                message: "species classifier returned no predictions".to_string(),
            }
        })?;

        debug!(
            species = %verdict.species,
            confidence = verdict.confidence,
            "Species classifier responded"
        );
        Ok(verdict)
    }

    async fn classify_breed(
        &self,
        image: &ImageData,
        species: &str,
        top_k: usize,
    ) -> Result<Distribution, UnavailableError> {
        let body = BreedRequest {
            image: image.to_base64(),
            mime_type: image.mime_type(),
            species,
            top_k,
        };
        let distribution = self.predict("breed", &body).await?.truncated(top_k);

        debug!(
            species = species,
            entries = distribution.len(),
            top = ?distribution.top().map(|e| &e.label),
            "Breed classifier responded"
        );
        Ok(distribution)
    }
}
