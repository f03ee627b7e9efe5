//! Test Helper Utilities
//!
//! Scripted collaborators that count their calls, plus log capture.

#![allow(dead_code)]

pub mod log_capture;

pub use log_capture::LogCapture;

use async_trait::async_trait;
use breedscan_pipeline::describer::{PreparedImage, VisionLanguageModel};
use breedscan_pipeline::distribution::Distribution;
use breedscan_pipeline::enrichment::KnowledgeEnricher;
use breedscan_pipeline::error::{EnrichmentError, UnavailableError};
use breedscan_pipeline::image::ImageData;
use breedscan_pipeline::types::{EnrichmentContext, SafetyVerdict, SpeciesVerdict};
use breedscan_pipeline::gateway::ClassificationGateway;
use breedscan_pipeline::{PipelineConfig, PipelineOrchestrator};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Smallest byte sequence recognised as a PNG
pub fn png_bytes() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52,
    ]
}

pub fn unavailable(service: &'static str) -> UnavailableError {
    UnavailableError::Network {
        service,
        message: "connection refused".to_string(),
    }
}

pub fn species(label: &str, confidence: f64) -> SpeciesVerdict {
    let other = if label == "cat" { "dog" } else { "cat" };
    SpeciesVerdict::from_distribution(Distribution::from_pairs([
        (label, confidence),
        (other, (1.0 - confidence) / 2.0),
    ]))
    .unwrap()
}

pub fn purebred_distribution() -> Distribution {
    Distribution::from_pairs([
        ("golden_retriever", 0.89),
        ("labrador_retriever", 0.06),
        ("flat_coated_retriever", 0.03),
    ])
}

pub fn doodle_distribution() -> Distribution {
    Distribution::from_pairs([
        ("golden_retriever", 0.47),
        ("poodle", 0.36),
        ("labrador_retriever", 0.09),
    ])
}

pub fn golden_context() -> EnrichmentContext {
    EnrichmentContext {
        subject_labels: vec!["golden_retriever".to_string()],
        description: "Friendly, intelligent gundog bred for retrieving waterfowl.".to_string(),
        care_summary: "Daily exercise and weekly brushing.".to_string(),
        health_summary: "Prone to hip dysplasia.".to_string(),
        sources: vec!["breed-guide".to_string()],
    }
}

pub const DESCRIPTION_JSON: &str = r#"{"description": "A golden dog lying on a lawn with a tennis ball.", "traits": {"size": "large", "energy_level": "moderate", "temperament": "relaxed"}, "health_observations": []}"#;

async fn pause(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

// ============================================================================
// Classification gateway
// ============================================================================

pub struct MockGateway {
    pub safety: Result<SafetyVerdict, UnavailableError>,
    pub species: Result<SpeciesVerdict, UnavailableError>,
    pub breed: Result<Distribution, UnavailableError>,
    pub safety_delay: Option<Duration>,
    pub species_delay: Option<Duration>,
    pub breed_delay: Option<Duration>,
    pub safety_calls: AtomicUsize,
    pub species_calls: AtomicUsize,
    pub breed_calls: AtomicUsize,
    pub breed_requests: Mutex<Vec<(String, usize)>>,
}

impl MockGateway {
    /// Safe image of a dog with the given breed distribution
    pub fn dog(breed: Distribution) -> Self {
        Self {
            safety: Ok(SafetyVerdict::from_score(0.1, 0.70)),
            species: Ok(species("dog", 0.87)),
            breed: Ok(breed),
            safety_delay: None,
            species_delay: None,
            breed_delay: None,
            safety_calls: AtomicUsize::new(0),
            species_calls: AtomicUsize::new(0),
            breed_calls: AtomicUsize::new(0),
            breed_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> (usize, usize, usize) {
        (
            self.safety_calls.load(Ordering::SeqCst),
            self.species_calls.load(Ordering::SeqCst),
            self.breed_calls.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl ClassificationGateway for MockGateway {
    async fn check_safety(&self, _image: &ImageData) -> Result<SafetyVerdict, UnavailableError> {
        self.safety_calls.fetch_add(1, Ordering::SeqCst);
        pause(self.safety_delay).await;
        self.safety.clone()
    }

    async fn detect_species(&self, _image: &ImageData) -> Result<SpeciesVerdict, UnavailableError> {
        self.species_calls.fetch_add(1, Ordering::SeqCst);
        pause(self.species_delay).await;
        self.species.clone()
    }

    async fn classify_breed(
        &self,
        _image: &ImageData,
        species: &str,
        top_k: usize,
    ) -> Result<Distribution, UnavailableError> {
        self.breed_calls.fetch_add(1, Ordering::SeqCst);
        self.breed_requests
            .lock()
            .unwrap()
            .push((species.to_string(), top_k));
        pause(self.breed_delay).await;
        self.breed.clone()
    }
}

// ============================================================================
// Knowledge enricher
// ============================================================================

pub struct MockEnricher {
    pub result: Result<EnrichmentContext, EnrichmentError>,
    pub delay: Option<Duration>,
    /// Labels of every request, one entry per call
    pub requests: Mutex<Vec<Vec<String>>>,
}

impl MockEnricher {
    pub fn returning(result: Result<EnrichmentContext, EnrichmentError>) -> Self {
        Self {
            result,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeEnricher for MockEnricher {
    async fn enrich_single(&self, label: &str) -> Result<EnrichmentContext, EnrichmentError> {
        self.requests.lock().unwrap().push(vec![label.to_string()]);
        pause(self.delay).await;
        self.result.clone()
    }

    async fn enrich_pair(
        &self,
        label_a: &str,
        label_b: &str,
    ) -> Result<EnrichmentContext, EnrichmentError> {
        self.requests
            .lock()
            .unwrap()
            .push(vec![label_a.to_string(), label_b.to_string()]);
        pause(self.delay).await;
        self.result.clone()
    }
}

// ============================================================================
// Vision-language model
// ============================================================================

pub struct MockVision {
    pub reply: Result<String, UnavailableError>,
    pub prepare_error: Option<UnavailableError>,
    pub delay: Option<Duration>,
    pub prepare_calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl MockVision {
    pub fn replying(reply: Result<String, UnavailableError>) -> Self {
        Self {
            reply,
            prepare_error: None,
            delay: None,
            prepare_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl VisionLanguageModel for MockVision {
    async fn prepare(&self, image: &ImageData) -> Result<PreparedImage, UnavailableError> {
        self.prepare_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.prepare_error {
            return Err(err.clone());
        }
        Ok(PreparedImage {
            mime_type: image.mime_type(),
            data: image.to_base64(),
        })
    }

    async fn generate(&self, _image: &PreparedImage, prompt: &str) -> Result<String, UnavailableError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        pause(self.delay).await;
        self.reply.clone()
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Orchestrator wired to mocks, with handles kept for assertions
pub struct Harness {
    pub gateway: Arc<MockGateway>,
    pub enricher: Arc<MockEnricher>,
    pub vision: Arc<MockVision>,
    pub orchestrator: PipelineOrchestrator,
}

impl Harness {
    pub fn new(
        config: PipelineConfig,
        gateway: MockGateway,
        enricher: MockEnricher,
        vision: MockVision,
    ) -> Self {
        let gateway = Arc::new(gateway);
        let enricher = Arc::new(enricher);
        let vision = Arc::new(vision);
        let orchestrator = PipelineOrchestrator::new(
            config,
            gateway.clone(),
            enricher.clone(),
            vision.clone(),
        )
        .expect("valid test configuration");

        Self {
            gateway,
            enricher,
            vision,
            orchestrator,
        }
    }

    /// Default configuration, enrichment and description all succeed
    pub fn happy(breed: Distribution) -> Self {
        Self::new(
            PipelineConfig::default(),
            MockGateway::dog(breed),
            MockEnricher::returning(Ok(golden_context())),
            MockVision::replying(Ok(DESCRIPTION_JSON.to_string())),
        )
    }

    pub fn description_calls(&self) -> usize {
        self.vision.prompts.lock().unwrap().len()
    }
}
