//! Wiring of the HTTP collaborators from loaded TOML configuration

use crate::config::PipelineConfig;
use crate::describer::{HttpVisionModel, HttpVisionModelConfig};
use crate::enrichment::{HttpKnowledgeStore, HttpKnowledgeStoreConfig, RetrievalEnricher};
use crate::error::UnavailableError;
use crate::gateway::{HttpClassificationGateway, HttpGatewayConfig};
use crate::pipeline::PipelineOrchestrator;
use breedscan_common::config::TomlConfig;
use breedscan_common::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Passages requested per knowledge query when unset
pub const DEFAULT_KNOWLEDGE_PASSAGES: usize = 4;

impl From<UnavailableError> for Error {
    fn from(err: UnavailableError) -> Self {
        Error::Internal(err.to_string())
    }
}

/// Build an orchestrator backed by the configured HTTP services
pub fn build_orchestrator(config: &TomlConfig) -> Result<PipelineOrchestrator> {
    let pipeline_config = PipelineConfig::from_settings(&config.pipeline)?;
    let request_timeout = Duration::from_secs(config.services.request_timeout_secs.max(1));

    let mut gateway_config = HttpGatewayConfig::new(&config.services.classifier_url);
    gateway_config.timeout = request_timeout;
    if let Some(threshold) = config.pipeline.safety_threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::Config(format!(
                "safety_threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        gateway_config.safety_threshold = threshold;
    }
    let gateway = HttpClassificationGateway::new(gateway_config)?;

    let store = HttpKnowledgeStore::new(HttpKnowledgeStoreConfig {
        base_url: config.services.knowledge_url.clone(),
        timeout: request_timeout,
    })?;
    let passages = config
        .pipeline
        .knowledge_passages
        .unwrap_or(DEFAULT_KNOWLEDGE_PASSAGES)
        .max(1);
    let enricher = RetrievalEnricher::new(Arc::new(store), passages);

    let mut vision_config = HttpVisionModelConfig::new(&config.services.vision_url);
    vision_config.timeout = pipeline_config.description_timeout;
    let vision = HttpVisionModel::new(vision_config)?;

    info!(
        classifier = %config.services.classifier_url,
        knowledge = %config.services.knowledge_url,
        vision = %config.services.vision_url,
        concurrent_screening = pipeline_config.concurrent_screening,
        "Pipeline collaborators configured"
    );

    Ok(PipelineOrchestrator::new(
        pipeline_config,
        Arc::new(gateway),
        Arc::new(enricher),
        Arc::new(vision),
    )?)
}
