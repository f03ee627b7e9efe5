//! Pipeline Orchestrator
//!
//! Sequences the classification stages and enforces each stage's failure
//! policy:
//!
//! | Stage | Operation                      | Policy  |
//! |-------|--------------------------------|---------|
//! | 1     | Safety check                   | strict  |
//! | 2     | Species detection              | strict  |
//! | 3     | Breed + crossbreed analysis    | strict  |
//! | 4     | Knowledge enrichment           | lenient |
//! | 5     | Contextual description         | strict  |
//!
//! Strict failures end the request with one [`Rejection`]. A lenient failure
//! is logged and leaves `enrichment` empty. Requests only move forward and
//! are never retried here.
//!
//! # Concurrency
//! - Stages 1 and 2 run concurrently when `concurrent_screening` is set;
//!   the first strict failure wins and the other call is dropped.
//! - Stage 4 runs alongside the describer's image preparation; the
//!   description request itself waits for stage 4.
//! - Classifier and knowledge calls are bounded by `stage_timeout`; image
//!   preparation and description by `description_timeout`.
//! - Cancelling (or dropping) a request drops all of its in-flight calls.
//!
//! # Example
//! ```rust,ignore
//! let orchestrator = PipelineOrchestrator::new(config, gateway, enricher, vision)?;
//! let result = orchestrator.analyze(image_bytes).await?;
//! println!("{} ({:.2})", result.breed.display_label(), result.breed.confidence);
//! ```

use crate::config::{ConfigError, PipelineConfig};
use crate::crossbreed::CrossbreedAnalyzer;
use crate::describer::{ContextualDescriber, PreparedImage, VisionLanguageModel};
use crate::enrichment::KnowledgeEnricher;
use crate::error::{Rejection, Stage, UnavailableError};
use crate::gateway::ClassificationGateway;
use crate::image::{ImageData, ImageInput};
use crate::types::{
    normalize_species, BreedVerdict, EnrichmentContext, PipelineResult, SpeciesVerdict,
    VisualObservation,
};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Bound a collaborator call by `limit`, reporting expiry as unavailability
async fn with_timeout<T, E, F>(service: &'static str, limit: Duration, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<UnavailableError>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(UnavailableError::Timeout {
            service,
            after: limit,
        }
        .into()),
    }
}

/// Pipeline orchestrator
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    analyzer: CrossbreedAnalyzer,
    gateway: Arc<dyn ClassificationGateway>,
    enricher: Arc<dyn KnowledgeEnricher>,
    describer: ContextualDescriber,
}

impl PipelineOrchestrator {
    /// Create orchestrator with validated configuration and collaborators
    pub fn new(
        config: PipelineConfig,
        gateway: Arc<dyn ClassificationGateway>,
        enricher: Arc<dyn KnowledgeEnricher>,
        vision: Arc<dyn VisionLanguageModel>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let analyzer = CrossbreedAnalyzer::new(config.crossbreed)?;

        Ok(Self {
            config,
            analyzer,
            gateway,
            enricher,
            describer: ContextualDescriber::new(vision),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one image through the pipeline
    ///
    /// Returns a complete result or exactly one rejection reason.
    pub async fn analyze(&self, input: impl Into<ImageInput>) -> Result<PipelineResult, Rejection> {
        let request_id = Uuid::new_v4();
        let span = info_span!("analyze", %request_id);
        let input = input.into();

        async move {
            let result = self.run(request_id, input).await;
            match &result {
                Ok(r) => info!(
                    breed = %r.breed.display_label(),
                    confidence = r.breed.confidence,
                    crossbreed = r.is_crossbreed(),
                    enriched = r.enrichment.is_some(),
                    elapsed_ms = r.elapsed_ms,
                    "Analysis complete"
                ),
                Err(rejection) => info!(
                    code = rejection.code(),
                    stage = ?rejection.stage(),
                    reason = %rejection,
                    "Analysis rejected"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// [`analyze`](Self::analyze), abandoned as soon as `token` is cancelled
    ///
    /// Cancellation drops every in-flight collaborator call of the request.
    pub async fn analyze_with_cancellation(
        &self,
        input: impl Into<ImageInput>,
        token: &CancellationToken,
    ) -> Result<PipelineResult, Rejection> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                info!("Analysis cancelled by caller");
                Err(Rejection::Cancelled)
            }
            result = self.analyze(input) => result,
        }
    }

    async fn run(&self, request_id: Uuid, input: ImageInput) -> Result<PipelineResult, Rejection> {
        let started = Instant::now();

        let image = ImageData::decode(input)?;
        debug!(bytes = image.len(), mime_type = image.mime_type(), "Image accepted");

        // Stages 1-2
        let species = self.screen(&image).await?;

        // Stage 3
        let breed = self.breed_stage(&image, &species).await?;

        // Stage 4 alongside image preparation for stage 5
        let (enrichment, prepared) = tokio::try_join!(
            async { Ok::<_, Rejection>(self.enrichment_stage(&breed).await) },
            self.prepare_stage(&image),
        )?;

        // Stage 5
        let observation = self
            .description_stage(&prepared, &species, &breed, enrichment.as_ref())
            .await?;

        Ok(PipelineResult {
            request_id,
            species,
            breed,
            enrichment,
            observation,
            analyzed_at: Utc::now(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Stages 1 and 2: both must pass before breed classification
    async fn screen(&self, image: &ImageData) -> Result<SpeciesVerdict, Rejection> {
        if self.config.concurrent_screening {
            let ((), species) =
                tokio::try_join!(self.safety_stage(image), self.species_stage(image))?;
            Ok(species)
        } else {
            self.safety_stage(image).await?;
            self.species_stage(image).await
        }
    }

    async fn safety_stage(&self, image: &ImageData) -> Result<(), Rejection> {
        let verdict = with_timeout(
            "classifier",
            self.config.stage_timeout,
            self.gateway.check_safety(image),
        )
        .await
        .map_err(|source| Rejection::Unavailable {
            stage: Stage::Safety,
            source,
        })?;

        if !verdict.is_safe {
            warn!(score = verdict.score, "Image rejected by content-safety check");
            return Err(Rejection::ContentPolicyViolation {
                score: verdict.score,
            });
        }

        debug!(score = verdict.score, "Safety check passed");
        Ok(())
    }

    async fn species_stage(&self, image: &ImageData) -> Result<SpeciesVerdict, Rejection> {
        let mut verdict = with_timeout(
            "classifier",
            self.config.stage_timeout,
            self.gateway.detect_species(image),
        )
        .await
        .map_err(|source| Rejection::Unavailable {
            stage: Stage::Species,
            source,
        })?;

        // Gateways are not required to return lower-case labels
        verdict.species = normalize_species(&verdict.species);

        if !self.config.supports_species(&verdict.species) {
            return Err(Rejection::UnsupportedSpecies {
                species: verdict.species,
            });
        }

        // Inclusive floor
        if verdict.confidence < self.config.species_confidence_floor {
            return Err(Rejection::SpeciesDetectionFailed {
                confidence: verdict.confidence,
                floor: self.config.species_confidence_floor,
            });
        }

        info!(
            species = %verdict.species,
            confidence = verdict.confidence,
            "Species detected"
        );
        Ok(verdict)
    }

    async fn breed_stage(
        &self,
        image: &ImageData,
        species: &SpeciesVerdict,
    ) -> Result<BreedVerdict, Rejection> {
        let distribution = with_timeout(
            "classifier",
            self.config.stage_timeout,
            self.gateway
                .classify_breed(image, &species.species, self.config.breed_top_k),
        )
        .await
        .map_err(|source| Rejection::Unavailable {
            stage: Stage::Breed,
            source,
        })?;

        let floor = self.config.breed_confidence_floor;
        let primary_label = match distribution.top() {
            Some(top) => top.label.clone(),
            None => {
                return Err(Rejection::BreedDetectionFailed {
                    confidence: 0.0,
                    floor,
                })
            }
        };

        let analysis = self.analyzer.analyze(&distribution);
        if analysis.confidence < floor {
            return Err(Rejection::BreedDetectionFailed {
                confidence: analysis.confidence,
                floor,
            });
        }

        info!(
            breed = %primary_label,
            confidence = analysis.confidence,
            crossbreed = analysis.is_crossbreed,
            rule = ?analysis.rule,
            "Breed classified"
        );

        Ok(BreedVerdict {
            primary_label,
            confidence: analysis.confidence,
            distribution,
            crossbreed: analysis.info,
        })
    }

    /// Lenient: every failure becomes `None`
    async fn enrichment_stage(&self, breed: &BreedVerdict) -> Option<EnrichmentContext> {
        let lookup = async {
            match &breed.crossbreed {
                Some(info) => {
                    self.enricher
                        .enrich_pair(&info.parent_labels[0], &info.parent_labels[1])
                        .await
                }
                None => self.enricher.enrich_single(&breed.primary_label).await,
            }
        };

        match with_timeout("knowledge", self.config.stage_timeout, lookup).await {
            Ok(context) => {
                debug!(sources = context.sources.len(), "Enrichment retrieved");
                Some(context)
            }
            Err(e) => {
                warn!(error = %e, "Knowledge enrichment failed; continuing without it");
                None
            }
        }
    }

    async fn prepare_stage(&self, image: &ImageData) -> Result<PreparedImage, Rejection> {
        with_timeout(
            "vision",
            self.config.description_timeout,
            self.describer.prepare(image),
        )
        .await
        .map_err(Rejection::from)
    }

    async fn description_stage(
        &self,
        prepared: &PreparedImage,
        species: &SpeciesVerdict,
        breed: &BreedVerdict,
        enrichment: Option<&EnrichmentContext>,
    ) -> Result<VisualObservation, Rejection> {
        let observation = with_timeout(
            "vision",
            self.config.description_timeout,
            self.describer
                .describe_prepared(prepared, &species.species, breed, enrichment),
        )
        .await?;

        debug!(
            health_notes = observation.health_observations.len(),
            "Description parsed"
        );
        Ok(observation)
    }
}
