//! Contextual Describer
//!
//! Produces a grounded description of the pictured individual, using the
//! species, breed verdict and (optional) enrichment already determined
//! upstream. Breed identification is never delegated to this stage.
//!
//! The underlying vision-language capability is abstracted by
//! [`VisionLanguageModel`]; image preparation (upload / encoding) is a
//! separate step so the pipeline can run it while enrichment is in flight.

pub mod http;
pub mod parser;
pub mod prompt;

use crate::error::{DescribeError, UnavailableError};
use crate::image::ImageData;
use crate::types::{BreedVerdict, EnrichmentContext, VisualObservation};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub use http::{HttpVisionModel, HttpVisionModelConfig};
pub use parser::parse_observation;
pub use prompt::build_prompt;

/// Image in the form the vision-language service consumes
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImage {
    pub mime_type: &'static str,
    /// Inline base64 payload, or a reference returned by an upload step
    pub data: String,
}

/// Vision-language capability
#[async_trait]
pub trait VisionLanguageModel: Send + Sync {
    /// Prepare an image for [`generate`](Self::generate)
    ///
    /// Defaults to inline base64 encoding.
    async fn prepare(&self, image: &ImageData) -> Result<PreparedImage, UnavailableError> {
        Ok(PreparedImage {
            mime_type: image.mime_type(),
            data: image.to_base64(),
        })
    }

    /// Free-text completion for an image and instructions
    async fn generate(&self, image: &PreparedImage, prompt: &str)
        -> Result<String, UnavailableError>;
}

/// Contextual Describer
#[derive(Clone)]
pub struct ContextualDescriber {
    model: Arc<dyn VisionLanguageModel>,
}

impl ContextualDescriber {
    pub fn new(model: Arc<dyn VisionLanguageModel>) -> Self {
        Self { model }
    }

    /// Upload / encode the image ahead of the description request
    pub async fn prepare(&self, image: &ImageData) -> Result<PreparedImage, DescribeError> {
        Ok(self.model.prepare(image).await?)
    }

    /// Describe an already-prepared image
    pub async fn describe_prepared(
        &self,
        image: &PreparedImage,
        species: &str,
        breed: &BreedVerdict,
        enrichment: Option<&EnrichmentContext>,
    ) -> Result<VisualObservation, DescribeError> {
        let prompt = build_prompt(species, breed, enrichment);
        debug!(
            prompt_chars = prompt.len(),
            with_enrichment = enrichment.is_some(),
            "Requesting contextual description"
        );

        let text = self.model.generate(image, &prompt).await?;
        parse_observation(&text)
    }

    /// Prepare and describe in one call
    pub async fn describe(
        &self,
        image: &ImageData,
        species: &str,
        breed: &BreedVerdict,
        enrichment: Option<&EnrichmentContext>,
    ) -> Result<VisualObservation, DescribeError> {
        let prepared = self.prepare(image).await?;
        self.describe_prepared(&prepared, species, breed, enrichment)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::Distribution;
    use crate::image::{tests::PNG_BYTES, ImageInput};
    use std::sync::Mutex;

    /// Model echoing a canned reply and recording the prompt it saw
    struct RecordingModel {
        reply: Result<String, UnavailableError>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl VisionLanguageModel for RecordingModel {
        async fn generate(
            &self,
            _image: &PreparedImage,
            prompt: &str,
        ) -> Result<String, UnavailableError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone()
        }
    }

    fn verdict() -> BreedVerdict {
        BreedVerdict {
            primary_label: "beagle".into(),
            confidence: 0.9,
            distribution: Distribution::from_pairs([("beagle", 0.9)]),
            crossbreed: None,
        }
    }

    fn image() -> ImageData {
        ImageData::decode(ImageInput::Bytes(PNG_BYTES.to_vec())).unwrap()
    }

    #[tokio::test]
    async fn test_describe_parses_model_reply() {
        let model = Arc::new(RecordingModel {
            reply: Ok(r#"```json
{"description": "A beagle sniffing a log.", "traits": {"size": "medium", "energy_level": "high", "temperament": "curious"}, "health_observations": []}
```"#
                .to_string()),
            prompts: Mutex::new(Vec::new()),
        });
        let describer = ContextualDescriber::new(model.clone());

        let obs = describer.describe(&image(), "dog", &verdict(), None).await.unwrap();
        assert_eq!(obs.traits.temperament, "curious");

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("identified as a beagle"));
    }

    #[tokio::test]
    async fn test_default_prepare_encodes_inline() {
        let model = RecordingModel {
            reply: Ok(String::new()),
            prompts: Mutex::new(Vec::new()),
        };
        let image = image();
        let prepared = model.prepare(&image).await.unwrap();
        assert_eq!(prepared.mime_type, "image/png");
        assert_eq!(prepared.data, image.to_base64());
    }

    #[tokio::test]
    async fn test_errors_map_to_describe_error() {
        let unavailable = ContextualDescriber::new(Arc::new(RecordingModel {
            reply: Err(UnavailableError::Network {
                service: "vision",
                message: "refused".into(),
            }),
            prompts: Mutex::new(Vec::new()),
        }));
        let err = unavailable
            .describe(&image(), "dog", &verdict(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DescribeError::Unavailable(_)));

        let garbled = ContextualDescriber::new(Arc::new(RecordingModel {
            reply: Ok("sorry, no".into()),
            prompts: Mutex::new(Vec::new()),
        }));
        let err = garbled
            .describe(&image(), "dog", &verdict(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DescribeError::Parse(_)));
    }
}
