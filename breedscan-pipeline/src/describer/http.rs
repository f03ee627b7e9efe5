//! HTTP client for the vision-language describer
//!
//! `POST {base}/generate` with `{image, mime_type, prompt, max_tokens}`
//! returns `{"text": "..."}`.

use super::{PreparedImage, VisionLanguageModel};
use crate::error::UnavailableError;
use crate::http::{build_client, endpoint, post_json};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "vision";

/// Vision model client settings
#[derive(Debug, Clone)]
pub struct HttpVisionModelConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Completion length cap forwarded to the service
    pub max_tokens: u32,
}

impl HttpVisionModelConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            max_tokens: 600,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    image: &'a str,
    mime_type: &'a str,
    prompt: &'a str,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    text: String,
}

/// HTTP implementation of [`VisionLanguageModel`]
pub struct HttpVisionModel {
    http_client: Client,
    config: HttpVisionModelConfig,
}

impl HttpVisionModel {
    pub fn new(config: HttpVisionModelConfig) -> Result<Self, UnavailableError> {
        Ok(Self {
            http_client: build_client(SERVICE, config.timeout)?,
            config,
        })
    }
}

#[async_trait]
impl VisionLanguageModel for HttpVisionModel {
    async fn generate(
        &self,
        image: &PreparedImage,
        prompt: &str,
    ) -> Result<String, UnavailableError> {
        let url = endpoint(&self.config.base_url, "generate");
        let request = GenerateRequest {
            image: &image.data,
            mime_type: image.mime_type,
            prompt,
            max_tokens: self.config.max_tokens,
        };

        let response: GenerateResponse =
            post_json(&self.http_client, SERVICE, self.config.timeout, &url, &request).await?;
        Ok(response.text)
    }
}
