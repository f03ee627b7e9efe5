//! HTTP client for the knowledge retrieval store
//!
//! `POST {base}/query` with `{query, limit}` returns
//! `{"passages": [{"text", "source", "topic"}, ...]}`.

use super::{KnowledgeStore, Passage};
use crate::error::UnavailableError;
use crate::http::{build_client, endpoint, post_json};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "knowledge";

/// Knowledge store client settings
#[derive(Debug, Clone)]
pub struct HttpKnowledgeStoreConfig {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    passages: Vec<Passage>,
}

/// HTTP implementation of [`KnowledgeStore`]
pub struct HttpKnowledgeStore {
    http_client: Client,
    config: HttpKnowledgeStoreConfig,
}

impl HttpKnowledgeStore {
    pub fn new(config: HttpKnowledgeStoreConfig) -> Result<Self, UnavailableError> {
        Ok(Self {
            http_client: build_client(SERVICE, config.timeout)?,
            config,
        })
    }
}

#[async_trait]
impl KnowledgeStore for HttpKnowledgeStore {
    async fn query(&self, label: &str, limit: usize) -> Result<Vec<Passage>, UnavailableError> {
        let url = endpoint(&self.config.base_url, "query");
        let request = QueryRequest {
            query: label,
            limit,
        };
        let response: QueryResponse =
            post_json(&self.http_client, SERVICE, self.config.timeout, &url, &request).await?;

        let mut passages = response.passages;
        passages.truncate(limit);
        Ok(passages)
    }
}
