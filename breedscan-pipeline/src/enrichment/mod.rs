//! Knowledge Enricher
//!
//! Retrieves knowledge-base context for a breed, or for both parents of a
//! crossbreed. Enrichment is best-effort: this module reports failures as
//! [`EnrichmentError`] and the pipeline converts them into an absent
//! enrichment.

pub mod http;

use crate::error::{EnrichmentError, UnavailableError};
use crate::types::EnrichmentContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub use http::{HttpKnowledgeStore, HttpKnowledgeStoreConfig};

/// Section of the knowledge base a passage belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Overview,
    Care,
    Health,
    #[default]
    #[serde(other)]
    Other,
}

/// One retrieved passage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    /// Source identifier (document id, URL, ...)
    pub source: String,
    #[serde(default)]
    pub topic: Topic,
}

/// Retrieval store queried by label
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Up to `limit` passages relevant to `label`; may be empty
    async fn query(&self, label: &str, limit: usize) -> Result<Vec<Passage>, UnavailableError>;
}

/// Breed context provider used by the pipeline
#[async_trait]
pub trait KnowledgeEnricher: Send + Sync {
    /// Context for a single breed
    async fn enrich_single(&self, label: &str) -> Result<EnrichmentContext, EnrichmentError>;

    /// Merged context for both parents of a crossbreed
    async fn enrich_pair(
        &self,
        label_a: &str,
        label_b: &str,
    ) -> Result<EnrichmentContext, EnrichmentError>;
}

/// [`KnowledgeEnricher`] backed by a [`KnowledgeStore`]
pub struct RetrievalEnricher {
    store: Arc<dyn KnowledgeStore>,
    passages_per_query: usize,
}

impl RetrievalEnricher {
    pub fn new(store: Arc<dyn KnowledgeStore>, passages_per_query: usize) -> Self {
        Self {
            store,
            passages_per_query: passages_per_query.max(1),
        }
    }

    async fn fetch(&self, label: &str) -> Result<Vec<Passage>, UnavailableError> {
        let passages = self.store.query(label, self.passages_per_query).await?;
        debug!(label = label, passages = passages.len(), "Knowledge store responded");
        Ok(passages)
    }
}

#[async_trait]
impl KnowledgeEnricher for RetrievalEnricher {
    async fn enrich_single(&self, label: &str) -> Result<EnrichmentContext, EnrichmentError> {
        let passages = self.fetch(label).await?;
        compose_context(vec![label.to_string()], passages)
    }

    async fn enrich_pair(
        &self,
        label_a: &str,
        label_b: &str,
    ) -> Result<EnrichmentContext, EnrichmentError> {
        let (a, b) = tokio::join!(self.fetch(label_a), self.fetch(label_b));

        let passages = match (a, b) {
            (Ok(mut a), Ok(b)) => {
                a.extend(b);
                a
            }
            (Ok(found), Err(e)) | (Err(e), Ok(found)) => {
                // Half a pair is still useful context
                warn!(error = %e, "One parent-breed knowledge query failed");
                found
            }
            (Err(e), Err(_)) => return Err(e.into()),
        };

        compose_context(vec![label_a.to_string(), label_b.to_string()], passages)
    }
}

/// Deduplicate passages and fold them into an [`EnrichmentContext`]
///
/// Passages are deduplicated on whitespace-normalised text and sources on
/// their identifier, keeping first-seen order. `Other` passages extend the
/// description.
pub fn compose_context(
    subject_labels: Vec<String>,
    passages: Vec<Passage>,
) -> Result<EnrichmentContext, EnrichmentError> {
    let passages = dedupe_passages(passages);
    if passages.is_empty() {
        return Err(EnrichmentError::NoResults {
            labels: subject_labels,
        });
    }

    let join = |topics: &[Topic]| -> String {
        passages
            .iter()
            .filter(|p| topics.contains(&p.topic))
            .map(|p| p.text.trim())
            .collect::<Vec<_>>()
            .join(" ")
    };

    let mut seen_sources = HashSet::new();
    let sources = passages
        .iter()
        .map(|p| p.source.trim())
        .filter(|s| !s.is_empty() && seen_sources.insert(s.to_string()))
        .map(str::to_string)
        .collect();

    Ok(EnrichmentContext {
        description: join(&[Topic::Overview, Topic::Other]),
        care_summary: join(&[Topic::Care]),
        health_summary: join(&[Topic::Health]),
        subject_labels,
        sources,
    })
}

fn dedupe_passages(passages: Vec<Passage>) -> Vec<Passage> {
    let mut seen = HashSet::new();
    passages
        .into_iter()
        .filter(|p| {
            let key = p.text.split_whitespace().collect::<Vec<_>>().join(" ");
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}
