//! breedscan-pipeline library interface
//!
//! Multi-stage pet-image classification: content safety, species, breed
//! (with crossbreed analysis), best-effort knowledge enrichment and a
//! grounded description of the pictured animal.
//!
//! Collaborators are reached through traits so that HTTP clients and test
//! doubles are interchangeable:
//! - [`gateway::ClassificationGateway`]
//! - [`enrichment::KnowledgeEnricher`] / [`enrichment::KnowledgeStore`]
//! - [`describer::VisionLanguageModel`]

pub mod config;
pub mod crossbreed;
pub mod describer;
pub mod distribution;
pub mod enrichment;
pub mod error;
pub mod gateway;
pub mod http;
pub mod image;
pub mod pipeline;
pub mod service;
pub mod types;

pub use crate::config::{ConfigError, PipelineConfig};
pub use crate::error::{Rejection, Stage, UnavailableError};
pub use crate::image::ImageInput;
pub use crate::pipeline::PipelineOrchestrator;
pub use crate::service::build_orchestrator;
pub use crate::types::PipelineResult;
