//! Error types for the classification pipeline
//!
//! Collaborator-level errors (`UnavailableError`, `EnrichmentError`,
//! `DescribeError`) are converted by the orchestrator into exactly one
//! request-level [`Rejection`].

use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Stages that can end a request, in execution order
///
/// Knowledge enrichment is lenient and never ends a request, so it has no
/// variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Image decoding and validation
    Intake,
    /// Stage 1: content-safety check
    Safety,
    /// Stage 2: species detection
    Species,
    /// Stage 3: breed classification and crossbreed analysis
    Breed,
    /// Stage 5: contextual description
    Description,
}

impl Stage {
    /// Stable lower-case name used in logs and error bodies
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Intake => "intake",
            Stage::Safety => "safety",
            Stage::Species => "species",
            Stage::Breed => "breed",
            Stage::Description => "description",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A collaborator service could not be reached or answered unusably
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UnavailableError {
    #[error("{service} timed out after {after:?}")]
    Timeout {
        service: &'static str,
        after: Duration,
    },

    #[error("{service} network error: {message}")]
    Network {
        service: &'static str,
        message: String,
    },

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} returned an invalid response: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },
}

impl UnavailableError {
    /// Name of the collaborator that failed
    pub fn service(&self) -> &'static str {
        match self {
            UnavailableError::Timeout { service, .. }
            | UnavailableError::Network { service, .. }
            | UnavailableError::Status { service, .. }
            | UnavailableError::InvalidResponse { service, .. } => service,
        }
    }
}

/// Knowledge enrichment failure (always absorbed by the orchestrator)
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EnrichmentError {
    #[error(transparent)]
    Unavailable(#[from] UnavailableError),

    #[error("no knowledge passages found for {labels:?}")]
    NoResults { labels: Vec<String> },
}

/// Contextual description failure
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DescribeError {
    #[error(transparent)]
    Unavailable(#[from] UnavailableError),

    #[error("description parse error: {0}")]
    Parse(String),
}

/// Request-level rejection: the single reason a request did not succeed
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Rejection {
    /// Stage 1 judged the image unsafe
    #[error("content policy violation (unsafe score {score:.2})")]
    ContentPolicyViolation { score: f64 },

    /// Stage 2 detected a species the pipeline does not handle
    #[error("unsupported species: {species}")]
    UnsupportedSpecies { species: String },

    /// Stage 2 confidence below the floor
    #[error("species detection failed: confidence {confidence:.2} below {floor:.2}")]
    SpeciesDetectionFailed { confidence: f64, floor: f64 },

    /// Stage 3 confidence below the floor
    #[error("breed detection failed: confidence {confidence:.2} below {floor:.2}")]
    BreedDetectionFailed { confidence: f64, floor: f64 },

    /// A strict classification stage could not reach its collaborator
    #[error("{stage} stage unavailable: {source}")]
    Unavailable {
        stage: Stage,
        #[source]
        source: UnavailableError,
    },

    /// Stage 5 could not reach the describer
    #[error("description unavailable: {0}")]
    DescriptionUnavailable(#[source] UnavailableError),

    /// Stage 5 output could not be parsed
    #[error("description parse error: {0}")]
    DescriptionParseError(String),

    /// The submitted payload is not a usable image
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// The caller cancelled the request
    #[error("request cancelled")]
    Cancelled,
}

impl Rejection {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::ContentPolicyViolation { .. } => "CONTENT_POLICY_VIOLATION",
            Rejection::UnsupportedSpecies { .. } => "UNSUPPORTED_SPECIES",
            Rejection::SpeciesDetectionFailed { .. } => "SPECIES_DETECTION_FAILED",
            Rejection::BreedDetectionFailed { .. } => "BREED_DETECTION_FAILED",
            Rejection::Unavailable { .. } => "UNAVAILABLE",
            Rejection::DescriptionUnavailable(_) => "DESCRIPTION_UNAVAILABLE",
            Rejection::DescriptionParseError(_) => "DESCRIPTION_PARSE_ERROR",
            Rejection::InvalidImage(_) => "INVALID_IMAGE",
            Rejection::Cancelled => "CANCELLED",
        }
    }

    /// Stage at which the pipeline stopped (None for cancellation)
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Rejection::ContentPolicyViolation { .. } => Some(Stage::Safety),
            Rejection::UnsupportedSpecies { .. } | Rejection::SpeciesDetectionFailed { .. } => {
                Some(Stage::Species)
            }
            Rejection::BreedDetectionFailed { .. } => Some(Stage::Breed),
            Rejection::Unavailable { stage, .. } => Some(*stage),
            Rejection::DescriptionUnavailable(_) | Rejection::DescriptionParseError(_) => {
                Some(Stage::Description)
            }
            Rejection::InvalidImage(_) => Some(Stage::Intake),
            Rejection::Cancelled => None,
        }
    }

    /// Whether resubmitting the same image later could succeed
    ///
    /// Verdicts about the image itself are final; transport failures and
    /// cancellation are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Rejection::Unavailable { .. }
                | Rejection::DescriptionUnavailable(_)
                | Rejection::Cancelled
        )
    }
}

impl Rejection {
    /// Error body for callers: `{"error": {code, message, stage, retryable}}`
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "stage": self.stage(),
                "retryable": self.is_retryable(),
            }
        })
    }
}

impl From<DescribeError> for Rejection {
    fn from(err: DescribeError) -> Self {
        match err {
            DescribeError::Unavailable(e) => Rejection::DescriptionUnavailable(e),
            DescribeError::Parse(msg) => Rejection::DescriptionParseError(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_stages() {
        let rejection = Rejection::ContentPolicyViolation { score: 0.85 };
        assert_eq!(rejection.code(), "CONTENT_POLICY_VIOLATION");
        assert_eq!(rejection.stage(), Some(Stage::Safety));
        assert!(!rejection.is_retryable());

        let rejection = Rejection::Unavailable {
            stage: Stage::Breed,
            source: UnavailableError::Timeout {
                service: "classifier",
                after: Duration::from_secs(1),
            },
        };
        assert_eq!(rejection.stage(), Some(Stage::Breed));
        assert!(rejection.is_retryable());
        assert!(rejection.to_string().contains("breed stage unavailable"));
    }

    #[test]
    fn test_describe_error_conversion() {
        let parse: Rejection = DescribeError::Parse("bad json".into()).into();
        assert_eq!(parse, Rejection::DescriptionParseError("bad json".into()));
        assert!(!parse.is_retryable());

        let unavailable: Rejection = DescribeError::Unavailable(UnavailableError::Network {
            service: "vision",
            message: "refused".into(),
        })
        .into();
        assert_eq!(unavailable.code(), "DESCRIPTION_UNAVAILABLE");
        assert_eq!(unavailable.stage(), Some(Stage::Description));
    }

    #[test]
    fn test_json_body() {
        let body = Rejection::UnsupportedSpecies {
            species: "horse".into(),
        }
        .to_json();
        assert_eq!(body["error"]["code"], "UNSUPPORTED_SPECIES");
        assert_eq!(body["error"]["stage"], "species");
        assert_eq!(body["error"]["retryable"], false);
        assert_eq!(body["error"]["message"], "unsupported species: horse");

        let cancelled = Rejection::Cancelled.to_json();
        assert!(cancelled["error"]["stage"].is_null());
    }

    #[test]
    fn test_unavailable_service_name() {
        let err = UnavailableError::Status {
            service: "knowledge",
            status: 503,
            body: String::new(),
        };
        assert_eq!(err.service(), "knowledge");
    }
}
