//! Image intake
//!
//! The entry point accepts raw bytes or base64 text (optionally a `data:`
//! URL). Input is decoded once and its type sniffed from magic bytes so that
//! every collaborator receives the same validated payload.

use crate::error::Rejection;
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;

/// Image as submitted by the caller
#[derive(Debug, Clone)]
pub enum ImageInput {
    /// Raw file bytes
    Bytes(Vec<u8>),
    /// Base64 text or a `data:<mime>;base64,<payload>` URL
    Encoded(String),
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        ImageInput::Bytes(bytes)
    }
}

impl From<String> for ImageInput {
    fn from(encoded: String) -> Self {
        ImageInput::Encoded(encoded)
    }
}

/// Decoded, validated image shared by all stages of one request
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    bytes: Arc<[u8]>,
    mime_type: &'static str,
}

impl ImageData {
    /// Decode and validate caller input
    pub fn decode(input: ImageInput) -> Result<Self, Rejection> {
        let bytes = match input {
            ImageInput::Bytes(bytes) => bytes,
            ImageInput::Encoded(text) => decode_base64(&text)?,
        };

        if bytes.is_empty() {
            return Err(Rejection::InvalidImage("empty payload".to_string()));
        }

        let kind = infer::get(&bytes)
            .ok_or_else(|| Rejection::InvalidImage("unrecognised file type".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(Rejection::InvalidImage(format!(
                "expected an image, got {}",
                kind.mime_type()
            )));
        }

        Ok(Self {
            bytes: Arc::from(bytes),
            mime_type: kind.mime_type(),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Sniffed MIME type (e.g. `image/jpeg`)
    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Standard base64 encoding of the image bytes
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }
}

fn decode_base64(text: &str) -> Result<Vec<u8>, Rejection> {
    let payload = match text.trim().strip_prefix("data:") {
        Some(rest) => rest
            .split_once(";base64,")
            .map(|(_, data)| data)
            .ok_or_else(|| Rejection::InvalidImage("data URL is not base64".to_string()))?,
        None => text.trim(),
    };

    // Tolerate line-wrapped base64
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();

    general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| Rejection::InvalidImage(format!("invalid base64: {}", e)))
}
