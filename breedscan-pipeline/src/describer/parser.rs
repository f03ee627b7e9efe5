//! Parsing of the describer's structured output
//!
//! Accepts raw JSON, JSON wrapped in a ``` fence (with or without a language
//! tag), or a single JSON object surrounded by prose.

use crate::error::DescribeError;
use crate::types::{ObservedTraits, VisualObservation};
use serde::Deserialize;

const UNKNOWN: &str = "unknown";

#[derive(Debug, Deserialize)]
struct RawObservation {
    #[serde(default)]
    description: String,
    #[serde(default)]
    traits: RawTraits,
    #[serde(default)]
    health_observations: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTraits {
    #[serde(default)]
    size: String,
    #[serde(default, alias = "energy")]
    energy_level: String,
    #[serde(default)]
    temperament: String,
}

/// Parse model output into a [`VisualObservation`]
pub fn parse_observation(text: &str) -> Result<VisualObservation, DescribeError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DescribeError::Parse("empty response".to_string()));
    }

    let body = strip_fence(trimmed).unwrap_or(trimmed);

    let raw: RawObservation = match serde_json::from_str(body) {
        Ok(raw) => raw,
        Err(first_err) => {
            let object = outermost_object(body).ok_or_else(|| {
                DescribeError::Parse(format!("no JSON object found: {}", first_err))
            })?;
            serde_json::from_str(object).map_err(|e| DescribeError::Parse(e.to_string()))?
        }
    };

    let description = raw.description.trim();
    if description.is_empty() {
        return Err(DescribeError::Parse("missing description".to_string()));
    }

    Ok(VisualObservation {
        description: description.to_string(),
        traits: ObservedTraits {
            size: or_unknown(&raw.traits.size),
            energy_level: or_unknown(&raw.traits.energy_level),
            temperament: or_unknown(&raw.traits.temperament),
        },
        health_observations: raw
            .health_observations
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    })
}

fn or_unknown(value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        UNKNOWN.to_string()
    } else {
        value.to_string()
    }
}

/// Content of the first ``` fenced block, minus its language tag
fn strip_fence(text: &str) -> Option<&str> {
    let start = text.find("```")? + 3;
    let rest = &text[start..];
    let end = rest.find("```")?;
    let block = &rest[..end];

    // Drop a language tag such as `json` on the opening line
    let block = match block.find('\n') {
        Some(newline) if !block[..newline].trim_start().starts_with('{') => &block[newline + 1..],
        _ => block,
    };
    Some(block.trim())
}

/// Slice from the first `{` to the last `}`
fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
