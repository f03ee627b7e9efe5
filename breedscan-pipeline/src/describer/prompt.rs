//! Prompt construction for the contextual describer
//!
//! The prompt hands the vision-language model everything already decided
//! upstream and asks only about the pictured individual. It never asks the
//! model to identify the breed.

use crate::types::{BreedVerdict, EnrichmentContext};
use std::fmt::Write;

/// Longest enrichment section forwarded to the model, in characters
const MAX_SECTION_CHARS: usize = 600;

/// JSON shape the model must answer with
pub const RESPONSE_SCHEMA: &str = r#"{"description": "<2-4 sentences about this individual animal>", "traits": {"size": "<small|medium|large|giant>", "energy_level": "<low|moderate|high>", "temperament": "<short phrase>"}, "health_observations": ["<visible condition>", "..."]}"#;

/// `golden_retriever` -> `golden retriever`
pub fn humanize_label(label: &str) -> String {
    label
        .split(|c: char| c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the describer prompt from upstream results
pub fn build_prompt(
    species: &str,
    breed: &BreedVerdict,
    enrichment: Option<&EnrichmentContext>,
) -> String {
    let species = humanize_label(species);
    let mut prompt = String::new();

    let _ = writeln!(prompt, "You are looking at a photo of a {}.", species);

    match &breed.crossbreed {
        Some(info) => {
            let a = humanize_label(&info.parent_labels[0]);
            let b = humanize_label(&info.parent_labels[1]);
            match &info.common_name {
                Some(name) => {
                    let _ = writeln!(
                        prompt,
                        "It has already been identified as a mixed-breed {}: a {} ({} x {} cross).",
                        species, name, a, b
                    );
                }
                None => {
                    let _ = writeln!(
                        prompt,
                        "It has already been identified as a mixed-breed {}: a cross between a {} and a {}.",
                        species, a, b
                    );
                }
            }
        }
        None => {
            let _ = writeln!(
                prompt,
                "It has already been identified as a {}.",
                humanize_label(&breed.primary_label)
            );
        }
    }
    prompt.push_str(
        "Treat this identification as settled. Do not re-identify, question or re-derive the breed.\n",
    );

    if let Some(ctx) = enrichment {
        prompt.push_str("\nReference knowledge about this breed (background only):\n");
        for (heading, text) in [
            ("Overview", &ctx.description),
            ("Care", &ctx.care_summary),
            ("Health", &ctx.health_summary),
        ] {
            let text = text.trim();
            if !text.is_empty() {
                let _ = writeln!(prompt, "- {}: {}", heading, clip(text, MAX_SECTION_CHARS));
            }
        }
    }

    prompt.push_str(
        "\nDescribe the specific individual in this photo, not the breed in general: \
         its coat colour and condition, build, posture, expression and surroundings. \
         Estimate its size, energy level and temperament from what is visible. \
         List only health observations you can actually see (for example eye discharge, \
         skin irritation, weight condition); use an empty list if there are none. \
         Do not repeat generic breed facts unless the photo confirms them.\n",
    );

    let _ = write!(
        prompt,
        "\nRespond with only a JSON object in exactly this shape:\n{}",
        RESPONSE_SCHEMA
    );

    prompt
}

/// Cut `text` at a char boundary, appending an ellipsis when shortened
fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(max_chars).collect();
    clipped.push_str("...");
    clipped
}
