//! Splitting raw LLM text into a code/markup block and its explanation.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use super::types::GeneratedArtifact;
use crate::config::NO_EXPLANATION;

const FENCE: &str = "```";

/// First fenced block becomes `source`; prose after the last fence becomes `explanation`.
pub fn extract_artifact(text: &str) -> GeneratedArtifact {
    GeneratedArtifact {
        source: first_fenced_block(text).unwrap_or_default(),
        explanation: trailing_explanation(text),
    }
}

/// Like [`extract_artifact`], but falls back to a bare `@startuml ... @enduml` span.
pub fn extract_diagram(text: &str) -> GeneratedArtifact {
    let mut artifact = extract_artifact(text);
    if artifact.source.is_empty() {
        if let Some(span) = bare_plantuml_span(text) {
            artifact.source = span.to_string();
            let after = text[text.find(span).map_or(0, |i| i + span.len())..].trim();
            if !after.is_empty() && !text.contains(FENCE) {
                artifact.explanation = after.to_string();
            }
        }
    }
    artifact
}

pub fn first_fenced_block(text: &str) -> Option<String> {
    static TAGGED_RE: OnceLock<Regex> = OnceLock::new();
    static INLINE_RE: OnceLock<Regex> = OnceLock::new();

    // A language tag only counts when it sits alone on the opening fence line;
    // otherwise the first word of the code would be swallowed as a tag.
    let tagged = TAGGED_RE.get_or_init(|| {
        Regex::new(r"(?s)```[ \t]*[A-Za-z0-9_+.\-]*[ \t]*\r?\n(.*?)```").expect("fence regex")
    });
    let inline = INLINE_RE.get_or_init(|| {
        Regex::new(r"(?s)```(?:(?:python|plantuml)[ \t]+)?(.*?)```").expect("inline regex")
    });

    let first_fence = text.find(FENCE)?;
    let caps = tagged
        .captures_at(text, first_fence)
        .filter(|c| c.get(0).is_some_and(|m| m.start() == first_fence))
        .or_else(|| inline.captures_at(text, first_fence))?;

    Some(caps.get(1)?.as_str().trim().to_string())
}

fn trailing_explanation(text: &str) -> String {
    let parts: Vec<&str> = text.split(FENCE).collect();
    if parts.len() >= 3 {
        let tail = parts[parts.len() - 1].trim();
        if !tail.is_empty() {
            return tail.to_string();
        }
    }
    NO_EXPLANATION.to_string()
}

fn bare_plantuml_span(text: &str) -> Option<&str> {
    let start = text.find("@startuml")?;
    let end_rel = text[start..].find("@enduml")?;
    Some(&text[start..start + end_rel + "@enduml".len()])
}

/// Pull a JSON object or array out of model output that may wrap it in a fence or prose.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if let Some(block) = first_fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(&block) {
            return Some(value);
        }
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) {
            if start < end {
                if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                    return Some(value);
                }
            }
        }
    }

    None
}
