use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::extract::extract_json;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimationAnalysis {
    pub animation_type: String,
    pub complexity: String,
    #[serde(default)]
    pub key_concepts: Vec<String>,
    #[serde(default)]
    pub visual_objects: Vec<String>,
}

impl AnimationAnalysis {
    pub fn fallback(prompt: &str) -> Self {
        Self {
            animation_type: "educational".to_string(),
            complexity: "medium".to_string(),
            key_concepts: vec![prompt.trim().to_string()],
            visual_objects: vec!["Text".to_string(), "Circle".to_string(), "Arrow".to_string()],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DesignAnalysis {
    pub system_type: String,
    pub scale: String,
    #[serde(default)]
    pub key_components: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl DesignAnalysis {
    pub fn fallback(_prompt: &str) -> Self {
        Self {
            system_type: "web application".to_string(),
            scale: "medium".to_string(),
            key_components: vec![
                "API Gateway".to_string(),
                "Application Service".to_string(),
                "Database".to_string(),
            ],
            patterns: vec!["layered architecture".to_string()],
        }
    }
}

/// Parse a model's analysis reply; `None` means the caller should use the fallback.
pub fn parse_analysis<T: serde::de::DeserializeOwned>(text: &str) -> Option<T> {
    let value = extract_json(text)?;
    if !matches!(value, Value::Object(_)) {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// Compact bullet rendering folded into the generation prompt.
pub fn summarize(analysis: &Value) -> String {
    let Some(map) = analysis.as_object() else {
        return String::new();
    };

    map.iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("- {}: {rendered}", key.replace('_', " "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_analysis() {
        let text = "```json\n{\"animation_type\": \"physics\", \"complexity\": \"simple\", \"key_concepts\": [\"gravity\"]}\n```";
        let parsed: AnimationAnalysis = parse_analysis(text).unwrap();
        assert_eq!(parsed.animation_type, "physics");
        assert_eq!(parsed.key_concepts, vec!["gravity"]);
        assert!(parsed.visual_objects.is_empty());
    }

    #[test]
    fn malformed_analysis_is_none() {
        assert!(parse_analysis::<AnimationAnalysis>("not json").is_none());
        assert!(parse_analysis::<AnimationAnalysis>("[1, 2]").is_none());
        assert!(parse_analysis::<DesignAnalysis>("{\"scale\": \"large\"}").is_none());
    }

    #[test]
    fn summary_lists_fields() {
        let value = serde_json::to_value(DesignAnalysis::fallback("shop")).unwrap();
        let summary = summarize(&value);
        assert!(summary.contains("- system type: web application"));
        assert!(summary.contains("- key components: API Gateway, Application Service, Database"));
    }
}
