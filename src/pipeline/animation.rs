//! Manim animation prompts and the animation wire shape.

use serde::Serialize;
use serde_json::Value;

use super::analysis::summarize;
use super::types::{GenerationRequest, PipelineResult};
use crate::providers::GenerationPrompt;

const SYSTEM: &str = "You are an expert Manim developer who writes short, correct, \
educational animations. You only use the manim library and the Python standard library.";

pub(crate) fn analysis_prompt(prompt: &str) -> GenerationPrompt {
    GenerationPrompt::new(format!(
        "Analyze this animation request: {prompt}\n\n\
Reply with a single JSON object and nothing else, with these fields:\n\
- \"animation_type\": one of \"mathematical\", \"physics\", \"algorithm\", \"educational\", \"abstract\"\n\
- \"complexity\": one of \"simple\", \"medium\", \"complex\"\n\
- \"key_concepts\": list of concepts the animation must show\n\
- \"visual_objects\": list of Manim objects likely needed (Circle, Axes, Arrow, ...)"
    ))
    .with_system(SYSTEM)
}

pub(crate) fn generation_prompt(request: &GenerationRequest, analysis: Option<&Value>) -> GenerationPrompt {
    let mut text = format!(
        "Create a Manim animation to visualize the following: {}\n\n\
Generate Python code that uses the Manim library to create this visualization.\n\
The code should be complete, executable, and well-commented.\n\
Define a single Scene class that extends Scene.\n\n\
Important requirements:\n\
- Use only standard Manim imports and basic Python libraries\n\
- Create engaging, educational animations\n\
- Include smooth transitions and clear visual elements\n\
- Make the animation last 5-10 seconds\n\
- Use appropriate colors and styling\n",
        request.prompt
    );
    if let Some(style) = &request.style {
        text.push_str(&format!("- Visual style: {style}\n"));
    }
    if let Some(analysis) = analysis {
        let summary = summarize(analysis);
        if !summary.is_empty() {
            text.push_str("\nRequest analysis:\n");
            text.push_str(&summary);
            text.push('\n');
        }
    }
    text.push_str(
        "\nAlso provide a brief explanation of how the animation works and what it demonstrates.\n\n\
Format your response as follows:\n\
1. Python code block (wrapped in ```python and ```)\n\
2. Explanation of the animation",
    );
    GenerationPrompt::new(text).with_system(SYSTEM)
}

/// JSON body of the animation endpoints.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnimationOutput {
    pub code: String,
    pub explanation: String,
    pub video_url: Option<String>,
}

impl From<PipelineResult> for AnimationOutput {
    fn from(result: PipelineResult) -> Self {
        Self {
            code: result.source,
            explanation: result.explanation,
            video_url: result.artifact_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutputId;

    #[test]
    fn prompt_carries_request_style_and_analysis() {
        let request = GenerationRequest::new("bouncing ball").with_style("whiteboard");
        let analysis = serde_json::json!({ "complexity": "simple" });
        let prompt = generation_prompt(&request, Some(&analysis));
        assert!(prompt.user.contains("visualize the following: bouncing ball"));
        assert!(prompt.user.contains("Visual style: whiteboard"));
        assert!(prompt.user.contains("- complexity: simple"));
        assert!(prompt.system.is_some());
    }

    #[test]
    fn wire_shape_uses_code_and_video_url() {
        let result = PipelineResult {
            output_id: OutputId::new("ab12cd34"),
            source: "class A(Scene): pass".into(),
            explanation: "e".into(),
            artifact_url: None,
            note: None,
            analysis: None,
        };
        let json = serde_json::to_value(AnimationOutput::from(result)).unwrap();
        assert_eq!(json["code"], "class A(Scene): pass");
        assert!(json["video_url"].is_null());
        assert!(json.get("output_id").is_none());
    }
}
