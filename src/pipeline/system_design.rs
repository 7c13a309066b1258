//! System-design prompts and the diagram wire shape.

use serde::Serialize;
use serde_json::Value;

use super::analysis::summarize;
use super::types::{GenerationRequest, PipelineResult};
use crate::providers::GenerationPrompt;
use crate::render::plantuml::{DiagramComponents, parse_components};

const SYSTEM: &str = "You are a senior software architect. You describe architectures as \
PlantUML component diagrams and explain the trade-offs behind them.";

pub(crate) fn analysis_prompt(prompt: &str) -> GenerationPrompt {
    GenerationPrompt::new(format!(
        "Analyze the requirements of this system: {prompt}\n\n\
Reply with a single JSON object and nothing else, with these fields:\n\
- \"system_type\": short name of the kind of system\n\
- \"scale\": one of \"small\", \"medium\", \"large\"\n\
- \"key_components\": list of the main components\n\
- \"patterns\": list of architecture patterns that apply"
    ))
    .with_system(SYSTEM)
}

pub(crate) fn generation_prompt(request: &GenerationRequest, analysis: Option<&Value>) -> GenerationPrompt {
    let mut text = format!(
        "Design the architecture for: {}\n\n\
Produce a PlantUML component diagram that:\n\
- starts with @startuml and ends with @enduml\n\
- declares components, databases, queues and actors with short aliases (component \"Web App\" as web)\n\
- connects them with labelled arrows (web --> api : REST)\n\
- does not use !include, !import or !pragma directives\n",
        request.prompt
    );
    if let Some(style) = &request.style {
        text.push_str(&format!("- follows this style: {style}\n"));
    }
    if let Some(analysis) = analysis {
        let summary = summarize(analysis);
        if !summary.is_empty() {
            text.push_str("\nRequirements analysis:\n");
            text.push_str(&summary);
            text.push('\n');
        }
    }
    text.push_str(
        "\nFormat your response as follows:\n\
1. The diagram in a code block (wrapped in ```plantuml and ```)\n\
2. An explanation of the architecture: the role of each component, data flow, \
scalability considerations and best practices",
    );
    GenerationPrompt::new(text).with_system(SYSTEM)
}

/// JSON body of the system-design endpoints.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DesignOutput {
    pub analysis: Option<Value>,
    pub plantuml_code: String,
    pub explanation: String,
    pub diagram_url: Option<String>,
    pub d3_components: DiagramComponents,
    pub diagram_id: String,
}

impl From<PipelineResult> for DesignOutput {
    fn from(result: PipelineResult) -> Self {
        Self {
            d3_components: parse_components(&result.source),
            analysis: result.analysis,
            plantuml_code: result.source,
            explanation: result.explanation,
            diagram_url: result.artifact_url,
            diagram_id: result.output_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutputId;

    #[test]
    fn prompt_forbids_preprocessor_includes() {
        let prompt = generation_prompt(&GenerationRequest::new("url shortener"), None);
        assert!(prompt.user.contains("Design the architecture for: url shortener"));
        assert!(prompt.user.contains("!include"));
        assert!(!prompt.user.contains("Requirements analysis"));
    }

    #[test]
    fn output_carries_components_and_id() {
        let result = PipelineResult {
            output_id: OutputId::new("0badf00d"),
            source: "@startuml\n[Web] --> [API] : calls\n@enduml".into(),
            explanation: "two tiers".into(),
            artifact_url: Some("https://uml/svg/abc".into()),
            note: None,
            analysis: Some(serde_json::json!({ "scale": "small" })),
        };
        let output = DesignOutput::from(result);
        assert_eq!(output.diagram_id, "0badf00d");
        assert_eq!(output.d3_components.nodes.len(), 2);
        assert_eq!(output.d3_components.links[0].label.as_deref(), Some("calls"));

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["diagram_url"], "https://uml/svg/abc");
        assert_eq!(json["analysis"]["scale"], "small");
    }
}
