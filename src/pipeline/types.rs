use serde::{Deserialize, Serialize};

use crate::types::OutputId;

/// One incoming generation call. Discarded once the run finishes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Optional style hint ("minimal", "colourful", "whiteboard", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Fixed output id instead of a generated one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_id: Option<OutputId>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            style: None,
            output_id: None,
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_output_id(mut self, id: OutputId) -> Self {
        self.output_id = Some(id);
        self
    }
}

/// Raw LLM output split into the code/markup block and the prose around it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub source: String,
    pub explanation: String,
}

impl GeneratedArtifact {
    pub fn is_empty(&self) -> bool {
        self.source.trim().is_empty()
    }
}

/// Result of the external render step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Public URL of the located artifact.
    Success(String),
    ToolFailure(String),
    Timeout,
}

/// Composite returned to the caller of a run.
///
/// `artifact_url` is set only when rendering fully succeeded; otherwise `note`
/// says why and has already been appended to `explanation`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub output_id: OutputId,
    pub source: String,
    pub explanation: String,
    pub artifact_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<serde_json::Value>,
}

impl PipelineResult {
    pub(crate) fn degraded(
        output_id: OutputId,
        source: String,
        explanation: &str,
        note: String,
        analysis: Option<serde_json::Value>,
    ) -> Self {
        Self {
            output_id,
            source,
            explanation: format!("{explanation}\n\nNote: {note}"),
            artifact_url: None,
            note: Some(note),
            analysis,
        }
    }

    pub fn rendered(&self) -> bool {
        self.artifact_url.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Started,
    Analyzing,
    Analyzed,
    Generating,
    Generated,
    Sanitizing,
    Sanitized,
    Rendering,
    Completed,
    Error,
}

impl Stage {
    pub fn progress(self) -> i32 {
        match self {
            Stage::Started => 0,
            Stage::Analyzing => 10,
            Stage::Analyzed => 25,
            Stage::Generating => 30,
            Stage::Generated => 50,
            Stage::Sanitizing => 60,
            Stage::Sanitized => 70,
            Stage::Rendering => 75,
            Stage::Completed => 100,
            Stage::Error => -1,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Completed | Stage::Error)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    InProgress,
    Completed,
    Error,
}

/// One entry of the streamed progress sequence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub status: EventStatus,
    pub progress: i32,
    pub stage: Stage,
    pub stage_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<PipelineResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressEvent {
    pub fn stage(stage: Stage, description: impl Into<String>) -> Self {
        Self {
            status: EventStatus::InProgress,
            progress: stage.progress(),
            stage,
            stage_description: description.into(),
            analysis: None,
            result: None,
            error: None,
        }
    }

    pub fn completed(result: PipelineResult) -> Self {
        let description = if result.rendered() {
            "Generation complete"
        } else {
            "Completed without a rendered artifact"
        };
        Self {
            status: EventStatus::Completed,
            result: Some(result),
            ..Self::stage(Stage::Completed, description)
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: EventStatus::Error,
            error: Some(error.into()),
            ..Self::stage(Stage::Error, "Generation failed")
        }
    }

    pub fn with_analysis(mut self, analysis: serde_json::Value) -> Self {
        self.analysis = Some(analysis);
        self
    }
}
