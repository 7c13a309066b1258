//! The generate → sanitize → render state machine shared by every workflow.
//!
//! Only a failed LLM call aborts a run. Policy rejections and render failures
//! degrade into a result without an artifact URL and an explanatory note.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::mpsc;

use super::analysis::{AnimationAnalysis, DesignAnalysis, parse_analysis};
use super::extract::{extract_artifact, extract_diagram};
use super::journal::RunJournal;
use super::policy::ScriptPolicy;
use super::types::{
    GeneratedArtifact, GenerationRequest, PipelineResult, ProgressEvent, RenderOutcome, Stage,
};
use super::{animation, system_design};
use crate::app_config::LlmConfig;
use crate::config::GENERATION_FAILED_EXPLANATION;
use crate::errors::PipelineError;
use crate::providers::{GenerationPrompt, LlmProvider};
use crate::render::ArtifactRenderer;
use crate::types::OutputId;

/// What a pipeline produces. Selects prompts, extraction and stage wording.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Workflow {
    Animation,
    SystemDesign,
}

impl Workflow {
    pub fn noun(self) -> &'static str {
        match self {
            Workflow::Animation => "animation",
            Workflow::SystemDesign => "diagram",
        }
    }

    pub fn policy(self) -> ScriptPolicy {
        match self {
            Workflow::Animation => ScriptPolicy::manim(),
            Workflow::SystemDesign => ScriptPolicy::plantuml(),
        }
    }

    fn analysis_prompt(self, prompt: &str) -> GenerationPrompt {
        match self {
            Workflow::Animation => animation::analysis_prompt(prompt),
            Workflow::SystemDesign => system_design::analysis_prompt(prompt),
        }
    }

    fn generation_prompt(self, request: &GenerationRequest, analysis: Option<&Value>) -> GenerationPrompt {
        match self {
            Workflow::Animation => animation::generation_prompt(request, analysis),
            Workflow::SystemDesign => system_design::generation_prompt(request, analysis),
        }
    }

    /// Structured analysis from the model reply, or the default one for the prompt.
    fn analysis(self, prompt: &str, reply: &str) -> Value {
        let parsed = match self {
            Workflow::Animation => parse_analysis::<AnimationAnalysis>(reply)
                .or_else(|| Some(AnimationAnalysis::fallback(prompt)))
                .and_then(|a| serde_json::to_value(a).ok()),
            Workflow::SystemDesign => parse_analysis::<DesignAnalysis>(reply)
                .or_else(|| Some(DesignAnalysis::fallback(prompt)))
                .and_then(|a| serde_json::to_value(a).ok()),
        };
        parsed.unwrap_or(Value::Null)
    }

    fn extract(self, reply: &str) -> GeneratedArtifact {
        match self {
            Workflow::Animation => extract_artifact(reply),
            Workflow::SystemDesign => extract_diagram(reply),
        }
    }

    fn describe(self, stage: Stage) -> String {
        let (noun, code) = match self {
            Workflow::Animation => ("animation", "Manim code"),
            Workflow::SystemDesign => ("system design", "PlantUML diagram"),
        };
        match stage {
            Stage::Started => format!("Starting {noun} generation"),
            Stage::Analyzing => format!("Analyzing {noun} requirements"),
            Stage::Analyzed => "Requirements analyzed".to_string(),
            Stage::Generating => format!("Generating {code}"),
            Stage::Generated => format!("{code} generated"),
            Stage::Sanitizing => format!("Validating {code}"),
            Stage::Sanitized => format!("{code} validated"),
            Stage::Rendering => format!("Rendering {}", self.noun()),
            Stage::Completed => "Generation complete".to_string(),
            Stage::Error => "Generation failed".to_string(),
        }
    }
}

/// Where stage transitions go: nowhere, or a bounded channel to a streaming caller.
enum Progress<'a> {
    Silent,
    Channel(&'a mpsc::Sender<ProgressEvent>),
}

impl Progress<'_> {
    async fn emit(&self, event: ProgressEvent) -> Result<(), PipelineError> {
        match self {
            Progress::Silent => Ok(()),
            Progress::Channel(tx) => tx.send(event).await.map_err(|_| PipelineError::Cancelled),
        }
    }
}

pub struct Pipeline {
    workflow: Workflow,
    provider: Arc<dyn LlmProvider>,
    renderer: Arc<dyn ArtifactRenderer>,
    policy: ScriptPolicy,
    analyze: bool,
    temperature: Option<f32>,
    max_tokens: u32,
    journal: Option<Arc<RunJournal>>,
}

impl Pipeline {
    pub fn new(
        workflow: Workflow,
        provider: Arc<dyn LlmProvider>,
        renderer: Arc<dyn ArtifactRenderer>,
    ) -> Self {
        let defaults = LlmConfig::default();
        Self {
            workflow,
            provider,
            renderer,
            policy: workflow.policy(),
            analyze: true,
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
            journal: None,
        }
    }

    pub fn with_analysis(mut self, enabled: bool) -> Self {
        self.analyze = enabled;
        self
    }

    pub fn with_llm_settings(mut self, llm: &LlmConfig) -> Self {
        self.temperature = llm.temperature;
        self.max_tokens = llm.max_tokens;
        self
    }

    pub fn with_journal(mut self, journal: Arc<RunJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn workflow(&self) -> Workflow {
        self.workflow
    }

    /// Run to completion without progress reporting.
    pub async fn run(&self, request: GenerationRequest) -> Result<PipelineResult, PipelineError> {
        self.drive(request, Progress::Silent).await
    }

    /// Run while sending one event per transition, ending in exactly one terminal event.
    ///
    /// A dropped receiver stops the run at the next stage boundary.
    pub async fn run_stream(
        &self,
        request: GenerationRequest,
        tx: mpsc::Sender<ProgressEvent>,
    ) -> Result<PipelineResult, PipelineError> {
        match self.drive(request, Progress::Channel(&tx)).await {
            Ok(result) => {
                tx.send(ProgressEvent::completed(result.clone()))
                    .await
                    .map_err(|_| PipelineError::Cancelled)?;
                Ok(result)
            }
            Err(PipelineError::Cancelled) => {
                log::info!("{} stream cancelled by client", self.workflow.noun());
                Err(PipelineError::Cancelled)
            }
            Err(e) => {
                let _ = tx.send(ProgressEvent::failed(e.to_string())).await;
                Err(e)
            }
        }
    }

    fn record(&self, id: &OutputId, step: &str, data: Value) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.log_event(id, step, data) {
                log::debug!("journal write failed for {id}: {e}");
            }
        }
    }

    fn prompt(&self, prompt: GenerationPrompt) -> GenerationPrompt {
        prompt
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }

    fn stage(&self, stage: Stage) -> ProgressEvent {
        ProgressEvent::stage(stage, self.workflow.describe(stage))
    }

    async fn drive(
        &self,
        mut request: GenerationRequest,
        progress: Progress<'_>,
    ) -> Result<PipelineResult, PipelineError> {
        request.prompt = request.prompt.trim().to_string();
        let output_id = request.output_id.clone().unwrap_or_else(OutputId::generate);
        let noun = self.workflow.noun();
        log::info!("{noun} run {output_id} started");
        self.record(&output_id, "started", json!({ "prompt": request.prompt }));
        progress.emit(self.stage(Stage::Started)).await?;

        let analysis = if self.analyze {
            progress.emit(self.stage(Stage::Analyzing)).await?;
            let reply = self
                .provider
                .generate(&self.prompt(self.workflow.analysis_prompt(&request.prompt)))
                .await?;
            let value = self.workflow.analysis(&request.prompt, &reply);
            self.record(&output_id, "analyzed", value.clone());
            progress
                .emit(self.stage(Stage::Analyzed).with_analysis(value.clone()))
                .await?;
            Some(value)
        } else {
            None
        };

        progress.emit(self.stage(Stage::Generating)).await?;
        let reply = self
            .provider
            .generate(&self.prompt(
                self.workflow.generation_prompt(&request, analysis.as_ref()),
            ))
            .await?;
        let artifact = self.workflow.extract(&reply);
        self.record(
            &output_id,
            "generated",
            json!({ "source_chars": artifact.source.len() }),
        );
        progress.emit(self.stage(Stage::Generated)).await?;

        if artifact.is_empty() {
            log::warn!("{noun} run {output_id}: no code block in model reply");
            return Ok(PipelineResult {
                output_id,
                source: String::new(),
                explanation: GENERATION_FAILED_EXPLANATION.to_string(),
                artifact_url: None,
                note: None,
                analysis,
            });
        }

        progress.emit(self.stage(Stage::Sanitizing)).await?;
        let sanitized = match self.policy.sanitize(&artifact) {
            Ok(sanitized) => sanitized,
            Err(e) => {
                log::warn!("{noun} run {output_id} rejected: {e}");
                self.record(&output_id, "rejected", json!({ "reason": e.to_string() }));
                return Ok(PipelineResult::degraded(
                    output_id,
                    artifact.source,
                    &artifact.explanation,
                    format!("Could not render {noun}: {e}"),
                    analysis,
                ));
            }
        };
        progress.emit(self.stage(Stage::Sanitized)).await?;

        progress.emit(self.stage(Stage::Rendering)).await?;
        let outcome = self.renderer.render(&sanitized, &output_id).await;
        let note = match outcome {
            RenderOutcome::Success(url) => {
                self.record(&output_id, "rendered", json!({ "url": url }));
                log::info!("{noun} run {output_id} completed");
                return Ok(PipelineResult {
                    output_id,
                    source: artifact.source,
                    explanation: artifact.explanation,
                    artifact_url: Some(url),
                    note: None,
                    analysis,
                });
            }
            RenderOutcome::ToolFailure(detail) => {
                format!("Could not render {noun}: Failed to render {noun}: {detail}")
            }
            RenderOutcome::Timeout => {
                format!("Could not render {noun}: {} rendering timed out", capitalize(noun))
            }
        };
        self.record(&output_id, "render_failed", json!({ "note": note }));
        Ok(PipelineResult::degraded(
            output_id,
            artifact.source,
            &artifact.explanation,
            note,
            analysis,
        ))
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
