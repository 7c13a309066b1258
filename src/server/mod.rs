//! HTTP surface: animation, system design and interview routers plus static media.

pub mod animation;
pub mod error;
pub mod interview;
pub mod system_design;

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use futures::Stream;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::app_config::AppConfig;
use crate::interview::InterviewRegistry;
use crate::media;
use crate::pipeline::journal::RunJournal;
use crate::pipeline::{GenerationRequest, Pipeline, PipelineResult, ProgressEvent, Workflow};
use crate::providers::LlmProvider;
use crate::render::{ArtifactRenderer, ManimRenderer, PlantUmlRenderer};
use crate::voice::{CommandVoice, MicrophoneListener, SpeechToText, TextToSpeech};

pub use error::ApiError;

/// Everything a handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub animation: Arc<Pipeline>,
    pub system_design: Arc<Pipeline>,
    pub interviews: Arc<InterviewRegistry>,
    pub tts: Arc<dyn TextToSpeech>,
    pub stt: Arc<dyn SpeechToText>,
    pub microphone: Arc<dyn MicrophoneListener>,
    pub tts_available: bool,
    pub media_root: PathBuf,
    pub media_prefix: String,
    pub audio_dir: PathBuf,
    pub audio_prefix: String,
}

impl AppState {
    /// Wire pipelines, renderers, voice engines and the session registry from config.
    pub fn from_config(config: &AppConfig, provider: Arc<dyn LlmProvider>) -> anyhow::Result<Self> {
        media::ensure_layout(&config.media.root)?;

        let journal = if config.pipeline.journal_enabled {
            Some(Arc::new(RunJournal::open(&config.pipeline.log_dir)?))
        } else {
            None
        };
        let build = |workflow: Workflow, renderer: Arc<dyn ArtifactRenderer>| {
            let pipeline = Pipeline::new(workflow, provider.clone(), renderer)
                .with_analysis(config.pipeline.analyze_prompt)
                .with_llm_settings(&config.llm);
            match &journal {
                Some(journal) => pipeline.with_journal(journal.clone()),
                None => pipeline,
            }
        };

        let manim: Arc<dyn ArtifactRenderer> = Arc::new(ManimRenderer::new(
            config.renderer.clone(),
            config.media.root.clone(),
            config.media.public_prefix.clone(),
        ));
        let plantuml: Arc<dyn ArtifactRenderer> = Arc::new(PlantUmlRenderer::new(&config.diagram));

        let voice = Arc::new(CommandVoice::new(&config.interview, &config.media.root));
        let media_prefix = config.media.public_prefix.trim_end_matches('/').to_string();
        let audio_prefix = format!("{media_prefix}/{}", config.interview.audio_subdir);
        let mut interviews = InterviewRegistry::new(provider.clone(), config.interview.max_questions)
            .with_retention(Duration::from_secs(config.interview.completed_retention_secs));
        if voice.tts_available() {
            interviews = interviews.with_tts(voice.clone(), audio_prefix.clone());
        }

        Ok(Self {
            animation: Arc::new(build(Workflow::Animation, manim)),
            system_design: Arc::new(build(Workflow::SystemDesign, plantuml)),
            interviews: Arc::new(interviews),
            tts_available: voice.tts_available(),
            audio_dir: voice.audio_dir().to_path_buf(),
            audio_prefix,
            tts: voice.clone(),
            stt: voice.clone(),
            microphone: voice,
            media_root: config.media.root.clone(),
            media_prefix,
        })
    }
}

pub fn router(state: AppState, cors_permissive: bool) -> Router {
    let media_route = if state.media_prefix.is_empty() {
        "/media".to_string()
    } else {
        state.media_prefix.clone()
    };
    let mut app = Router::new()
        .route("/", get(root))
        .nest("/ai-animation", animation::routes())
        .nest("/system-design", system_design::routes())
        .nest("/leetcode-qna", interview::routes())
        .nest_service(&media_route, ServeDir::new(&state.media_root))
        .with_state(state);
    if cors_permissive {
        app = app.layer(CorsLayer::permissive());
    }
    app
}

async fn root() -> axum::Json<Value> {
    axum::Json(json!({
        "service": "scenecraft",
        "version": env!("CARGO_PKG_VERSION"),
        "routes": ["/ai-animation", "/system-design", "/leetcode-qna", "/media"],
    }))
}

pub async fn serve(config: AppConfig, provider: Arc<dyn LlmProvider>) -> anyhow::Result<()> {
    let state = AppState::from_config(&config, provider)?;
    let app = router(state, config.server.cors_permissive);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    log::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("shutting down");
        })
        .await?;
    Ok(())
}

/// Body shared by both generate endpoints.
#[derive(Debug, Deserialize)]
pub struct PromptBody {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub style: Option<String>,
}

impl PromptBody {
    pub(crate) fn into_request(self) -> Result<GenerationRequest, ApiError> {
        let prompt = self.prompt.trim();
        if prompt.is_empty() {
            return Err(ApiError::BadRequest(
                "Prompt is required and cannot be empty".to_string(),
            ));
        }
        let mut request = GenerationRequest::new(prompt);
        request.style = self.style.filter(|s| !s.trim().is_empty());
        Ok(request)
    }
}

/// Progress event as sent on the wire, with the result in its endpoint's JSON shape.
fn wire_event(mut event: ProgressEvent, to_wire: fn(PipelineResult) -> Value) -> Value {
    let result = event.result.take();
    let mut value = serde_json::to_value(&event).unwrap_or(Value::Null);
    if let (Some(result), Value::Object(map)) = (result, &mut value) {
        map.insert("result".to_string(), to_wire(result));
    }
    value
}

/// Run `pipeline` in the background and relay its progress as server-sent events.
///
/// Dropping the response drops the receiver, which cancels the run at its next stage.
pub(crate) fn progress_stream(
    pipeline: Arc<Pipeline>,
    request: GenerationRequest,
    to_wire: fn(PipelineResult) -> Value,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<ProgressEvent>(16);
    tokio::spawn(async move {
        if let Err(e) = pipeline.run_stream(request, tx).await {
            log::info!("streamed run ended early: {e}");
        }
    });

    let stream = futures::stream::unfold(rx, move |mut rx| async move {
        let event = rx.recv().await?;
        let data = wire_event(event, to_wire).to_string();
        Some((Ok::<_, Infallible>(Event::default().data(data)), rx))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::test_support::get;
    use super::*;
    use crate::providers::scripted::ScriptedProvider;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn root_lists_routes() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(ScriptedProvider::new(), dir.path()), true);
        let response = app.oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["service"], "scenecraft");
    }

    #[tokio::test]
    async fn media_files_are_served() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("videos")).unwrap();
        std::fs::write(dir.path().join("videos/clip.mp4"), b"fake video").unwrap();
        let app = router(state(ScriptedProvider::new(), dir.path()), false);

        let response = app.oneshot(get("/media/videos/clip.mp4")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&bytes[..], b"fake video");
    }

    #[test]
    fn blank_prompt_is_rejected() {
        let body = PromptBody {
            prompt: "  \n ".to_string(),
            style: None,
        };
        assert!(matches!(body.into_request(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn wire_event_reshapes_result() {
        let result = PipelineResult {
            output_id: crate::types::OutputId::new("ab12cd34"),
            source: "code".into(),
            explanation: "why".into(),
            artifact_url: None,
            note: None,
            analysis: None,
        };
        let event = ProgressEvent::completed(result);
        let value = wire_event(event, |r| {
            serde_json::to_value(crate::pipeline::animation::AnimationOutput::from(r)).unwrap()
        });
        assert_eq!(value["stage"], "completed");
        assert_eq!(value["progress"], 100);
        assert_eq!(value["result"]["code"], "code");
        assert!(value["result"]["video_url"].is_null());
    }
}
