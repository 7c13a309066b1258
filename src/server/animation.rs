//! `/ai-animation` endpoints.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use super::{AppState, PromptBody, progress_stream};
use crate::media::{self, MediaInfo};
use crate::pipeline::PipelineResult;
use crate::pipeline::animation::AnimationOutput;
use crate::server::error::ApiError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate))
        .route("/generate-stream", post(generate_stream))
        .route("/media-info", get(media_info))
        .route("/health", get(health))
        .route("/workflow-info", get(workflow_info))
}

fn to_wire(result: PipelineResult) -> Value {
    serde_json::to_value(AnimationOutput::from(result)).unwrap_or(Value::Null)
}

/// `POST /ai-animation/generate`
async fn generate(
    State(state): State<AppState>,
    Json(body): Json<PromptBody>,
) -> Result<Json<AnimationOutput>, ApiError> {
    let request = body.into_request()?;
    log::info!("animation request: {}", request.prompt);
    let result = state.animation.run(request).await?;
    Ok(Json(result.into()))
}

/// `POST /ai-animation/generate-stream`
async fn generate_stream(
    State(state): State<AppState>,
    Json(body): Json<PromptBody>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body.into_request()?;
    Ok(progress_stream(state.animation.clone(), request, to_wire))
}

/// `GET /ai-animation/media-info`
async fn media_info(State(state): State<AppState>) -> Result<Json<MediaInfo>, ApiError> {
    let root = state.media_root.clone();
    let info = tokio::task::spawn_blocking(move || media::media_info(&root))
        .await
        .map_err(|e| ApiError::Internal(format!("media scan task failed: {e}")))??;
    Ok(Json(info))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "AI Animation Generator",
        "media_directory": state.media_root,
        "features": [
            "Streaming progress updates",
            "Multi-stage processing",
            "Prompt analysis",
            "Script sanitization",
        ],
    }))
}

async fn workflow_info() -> Json<Value> {
    Json(json!({
        "workflow_stages": [
            {
                "stage": "analyze_prompt",
                "description": "Analyze the request and determine animation requirements",
                "outputs": ["animation_type", "complexity", "key_concepts", "visual_objects"],
            },
            {
                "stage": "generate_code",
                "description": "Generate Manim code based on the analysis",
                "outputs": ["generated_code", "explanation"],
            },
            {
                "stage": "sanitize_code",
                "description": "Check the generated code against the script policy",
                "outputs": ["sanitized_code"],
            },
            {
                "stage": "render_animation",
                "description": "Render the animation with Manim",
                "outputs": ["video_url", "animation_id"],
            },
        ],
    }))
}
