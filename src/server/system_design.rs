//! `/system-design` endpoints.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use super::{AppState, PromptBody, progress_stream};
use crate::pipeline::PipelineResult;
use crate::pipeline::system_design::DesignOutput;
use crate::server::error::ApiError;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate))
        .route("/generate-stream", post(generate_stream))
        .route("/health", get(health))
        .route("/workflow-info", get(workflow_info))
}

fn to_wire(result: PipelineResult) -> Value {
    serde_json::to_value(DesignOutput::from(result)).unwrap_or(Value::Null)
}

async fn generate(
    State(state): State<AppState>,
    Json(body): Json<PromptBody>,
) -> Result<Json<DesignOutput>, ApiError> {
    let request = body.into_request()?;
    log::info!("system design request: {}", request.prompt);
    let result = state.system_design.run(request).await?;
    Ok(Json(result.into()))
}

async fn generate_stream(
    State(state): State<AppState>,
    Json(body): Json<PromptBody>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body.into_request()?;
    Ok(progress_stream(state.system_design.clone(), request, to_wire))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "System Design Generator",
        "features": [
            "Streaming progress updates",
            "PlantUML generation",
            "Component extraction",
            "Architecture analysis",
        ],
    }))
}

async fn workflow_info() -> Json<Value> {
    Json(json!({
        "workflow_stages": [
            {
                "stage": "analyze_requirements",
                "description": "Analyze system requirements and identify architecture patterns",
                "outputs": ["system_type", "scale", "key_components", "patterns"],
            },
            {
                "stage": "generate_plantuml",
                "description": "Generate a PlantUML component diagram with an explanation",
                "outputs": ["plantuml_code", "explanation"],
            },
            {
                "stage": "sanitize_diagram",
                "description": "Reject diagrams that pull in external content",
                "outputs": ["plantuml_code"],
            },
            {
                "stage": "create_diagram_url",
                "description": "Encode the diagram URL and extract components",
                "outputs": ["diagram_url", "d3_components", "diagram_id"],
            },
        ],
    }))
}
