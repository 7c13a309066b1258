//! `/leetcode-qna` endpoints: interview lifecycle plus voice passthroughs.

use std::path::Path as FsPath;
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::AppState;
use crate::interview::ProblemData;
use crate::server::error::ApiError;
use crate::types::SessionId;
use crate::voice::cleanup_audio;

const MICROPHONE_WINDOW: Duration = Duration::from_secs(10);

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/start-interview", post(start_interview))
        .route("/respond", post(respond))
        .route("/end-interview/{id}", post(end_interview))
        .route("/interview-status/{id}", get(interview_status))
        .route("/speech-to-text", post(speech_to_text))
        .route("/text-to-speech", post(text_to_speech))
        .route("/listen-microphone", post(listen_microphone))
        .route("/cleanup-audio/{id}", delete(cleanup))
}

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    message: &'static str,
    data: T,
}

fn ok<T: Serialize>(message: &'static str, data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        message,
        data,
    })
}

fn default_language() -> String {
    "Python".to_string()
}

#[derive(Deserialize)]
struct StartRequest {
    user_id: String,
    problem_data: ProblemData,
    #[serde(default = "default_language")]
    language: String,
}

#[derive(Deserialize)]
struct RespondRequest {
    interview_id: String,
    user_response: String,
    #[serde(default)]
    audio_input: bool,
}

#[derive(Deserialize)]
struct SpeakRequest {
    #[serde(default)]
    text: String,
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "leetcode-voice-interview",
        "tts_available": state.tts_available,
        "audio_directory": state.audio_dir,
        "active_sessions": state.interviews.len().await,
    }))
}

async fn start_interview(
    State(state): State<AppState>,
    Json(req): Json<StartRequest>,
) -> Result<Json<Envelope<crate::interview::StartedInterview>>, ApiError> {
    if req.user_id.trim().is_empty() {
        return Err(ApiError::BadRequest("user_id is required".into()));
    }
    log::info!(
        "starting interview for user {} on problem {:?}",
        req.user_id,
        req.problem_data.title
    );
    let started = state
        .interviews
        .start(req.problem_data, &req.user_id, &req.language)
        .await;
    Ok(ok("Interview started successfully", started))
}

async fn respond(
    State(state): State<AppState>,
    Json(req): Json<RespondRequest>,
) -> Result<Json<Envelope<crate::interview::TurnOutcome>>, ApiError> {
    let id = SessionId::new(req.interview_id);
    log::info!(
        "processing {} response for interview {id}",
        if req.audio_input { "spoken" } else { "typed" }
    );
    let outcome = state.interviews.respond(&id, &req.user_response).await?;
    Ok(ok("Response processed successfully", outcome))
}

async fn end_interview(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<crate::interview::CompletedInterview>>, ApiError> {
    let completed = state.interviews.end(&SessionId::new(id)).await?;
    Ok(ok("Interview completed successfully", completed))
}

async fn interview_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let view = state.interviews.status(&SessionId::new(id)).await?;
    let mut body = serde_json::to_value(view).map_err(|e| ApiError::Internal(e.to_string()))?;
    if let Value::Object(map) = &mut body {
        map.insert("success".to_string(), Value::Bool(true));
    }
    Ok(Json(body))
}

/// Upload extension, if it is a plain alphanumeric suffix.
fn upload_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| FsPath::new(name).extension())
        .map(|ext| ext.to_string_lossy().into_owned())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "wav".to_string())
}

async fn speech_to_text(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("audio_file") {
            continue;
        }
        let ext = upload_extension(field.file_name());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        upload = Some((ext, bytes));
        break;
    }
    let (ext, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("audio_file is required".into()))?;

    tokio::fs::create_dir_all(&state.audio_dir).await?;
    let temp = state
        .audio_dir
        .join(format!("temp_{}.{ext}", uuid::Uuid::new_v4().simple()));
    tokio::fs::write(&temp, &bytes).await?;

    let result = state.stt.transcribe(&temp).await;
    if let Err(e) = tokio::fs::remove_file(&temp).await {
        log::warn!("failed to remove {}: {e}", temp.display());
    }
    let text = result?;
    Ok(Json(json!({ "success": true, "text": text })))
}

async fn text_to_speech(
    State(state): State<AppState>,
    Json(req): Json<SpeakRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.text.trim().is_empty() {
        return Err(ApiError::BadRequest("Text is required".into()));
    }
    let stem = format!("tts_{}", uuid::Uuid::new_v4().simple());
    let path = state.tts.synthesize(&req.text, &stem).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{stem}.wav"));
    Ok(Json(json!({
        "success": true,
        "audio_path": format!("{}/{name}", state.audio_prefix),
    })))
}

async fn listen_microphone(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let text = state.microphone.listen(MICROPHONE_WINDOW).await?;
    Ok(Json(json!({ "success": true, "text": text })))
}

async fn cleanup(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if id.trim().is_empty() {
        return Err(ApiError::BadRequest("interview id is required".into()));
    }
    let dir = state.audio_dir.clone();
    let match_id = id.clone();
    let deleted = tokio::task::spawn_blocking(move || cleanup_audio(&dir, &match_id))
        .await
        .map_err(|e| ApiError::Internal(format!("cleanup task failed: {e}")))??;
    log::info!("removed {deleted} audio files for {id}");
    Ok(Json(json!({
        "success": true,
        "deleted_files": deleted,
        "message": format!("Cleaned up {deleted} audio files"),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::scripted::ScriptedProvider;
    use crate::server::router;
    use crate::server::test_support::*;
    use crate::server::test_support::get;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn start_body() -> Value {
        json!({
            "user_id": "u-1",
            "problem_data": { "title": "Two Sum", "difficulty": "Easy", "content": "Find two numbers." },
        })
    }

    #[tokio::test]
    async fn full_interview_over_http() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedProvider::new()
            .reply(r#"["What is your approach?", "What is the complexity?"]"#)
            .reply("Good start.")
            .reply("Nice analysis.")
            .reply("not json");
        let app = router(state(provider, dir.path()), false);

        let response = app
            .clone()
            .oneshot(post_json("/leetcode-qna/start-interview", start_body()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let started = body_json(response).await;
        assert_eq!(started["success"], true);
        assert_eq!(started["data"]["total_questions"], 2);
        let id = started["data"]["interview_id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(post_json(
                "/leetcode-qna/respond",
                json!({ "interview_id": id, "user_response": "hash map" }),
            ))
            .await
            .unwrap();
        let turn = body_json(response).await;
        assert_eq!(turn["data"]["feedback"], "Good start.");
        assert_eq!(turn["data"]["question_number"], 2);
        assert_eq!(turn["data"]["completed"], false);

        let response = app
            .clone()
            .oneshot(get(&format!("/leetcode-qna/interview-status/{id}")))
            .await
            .unwrap();
        let status = body_json(response).await;
        assert_eq!(status["success"], true);
        assert_eq!(status["current_question_index"], 1);
        assert_eq!(status["responses_count"], 1);

        let response = app
            .clone()
            .oneshot(post_json(
                "/leetcode-qna/respond",
                json!({ "interview_id": id, "user_response": "O(n)", "audio_input": true }),
            ))
            .await
            .unwrap();
        let done = body_json(response).await;
        assert_eq!(done["data"]["completed"], true);
        assert_eq!(done["data"]["interview_data"]["status"], "completed");
        assert!(done["data"]["performance_report"]["overall_score"].is_number());

        let response = app
            .oneshot(post_json(
                "/leetcode-qna/respond",
                json!({ "interview_id": id, "user_response": "late" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_session_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(ScriptedProvider::new(), dir.path()), false);

        let response = app
            .oneshot(get("/leetcode-qna/interview-status/interview_nope"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "SESSION_NOT_FOUND");
    }

    #[tokio::test]
    async fn text_to_speech_returns_public_path() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(ScriptedProvider::new(), dir.path()), false);

        let response = app
            .oneshot(post_json("/leetcode-qna/text-to-speech", json!({ "text": "hello" })))
            .await
            .unwrap();
        let body = body_json(response).await;
        let path = body["audio_path"].as_str().unwrap();
        assert!(path.starts_with("/media/leetcode_audio/tts_"));
        assert!(path.ends_with(".wav"));
    }

    #[tokio::test]
    async fn blank_text_to_speech_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(ScriptedProvider::new(), dir.path()), false);
        let response = app
            .oneshot(post_json("/leetcode-qna/text-to-speech", json!({ "text": "" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unconfigured_microphone_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(ScriptedProvider::new(), dir.path()), false);
        let request = Request::builder()
            .method("POST")
            .uri("/leetcode-qna/listen-microphone")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn speech_to_text_transcribes_and_removes_upload() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(ScriptedProvider::new(), dir.path()), false);

        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"audio_file\"; filename=\"clip.webm\"\r\nContent-Type: audio/webm\r\n\r\nhello\r\n--{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/leetcode-qna/speech-to-text")
            .header("content-type", format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["text"], "transcribed 5 bytes");

        let leftovers = std::fs::read_dir(dir.path().join("leetcode_audio")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn cleanup_deletes_matching_audio() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("leetcode_audio");
        std::fs::create_dir_all(&audio).unwrap();
        std::fs::write(audio.join("welcome_interview_7.wav"), b"a").unwrap();
        std::fs::write(audio.join("welcome_interview_8.wav"), b"a").unwrap();
        let app = router(state(ScriptedProvider::new(), dir.path()), false);

        let request = Request::builder()
            .method("DELETE")
            .uri("/leetcode-qna/cleanup-audio/interview_7")
            .body(Body::empty())
            .unwrap();
        let body = body_json(app.oneshot(request).await.unwrap()).await;
        assert_eq!(body["deleted_files"], 1);
        assert!(audio.join("welcome_interview_8.wav").exists());
    }

    #[test]
    fn upload_extension_is_restricted() {
        assert_eq!(upload_extension(Some("a.mp3")), "mp3");
        assert_eq!(upload_extension(Some("../../x")), "wav");
        assert_eq!(upload_extension(None), "wav");
    }
}
