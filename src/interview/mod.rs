//! Mock coding interviews: question generation, per-turn feedback, and a final report.
//!
//! Sessions are keyed by id. The map lock is only held to look up, insert or
//! evict an entry; each session has its own mutex, held for a whole turn
//! (including the feedback LLM call) so two turns of one interview never
//! interleave. A turn awaits the model before touching the session, so a turn
//! dropped mid-call leaves it exactly as it was.
//!
//! Completed sessions stay readable for a retention window and are evicted by
//! the next `start` after it lapses.

pub mod questions;
pub mod report;
pub mod session;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::config::{FALLBACK_FEEDBACK, FINAL_MESSAGE};
use crate::errors::SessionError;
use crate::providers::{GenerationPrompt, LlmProvider};
use crate::types::SessionId;
use crate::voice::TextToSpeech;

pub use report::PerformanceReport;
pub use session::{InterviewSession, ProblemData, SessionStatus, StatusView};

#[derive(Clone, Debug, Serialize)]
pub struct StartedInterview {
    pub interview_id: SessionId,
    pub welcome_message: String,
    pub welcome_audio_path: Option<String>,
    pub first_question: String,
    pub total_questions: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct NextQuestion {
    pub feedback: String,
    pub feedback_audio_path: Option<String>,
    pub next_question: String,
    pub next_question_audio_path: Option<String>,
    pub question_number: usize,
    pub total_questions: usize,
    pub completed: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct CompletedInterview {
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub final_message: String,
    pub final_audio_path: Option<String>,
    pub interview_data: InterviewSession,
    pub performance_report: PerformanceReport,
}

/// What a `respond` call produced.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum TurnOutcome {
    Next(NextQuestion),
    Completed(Box<CompletedInterview>),
}

impl TurnOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TurnOutcome::Completed(_))
    }
}

type SessionHandle = Arc<Mutex<InterviewSession>>;

pub struct InterviewRegistry {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    provider: Arc<dyn LlmProvider>,
    tts: Option<Arc<dyn TextToSpeech>>,
    audio_prefix: String,
    max_questions: usize,
    retention: Duration,
}

impl InterviewRegistry {
    pub fn new(provider: Arc<dyn LlmProvider>, max_questions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            provider,
            tts: None,
            audio_prefix: String::new(),
            max_questions,
            retention: Duration::from_secs(3600),
        }
    }

    /// Enable spoken prompts. Audio is reported as `<audio_prefix>/<file name>`.
    pub fn with_tts(mut self, tts: Arc<dyn TextToSpeech>, audio_prefix: impl Into<String>) -> Self {
        self.tts = Some(tts);
        self.audio_prefix = audio_prefix.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn handle(&self, id: &SessionId) -> Result<SessionHandle, SessionError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    /// Drop completed sessions older than the retention window. Returns how many went.
    ///
    /// Sessions whose lock is busy are mid-turn and kept.
    pub async fn evict_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, handle| {
            let Ok(session) = handle.try_lock() else {
                return true;
            };
            match session.completed_at {
                Some(at) => !(now - at).to_std().is_ok_and(|age| age >= self.retention),
                None => true,
            }
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            log::debug!("evicted {evicted} completed interview(s)");
        }
        evicted
    }

    /// Public URL of the audio for `text`, or `None` when no engine is configured or synthesis fails.
    async fn speak(&self, text: &str, file_stem: &str) -> Option<String> {
        let tts = self.tts.as_ref()?;
        match tts.synthesize(text, file_stem).await {
            Ok(path) => {
                let name = path.file_name()?.to_string_lossy().into_owned();
                Some(format!("{}/{name}", self.audio_prefix))
            }
            Err(e) => {
                log::warn!("text-to-speech failed for {file_stem}: {e}");
                None
            }
        }
    }

    pub async fn start(
        &self,
        problem: ProblemData,
        user_id: &str,
        language: &str,
    ) -> StartedInterview {
        self.evict_expired().await;
        let questions = questions::generate_questions(
            self.provider.as_ref(),
            &problem,
            language,
            self.max_questions,
        )
        .await;
        let id = SessionId::generate();
        let title = if problem.title.is_empty() {
            "selected"
        } else {
            problem.title.as_str()
        };
        let welcome_message = format!(
            "Hello! I'll be conducting your technical interview today about the {title} problem. \
This is a {} level problem, and you'll be working in {language}.\n\n\
I'll ask you several questions to understand your approach, and we'll discuss the solution together. \
Feel free to think out loud as you work through the problem.\n\n\
Let's begin with the first question.",
            problem.difficulty.to_lowercase()
        );

        let first_question = questions
            .first()
            .cloned()
            .unwrap_or_else(|| "Let's start discussing the problem.".to_string());
        let total_questions = questions.len();
        let session = InterviewSession::new(id.clone(), user_id, problem, language, questions);
        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(session)));
        log::info!("interview {id} started for user {user_id} ({total_questions} questions)");

        let welcome_audio_path = self.speak(&welcome_message, &format!("welcome_{id}")).await;
        StartedInterview {
            interview_id: id,
            welcome_message,
            welcome_audio_path,
            first_question,
            total_questions,
        }
    }

    pub async fn respond(&self, id: &SessionId, text: &str) -> Result<TurnOutcome, SessionError> {
        let handle = self.handle(id).await?;
        let mut session = handle.lock().await;
        if session.is_completed() {
            return Err(SessionError::AlreadyCompleted(id.clone()));
        }

        let Some(question) = session.current_question().map(str::to_string) else {
            return Ok(TurnOutcome::Completed(Box::new(
                self.finish(&mut session, None).await,
            )));
        };
        let index = session.current_question_index;

        let feedback = self.feedback(&session, &question, text).await;
        session.record_response(&question, text);
        session.record_feedback(&feedback);
        let next_index = session.advance();

        let feedback_audio_path = self
            .speak(&feedback, &format!("feedback_{id}_{index}"))
            .await;
        match session.current_question().map(str::to_string) {
            Some(next_question) => {
                let next_question_audio_path = self
                    .speak(&next_question, &format!("question_{id}_{next_index}"))
                    .await;
                Ok(TurnOutcome::Next(NextQuestion {
                    feedback,
                    feedback_audio_path,
                    next_question,
                    next_question_audio_path,
                    question_number: next_index + 1,
                    total_questions: session.questions.len(),
                    completed: false,
                }))
            }
            None => Ok(TurnOutcome::Completed(Box::new(
                self.finish(&mut session, Some(feedback)).await,
            ))),
        }
    }

    /// Force completion. A session that already finished returns its existing report unchanged.
    pub async fn end(&self, id: &SessionId) -> Result<CompletedInterview, SessionError> {
        let handle = self.handle(id).await?;
        let mut session = handle.lock().await;
        if let (true, Some(report)) = (session.is_completed(), session.report.clone()) {
            return Ok(CompletedInterview {
                completed: true,
                feedback: None,
                final_message: FINAL_MESSAGE.to_string(),
                final_audio_path: None,
                interview_data: session.clone(),
                performance_report: report,
            });
        }
        Ok(self.finish(&mut session, None).await)
    }

    pub async fn status(&self, id: &SessionId) -> Result<StatusView, SessionError> {
        let handle = self.handle(id).await?;
        let session = handle.lock().await;
        Ok(session.status_view())
    }

    async fn finish(&self, session: &mut InterviewSession, feedback: Option<String>) -> CompletedInterview {
        let report = report::generate_report(self.provider.as_ref(), session).await;
        let final_audio_path = self
            .speak(FINAL_MESSAGE, &format!("final_{}", session.id))
            .await;
        session.complete();
        session.report = Some(report.clone());
        log::info!(
            "interview {} completed: {}/{} answered, score {:.1}",
            session.id,
            session.responses.len(),
            session.questions.len(),
            report.overall_score
        );
        CompletedInterview {
            completed: true,
            feedback,
            final_message: FINAL_MESSAGE.to_string(),
            final_audio_path,
            interview_data: session.clone(),
            performance_report: report,
        }
    }

    async fn feedback(&self, session: &InterviewSession, question: &str, response: &str) -> String {
        let prompt = GenerationPrompt::new(format!(
            "Interview Context:\n- Problem: {}\n- Difficulty: {}\n- Language: {}\n\nQuestion Asked: {question}\n\nCandidate's Response: {response}\n\nPlease provide appropriate feedback.",
            session.problem_data.title, session.problem_data.difficulty, session.language
        ))
        .with_system(FEEDBACK_SYSTEM)
        .with_temperature(Some(0.7));

        match self.provider.generate(&prompt).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => FALLBACK_FEEDBACK.to_string(),
            Err(e) => {
                log::error!("feedback generation failed for {}: {e}", session.id);
                FALLBACK_FEEDBACK.to_string()
            }
        }
    }
}

const FEEDBACK_SYSTEM: &str = "You are an experienced technical interviewer providing feedback on a candidate's response to a LeetCode problem question.

Provide constructive, encouraging feedback that:
1. Acknowledges what the candidate did well
2. Gently corrects any misconceptions
3. Provides hints or guidance if needed
4. Asks a follow-up question if appropriate
5. Keeps the conversation flowing naturally

Keep responses concise (2-3 sentences) and conversational. Be encouraging and professional.";
