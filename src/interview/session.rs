use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::report::PerformanceReport;
use crate::types::SessionId;

fn default_difficulty() -> String {
    "Medium".to_string()
}

/// Problem statement supplied by the client. Unknown fields are kept verbatim.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProblemData {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            difficulty: default_difficulty(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
}

#[derive(Clone, Debug, Serialize)]
pub struct Turn {
    pub question_index: usize,
    pub question: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FeedbackEntry {
    pub question_index: usize,
    pub feedback: String,
    pub timestamp: DateTime<Utc>,
}

/// One interview. It exists only once started, so it is `Active` or `Completed`.
#[derive(Clone, Debug, Serialize)]
pub struct InterviewSession {
    pub id: SessionId,
    pub user_id: String,
    pub problem_data: ProblemData,
    pub language: String,
    pub questions: Vec<String>,
    pub current_question_index: usize,
    pub responses: Vec<Turn>,
    pub feedback: Vec<FeedbackEntry>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    #[serde(skip)]
    pub report: Option<PerformanceReport>,
}

impl InterviewSession {
    pub fn new(
        id: SessionId,
        user_id: impl Into<String>,
        problem_data: ProblemData,
        language: impl Into<String>,
        questions: Vec<String>,
    ) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            problem_data,
            language: language.into(),
            questions,
            current_question_index: 0,
            responses: Vec::new(),
            feedback: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            status: SessionStatus::Active,
            report: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    pub fn current_question(&self) -> Option<&str> {
        self.questions
            .get(self.current_question_index)
            .map(String::as_str)
    }

    pub fn record_response(&mut self, question: &str, response: &str) {
        self.responses.push(Turn {
            question_index: self.current_question_index,
            question: question.to_string(),
            response: response.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub fn record_feedback(&mut self, feedback: &str) {
        self.feedback.push(FeedbackEntry {
            question_index: self.current_question_index,
            feedback: feedback.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Move the cursor forward by one; returns the new index.
    pub fn advance(&mut self) -> usize {
        self.current_question_index += 1;
        self.current_question_index
    }

    pub fn complete(&mut self) {
        if !self.is_completed() {
            self.status = SessionStatus::Completed;
            self.completed_at = Some(Utc::now());
        }
    }

    pub fn status_view(&self) -> StatusView {
        StatusView {
            interview_id: self.id.clone(),
            status: self.status,
            current_question_index: self.current_question_index,
            total_questions: self.questions.len(),
            responses_count: self.responses.len(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusView {
    pub interview_id: SessionId,
    pub status: SessionStatus,
    pub current_question_index: usize,
    pub total_questions: usize,
    pub responses_count: usize,
}
