//! End-of-interview performance report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::InterviewSession;
use crate::pipeline::extract::extract_json;
use crate::providers::{GenerationPrompt, LlmProvider};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub problem_understanding: f64,
    pub algorithm_design: f64,
    pub complexity_analysis: f64,
    pub implementation_knowledge: f64,
    pub communication: f64,
}

impl CategoryScores {
    fn clamped(self) -> Self {
        let c = |v: f64| v.clamp(0.0, 20.0);
        Self {
            problem_understanding: c(self.problem_understanding),
            algorithm_design: c(self.algorithm_design),
            complexity_analysis: c(self.complexity_analysis),
            implementation_knowledge: c(self.implementation_knowledge),
            communication: c(self.communication),
        }
    }
}

/// Fields the model is asked for; `generated_at` is stamped locally.
#[derive(Deserialize)]
struct ReportDraft {
    overall_score: f64,
    category_scores: CategoryScores,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    areas_for_improvement: Vec<String>,
    final_assessment: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub overall_score: f64,
    pub category_scores: CategoryScores,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub final_assessment: String,
    pub generated_at: DateTime<Utc>,
}

impl PerformanceReport {
    /// Deterministic report from the completion ratio alone.
    pub fn fallback(responses: usize, total_questions: usize) -> Self {
        let completion_pct = if total_questions == 0 {
            0.0
        } else {
            responses as f64 / total_questions as f64 * 100.0
        };
        Self {
            overall_score: (50.0 + completion_pct * 0.25).min(75.0),
            category_scores: CategoryScores {
                problem_understanding: 15.0,
                algorithm_design: 14.0,
                complexity_analysis: 13.0,
                implementation_knowledge: 14.0,
                communication: 16.0,
            },
            strengths: vec![
                "Completed the interview session".to_string(),
                "Engaged with the questions".to_string(),
                "Demonstrated problem-solving approach".to_string(),
            ],
            areas_for_improvement: vec![
                "Practice more complex algorithmic problems".to_string(),
                "Work on time complexity analysis".to_string(),
                "Improve communication of technical concepts".to_string(),
            ],
            final_assessment: format!(
                "You completed {responses} out of {total_questions} questions and showed good engagement with the interview process."
            ),
            generated_at: Utc::now(),
        }
    }

    pub fn parse(reply: &str) -> Option<Self> {
        let value = extract_json(reply)?;
        let draft: ReportDraft = serde_json::from_value(value).ok()?;
        Some(Self {
            overall_score: draft.overall_score.clamp(0.0, 100.0),
            category_scores: draft.category_scores.clamped(),
            strengths: draft.strengths,
            areas_for_improvement: draft.areas_for_improvement,
            final_assessment: draft.final_assessment,
            generated_at: Utc::now(),
        })
    }
}

const REPORT_SYSTEM: &str = r#"You are an expert technical interviewer generating a performance report for a LeetCode interview.

Analyze the candidate's responses and provide:
1. Overall Score (0-100)
2. Category Scores (0-20 each) for problem understanding, algorithm design, time & space complexity, implementation knowledge, and communication
3. Strengths (3-5 bullet points)
4. Areas for Improvement (3-5 bullet points)
5. Final Assessment (2-3 sentences)

Return a JSON object with this structure:
{
    "overall_score": number,
    "category_scores": {
        "problem_understanding": number,
        "algorithm_design": number,
        "complexity_analysis": number,
        "implementation_knowledge": number,
        "communication": number
    },
    "strengths": [array of strings],
    "areas_for_improvement": [array of strings],
    "final_assessment": "string"
}"#;

pub(crate) fn report_prompt(session: &InterviewSession) -> GenerationPrompt {
    let transcript: String = session
        .responses
        .iter()
        .enumerate()
        .map(|(i, turn)| format!("Q{}: {}\nA: {}\n", i + 1, turn.question, turn.response))
        .collect::<Vec<_>>()
        .join("\n");
    GenerationPrompt::new(format!(
        "Interview Details:\n- Problem: {}\n- Difficulty: {}\n- Language: {}\n- Duration: {} questions answered\n\nQuestions and Responses:\n{transcript}\n\nPlease analyze and generate the performance report.",
        session.problem_data.title,
        session.problem_data.difficulty,
        session.language,
        session.responses.len()
    ))
    .with_system(REPORT_SYSTEM)
}

pub async fn generate_report(provider: &dyn LlmProvider, session: &InterviewSession) -> PerformanceReport {
    let fallback = || PerformanceReport::fallback(session.responses.len(), session.questions.len());
    match provider.generate(&report_prompt(session)).await {
        Ok(reply) => PerformanceReport::parse(&reply).unwrap_or_else(|| {
            log::warn!("malformed report for {}; using fallback", session.id);
            fallback()
        }),
        Err(e) => {
            log::error!("report generation failed for {}: {e}", session.id);
            fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_scales_with_completion_and_caps() {
        assert_eq!(PerformanceReport::fallback(0, 8).overall_score, 50.0);
        assert_eq!(PerformanceReport::fallback(4, 8).overall_score, 62.5);
        assert_eq!(PerformanceReport::fallback(8, 8).overall_score, 75.0);
        assert_eq!(PerformanceReport::fallback(0, 0).overall_score, 50.0);

        let report = PerformanceReport::fallback(3, 3);
        assert_eq!(report.category_scores.communication, 16.0);
        assert_eq!(
            report.final_assessment,
            "You completed 3 out of 3 questions and showed good engagement with the interview process."
        );
    }

    #[test]
    fn parses_model_report_and_clamps() {
        let reply = r#"```json
{"overall_score": 130, "category_scores": {"problem_understanding": 18, "algorithm_design": 25,
 "complexity_analysis": 12, "implementation_knowledge": 15, "communication": 17},
 "strengths": ["clear"], "areas_for_improvement": ["edge cases"], "final_assessment": "Solid."}
```"#;
        let report = PerformanceReport::parse(reply).unwrap();
        assert_eq!(report.overall_score, 100.0);
        assert_eq!(report.category_scores.algorithm_design, 20.0);
        assert_eq!(report.strengths, vec!["clear"]);
    }

    #[test]
    fn incomplete_report_is_rejected() {
        assert!(PerformanceReport::parse(r#"{"overall_score": 80}"#).is_none());
        assert!(PerformanceReport::parse("great job!").is_none());
    }
}
