//! Interview question generation with a template fallback.

use rand::Rng;
use rand::seq::SliceRandom;

use super::session::ProblemData;
use crate::config::MAX_PROBLEM_CONTENT_CHARS;
use crate::pipeline::extract::extract_json;
use crate::providers::{GenerationPrompt, LlmProvider};

const UNDERSTANDING: &[&str] = &[
    "Can you explain your understanding of this problem in your own words?",
    "What are the key constraints we need to consider?",
    "Can you walk me through a few examples to show you understand the problem?",
];

const APPROACH: &[&str] = &[
    "What approach would you take to solve this problem?",
    "Can you think of multiple ways to solve this?",
    "What data structures would be most helpful here?",
];

const COMPLEXITY: &[&str] = &[
    "What's the time complexity of your approach?",
    "How about the space complexity?",
    "Can you optimize this further?",
    "Are there any trade-offs between time and space here?",
];

const IMPLEMENTATION: &[&str] = &[
    "Can you walk through your implementation step by step?",
    "How would you handle edge cases?",
    "What would your main function look like?",
];

const OPTIMIZATION: &[&str] = &[
    "Is there a more efficient solution?",
    "What if the input size was much larger?",
    "How would you test this solution?",
];

/// Category pools and how many questions each contributes.
const TEMPLATE_PLAN: &[(&[&str], usize)] = &[
    (UNDERSTANDING, 2),
    (APPROACH, 2),
    (COMPLEXITY, 2),
    (IMPLEMENTATION, 1),
    (OPTIMIZATION, 1),
];

pub(crate) fn question_prompt(problem: &ProblemData, language: &str) -> GenerationPrompt {
    let content: String = problem
        .content
        .chars()
        .take(MAX_PROBLEM_CONTENT_CHARS)
        .collect();
    let system = format!(
        "You are an expert technical interviewer specializing in LeetCode problems.\n\
Generate 6-8 interview questions for the following problem that test different aspects:\n\
1. Problem Understanding (1-2 questions)\n\
2. Solution Approach (2-3 questions)\n\
3. Time & Space Complexity (1-2 questions)\n\
4. Implementation Details (1-2 questions)\n\
5. Edge Cases & Optimization (1 question)\n\n\
The candidate will be coding in {language}.\n\
Problem difficulty: {}\n\n\
Return ONLY a JSON array of strings (questions), no other text or formatting.",
        problem.difficulty
    );
    GenerationPrompt::new(format!(
        "Problem Title: {}\nProblem Description: {content}...\nDifficulty: {}\nLanguage: {language}",
        problem.title, problem.difficulty
    ))
    .with_system(system)
    .with_temperature(Some(0.7))
}

/// Questions from a JSON array reply, capped at `max`. `None` if the reply is unusable.
pub fn parse_questions(reply: &str, max: usize) -> Option<Vec<String>> {
    let value = extract_json(reply)?;
    let items = value.as_array()?;
    let questions: Vec<String> = items
        .iter()
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .take(max)
        .map(str::to_string)
        .collect();
    if questions.is_empty() {
        None
    } else {
        Some(questions)
    }
}

/// Sample the template pools and tailor the wording to the problem and language.
pub fn template_questions<R: Rng + ?Sized>(rng: &mut R, title: &str, language: &str) -> Vec<String> {
    TEMPLATE_PLAN
        .iter()
        .flat_map(|(pool, count)| pool.choose_multiple(rng, *count).copied().collect::<Vec<_>>())
        .map(|q| {
            let mut q = q.to_string();
            if !title.is_empty() {
                q = q.replace("this problem", &format!("the {title} problem"));
            }
            q.replace("your approach", &format!("your {language} approach"))
        })
        .collect()
}

pub async fn generate_questions(
    provider: &dyn LlmProvider,
    problem: &ProblemData,
    language: &str,
    max: usize,
) -> Vec<String> {
    let max = max.max(1);
    match provider.generate(&question_prompt(problem, language)).await {
        Ok(reply) => {
            if let Some(questions) = parse_questions(&reply, max) {
                log::info!(
                    "generated {} questions for {}",
                    questions.len(),
                    problem.title
                );
                return questions;
            }
            log::warn!("could not parse generated questions; using templates");
        }
        Err(e) => log::error!("question generation failed: {e}; using templates"),
    }
    let mut questions = template_questions(&mut rand::thread_rng(), &problem.title, language);
    questions.truncate(max);
    questions
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn parses_and_caps_array() {
        let reply = r#"["a?", "b?", "", 3, "c?"]"#;
        assert_eq!(parse_questions(reply, 2).unwrap(), vec!["a?", "b?"]);
        assert_eq!(parse_questions(reply, 10).unwrap().len(), 3);
    }

    #[test]
    fn rejects_non_arrays_and_empty() {
        assert!(parse_questions("{\"q\": 1}", 8).is_none());
        assert!(parse_questions("[]", 8).is_none());
        assert!(parse_questions("sure, here you go", 8).is_none());
    }

    #[test]
    fn fenced_array_is_accepted() {
        let reply = "```json\n[\"What is the input size?\"]\n```";
        assert_eq!(parse_questions(reply, 8).unwrap(), vec!["What is the input size?"]);
    }

    #[test]
    fn templates_follow_plan_and_substitute() {
        let mut rng = StdRng::seed_from_u64(7);
        let questions = template_questions(&mut rng, "Two Sum", "Rust");
        assert_eq!(questions.len(), 8);
        assert!(questions.iter().all(|q| !q.contains("this problem")));
        assert!(questions.iter().all(|q| !q.contains("your approach")));

        let understanding = questions[..2]
            .iter()
            .filter(|q| {
                UNDERSTANDING
                    .iter()
                    .any(|t| t.replace("this problem", "the Two Sum problem") == **q)
            })
            .count();
        assert_eq!(understanding, 2);
    }

    #[test]
    fn prompt_truncates_problem_content() {
        let problem = ProblemData {
            content: "x".repeat(MAX_PROBLEM_CONTENT_CHARS + 500),
            ..ProblemData::titled("Long")
        };
        let prompt = question_prompt(&problem, "Go");
        assert!(prompt.user.len() < MAX_PROBLEM_CONTENT_CHARS + 200);
        assert!(prompt.system.unwrap().contains("coding in Go"));
    }
}
