use serde_json::{Value, json};

use crate::errors::ProviderError;

use super::{GenerationPrompt, LlmProvider, ProviderHttpClient};
use crate::types::ModelId;

pub const API_KEY_VAR: &str = "GOOGLE_GENERATIVE_AI_API_KEY";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Google Generative Language API (`generateContent`).
pub struct GeminiProvider {
    http: ProviderHttpClient,
    key: String,
    model: ModelId,
}

impl GeminiProvider {
    pub fn new(key: String, model: Option<ModelId>, timeout_secs: u64) -> Result<Self, ProviderError> {
        let http = ProviderHttpClient::new(timeout_secs)?;
        let model = model.unwrap_or_else(ModelId::gemini_flash);
        Ok(Self { http, key, model })
    }

    fn request_body(req: &GenerationPrompt) -> Value {
        let mut generation_config = json!({ "maxOutputTokens": req.max_tokens });
        if let Some(temp) = req.temperature {
            generation_config["temperature"] = json!(temp);
        }

        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": req.user }] }],
            "generationConfig": generation_config,
        });
        if let Some(system) = &req.system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }
        body
    }
}

/// Text parts of the first candidate.
pub(crate) fn parse_response(response_json: &Value) -> Result<String, ProviderError> {
    let parts = response_json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| {
            let reason = response_json
                .pointer("/promptFeedback/blockReason")
                .and_then(|v| v.as_str())
                .unwrap_or("no candidates");
            ProviderError::InvalidResponse(format!("Gemini returned no content ({reason})"))
        })?;

    Ok(parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect())
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate(&self, req: &GenerationPrompt) -> Result<String, ProviderError> {
        let url = format!("{BASE_URL}/{}:generateContent", self.model);
        let res = self
            .http
            .client()
            .post(url)
            .header("x-goog-api-key", &self.key)
            .header("Content-Type", "application/json")
            .json(&Self::request_body(req))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let err_text = res.text().await?;
            return Err(ProviderError::ApiError(format!(
                "Gemini API Error {status}: {err_text}"
            )));
        }

        let response_json: Value = res.json().await?;
        parse_response(&response_json)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &ModelId {
        &self.model
    }

    fn validate_config(&self) -> Result<(), ProviderError> {
        if self.key.is_empty() {
            return Err(ProviderError::Config("Gemini API key is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_uses_system_instruction() {
        let prompt = GenerationPrompt::new("explain sorting")
            .with_system("be brief")
            .with_max_tokens(100);
        let body = GeminiProvider::request_body(&prompt);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "explain sorting");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 100);
        assert!(body["generationConfig"].get("temperature").is_none());
    }

    #[test]
    fn parses_candidate_parts() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "a" }, { "text": "b" }] } }]
        });
        assert_eq!(parse_response(&response).unwrap(), "ab");
    }

    #[test]
    fn blocked_prompt_reports_reason() {
        let response = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = parse_response(&response).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }
}
