use serde_json::{Value, json};

use crate::errors::ProviderError;

use super::{GenerationPrompt, LlmProvider, ProviderHttpClient};
use crate::types::ModelId;

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
const ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAIProvider {
    http: ProviderHttpClient,
    key: String,
    model: ModelId,
}

impl OpenAIProvider {
    pub fn new(key: String, model: Option<ModelId>, timeout_secs: u64) -> Result<Self, ProviderError> {
        let http = ProviderHttpClient::new(timeout_secs)?;
        let model = model.unwrap_or_else(ModelId::gpt_4o_mini);
        Ok(Self { http, key, model })
    }

    fn request_body(&self, req: &GenerationPrompt) -> Value {
        let mut messages = Vec::new();
        if let Some(system) = &req.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": req.user }));

        let mut body = json!({
            "model": self.model.as_str(),
            "max_tokens": req.max_tokens,
            "messages": messages,
        });
        if let Some(temp) = req.temperature {
            body["temperature"] = json!(temp);
        }
        body
    }
}

/// Text of the first choice in a chat-completions response.
pub(crate) fn parse_response(response_json: &Value) -> Result<String, ProviderError> {
    response_json
        .get("choices")
        .and_then(|arr| arr.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            ProviderError::InvalidResponse("No message content in first choice".to_string())
        })
}

#[async_trait::async_trait]
impl LlmProvider for OpenAIProvider {
    async fn generate(&self, req: &GenerationPrompt) -> Result<String, ProviderError> {
        let res = self
            .http
            .client()
            .post(ENDPOINT)
            .bearer_auth(&self.key)
            .header("Content-Type", "application/json")
            .json(&self.request_body(req))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let err_text = res.text().await?;
            return Err(ProviderError::ApiError(format!(
                "OpenAI API Error {status}: {err_text}"
            )));
        }

        let response_json: Value = res.json().await?;
        parse_response(&response_json)
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &ModelId {
        &self.model
    }

    fn validate_config(&self) -> Result<(), ProviderError> {
        if self.key.is_empty() {
            return Err(ProviderError::Config("OpenAI API key is empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_includes_system_and_temperature() {
        let provider = OpenAIProvider::new("k".to_string(), None, 5).unwrap();
        let prompt = GenerationPrompt::new("hi")
            .with_system("sys")
            .with_temperature(Some(0.5));
        let body = provider.request_body(&prompt);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["temperature"], json!(0.5f32));
    }

    #[test]
    fn parses_first_choice() {
        let response = json!({
            "choices": [{ "message": { "role": "assistant", "content": "```python\nx\n```" } }]
        });
        assert_eq!(parse_response(&response).unwrap(), "```python\nx\n```");
        assert!(parse_response(&json!({ "choices": [] })).is_err());
    }
}
