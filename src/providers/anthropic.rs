use serde_json::{Value, json};

use crate::errors::ProviderError;

use super::{GenerationPrompt, LlmProvider, ProviderHttpClient};
use crate::types::ModelId;

pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

pub struct AnthropicProvider {
    http: ProviderHttpClient,
    key: String,
    model: ModelId,
}

impl AnthropicProvider {
    pub fn new(key: String, model: Option<ModelId>, timeout_secs: u64) -> Result<Self, ProviderError> {
        let http = ProviderHttpClient::new(timeout_secs)?;
        let model = model.unwrap_or_else(ModelId::claude_sonnet);
        Ok(Self { http, key, model })
    }
}

/// Concatenated text blocks of a messages-API response.
pub(crate) fn parse_response(response_json: &Value) -> Result<String, ProviderError> {
    let content_arr = response_json["content"].as_array().ok_or_else(|| {
        ProviderError::InvalidResponse(
            "Unexpected API response: missing 'content' array".to_string(),
        )
    })?;

    let text: String = content_arr
        .iter()
        .filter(|block| block.get("type").and_then(|v| v.as_str()) == Some("text"))
        .filter_map(|block| block.get("text").and_then(|v| v.as_str()))
        .collect();
    Ok(text)
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    async fn generate(&self, req: &GenerationPrompt) -> Result<String, ProviderError> {
        let mut body = json!({
            "model": self.model.as_str(),
            "max_tokens": req.max_tokens,
            "messages": [{ "role": "user", "content": req.user }],
        });
        if let Some(system) = &req.system {
            body["system"] = json!(system);
        }
        if let Some(temp) = req.temperature {
            body["temperature"] = json!(temp);
        }

        let res = self
            .http
            .client()
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let err_text = res.text().await?;
            return Err(ProviderError::ApiError(format!(
                "Anthropic API Error {status}: {err_text}"
            )));
        }

        let response_json: Value = res.json().await?;
        parse_response(&response_json)
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &ModelId {
        &self.model
    }

    fn validate_config(&self) -> Result<(), ProviderError> {
        if self.key.is_empty() {
            return Err(ProviderError::Config(
                "Anthropic API key is empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_text_blocks_only() {
        let response = json!({
            "content": [
                { "type": "text", "text": "part one " },
                { "type": "tool_use", "id": "t1", "name": "x", "input": {} },
                { "type": "text", "text": "part two" }
            ]
        });
        assert_eq!(parse_response(&response).unwrap(), "part one part two");
    }

    #[test]
    fn missing_content_is_invalid() {
        let err = parse_response(&json!({ "type": "error" })).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }
}
