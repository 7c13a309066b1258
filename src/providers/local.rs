use serde_json::{Value, json};
use std::time::Duration;

use crate::errors::ProviderError;

use super::{GenerationPrompt, LlmProvider, ProviderHttpClient};
use crate::types::ModelId;

const DEFAULT_HOST: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.1";

fn ollama_host() -> String {
    std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string())
}

/// Ollama chat API on the local host.
pub struct LocalProvider {
    http: ProviderHttpClient,
    host: String,
    model: ModelId,
}

impl LocalProvider {
    pub fn new(model: Option<ModelId>, timeout_secs: u64) -> Result<Self, ProviderError> {
        let http = ProviderHttpClient::new(timeout_secs)?;
        let model = model
            .or_else(|| std::env::var("OLLAMA_MODEL").ok().map(ModelId::new))
            .unwrap_or_else(|| ModelId::new(DEFAULT_MODEL));
        Ok(Self {
            http,
            host: ollama_host(),
            model,
        })
    }

    pub async fn is_available(timeout_secs: u64) -> bool {
        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
        {
            Ok(c) => c,
            Err(_) => return false,
        };

        match client.get(format!("{}/api/tags", ollama_host())).send().await {
            Ok(res) => res.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait::async_trait]
impl LlmProvider for LocalProvider {
    async fn generate(&self, req: &GenerationPrompt) -> Result<String, ProviderError> {
        let mut messages = Vec::new();
        if let Some(system) = &req.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": req.user }));

        let mut options = json!({ "num_predict": req.max_tokens });
        if let Some(temp) = req.temperature {
            options["temperature"] = json!(temp);
        }
        let body = json!({
            "model": self.model.as_str(),
            "messages": messages,
            "stream": false,
            "options": options,
        });

        let res = self
            .http
            .client()
            .post(format!("{}/api/chat", self.host))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let err_text = res.text().await?;
            return Err(ProviderError::ApiError(format!(
                "Ollama API Error {status}: {err_text}"
            )));
        }

        let response_json: Value = res.json().await?;

        response_json
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::InvalidResponse("No message content in response".to_string())
            })
    }

    fn name(&self) -> &str {
        "local"
    }

    fn model(&self) -> &ModelId {
        &self.model
    }

    fn validate_config(&self) -> Result<(), ProviderError> {
        if self.host.is_empty() {
            return Err(ProviderError::Config("Ollama host is empty".to_string()));
        }
        Ok(())
    }
}
