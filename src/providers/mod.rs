use std::env;
use std::sync::Arc;
use std::time::Duration;

pub mod anthropic;
pub mod gemini;
pub mod local;
pub mod openai;
pub mod scripted;

use crate::app_config::LlmConfig;
use crate::errors::ProviderError;
use crate::types::ModelId;
use reqwest::Client;

pub(crate) struct ProviderHttpClient {
    client: Client,
}

impl ProviderHttpClient {
    pub fn new(timeout_secs: u64) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// One text-in, text-out completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPrompt {
    pub system: Option<String>,
    pub user: String,
    pub temperature: Option<f32>,
    pub max_tokens: u32,
}

impl GenerationPrompt {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            system: None,
            user: user.into(),
            temperature: None,
            max_tokens: 4096,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Trait for LLM providers
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete the prompt and return the raw response text
    async fn generate(&self, req: &GenerationPrompt) -> Result<String, ProviderError>;

    /// Get the name of this provider
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &ModelId;

    /// Validate that this provider is properly configured
    fn validate_config(&self) -> Result<(), ProviderError>;
}

fn api_key(var: &str, provider: &str) -> Result<String, ProviderError> {
    env::var(var)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| ProviderError::MissingApiKey(provider.to_string()))
}

fn has_key(var: &str) -> bool {
    env::var(var).is_ok_and(|k| !k.trim().is_empty())
}

/// Create a provider based on configuration priority:
/// 1. Explicit provider name (`PROVIDER` env, already folded into the config)
/// 2. Auto-detection from available API keys: Gemini, Anthropic, OpenAI
/// 3. Local Ollama, if reachable
/// 4. Error if none found
pub async fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
    let _ = dotenvy::dotenv();

    if let Some(name) = &config.provider {
        return create_provider_by_name(name, config).await;
    }

    let name = if has_key(gemini::API_KEY_VAR) {
        "gemini"
    } else if has_key(anthropic::API_KEY_VAR) {
        "anthropic"
    } else if has_key(openai::API_KEY_VAR) {
        "openai"
    } else if local::LocalProvider::is_available(config.timeout_secs.min(5)).await {
        "local"
    } else {
        return Err(ProviderError::NoProviderConfigured);
    };
    create_provider_by_name(name, config).await
}

/// Create a provider by explicit name
async fn create_provider_by_name(
    name: &str,
    config: &LlmConfig,
) -> Result<Arc<dyn LlmProvider>, ProviderError> {
    let model = config.model.clone().map(ModelId::new);
    let provider: Arc<dyn LlmProvider> = match name.to_lowercase().as_str() {
        "gemini" | "google" => Arc::new(gemini::GeminiProvider::new(
            api_key(gemini::API_KEY_VAR, "gemini")?,
            model,
            config.timeout_secs,
        )?),
        "anthropic" | "claude" => Arc::new(anthropic::AnthropicProvider::new(
            api_key(anthropic::API_KEY_VAR, "anthropic")?,
            model,
            config.timeout_secs,
        )?),
        "openai" => Arc::new(openai::OpenAIProvider::new(
            api_key(openai::API_KEY_VAR, "openai")?,
            model,
            config.timeout_secs,
        )?),
        "local" | "ollama" => Arc::new(local::LocalProvider::new(model, config.timeout_secs)?),
        other => return Err(ProviderError::Config(format!("Unknown provider: {other}"))),
    };
    provider.validate_config()?;
    log::info!(
        "using LLM provider {} ({})",
        provider.name(),
        provider.model()
    );
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_builder_sets_fields() {
        let prompt = GenerationPrompt::new("draw a circle")
            .with_system("you animate")
            .with_temperature(Some(0.2))
            .with_max_tokens(512);
        assert_eq!(prompt.system.as_deref(), Some("you animate"));
        assert_eq!(prompt.user, "draw a circle");
        assert_eq!(prompt.temperature, Some(0.2));
        assert_eq!(prompt.max_tokens, 512);
    }

    #[tokio::test]
    async fn unknown_provider_name_is_config_error() {
        let config = LlmConfig {
            provider: Some("mystery".to_string()),
            ..LlmConfig::default()
        };
        let err = create_provider(&config).await.err().unwrap();
        assert!(matches!(err, ProviderError::Config(msg) if msg.contains("mystery")));
    }

    #[tokio::test]
    async fn local_provider_needs_no_key() {
        let config = LlmConfig {
            provider: Some("ollama".to_string()),
            model: Some("llama3".to_string()),
            ..LlmConfig::default()
        };
        let provider = create_provider(&config).await.unwrap();
        assert_eq!(provider.name(), "local");
        assert_eq!(provider.model().as_str(), "llama3");
    }
}
