use thiserror::Error;

use crate::types::SessionId;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    ApiError(String),

    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),

    #[error("Missing API key for provider '{0}'")]
    MissingApiKey(String),

    #[error("Provider configuration error: {0}")]
    Config(String),

    #[error(
        "No LLM provider configured. Set GOOGLE_GENERATIVE_AI_API_KEY, ANTHROPIC_API_KEY or OPENAI_API_KEY, or run Ollama locally"
    )]
    NoProviderConfigured,
}

/// Reasons the script policy refuses a generated artifact.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Code contains disallowed operation: {term}")]
    Violation { term: String },

    #[error("Code must define a {expected} entry point")]
    MissingEntryPoint { expected: &'static str },
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Interview session not found: {0}")]
    NotFound(SessionId),

    #[error("Interview session already completed: {0}")]
    AlreadyCompleted(SessionId),
}

#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Voice engine not configured: {0}")]
    Unavailable(&'static str),

    #[error("Voice engine failed: {0}")]
    Failed(String),

    #[error("Voice engine timed out after {0}s")]
    TimedOut(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The LLM call itself failed; the run is aborted without a partial result.
    #[error("Error generating artifact: {0}")]
    Upstream(#[from] ProviderError),

    #[error("Pipeline run cancelled by the caller")]
    Cancelled,
}
