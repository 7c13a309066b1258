pub mod app_config;
pub mod config;
pub mod errors;
pub mod interview;
pub mod logging;
pub mod media;
pub mod pipeline;
pub mod providers;
pub mod render;
pub mod sanitize;
pub mod server;
pub mod types;
pub mod voice;

pub use crate::app_config::AppConfig;
pub use crate::errors::{PipelineError, PolicyError, ProviderError, SessionError, VoiceError};
pub use crate::interview::InterviewRegistry;
pub use crate::pipeline::{GenerationRequest, Pipeline, PipelineResult, ProgressEvent, Workflow};
pub use crate::providers::{LlmProvider, create_provider};
