use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{RENDER_FORMAT, RENDER_FPS, RENDER_QUALITY, RENDER_TIMEOUT_SECS};

const DEFAULT_CONFIG_PATH: &str = ".scenecraft/config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub media: MediaConfig,
    pub renderer: RendererConfig,
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
    pub interview: InterviewConfig,
    pub diagram: DiagramConfig,
}

impl AppConfig {
    /// Load from `.scenecraft/config.json` (missing file means defaults), then apply env overrides.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_PATH))
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let mut config: Self = if path.exists() {
            let content = fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(bind) = env_non_empty("SCENECRAFT_BIND") {
            self.server.bind = bind;
        }
        if let Some(root) = env_non_empty("SCENECRAFT_MEDIA_DIR") {
            self.media.root = PathBuf::from(root);
        }
        if let Some(program) = env_non_empty("SCENECRAFT_RENDERER") {
            self.renderer.program = program;
        }
        if let Some(provider) = env_non_empty("PROVIDER") {
            self.llm.provider = Some(provider);
        }
        if let Some(model) = env_non_empty("MODEL") {
            self.llm.model = Some(model);
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub cors_permissive: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            cors_permissive: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub root: PathBuf,
    pub public_prefix: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("media"),
            public_prefix: "/media".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub program: String,
    pub timeout_secs: u64,
    pub quality: String,
    pub fps: u32,
    pub format: String,
    /// Parent directory for per-run temporary workspaces; system temp dir when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_dir: Option<PathBuf>,
    pub disable_caching: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: "manim".to_string(),
            timeout_secs: RENDER_TIMEOUT_SECS,
            quality: RENDER_QUALITY.to_string(),
            fps: RENDER_FPS,
            format: RENDER_FORMAT.to_string(),
            workspace_dir: None,
            disable_caching: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            timeout_secs: 120,
            temperature: None,
            max_tokens: 4096,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub analyze_prompt: bool,
    pub journal_enabled: bool,
    pub log_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            analyze_prompt: true,
            journal_enabled: false,
            log_dir: PathBuf::from(".scenecraft/runs"),
        }
    }
}

/// External program invocation with `{text}`, `{input}`, `{output}`, `{timeout}` placeholders in `args`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterviewConfig {
    pub max_questions: usize,
    pub audio_subdir: String,
    pub voice_timeout_secs: u64,
    /// How long a finished interview stays readable before it is evicted.
    pub completed_retention_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_command: Option<CommandSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stt_command: Option<CommandSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub microphone_command: Option<CommandSpec>,
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            max_questions: 8,
            audio_subdir: "leetcode_audio".to_string(),
            voice_timeout_secs: 60,
            completed_retention_secs: 3600,
            tts_command: None,
            stt_command: None,
            microphone_command: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    pub plantuml_server: String,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            plantuml_server: "https://www.plantuml.com/plantuml".to_string(),
        }
    }
}
