//! External renderers: the manim subprocess and the PlantUML URL encoder.

pub mod locate;
pub mod plantuml;

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::app_config::RendererConfig;
use crate::config::SCRIPT_FILE_NAME;
use crate::media;
use crate::pipeline::policy::SanitizedArtifact;
use crate::sanitize::clean_diagnostic;
use crate::types::OutputId;

pub use crate::pipeline::types::RenderOutcome;
pub use plantuml::PlantUmlRenderer;

/// Turns a sanitized artifact into something a client can fetch.
#[async_trait::async_trait]
pub trait ArtifactRenderer: Send + Sync {
    async fn render(&self, artifact: &SanitizedArtifact, output_id: &OutputId) -> RenderOutcome;

    fn name(&self) -> &str;
}

/// Runs the manim CLI on a script written into a throwaway workspace.
pub struct ManimRenderer {
    config: RendererConfig,
    media_root: PathBuf,
    public_prefix: String,
}

impl ManimRenderer {
    pub fn new(config: RendererConfig, media_root: PathBuf, public_prefix: impl Into<String>) -> Self {
        Self {
            config,
            media_root,
            public_prefix: public_prefix.into(),
        }
    }

    fn workspace(&self) -> std::io::Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("scenecraft-render-");
        match &self.config.workspace_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)
            }
            None => builder.tempdir(),
        }
    }

    fn command(&self, script: &std::path::Path, entry_point: &str, output_id: &OutputId) -> Command {
        let cfg = &self.config;
        let mut cmd = Command::new(&cfg.program);
        cmd.arg("render")
            .arg(script)
            .arg(entry_point)
            .arg("-o")
            .arg(format!("{output_id}.{}", cfg.format))
            .arg("--media_dir")
            .arg(&self.media_root)
            .arg("-q")
            .arg(&cfg.quality)
            .arg("--fps")
            .arg(cfg.fps.to_string())
            .arg("--format")
            .arg(&cfg.format);
        if cfg.disable_caching {
            cmd.arg("--disable_caching");
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    async fn run(&self, artifact: &SanitizedArtifact, output_id: &OutputId) -> RenderOutcome {
        if let Err(e) = media::ensure_layout(&self.media_root) {
            return RenderOutcome::ToolFailure(format!("could not prepare output directory: {e}"));
        }

        // Dropped on every return path below, which removes the directory.
        let workspace = match self.workspace() {
            Ok(dir) => dir,
            Err(e) => return RenderOutcome::ToolFailure(format!("could not create workspace: {e}")),
        };
        let script = workspace.path().join(SCRIPT_FILE_NAME);
        if let Err(e) = tokio::fs::write(&script, artifact.source()).await {
            return RenderOutcome::ToolFailure(format!("could not write script: {e}"));
        }

        let mut cmd = self.command(&script, artifact.entry_point(), output_id);
        log::info!(
            "rendering {} (scene {}) with {}",
            output_id,
            artifact.entry_point(),
            self.config.program
        );

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return RenderOutcome::ToolFailure(format!(
                    "could not start {}: {e}",
                    self.config.program
                ));
            }
        };
        let pid = child.id();

        let limit = Duration::from_secs(self.config.timeout_secs);
        let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return RenderOutcome::ToolFailure(format!("renderer I/O error: {e}")),
            Err(_) => {
                // The direct child is killed when its handle drops; the group kill
                // also reaches encoders it spawned.
                kill_process_group(pid);
                log::warn!("render {output_id} timed out after {}s", self.config.timeout_secs);
                return RenderOutcome::Timeout;
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::debug!("renderer stdout for {output_id}: {}", clean_diagnostic(&stdout));

        if !output.status.success() {
            let detail = if stderr.trim().is_empty() {
                format!("exit status {}", output.status)
            } else {
                clean_diagnostic(&stderr)
            };
            log::warn!("render {output_id} failed: {detail}");
            return RenderOutcome::ToolFailure(detail);
        }

        let root = self.media_root.clone();
        let id = output_id.clone();
        let format = self.config.format.clone();
        let prefix = self.public_prefix.clone();
        let located = tokio::task::spawn_blocking(move || {
            locate::locate_artifact(&root, &id, &format, &prefix)
        })
        .await;
        match located {
            Ok(Some(url)) => {
                log::info!("render {output_id} produced {url}");
                RenderOutcome::Success(url)
            }
            Ok(None) => RenderOutcome::ToolFailure("artifact not produced".to_string()),
            Err(e) => RenderOutcome::ToolFailure(format!("artifact lookup failed: {e}")),
        }
    }
}

#[async_trait::async_trait]
impl ArtifactRenderer for ManimRenderer {
    async fn render(&self, artifact: &SanitizedArtifact, output_id: &OutputId) -> RenderOutcome {
        self.run(artifact, output_id).await
    }

    fn name(&self) -> &str {
        "manim"
    }
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    // SAFETY: killpg only sends a signal; the group id is the child we spawned
    // as leader of its own group via `process_group(0)`.
    let rc = unsafe { libc::killpg(pid, libc::SIGKILL) };
    if rc != 0 {
        log::debug!(
            "killpg({pid}) failed: {}",
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
