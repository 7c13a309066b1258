//! Voice engines behind traits. The bundled implementation shells out to
//! configured programs; anything heavier (local TTS models, cloud STT) plugs
//! in through the same traits.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::app_config::{CommandSpec, InterviewConfig};
use crate::errors::VoiceError;
use crate::sanitize::clean_diagnostic;

#[async_trait::async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Synthesize `text` into `<audio dir>/<file_stem>.wav` and return the path.
    async fn synthesize(&self, text: &str, file_stem: &str) -> Result<PathBuf, VoiceError>;
}

#[async_trait::async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<String, VoiceError>;
}

#[async_trait::async_trait]
pub trait MicrophoneListener: Send + Sync {
    async fn listen(&self, timeout: Duration) -> Result<String, VoiceError>;
}

pub struct CommandVoice {
    audio_dir: PathBuf,
    timeout: Duration,
    tts: Option<CommandSpec>,
    stt: Option<CommandSpec>,
    microphone: Option<CommandSpec>,
}

impl CommandVoice {
    pub fn new(config: &InterviewConfig, media_root: &Path) -> Self {
        Self {
            audio_dir: media_root.join(&config.audio_subdir),
            timeout: Duration::from_secs(config.voice_timeout_secs),
            tts: config.tts_command.clone(),
            stt: config.stt_command.clone(),
            microphone: config.microphone_command.clone(),
        }
    }

    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    pub fn tts_available(&self) -> bool {
        self.tts.is_some()
    }

    async fn run(
        &self,
        spec: &CommandSpec,
        vars: &[(&str, &str)],
        limit: Duration,
    ) -> Result<String, VoiceError> {
        let args: Vec<String> = spec
            .args
            .iter()
            .map(|arg| {
                vars.iter().fold(arg.clone(), |acc, (key, value)| {
                    acc.replace(&format!("{{{key}}}"), value)
                })
            })
            .collect();

        let child = Command::new(&spec.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| VoiceError::TimedOut(limit.as_secs()))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VoiceError::Failed(format!(
                "{} exited with {}: {}",
                spec.program,
                output.status,
                clean_diagnostic(&stderr)
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait::async_trait]
impl TextToSpeech for CommandVoice {
    async fn synthesize(&self, text: &str, file_stem: &str) -> Result<PathBuf, VoiceError> {
        let spec = self
            .tts
            .as_ref()
            .ok_or(VoiceError::Unavailable("text-to-speech"))?;
        tokio::fs::create_dir_all(&self.audio_dir).await?;
        let output = self.audio_dir.join(format!("{file_stem}.wav"));
        let output_str = output.to_string_lossy().into_owned();

        self.run(spec, &[("text", text), ("output", &output_str)], self.timeout)
            .await?;

        if !output.is_file() {
            return Err(VoiceError::Failed(format!(
                "{} did not write {}",
                spec.program,
                output.display()
            )));
        }
        log::info!("generated speech audio {}", output.display());
        Ok(output)
    }
}

#[async_trait::async_trait]
impl SpeechToText for CommandVoice {
    async fn transcribe(&self, audio: &Path) -> Result<String, VoiceError> {
        let spec = self
            .stt
            .as_ref()
            .ok_or(VoiceError::Unavailable("speech-to-text"))?;
        let input = audio.to_string_lossy();
        self.run(spec, &[("input", &input)], self.timeout).await
    }
}

#[async_trait::async_trait]
impl MicrophoneListener for CommandVoice {
    async fn listen(&self, timeout: Duration) -> Result<String, VoiceError> {
        let spec = self
            .microphone
            .as_ref()
            .ok_or(VoiceError::Unavailable("microphone"))?;
        let secs = timeout.as_secs().to_string();
        // Give the recorder its own window plus the usual processing allowance.
        self.run(spec, &[("timeout", &secs)], timeout + self.timeout)
            .await
    }
}

/// Delete audio files whose names contain `interview_id`. A missing directory counts as zero.
pub fn cleanup_audio(dir: &Path, interview_id: &str) -> std::io::Result<usize> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut deleted = 0;
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let matches = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().contains(interview_id));
        if !matches || !path.is_file() {
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => deleted += 1,
            Err(e) => log::warn!("failed to delete {}: {e}", path.display()),
        }
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(tts: Option<CommandSpec>, stt: Option<CommandSpec>) -> InterviewConfig {
        InterviewConfig {
            tts_command: tts,
            stt_command: stt,
            voice_timeout_secs: 5,
            ..InterviewConfig::default()
        }
    }

    #[tokio::test]
    async fn unconfigured_engines_are_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let voice = CommandVoice::new(&InterviewConfig::default(), dir.path());
        assert!(matches!(
            voice.synthesize("hi", "x").await,
            Err(VoiceError::Unavailable(_))
        ));
        assert!(matches!(
            voice.transcribe(Path::new("a.wav")).await,
            Err(VoiceError::Unavailable(_))
        ));
        assert!(matches!(
            voice.listen(Duration::from_secs(1)).await,
            Err(VoiceError::Unavailable(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_tts_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let tts = CommandSpec {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                "printf '%s' \"$1\" > \"$2\"".to_string(),
                "tts".to_string(),
                "{text}".to_string(),
                "{output}".to_string(),
            ],
        };
        let voice = CommandVoice::new(&config_with(Some(tts), None), dir.path());
        let path = voice.synthesize("hello there", "welcome_abc").await.unwrap();
        assert_eq!(path, dir.path().join("leetcode_audio/welcome_abc.wav"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello there");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_stt_returns_trimmed_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let stt = CommandSpec {
            program: "echo".to_string(),
            args: vec!["heard".to_string(), "{input}".to_string()],
        };
        let voice = CommandVoice::new(&config_with(None, Some(stt)), dir.path());
        let text = voice.transcribe(Path::new("clip.wav")).await.unwrap();
        assert_eq!(text, "heard clip.wav");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let stt = CommandSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo bad audio >&2; exit 3".to_string()],
        };
        let voice = CommandVoice::new(&config_with(None, Some(stt)), dir.path());
        let err = voice.transcribe(Path::new("x.wav")).await.unwrap_err();
        assert!(matches!(err, VoiceError::Failed(msg) if msg.contains("bad audio")));
    }

    #[test]
    fn cleanup_removes_only_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["welcome_interview_1.wav", "feedback_interview_1_0.wav", "welcome_interview_2.wav"] {
            std::fs::write(dir.path().join(name), b"a").unwrap();
        }
        assert_eq!(cleanup_audio(dir.path(), "interview_1").unwrap(), 2);
        assert!(dir.path().join("welcome_interview_2.wav").exists());
        assert_eq!(cleanup_audio(&dir.path().join("missing"), "interview_1").unwrap(), 0);
    }
}
