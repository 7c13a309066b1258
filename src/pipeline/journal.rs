use std::fs::{File, OpenOptions, create_dir_all};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::types::OutputId;

/// Append-only JSONL record of stage transitions, shared by every run of a pipeline.
pub struct RunJournal {
    file: Mutex<File>,
}

impl RunJournal {
    pub fn open(log_dir: &Path) -> io::Result<Self> {
        create_dir_all(log_dir)?;
        let path = log_dir.join("events.jsonl");
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// `flush` only reaches OS buffers; records are not fsynced.
    pub fn log_event(&self, run_id: &OutputId, step: &str, data: serde_json::Value) -> io::Result<()> {
        let event = serde_json::json!({
            "run_id": run_id.as_str(),
            "step": step,
            "data": data,
            "ts": chrono::Utc::now().timestamp_millis(),
        });

        let line = serde_json::to_string(&event).map_err(io::Error::other)?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("journal mutex poisoned"))?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(())
    }
}
