use std::fs::{File, OpenOptions, create_dir_all};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::RunId;

/// Append-only JSONL record of pipeline stages and sample outcomes.
pub struct PipelineLogger {
    path: PathBuf,
    file: Mutex<File>,
}

impl PipelineLogger {
    pub fn new(log_dir: &Path) -> io::Result<Self> {
        create_dir_all(log_dir)?;
        let path = log_dir.join("events.jsonl");
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Note: `flush` only pushes to OS buffers; it does not guarantee durability on disk.
    pub fn log_event(&self, run_id: &RunId, step: &str, data: serde_json::Value) -> io::Result<()> {
        let mut event = serde_json::Map::new();
        event.insert(
            "run_id".to_string(),
            serde_json::Value::String(run_id.to_string()),
        );
        event.insert(
            "step".to_string(),
            serde_json::Value::String(step.to_string()),
        );
        event.insert("data".to_string(), data);

        if let Ok(duration) = SystemTime::now().duration_since(UNIX_EPOCH) {
            let millis = duration.as_millis() as u64;
            event.insert("ts".to_string(), serde_json::Value::Number(millis.into()));
        }

        let line = serde_json::to_string(&event).map_err(io::Error::other)?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("logger mutex poisoned"))?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::PipelineLogger;
    use crate::types::RunId;

    #[test]
    fn jsonl_event_written() {
        let dir = tempfile::tempdir().unwrap();
        let logger = PipelineLogger::new(dir.path()).unwrap();
        let run_id = RunId::new("run-1");
        logger
            .log_event(&run_id, "started", serde_json::json!({"samples": 5}))
            .unwrap();
        logger
            .log_event(&run_id, "completed", serde_json::json!({"samples_used": 5}))
            .unwrap();

        let entries = std::fs::read_to_string(dir.path().join("events.jsonl")).unwrap();
        let lines: Vec<_> = entries.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["run_id"], "run-1");
        assert_eq!(first["step"], "started");
        assert_eq!(first["data"]["samples"], 5);
        assert!(first["ts"].is_u64());
    }
}
