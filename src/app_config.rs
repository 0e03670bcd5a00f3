use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::pipeline::PipelineConfig;
use crate::pipeline::types::{DEFAULT_FAN_OUT, DEFAULT_MAX_FAN_OUT, DEFAULT_MIN_QUORUM};

const CONFIG_PATH_ENV: &str = "NUTRISNAP_CONFIG";

/// Non-secret service settings. Credentials come from the environment only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineSettings,
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".nutrisnap/config.json"))
    }

    /// Load `.nutrisnap/config.json` (or `NUTRISNAP_CONFIG`), then overlay `NUTRISNAP_*` env vars.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(&Self::path())?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        override_from(&var, "NUTRISNAP_FAN_OUT", &mut self.pipeline.fan_out_count);
        override_from(&var, "NUTRISNAP_MIN_QUORUM", &mut self.pipeline.min_quorum);
        override_from(&var, "NUTRISNAP_MAX_FAN_OUT", &mut self.pipeline.max_fan_out);
        if let Some(secs) = parse_var::<u64>(&var, "NUTRISNAP_CALL_TIMEOUT_SECS") {
            // 0 disables the per-call budget
            self.pipeline.per_call_timeout_secs = Some(secs).filter(|s| *s > 0);
        }
        if let Some(dir) = var("NUTRISNAP_EVENT_LOG_DIR").filter(|v| !v.trim().is_empty()) {
            self.pipeline.event_log_dir = Some(dir);
        }
        override_from(&var, "NUTRISNAP_PORT", &mut self.server.port);
        if let Some(bucket) = var("SUPABASE_BUCKET").filter(|v| !v.trim().is_empty()) {
            self.storage.bucket = bucket;
        }
    }
}

fn parse_var<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = var(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring invalid {key} value: {raw}");
            None
        }
    }
}

fn override_from<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T) {
    if let Some(value) = parse_var(var, key) {
        *slot = value;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub fan_out_count: usize,
    pub min_quorum: usize,
    pub max_fan_out: usize,
    pub per_call_timeout_secs: Option<u64>,
    pub temperature: Option<f32>,
    /// Directory for the JSONL event log; disabled when unset.
    pub event_log_dir: Option<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            fan_out_count: DEFAULT_FAN_OUT,
            min_quorum: DEFAULT_MIN_QUORUM,
            max_fan_out: DEFAULT_MAX_FAN_OUT,
            per_call_timeout_secs: None,
            temperature: None,
            event_log_dir: None,
        }
    }
}

impl PipelineSettings {
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            fan_out_count: self.fan_out_count,
            min_quorum: self.min_quorum,
            max_fan_out: self.max_fan_out,
            per_call_timeout: self.per_call_timeout_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_mb: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub bucket: String,
    pub entries_table: String,
    pub sessions_table: String,
    pub users_table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: "images".to_string(),
            entries_table: "Entries".to_string(),
            sessions_table: "Sessions".to_string(),
            users_table: "Users".to_string(),
        }
    }
}
