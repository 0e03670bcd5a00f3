use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::errors::PipelineError;

pub const DEFAULT_FAN_OUT: usize = 5;
pub const DEFAULT_MIN_QUORUM: usize = 1;
pub const DEFAULT_MAX_FAN_OUT: usize = 10;

/// Sampling policy handed to the coordinator at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub fan_out_count: usize,
    pub min_quorum: usize,
    /// Upper bound on `fan_out_count`, including per-invocation overrides.
    pub max_fan_out: usize,
    /// `None` waits on each call for as long as the HTTP client allows.
    pub per_call_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fan_out_count: DEFAULT_FAN_OUT,
            min_quorum: DEFAULT_MIN_QUORUM,
            max_fan_out: DEFAULT_MAX_FAN_OUT,
            per_call_timeout: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.validate_counts(self.fan_out_count, self.min_quorum)
    }

    /// Effective `(fan_out_count, min_quorum)` for one invocation.
    pub fn resolve(&self, overrides: &PipelineOverrides) -> Result<(usize, usize), PipelineError> {
        let n = overrides.fan_out_count.unwrap_or(self.fan_out_count);
        let quorum = overrides.min_quorum.unwrap_or(self.min_quorum);
        self.validate_counts(n, quorum)?;
        Ok((n, quorum))
    }

    fn validate_counts(&self, fan_out_count: usize, min_quorum: usize) -> Result<(), PipelineError> {
        if fan_out_count == 0 {
            return Err(PipelineError::InvalidConfig(
                "fan_out_count must be at least 1".to_string(),
            ));
        }
        if fan_out_count > self.max_fan_out {
            return Err(PipelineError::InvalidConfig(format!(
                "fan_out_count ({fan_out_count}) exceeds max_fan_out ({})",
                self.max_fan_out
            )));
        }
        if min_quorum == 0 {
            return Err(PipelineError::InvalidConfig(
                "min_quorum must be at least 1".to_string(),
            ));
        }
        if min_quorum > fan_out_count {
            return Err(PipelineError::InvalidConfig(format!(
                "min_quorum ({min_quorum}) exceeds fan_out_count ({fan_out_count})"
            )));
        }
        Ok(())
    }
}

/// Per-invocation overrides supplied by the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOverrides {
    pub fan_out_count: Option<usize>,
    pub min_quorum: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Started,
    FanningOut,
    Aggregating,
    Completed,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Started => "started",
            PipelineStage::FanningOut => "fanning_out",
            PipelineStage::Aggregating => "aggregating",
            PipelineStage::Completed => "completed",
            PipelineStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Completed | PipelineStage::Failed)
    }

    /// Whether `next` may follow `self`.
    pub fn can_advance_to(&self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        matches!(
            (self, next),
            (Started, FanningOut)
                | (Started, Failed)
                | (FanningOut, Aggregating)
                | (FanningOut, Failed)
                | (Aggregating, Completed)
                | (Aggregating, Failed)
        )
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
