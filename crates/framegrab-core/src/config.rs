use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::types::OutputFormat;

/// Grab session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrabConfig {
    /// Zero-based DXGI output (monitor) on the default adapter.
    #[serde(alias = "outputIndex")]
    pub output_index: u32,
    /// Longest a single capture may block.
    #[serde(alias = "timeoutMs")]
    pub timeout_ms: u64,
    /// Keep capturing until the desktop actually changed.
    #[serde(alias = "waitForChange")]
    pub wait_for_change: bool,
    /// Backend recoveries allowed within one grab.
    #[serde(alias = "maxRecoveries")]
    pub max_recoveries: u32,
    pub format: OutputFormat,
}

impl Default for GrabConfig {
    fn default() -> Self {
        Self {
            output_index: 0,
            timeout_ms: 100,
            wait_for_change: false,
            max_recoveries: 1,
            format: OutputFormat::Rgb,
        }
    }
}

impl GrabConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let cfg: Self = serde_json::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms > u32::MAX as u64 {
            return Err(ConfigError::Invalid {
                reason: format!("timeout_ms {} exceeds {}", self.timeout_ms, u32::MAX),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
