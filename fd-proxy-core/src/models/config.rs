use serde::{Deserialize, Serialize};

use super::error::ProxyError;

/// Configuration for a `ProxyBridge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Maximum number of virtual files open at once (default: 256).
    pub max_open_files: usize,

    /// Capacity of each handle's request queue (default: 16).
    pub queue_depth: usize,

    /// Prefix for worker thread names; the handle id is appended.
    pub thread_name_prefix: String,
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_open_files == 0 {
            return Err("max_open_files must be positive".into());
        }
        if self.queue_depth == 0 {
            return Err("queue_depth must be positive".into());
        }
        if self.thread_name_prefix.trim().is_empty() {
            return Err("thread_name_prefix must not be empty".into());
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ProxyError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ProxyError::ConfigurationFailed(format!("invalid config: {}", e)))?;
        config.validate().map_err(ProxyError::ConfigurationFailed)?;
        Ok(config)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_open_files: 256,
            queue_depth: 16,
            thread_name_prefix: "proxy-fd".into(),
        }
    }
}
