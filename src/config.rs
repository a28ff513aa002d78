//! Transport configuration
//!
//! Tuning knobs for session establishment, loadable from JSON

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Transport tuning parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Default timeout for dialing a session (milliseconds)
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,

    /// Idle timeout after which a session is torn down (milliseconds)
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Keep-alive interval for established sessions (milliseconds)
    #[serde(default = "default_keep_alive_ms")]
    pub keep_alive_ms: u64,
}

fn default_handshake_timeout_ms() -> u64 {
    10_000
}

fn default_idle_timeout_ms() -> u64 {
    60_000
}

fn default_keep_alive_ms() -> u64 {
    15_000
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: default_handshake_timeout_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            keep_alive_ms: default_keep_alive_ms(),
        }
    }
}

impl TransportConfig {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Default dial timeout
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Session idle timeout
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Session keep-alive interval
    pub fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.handshake_timeout(), Duration::from_secs(10));
        assert_eq!(config.idle_timeout(), Duration::from_secs(60));
        assert_eq!(config.keep_alive(), Duration::from_secs(15));
    }

    #[test]
    fn test_config_from_json() {
        let config = TransportConfig::from_json(r#"{"handshake_timeout_ms": 2500}"#).unwrap();
        assert_eq!(config.handshake_timeout(), Duration::from_millis(2500));
        // Unspecified fields fall back to defaults
        assert_eq!(config.keep_alive(), Duration::from_secs(15));
    }

    #[test]
    fn test_config_rejects_bad_json() {
        assert!(TransportConfig::from_json("{").is_err());
    }
}
