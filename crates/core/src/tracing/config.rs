//! Configuration for tracing output

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main instrumentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentationConfig {
    /// Service name attached to the startup log line
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Log level filter (e.g., "info", "tokenkeep=debug")
    pub log_level: String,
    /// Emit JSON lines instead of human readable output
    #[serde(default)]
    pub json: bool,
    /// Also write plain (non-ANSI) logs to this file
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            service_name: "tokenkeep".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            json: false,
            log_file: None,
        }
    }
}

impl InstrumentationConfig {
    /// Create configuration from environment variables
    ///
    /// Supports the following environment variables:
    /// - `RUST_LOG`: Log level filter
    /// - `TOKENKEEP_LOG_FORMAT`: `json` for JSON lines, anything else for text
    pub fn from_env() -> Self {
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let json = std::env::var("TOKENKEEP_LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Self {
            log_level,
            json,
            ..Self::default()
        }
    }

    /// Write logs to `path` in addition to stderr
    #[must_use]
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InstrumentationConfig::default();
        assert_eq!(config.service_name, "tokenkeep");
        assert_eq!(config.service_version, env!("CARGO_PKG_VERSION"));
        assert_eq!(config.log_level, "info");
        assert!(!config.json);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_with_log_file() {
        let config = InstrumentationConfig::default().with_log_file("/tmp/tokenkeep.log");
        assert_eq!(
            config.log_file.as_deref(),
            Some(std::path::Path::new("/tmp/tokenkeep.log"))
        );
    }
}
