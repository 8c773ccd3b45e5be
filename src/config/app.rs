//! Runtime configuration loading from config.toml
//!
//! This module loads the runtime knobs that are not business settings:
//! the scheduler interval and the mail queue sizing. Business settings
//! (tax rate, bill prefix, SMTP credentials) live in the `settings` table
//! instead, where the admin layer can edit them.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Default seconds between scheduler cycles (hourly)
const DEFAULT_SCAN_INTERVAL_SECS: u64 = 3600;
/// Default bound on the outgoing mail queue
const DEFAULT_MAIL_QUEUE_DEPTH: usize = 256;
/// Default number of mail delivery workers
const DEFAULT_MAIL_WORKERS: usize = 2;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Seconds between scheduler cycles
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,
    /// Maximum number of queued outgoing emails before new dispatches are dropped
    #[serde(default = "default_queue_depth")]
    pub mail_queue_depth: usize,
    /// Number of background workers delivering email
    #[serde(default = "default_workers")]
    pub mail_workers: usize,
}

const fn default_scan_interval() -> u64 {
    DEFAULT_SCAN_INTERVAL_SECS
}

const fn default_queue_depth() -> usize {
    DEFAULT_MAIL_QUEUE_DEPTH
}

const fn default_workers() -> usize {
    DEFAULT_MAIL_WORKERS
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
            mail_queue_depth: DEFAULT_MAIL_QUEUE_DEPTH,
            mail_workers: DEFAULT_MAIL_WORKERS,
        }
    }
}

/// Loads runtime configuration from a TOML file.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
/// A missing file is not an error; defaults are used.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from the default location (./config.toml)
pub fn load_default_config() -> Result<AppConfig> {
    load_config("config.toml")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_app_config() {
        let toml_str = r"
            scan_interval_secs = 600
            mail_queue_depth = 64
            mail_workers = 4
        ";

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.scan_interval_secs, 600);
        assert_eq!(config.mail_queue_depth, 64);
        assert_eq!(config.mail_workers, 4);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml_str = "scan_interval_secs = 60";

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.scan_interval_secs, 60);
        assert_eq!(config.mail_queue_depth, DEFAULT_MAIL_QUEUE_DEPTH);
        assert_eq!(config.mail_workers, DEFAULT_MAIL_WORKERS);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_config("definitely-not-present.toml").unwrap();
        assert_eq!(config.scan_interval_secs, DEFAULT_SCAN_INTERVAL_SECS);
    }
}
