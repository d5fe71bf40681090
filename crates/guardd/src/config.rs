//! Daemon configuration.
//!
//! Loaded once at start-up and passed into the pipeline as one immutable
//! value. Every field has a deployment-sensible default so a missing config
//! file is not an error.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use guard_detect::DetectionConfig;

use crate::error::DaemonError;

/// Full daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuardConfig {
    /// Failed attempts within one window that trigger a block.
    #[serde(default = "defaults::failures_threshold")]
    pub failures_threshold: u32,
    /// Sliding window length in seconds.
    #[serde(default = "defaults::window_seconds")]
    pub window_seconds: u64,
    /// Block duration in seconds (per-entry firewall expiry).
    #[serde(default = "defaults::block_seconds")]
    pub block_seconds: u64,
    /// Auth log files to watch, one polling loop each.
    #[serde(default = "defaults::log_paths")]
    pub log_paths: Vec<PathBuf>,
    /// Networks exempt from detection.
    #[serde(default = "defaults::whitelist_cidrs")]
    pub whitelist_cidrs: Vec<String>,
    /// Name of the dynamic firewall address set.
    #[serde(default = "defaults::set_name")]
    pub set_name: String,
    /// Chain the filter rule is inserted into.
    #[serde(default = "defaults::chain_name")]
    pub chain_name: String,
}

mod defaults {
    use std::path::PathBuf;

    pub fn failures_threshold() -> u32 {
        5
    }

    pub fn window_seconds() -> u64 {
        180
    }

    pub fn block_seconds() -> u64 {
        86_400
    }

    pub fn log_paths() -> Vec<PathBuf> {
        vec![
            PathBuf::from("/var/log/auth.log"),
            PathBuf::from("/var/log/secure"),
        ]
    }

    pub fn whitelist_cidrs() -> Vec<String> {
        vec![
            "127.0.0.1/32".into(),
            "::1/128".into(),
            "10.0.0.0/8".into(),
            "172.16.0.0/12".into(),
            "192.168.0.0/16".into(),
        ]
    }

    pub fn set_name() -> String {
        "ssh_bruteforce_blacklist".into()
    }

    pub fn chain_name() -> String {
        "INPUT".into()
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            failures_threshold: defaults::failures_threshold(),
            window_seconds: defaults::window_seconds(),
            block_seconds: defaults::block_seconds(),
            log_paths: defaults::log_paths(),
            whitelist_cidrs: defaults::whitelist_cidrs(),
            set_name: defaults::set_name(),
            chain_name: defaults::chain_name(),
        }
    }
}

impl GuardConfig {
    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::Config`] if the file cannot be read or parsed,
    /// or if a value is out of range.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DaemonError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DaemonError::Config(format!("failed to read '{}': {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            DaemonError::Config(format!("failed to parse '{}': {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads from a file when it exists, otherwise uses defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, DaemonError> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when a value is out of range.
    pub fn validate(&self) -> Result<(), DaemonError> {
        self.detection().validate()?;
        if self.block_seconds == 0 {
            return Err(DaemonError::Config("block_seconds must be at least 1".into()));
        }
        if self.log_paths.is_empty() {
            return Err(DaemonError::Config("log_paths must not be empty".into()));
        }
        if self.set_name.is_empty() || self.chain_name.is_empty() {
            return Err(DaemonError::Config(
                "set_name and chain_name must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// The detection slice of this configuration.
    ///
    /// Idle sources are retained for ten windows before eviction.
    #[must_use]
    pub fn detection(&self) -> DetectionConfig {
        DetectionConfig {
            failures_threshold: self.failures_threshold,
            window_seconds: self.window_seconds,
            idle_retention_seconds: self.window_seconds.saturating_mul(10),
        }
    }
}
