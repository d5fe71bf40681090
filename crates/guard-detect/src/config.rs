//! Detection configuration.

use serde::{Deserialize, Serialize};

use crate::error::{DetectError, DetectResult};

/// Configuration for the sliding-window brute-force detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Failed attempts within one window that trigger a block.
    pub failures_threshold: u32,
    /// Sliding window length in seconds.
    pub window_seconds: u64,
    /// How long an idle source address is retained before its window state
    /// is evicted. Defaults to ten windows.
    #[serde(default = "DetectionConfig::default_idle_retention")]
    pub idle_retention_seconds: u64,
}

impl DetectionConfig {
    fn default_idle_retention() -> u64 {
        Self::default().idle_retention_seconds
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DetectError::InvalidConfig`] when a value is out of range.
    pub fn validate(&self) -> DetectResult<()> {
        if self.failures_threshold == 0 {
            return Err(DetectError::InvalidConfig(
                "failures_threshold must be at least 1".into(),
            ));
        }
        if self.window_seconds == 0 {
            return Err(DetectError::InvalidConfig(
                "window_seconds must be at least 1".into(),
            ));
        }
        if self.idle_retention_seconds < self.window_seconds {
            return Err(DetectError::InvalidConfig(
                "idle_retention_seconds must cover at least one window".into(),
            ));
        }
        Ok(())
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            failures_threshold: 5,
            window_seconds: 180,
            idle_retention_seconds: 1_800,
        }
    }
}
