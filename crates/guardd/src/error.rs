//! Daemon error types.

use thiserror::Error;

/// Errors surfaced by the daemon boundary.
///
/// Nothing inside the running pipeline produces these; once the watch
/// loops are up, every failure is logged and retried rather than raised.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration could not be loaded or is invalid.
    #[error("config error: {0}")]
    Config(String),

    /// Detection configuration is out of range.
    #[error(transparent)]
    Detect(#[from] guard_detect::DetectError),

    /// A filesystem operation at the daemon boundary failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
