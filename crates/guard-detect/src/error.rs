//! Error types for the detection pipeline.

use thiserror::Error;

/// Errors that can occur when configuring the detection pipeline.
///
/// Runtime misses are deliberately not errors: a line no grammar matches, a
/// whitelist entry that fails to parse or a source address that is not a
/// legal IP literal are all handled permissively inside the pipeline.
#[derive(Debug, Error)]
pub enum DetectError {
    /// A configuration value is out of range.
    #[error("invalid detection config: {0}")]
    InvalidConfig(String),
}

/// Result type for detection operations.
pub type DetectResult<T> = Result<T, DetectError>;
