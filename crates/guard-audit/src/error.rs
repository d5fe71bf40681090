//! Error types for the audit ledger.

use thiserror::Error;

/// Errors that can occur when appending to an audit ledger.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The backing store rejected the append.
    #[error("ledger append failed: {0}")]
    Append(String),

    /// The record could not be serialized for storage.
    #[error("record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type for ledger operations.
pub type AuditResult<T> = Result<T, AuditError>;
