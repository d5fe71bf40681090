//! Error types for firewall control.

use thiserror::Error;

/// Errors that can occur when driving the firewall backend.
#[derive(Debug, Error)]
pub enum FirewallError {
    /// The external tool exited with a nonzero status or failed to spawn.
    #[error("{tool} failed: {message}")]
    Tool {
        /// The tool that was invoked, e.g. `ipset`.
        tool: &'static str,
        /// Captured diagnostic text (stderr, or the spawn error).
        message: String,
    },

    /// The audit ledger rejected the action record.
    #[error(transparent)]
    Audit(#[from] guard_audit::AuditError),
}

impl FirewallError {
    pub(crate) fn tool(tool: &'static str, message: impl Into<String>) -> Self {
        Self::Tool {
            tool,
            message: message.into(),
        }
    }
}

/// Result type for firewall operations.
pub type FirewallResult<T> = Result<T, FirewallError>;
