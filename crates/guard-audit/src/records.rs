//! Audit record types.
//!
//! Field layout mirrors the operational ledger schema: event records carry
//! the source address, attempted username and raw log line; action records
//! carry the firewall operation, its target and its outcome.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// The firewall operation an [`ActionRecord`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Idempotent set/rule reconciliation.
    EnsureFirewall,
    /// Address added to the block set.
    Block,
    /// Address removed from the block set.
    Unblock,
    /// Set membership enumeration.
    List,
}

impl ActionKind {
    /// Stable string form used in ledger output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EnsureFirewall => "ensure_firewall",
            Self::Block => "block",
            Self::Unblock => "unblock",
            Self::List => "list",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a firewall operation, derived solely from the tool exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// The external tool exited successfully.
    Ok,
    /// The external tool exited with a nonzero status or failed to spawn.
    Error,
}

impl ActionStatus {
    /// Stable string form used in ledger output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }

    /// Whether this status represents a successful outcome.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl std::fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected authentication event, appended for every parsed line that
/// survives whitelist filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unix timestamp (seconds) of detection.
    pub ts: i64,
    /// Source address as it appeared in the log line.
    pub src_ip: String,
    /// Username the attacker tried, when the grammar captured one.
    pub username: Option<String>,
    /// Event classification, e.g. `failed_login`.
    pub kind: String,
    /// The raw log line the event was extracted from.
    pub raw: Option<String>,
}

impl EventRecord {
    /// Create an event record stamped with the current wall-clock time.
    #[must_use]
    pub fn new(src_ip: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            ts: Utc::now().timestamp(),
            src_ip: src_ip.into(),
            username: None,
            kind: kind.into(),
            raw: None,
        }
    }

    /// Override the timestamp (unix seconds).
    #[must_use]
    pub const fn at(mut self, ts: i64) -> Self {
        self.ts = ts;
        self
    }

    /// Attach the attempted username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Attach the raw log line.
    #[must_use]
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }
}

/// One firewall operation attempt and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Unix timestamp (seconds) of the attempt.
    pub ts: i64,
    /// Which operation was attempted.
    pub action: ActionKind,
    /// Target address, when the operation has one.
    pub src_ip: Option<String>,
    /// Block duration in seconds, for block actions.
    pub duration_secs: Option<u64>,
    /// Success or failure, from the tool exit status.
    pub status: ActionStatus,
    /// Captured tool output: stdout on success, stderr on failure.
    pub message: Option<String>,
}

impl ActionRecord {
    /// Create an action record stamped with the current wall-clock time.
    #[must_use]
    pub fn new(action: ActionKind, status: ActionStatus) -> Self {
        Self {
            ts: Utc::now().timestamp(),
            action,
            src_ip: None,
            duration_secs: None,
            status,
            message: None,
        }
    }

    /// Override the timestamp (unix seconds).
    #[must_use]
    pub const fn at(mut self, ts: i64) -> Self {
        self.ts = ts;
        self
    }

    /// Attach the target address.
    #[must_use]
    pub fn with_address(mut self, addr: impl Into<String>) -> Self {
        self.src_ip = Some(addr.into());
        self
    }

    /// Attach the block duration.
    #[must_use]
    pub const fn with_duration_secs(mut self, secs: u64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Attach captured tool output. Empty messages are dropped.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.message = if message.is_empty() {
            None
        } else {
            Some(message)
        };
        self
    }
}
