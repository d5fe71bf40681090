//! Authentication event extraction.
//!
//! Lines are matched against an ordered grammar table; the first grammar to
//! match wins and partial matches are never combined. Lines matching no
//! grammar are the common case (unrelated log traffic) and yield `None`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// `Failed password for [invalid user ]USER from ADDR ...`
///
/// The address class is permissive (hex digits, dots, colons); whether the
/// capture is a legal IP literal is decided by later stages. The trailing
/// space anchors the address capture against the `port` field.
static FAILED_PASSWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Failed password for (?:(invalid user )?(?P<user>\S+)) from (?P<ip>[0-9a-fA-F:.]+) ")
        .expect("failed-password grammar")
});

/// `Invalid user USER from ADDR`
static INVALID_USER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Invalid user (?P<user>\S+) from (?P<ip>[0-9a-fA-F:.]+)")
        .expect("invalid-user grammar")
});

/// Classification of an extracted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A failed SSH login attempt.
    FailedLogin,
}

impl EventKind {
    /// Stable string form used in ledger records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FailedLogin => "failed_login",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured authentication event extracted from one log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    /// Unix timestamp (seconds) of detection.
    pub ts: i64,
    /// Source address exactly as captured; not validated as an IP literal.
    pub src_ip: String,
    /// Username the attacker tried, when captured.
    pub username: Option<String>,
    /// Event classification.
    pub kind: EventKind,
    /// The raw line the event was extracted from.
    pub raw: String,
}

/// One named grammar in the parser's precedence table. The table itself is
/// fixed; callers inspect it through [`EventParser::grammar_names`].
#[derive(Debug, Clone)]
pub(crate) struct Grammar {
    /// Short identifier, e.g. `failed_password`.
    pub name: &'static str,
    regex: &'static Regex,
}

impl Grammar {
    const fn new(name: &'static str, regex: &'static Regex) -> Self {
        Self { name, regex }
    }
}

/// Extracts [`AuthEvent`]s from raw auth log lines.
///
/// The grammar table is evaluated in fixed precedence order:
///
/// 1. `failed_password` — `Failed password for [invalid user ]USER from ADDR`
/// 2. `invalid_user` — `Invalid user USER from ADDR`
#[derive(Debug, Clone)]
pub struct EventParser {
    grammars: Vec<Grammar>,
}

impl EventParser {
    /// Creates a parser with the default grammar table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            grammars: vec![
                Grammar::new("failed_password", &FAILED_PASSWORD),
                Grammar::new("invalid_user", &INVALID_USER),
            ],
        }
    }

    /// The grammar names in evaluation order.
    #[must_use]
    pub fn grammar_names(&self) -> Vec<&'static str> {
        self.grammars.iter().map(|g| g.name).collect()
    }

    /// Attempts to extract an event from one raw line.
    ///
    /// Returns `None` when no grammar matches; this is not an error.
    #[must_use]
    pub fn parse(&self, line: &str, ts: i64) -> Option<AuthEvent> {
        for grammar in &self.grammars {
            if let Some(captures) = grammar.regex.captures(line) {
                let src_ip = captures.name("ip")?.as_str().to_string();
                let username = captures.name("user").map(|m| m.as_str().to_string());
                return Some(AuthEvent {
                    ts,
                    src_ip,
                    username,
                    kind: EventKind::FailedLogin,
                    raw: line.to_string(),
                });
            }
        }
        None
    }
}

impl Default for EventParser {
    fn default() -> Self {
        Self::new()
    }
}
