//! # guard-detect
//!
//! SSH brute-force detection for failguard.
//!
//! This crate holds the pure detection pipeline, from raw log line to block
//! decision:
//!
//! - [`EventParser`] — extracts [`AuthEvent`]s from auth log lines using an
//!   ordered grammar table
//! - [`Whitelist`] — exempts addresses inside configured CIDR ranges
//! - [`WindowTracker`] — per-source sliding-window attempt counter with
//!   attempted-username tracking
//! - [`DecisionPolicy`] — threshold check producing at most one
//!   [`BlockDecision`] per burst
//!
//! Nothing here touches the filesystem, the network or the firewall; the
//! orchestrator wires these pieces to `guard-tail` and `guard-firewall`.
//!
//! # Example
//!
//! ```rust
//! use guard_detect::{DecisionPolicy, DetectionConfig, EventParser, WindowTracker};
//!
//! let config = DetectionConfig::default();
//! let parser = EventParser::new();
//! let tracker = WindowTracker::from_config(&config);
//! let policy = DecisionPolicy::new(config.failures_threshold);
//!
//! let line = "Failed password for invalid user admin from 203.0.113.7 port 4444 ssh2";
//! let event = parser.parse(line, 1_700_000_000).expect("matches grammar");
//! let fired = tracker.add_and_trigger(
//!     &event.src_ip,
//!     event.username.as_deref(),
//!     event.ts,
//!     policy.threshold(),
//! );
//!
//! assert!(fired.is_none());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod decision;
pub mod error;
pub mod event;
pub mod whitelist;
pub mod window;

pub use config::DetectionConfig;
pub use decision::{BlockDecision, DecisionPolicy};
pub use error::{DetectError, DetectResult};
pub use event::{AuthEvent, EventKind, EventParser};
pub use whitelist::Whitelist;
pub use window::WindowTracker;
