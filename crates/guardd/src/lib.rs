//! guardd - failguard daemon library.
//!
//! Wires the detection pipeline together: `guard-tail` feeds raw lines into
//! `guard-detect`, surviving events are persisted through `guard-audit`,
//! and threshold bursts are enacted through `guard-firewall`. One polling
//! loop runs per watched log file; all loops share the window tracker, the
//! ledger, the firewall and the decision sink.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod pipeline;
pub mod sink;

pub use config::GuardConfig;
pub use error::DaemonError;
pub use pipeline::Pipeline;
pub use sink::{DecisionSink, NoopSink, TracingSink};
