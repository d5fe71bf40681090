//! # guard-audit
//!
//! Append-only audit ledger for failguard.
//!
//! The ledger is the durable record of what the detection pipeline saw and
//! what the firewall controller tried to do. Two record kinds exist:
//!
//! - [`EventRecord`] — one per parsed, non-whitelisted authentication event
//! - [`ActionRecord`] — one per firewall operation attempt, success or failure
//!
//! The core only ever appends; reading the ledger back is the concern of
//! operational tooling. An [`AuditLedger::append_event`] or
//! [`AuditLedger::append_action`] call must return only after the record is
//! durably visible to later readers, so a reader never observes an action
//! without its causing event.
//!
//! ## Example
//!
//! ```rust
//! use guard_audit::{ActionKind, ActionRecord, ActionStatus, AuditLedger, MemoryLedger};
//!
//! let ledger = MemoryLedger::new();
//! let record = ActionRecord::new(ActionKind::Block, ActionStatus::Ok)
//!     .with_address("203.0.113.7")
//!     .with_duration_secs(86_400);
//! ledger.append_action(&record).expect("append");
//! assert_eq!(ledger.actions().len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod ledger;
pub mod records;

pub use error::{AuditError, AuditResult};
pub use ledger::{AuditLedger, BoxedLedger, MemoryLedger, NoopLedger, TracingLedger};
pub use records::{ActionKind, ActionRecord, ActionStatus, EventRecord};
