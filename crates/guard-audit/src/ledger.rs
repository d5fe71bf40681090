//! Ledger backends.
//!
//! This module provides the [`AuditLedger`] trait and the built-in
//! implementations. Real deployments plug a database-backed ledger in here;
//! the core only requires synchronous durability: an append call returns
//! only after the record is visible to later readers.

use parking_lot::Mutex;

use crate::error::AuditResult;
use crate::records::{ActionRecord, EventRecord};

/// Trait for append-only audit ledger backends.
///
/// Implementations must be durable in order: once `append_*` returns, the
/// record is visible to any later reader, so tooling never observes a
/// firewall action without the event that caused it.
pub trait AuditLedger: Send + Sync {
    /// Appends a detected authentication event.
    fn append_event(&self, record: &EventRecord) -> AuditResult<()>;

    /// Appends a firewall action attempt.
    fn append_action(&self, record: &ActionRecord) -> AuditResult<()>;
}

/// A boxed ledger for dynamic dispatch.
pub type BoxedLedger = Box<dyn AuditLedger>;

impl AuditLedger for BoxedLedger {
    fn append_event(&self, record: &EventRecord) -> AuditResult<()> {
        (**self).append_event(record)
    }

    fn append_action(&self, record: &ActionRecord) -> AuditResult<()> {
        (**self).append_action(record)
    }
}

/// Ledger that emits records through the `tracing` infrastructure.
///
/// Events are logged at `warn` (they are security findings), actions at
/// `info` on success and `error` on failure. Records are serialized to JSON
/// so downstream collectors can reconstruct them.
#[derive(Debug, Clone, Default)]
pub struct TracingLedger;

impl TracingLedger {
    /// Creates a new tracing-backed ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl AuditLedger for TracingLedger {
    fn append_event(&self, record: &EventRecord) -> AuditResult<()> {
        let json = serde_json::to_string(record)?;
        tracing::warn!(
            target: "guard_audit",
            src_ip = %record.src_ip,
            username = record.username.as_deref().unwrap_or("unknown"),
            kind = %record.kind,
            record_json = %json,
            "auth event"
        );
        Ok(())
    }

    fn append_action(&self, record: &ActionRecord) -> AuditResult<()> {
        let json = serde_json::to_string(record)?;
        if record.status.is_ok() {
            tracing::info!(
                target: "guard_audit",
                action = %record.action,
                src_ip = record.src_ip.as_deref().unwrap_or("-"),
                status = %record.status,
                record_json = %json,
                "firewall action"
            );
        } else {
            tracing::error!(
                target: "guard_audit",
                action = %record.action,
                src_ip = record.src_ip.as_deref().unwrap_or("-"),
                status = %record.status,
                record_json = %json,
                "firewall action failed"
            );
        }
        Ok(())
    }
}

/// In-memory ledger, used by tests and local tooling.
///
/// Appends take an internal lock, so visibility is sequentially consistent
/// with append order.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    events: Mutex<Vec<EventRecord>>,
    actions: Mutex<Vec<ActionRecord>>,
}

impl MemoryLedger {
    /// Creates an empty in-memory ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all appended event records, in append order.
    #[must_use]
    pub fn events(&self) -> Vec<EventRecord> {
        self.events.lock().clone()
    }

    /// Snapshot of all appended action records, in append order.
    #[must_use]
    pub fn actions(&self) -> Vec<ActionRecord> {
        self.actions.lock().clone()
    }

    /// Total number of records of both kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len() + self.actions.lock().len()
    }

    /// Whether the ledger holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditLedger for MemoryLedger {
    fn append_event(&self, record: &EventRecord) -> AuditResult<()> {
        self.events.lock().push(record.clone());
        Ok(())
    }

    fn append_action(&self, record: &ActionRecord) -> AuditResult<()> {
        self.actions.lock().push(record.clone());
        Ok(())
    }
}

/// Ledger that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLedger;

impl NoopLedger {
    /// Creates a new no-op ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl AuditLedger for NoopLedger {
    fn append_event(&self, _record: &EventRecord) -> AuditResult<()> {
        Ok(())
    }

    fn append_action(&self, _record: &ActionRecord) -> AuditResult<()> {
        Ok(())
    }
}
