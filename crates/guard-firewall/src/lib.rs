//! # guard-firewall
//!
//! Firewall control for failguard.
//!
//! The block/unblock surface is expressed as the [`Firewall`] capability
//! trait so detection logic never depends on a specific backend:
//!
//! - [`IpsetFirewall`] — production implementation driving `ipset` +
//!   `iptables` through a [`ToolRunner`] seam
//! - [`MemoryFirewall`] — in-memory implementation for tests and dry runs
//!
//! The external firewall is treated as eventually-idempotent state that can
//! drift: [`Firewall::ensure`] reconciles the named dynamic address set and
//! the single filter rule referencing it, and is safe to call any number of
//! times. Every operation appends exactly one action record to the audit
//! ledger, success or failure.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod ipset;
pub mod memory;
pub mod runner;

pub use error::{FirewallError, FirewallResult};
pub use ipset::IpsetFirewall;
pub use memory::MemoryFirewall;
pub use runner::{SystemRunner, ToolOutput, ToolRunner};

use std::sync::Arc;

/// Capability interface over the packet-filter backend.
///
/// All operations are synchronous. Failures are recorded in the audit
/// ledger by the implementation and are never fatal to the process; callers
/// log and continue.
pub trait Firewall: Send + Sync {
    /// Idempotently reconciles the address set and filter rule.
    fn ensure(&self) -> FirewallResult<()>;

    /// Adds an address to the block set with a per-entry expiry.
    ///
    /// Re-adding an address already present refreshes its expiry.
    fn block(&self, address: &str, duration_secs: u64, reason: &str) -> FirewallResult<()>;

    /// Removes an address from the block set.
    ///
    /// Removing an absent address is a recorded, non-fatal failure.
    fn unblock(&self, address: &str) -> FirewallResult<()>;

    /// Enumerates current set membership, deduplicated and sorted.
    fn list(&self) -> FirewallResult<Vec<String>>;
}

impl<T: Firewall + ?Sized> Firewall for Arc<T> {
    fn ensure(&self) -> FirewallResult<()> {
        (**self).ensure()
    }

    fn block(&self, address: &str, duration_secs: u64, reason: &str) -> FirewallResult<()> {
        (**self).block(address, duration_secs, reason)
    }

    fn unblock(&self, address: &str) -> FirewallResult<()> {
        (**self).unblock(address)
    }

    fn list(&self) -> FirewallResult<Vec<String>> {
        (**self).list()
    }
}
