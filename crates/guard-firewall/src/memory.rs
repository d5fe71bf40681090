//! In-memory firewall for tests and dry runs.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use guard_audit::{ActionKind, ActionRecord, ActionStatus, AuditLedger};

use crate::error::{FirewallError, FirewallResult};
use crate::Firewall;

/// A [`Firewall`] that mutates only process-local state.
///
/// Behaves like the ipset backend from the caller's point of view: the same
/// action records are appended, re-blocking refreshes the stored duration,
/// and unblocking an absent address is a recorded failure.
pub struct MemoryFirewall {
    ledger: Arc<dyn AuditLedger>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    ensure_calls: usize,
    blocked: BTreeMap<String, u64>,
}

impl MemoryFirewall {
    /// Creates an empty in-memory firewall writing to the given ledger.
    #[must_use]
    pub fn new(ledger: Arc<dyn AuditLedger>) -> Self {
        Self {
            ledger,
            state: Mutex::new(State::default()),
        }
    }

    /// How many times `ensure()` has been called.
    #[must_use]
    pub fn ensure_calls(&self) -> usize {
        self.state.lock().ensure_calls
    }

    /// The stored block duration for an address, if blocked.
    #[must_use]
    pub fn block_duration(&self, address: &str) -> Option<u64> {
        self.state.lock().blocked.get(address).copied()
    }
}

impl Firewall for MemoryFirewall {
    fn ensure(&self) -> FirewallResult<()> {
        self.state.lock().ensure_calls += 1;
        self.ledger.append_action(
            &ActionRecord::new(ActionKind::EnsureFirewall, ActionStatus::Ok)
                .with_message("in-memory firewall verified"),
        )?;
        Ok(())
    }

    fn block(&self, address: &str, duration_secs: u64, _reason: &str) -> FirewallResult<()> {
        self.state
            .lock()
            .blocked
            .insert(address.to_string(), duration_secs.max(1));
        self.ledger.append_action(
            &ActionRecord::new(ActionKind::Block, ActionStatus::Ok)
                .with_address(address)
                .with_duration_secs(duration_secs),
        )?;
        Ok(())
    }

    fn unblock(&self, address: &str) -> FirewallResult<()> {
        let removed = self.state.lock().blocked.remove(address).is_some();
        let status = if removed {
            ActionStatus::Ok
        } else {
            ActionStatus::Error
        };
        self.ledger.append_action(
            &ActionRecord::new(ActionKind::Unblock, status)
                .with_address(address)
                .with_message(if removed { "" } else { "address not blocked" }),
        )?;
        if removed {
            Ok(())
        } else {
            Err(FirewallError::tool("memory", "address not blocked"))
        }
    }

    fn list(&self) -> FirewallResult<Vec<String>> {
        let members: Vec<String> = self.state.lock().blocked.keys().cloned().collect();
        self.ledger
            .append_action(&ActionRecord::new(ActionKind::List, ActionStatus::Ok))?;
        Ok(members)
    }
}
