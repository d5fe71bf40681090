//! Decision sinks.
//!
//! A sink is notified after a block decision has been successfully enacted
//! by the firewall. It exists as a seam for notification or enrichment
//! collaborators; the daemon itself only logs.

use guard_detect::BlockDecision;
use tracing::warn;

/// Observer invoked once per successfully enacted block decision.
pub trait DecisionSink: Send + Sync {
    /// Called after the firewall has accepted the block.
    fn on_block(&self, decision: &BlockDecision);
}

/// Logs each enacted decision at `warn` level.
pub struct TracingSink;

impl DecisionSink for TracingSink {
    fn on_block(&self, decision: &BlockDecision) {
        warn!(
            address = %decision.address,
            attempts = decision.attempts,
            usernames = ?decision.usernames,
            reason = %decision.reason,
            "source blocked",
        );
    }
}

/// Discards decisions.
pub struct NoopSink;

impl DecisionSink for NoopSink {
    fn on_block(&self, _decision: &BlockDecision) {}
}

#[cfg(test)]
pub(crate) mod testing {
    use super::DecisionSink;
    use guard_detect::BlockDecision;
    use parking_lot::Mutex;

    /// Records every decision it receives.
    #[derive(Default)]
    pub struct RecordingSink {
        decisions: Mutex<Vec<BlockDecision>>,
    }

    impl RecordingSink {
        pub fn decisions(&self) -> Vec<BlockDecision> {
            self.decisions.lock().clone()
        }
    }

    impl DecisionSink for RecordingSink {
        fn on_block(&self, decision: &BlockDecision) {
            self.decisions.lock().push(decision.clone());
        }
    }
}
