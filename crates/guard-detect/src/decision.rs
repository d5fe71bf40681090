//! Block decision policy.

use serde::{Deserialize, Serialize};

/// The structured output of a fired threshold check.
///
/// Produced exactly once per burst; the orchestrator resets the source's
/// window immediately after so the same burst cannot re-trigger. This shape
/// is also what downstream enrichment/notification collaborators consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDecision {
    /// Source address to block.
    pub address: String,
    /// In-window attempt count at decision time.
    pub attempts: usize,
    /// Distinct usernames attempted from this source.
    pub usernames: Vec<String>,
    /// Human-readable reason.
    pub reason: String,
}

/// Pure threshold policy: `count >= threshold` fires a decision.
#[derive(Debug, Clone, Copy)]
pub struct DecisionPolicy {
    threshold: u32,
}

impl DecisionPolicy {
    /// Creates a policy with the given failure threshold.
    #[must_use]
    pub const fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    /// The configured threshold.
    #[must_use]
    pub const fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Evaluates the post-add count for a source.
    ///
    /// Returns a [`BlockDecision`] when the count has reached the
    /// threshold. The caller must reset the source's window immediately
    /// after acting on a returned decision.
    #[must_use]
    pub fn decide(
        &self,
        address: &str,
        count: usize,
        usernames: Vec<String>,
    ) -> Option<BlockDecision> {
        if count < self.threshold as usize {
            return None;
        }
        Some(BlockDecision {
            address: address.to_string(),
            attempts: count,
            usernames,
            reason: format!("burst detected ({count} attempts)"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_threshold_is_quiet() {
        let policy = DecisionPolicy::new(5);
        assert!(policy.decide("1.2.3.4", 0, Vec::new()).is_none());
        assert!(policy.decide("1.2.3.4", 4, Vec::new()).is_none());
    }

    #[test]
    fn at_threshold_fires() {
        let policy = DecisionPolicy::new(5);
        let decision = policy
            .decide("1.2.3.4", 5, vec!["root".into()])
            .expect("fires");
        assert_eq!(decision.address, "1.2.3.4");
        assert_eq!(decision.attempts, 5);
        assert_eq!(decision.usernames, vec!["root".to_string()]);
        assert_eq!(decision.reason, "burst detected (5 attempts)");
    }

    #[test]
    fn above_threshold_fires_with_actual_count() {
        let policy = DecisionPolicy::new(3);
        let decision = policy.decide("1.2.3.4", 7, Vec::new()).expect("fires");
        assert_eq!(decision.attempts, 7);
        assert_eq!(decision.reason, "burst detected (7 attempts)");
    }

    #[test]
    fn decision_serializes_for_downstream_consumers() {
        let decision = BlockDecision {
            address: "203.0.113.7".into(),
            attempts: 5,
            usernames: vec!["admin".into()],
            reason: "burst detected (5 attempts)".into(),
        };
        let json = serde_json::to_string(&decision).expect("serialize");
        assert!(json.contains("203.0.113.7"));
        assert!(json.contains("burst detected"));
    }
}
