//! The detection-and-response pipeline.
//!
//! One [`Pipeline`] is shared by every watch loop. Per line the flow is:
//! parse, whitelist check, ledger append, then an atomic window update plus
//! threshold check plus reset, and on a fired decision: firewall block and
//! sink notification.
//!
//! The window is reset in the same tracker lock that fires the decision, so
//! concurrent loops feeding one source cannot double-fire and a slow or
//! failing firewall call cannot let the same burst fire again.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use guard_audit::{AuditLedger, EventRecord};
use guard_detect::{BlockDecision, DecisionPolicy, EventParser, Whitelist, WindowTracker};
use guard_firewall::Firewall;
use guard_tail::LogTailer;

use crate::config::GuardConfig;
use crate::error::DaemonError;
use crate::sink::DecisionSink;

/// Shared pipeline state for all watch loops.
pub struct Pipeline {
    parser: EventParser,
    whitelist: Whitelist,
    tracker: WindowTracker,
    policy: DecisionPolicy,
    block_seconds: u64,
    log_paths: Vec<PathBuf>,
    firewall: Arc<dyn Firewall>,
    ledger: Arc<dyn AuditLedger>,
    sink: Arc<dyn DecisionSink>,
}

impl Pipeline {
    /// Builds a pipeline from validated configuration and its collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::Config`] when the configuration is invalid.
    pub fn new(
        config: &GuardConfig,
        firewall: Arc<dyn Firewall>,
        ledger: Arc<dyn AuditLedger>,
        sink: Arc<dyn DecisionSink>,
    ) -> Result<Self, DaemonError> {
        config.validate()?;
        let detection = config.detection();
        Ok(Self {
            parser: EventParser::new(),
            whitelist: Whitelist::new(&config.whitelist_cidrs),
            tracker: WindowTracker::from_config(&detection),
            policy: DecisionPolicy::new(detection.failures_threshold),
            block_seconds: config.block_seconds,
            log_paths: config.log_paths.clone(),
            firewall,
            ledger,
            sink,
        })
    }

    /// Feeds one raw log line through the pipeline.
    ///
    /// Returns the block decision when this line completed a burst. Ledger
    /// and firewall failures are logged and swallowed; a line is never
    /// retried.
    pub fn process_line(&self, line: &str, ts: i64) -> Option<BlockDecision> {
        let event = self.parser.parse(line, ts)?;

        if self.whitelist.is_whitelisted(&event.src_ip) {
            debug!(address = %event.src_ip, "whitelisted source, skipping");
            return None;
        }

        let mut record = EventRecord::new(&event.src_ip, event.kind.as_str())
            .at(event.ts)
            .with_raw(&event.raw);
        if let Some(username) = &event.username {
            record = record.with_username(username);
        }
        if let Err(error) = self.ledger.append_event(&record) {
            warn!(%error, "failed to append event record");
        }

        // Add, threshold check and window reset happen under one tracker
        // lock: two loops feeding the same source can never both fire for
        // one burst, and the reset holds regardless of how the firewall
        // call goes.
        let (count, usernames) = self.tracker.add_and_trigger(
            &event.src_ip,
            event.username.as_deref(),
            event.ts,
            self.policy.threshold(),
        )?;
        let decision = self.policy.decide(&event.src_ip, count, usernames)?;

        match self
            .firewall
            .block(&decision.address, self.block_seconds, &decision.reason)
        {
            Ok(()) => {
                info!(
                    address = %decision.address,
                    attempts = decision.attempts,
                    duration_secs = self.block_seconds,
                    "block enacted",
                );
                self.sink.on_block(&decision);
            }
            Err(error) => {
                warn!(address = %decision.address, %error, "block failed");
            }
        }

        Some(decision)
    }

    /// Watches one log file forever, feeding each line through the pipeline.
    pub async fn watch_source(self: Arc<Self>, path: PathBuf) {
        info!(path = %path.display(), "watching log source");
        let mut tailer = LogTailer::new(&path);
        loop {
            let line = tailer.next_line().await;
            self.process_line(&line, Utc::now().timestamp());
        }
    }

    /// Runs the daemon: reconciles the firewall, then spawns one watch loop
    /// per configured log path. Never returns under normal operation.
    pub async fn run(self: Arc<Self>) {
        if let Err(error) = self.firewall.ensure() {
            warn!(%error, "firewall reconciliation failed, continuing");
        }

        let mut handles = Vec::new();
        for path in self.log_paths.clone() {
            handles.push(tokio::spawn(Arc::clone(&self).watch_source(path)));
        }
        for handle in handles {
            if let Err(error) = handle.await {
                warn!(%error, "watch loop terminated");
            }
        }
    }

    /// The shared window tracker, for inspection.
    #[must_use]
    pub fn tracker(&self) -> &WindowTracker {
        &self.tracker
    }
}
