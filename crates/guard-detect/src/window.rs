//! Per-source sliding-window attempt tracking.

use std::collections::{HashMap, HashSet, VecDeque};

use parking_lot::Mutex;
use tracing::debug;

use crate::config::DetectionConfig;

/// How often idle sources are swept, in seconds.
const SWEEP_INTERVAL_SECS: i64 = 60;

/// Window state for one source address.
#[derive(Debug, Default)]
struct WindowState {
    /// Attempt timestamps, non-decreasing, bounded to the window length.
    timestamps: VecDeque<i64>,
    /// Distinct usernames attempted from this source.
    usernames: HashSet<String>,
}

impl WindowState {
    /// Evict entries older than the window, measured against `now`.
    fn evict(&mut self, now: i64, window_secs: i64) {
        let limit = now - window_secs;
        while self.timestamps.front().is_some_and(|t| *t < limit) {
            self.timestamps.pop_front();
        }
    }
}

/// Shared sliding-window counter keyed by source address.
///
/// Multiple source loops feed one tracker, so all mutations go through a
/// single lock; eviction and count for a key can never interleave with a
/// concurrent `reset` for the same key.
///
/// Sources with no activity for longer than the idle retention are swept
/// out opportunistically from [`WindowTracker::add`], bounding memory under
/// wide-scan adversaries. A source with in-window activity is never swept.
#[derive(Debug)]
pub struct WindowTracker {
    window_secs: i64,
    idle_retention_secs: i64,
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    sources: HashMap<String, WindowState>,
    last_sweep: i64,
}

impl WindowTracker {
    /// Creates a tracker with the given window length and an idle retention
    /// of ten windows.
    #[must_use]
    pub fn new(window_seconds: u64) -> Self {
        Self::with_retention(window_seconds, window_seconds.saturating_mul(10))
    }

    /// Creates a tracker with explicit window and idle retention lengths.
    #[must_use]
    pub fn with_retention(window_seconds: u64, idle_retention_seconds: u64) -> Self {
        Self {
            window_secs: window_seconds as i64,
            idle_retention_secs: idle_retention_seconds.max(window_seconds) as i64,
            inner: Mutex::new(Inner {
                sources: HashMap::new(),
                last_sweep: 0,
            }),
        }
    }

    /// Creates a tracker from configuration.
    #[must_use]
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::with_retention(config.window_seconds, config.idle_retention_seconds)
    }

    /// Records an attempt and returns the post-eviction count for the source.
    ///
    /// Front eviction against the new timestamp is correct because
    /// timestamps arrive non-decreasing per source under normal log order.
    pub fn add(&self, address: &str, username: Option<&str>, ts: i64) -> usize {
        let mut inner = self.inner.lock();
        let count = Self::record(&mut inner, address, username, ts, self.window_secs);
        self.maybe_sweep(&mut inner, ts);
        count
    }

    /// Records an attempt and fires the threshold check atomically.
    ///
    /// When the post-eviction count reaches `threshold`, the source's
    /// timestamps and usernames are cleared under the same lock and the
    /// count plus the drained usernames are returned. Concurrent callers
    /// feeding one source therefore observe at most one firing per burst;
    /// a separate `add` then `reset` would leave a window in which both
    /// callers see the threshold reached.
    pub fn add_and_trigger(
        &self,
        address: &str,
        username: Option<&str>,
        ts: i64,
        threshold: u32,
    ) -> Option<(usize, Vec<String>)> {
        let mut inner = self.inner.lock();
        let count = Self::record(&mut inner, address, username, ts, self.window_secs);

        let fired = if count >= threshold as usize {
            inner.sources.get_mut(address).map(|state| {
                let usernames = state.usernames.drain().collect();
                state.timestamps.clear();
                (count, usernames)
            })
        } else {
            None
        };

        self.maybe_sweep(&mut inner, ts);
        fired
    }

    fn record(
        inner: &mut Inner,
        address: &str,
        username: Option<&str>,
        ts: i64,
        window_secs: i64,
    ) -> usize {
        let state = inner.sources.entry(address.to_string()).or_default();
        state.timestamps.push_back(ts);
        state.evict(ts, window_secs);
        if let Some(username) = username {
            if !username.is_empty() {
                state.usernames.insert(username.to_string());
            }
        }
        state.timestamps.len()
    }

    fn maybe_sweep(&self, inner: &mut Inner, ts: i64) {
        if ts - inner.last_sweep >= SWEEP_INTERVAL_SECS {
            inner.last_sweep = ts;
            Self::sweep_idle(&mut inner.sources, ts, self.idle_retention_secs);
        }
    }

    /// Current in-window count for a source, evicting against `now`.
    ///
    /// Does not mutate the username set.
    #[must_use]
    pub fn count(&self, address: &str, now: i64) -> usize {
        let mut inner = self.inner.lock();
        match inner.sources.get_mut(address) {
            Some(state) => {
                state.evict(now, self.window_secs);
                state.timestamps.len()
            }
            None => 0,
        }
    }

    /// Distinct usernames attempted from a source, unordered.
    #[must_use]
    pub fn usernames(&self, address: &str) -> Vec<String> {
        self.inner
            .lock()
            .sources
            .get(address)
            .map(|state| state.usernames.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Clears the timestamp sequence and username set for a source.
    ///
    /// Called exactly once, immediately after a block decision, so the same
    /// burst cannot re-trigger on every subsequent matching line.
    pub fn reset(&self, address: &str) {
        let mut inner = self.inner.lock();
        if let Some(state) = inner.sources.get_mut(address) {
            state.timestamps.clear();
            state.usernames.clear();
        }
    }

    /// Removes sources whose newest activity is older than the idle
    /// retention. Returns the number of sources removed.
    pub fn evict_idle(&self, now: i64) -> usize {
        let mut inner = self.inner.lock();
        Self::sweep_idle(&mut inner.sources, now, self.idle_retention_secs)
    }

    /// Number of sources currently tracked.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.inner.lock().sources.len()
    }

    /// The configured window length in seconds.
    #[must_use]
    pub const fn window_seconds(&self) -> i64 {
        self.window_secs
    }

    fn sweep_idle(sources: &mut HashMap<String, WindowState>, now: i64, retention: i64) -> usize {
        let before = sources.len();
        sources.retain(|address, state| {
            let keep = state.timestamps.back().is_some_and(|t| now - *t < retention);
            if !keep {
                debug!(address = %address, "evicting idle source");
            }
            keep
        });
        before.saturating_sub(sources.len())
    }
}
