//! Skip-counter write debouncing.
//!
//! Persisting the lifetime skip count is cheap but the backing store is
//! quota-limited, so writes are rate-limited: at most one per interval,
//! with claims landing inside the window absorbed rather than queued.
//! Quota pressure widens the interval and converts the absorbed claim
//! into a scheduled retry.

use tracing::{debug, warn};

/// Minimum spacing between counter writes.
pub const MIN_WRITE_INTERVAL_MS: u64 = 2_000;

/// Interval ceiling under sustained quota pressure.
pub const MAX_WRITE_INTERVAL_MS: u64 = 60_000;

/// What the caller should do with a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimDecision {
    /// Outside the window; write immediately.
    WriteNow,
    /// Inside the window; the claim is absorbed and the window closes
    /// at `until_ms`.
    Absorbed { until_ms: u64 },
    /// A claim is already pending; this one is redundant.
    Ignored,
}

/// Time-based write limiter for the skip counter.
#[derive(Debug)]
pub struct CounterDebouncer {
    pending: bool,
    last_write_ms: Option<u64>,
    interval_ms: u64,
}

impl Default for CounterDebouncer {
    fn default() -> Self {
        Self {
            pending: false,
            last_write_ms: None,
            interval_ms: MIN_WRITE_INTERVAL_MS,
        }
    }
}

impl CounterDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a confirmed skip and decide whether to write now.
    pub fn claim(&mut self, now_ms: u64) -> ClaimDecision {
        if self.pending {
            debug!("counter claim ignored, one already pending");
            return ClaimDecision::Ignored;
        }
        match self.last_write_ms {
            Some(last) if now_ms < last + self.interval_ms => {
                self.pending = true;
                let until_ms = last + self.interval_ms;
                debug!(until_ms, "counter claim absorbed into open window");
                ClaimDecision::Absorbed { until_ms }
            }
            _ => ClaimDecision::WriteNow,
        }
    }

    /// Close the absorb window without a write. Called when the window
    /// lapses; the absorbed claim was already counted by the write that
    /// opened the window.
    pub fn release(&mut self) {
        self.pending = false;
    }

    /// A write went through; the window starts now.
    pub fn on_write_ok(&mut self, now_ms: u64) {
        self.pending = false;
        self.last_write_ms = Some(now_ms);
        self.interval_ms = MIN_WRITE_INTERVAL_MS;
    }

    /// Quota pressure: widen the interval and hold the claim for a
    /// retry. Returns when the retry should fire.
    pub fn on_quota_exceeded(&mut self, now_ms: u64) -> u64 {
        self.interval_ms = (self.interval_ms * 2).min(MAX_WRITE_INTERVAL_MS);
        self.pending = true;
        warn!(interval_ms = self.interval_ms, "counter write hit quota, backing off");
        now_ms + self.interval_ms
    }

    /// Non-quota write failure; the claim is abandoned.
    pub fn on_write_failed(&mut self) {
        self.pending = false;
    }

    /// A scheduled retry is about to attempt its write.
    pub fn begin_retry(&mut self) {
        self.pending = false;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }
}
