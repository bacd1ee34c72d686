//! Storage failure classification.
//!
//! Storage faults fall into exactly four buckets: context invalidation
//! tears the watcher down for good, quota presses the counter into
//! backoff, an unavailable backend degrades that one operation, and
//! everything else abandons the operation with a log line.

use tracing::{error, warn};

use aw_store::StorageError;

/// What a storage failure means for the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// The host context is gone; stop everything and never restart.
    Teardown,
    /// Transient quota pressure; the operation retries later.
    RetryLater,
    /// Backend unreachable; skip this operation, keep running.
    Degrade,
    /// Unrecoverable for this operation only.
    Abandon,
}

/// Latching context-invalidation guard.
#[derive(Debug, Default)]
pub struct ContextGuard {
    invalidated: bool,
}

impl ContextGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a storage failure. Teardown latches: once seen, the
    /// guard reports invalidated forever.
    pub fn classify(&mut self, err: &StorageError) -> FailureDisposition {
        match err {
            StorageError::ContextInvalidated => {
                if !self.invalidated {
                    error!("host context invalidated, tearing down");
                }
                self.invalidated = true;
                FailureDisposition::Teardown
            }
            StorageError::QuotaExceeded => FailureDisposition::RetryLater,
            StorageError::Unavailable => {
                warn!("storage backend unavailable, skipping operation");
                FailureDisposition::Degrade
            }
            other => {
                warn!(error = %other, "storage operation failed");
                FailureDisposition::Abandon
            }
        }
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }
}
