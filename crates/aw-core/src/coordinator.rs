//! Settings coordinator.
//!
//! The out-of-page counterpart to the watcher: seeds first-run defaults
//! without clobbering existing values and serves the two state messages,
//! rate-limiting enable-flag writes so a bouncing UI cannot hammer the
//! quota-limited store.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use aw_store::{SettingsStore, StorageError};

use crate::clock::Clock;

/// Default spacing between accepted enable-flag writes.
pub const INITIAL_WRITE_THROTTLE_MS: u64 = 1_000;

/// Spacing after the store has reported quota pressure.
pub const RAISED_WRITE_THROTTLE_MS: u64 = 2_000;

/// Messages the coordinator serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    #[serde(rename = "GET_WATCHER_STATE")]
    GetWatcherState,
    #[serde(rename = "SET_WATCHER_STATE")]
    SetWatcherState { enabled: bool },
}

/// Replies, shaped to match the request that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    State {
        enabled: bool,
    },
    Write {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        throttled: Option<bool>,
    },
}

/// Stateless apart from the write throttle.
pub struct Coordinator {
    store: SettingsStore,
    clock: Box<dyn Clock>,
    throttle_ms: u64,
    last_write_ms: Option<u64>,
}

impl Coordinator {
    pub fn new(store: SettingsStore, clock: Box<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            throttle_ms: INITIAL_WRITE_THROTTLE_MS,
            last_write_ms: None,
        }
    }

    /// Seed defaults for fields that have never been written. Existing
    /// values, whatever they are, stay untouched. The seeding write goes
    /// through the same throttle as the enable flag; inside the window it
    /// is deferred to a later call.
    pub fn ensure_defaults(&mut self) -> Result<(), StorageError> {
        let missing = self.store.missing_defaults()?;
        if missing.is_empty() {
            return Ok(());
        }
        let now = self.clock.now_ms();
        if self.in_throttle_window(now) {
            return Ok(());
        }
        let count = missing.len();
        match self.store.write_entries(missing) {
            Ok(()) => {
                self.last_write_ms = Some(now);
                info!(count, "seeded first-run defaults");
                Ok(())
            }
            Err(StorageError::QuotaExceeded) => {
                self.raise_throttle();
                Err(StorageError::QuotaExceeded)
            }
            Err(err) => Err(err),
        }
    }

    /// Serve one message. Never raises; failures degrade to the
    /// documented default or an unsuccessful write reply.
    pub fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::GetWatcherState => {
                let enabled = match self.store.read_enabled() {
                    Ok(enabled) => enabled,
                    Err(err) => {
                        warn!(error = %err, "state read failed, reporting default");
                        aw_common::keys::DEFAULT_WATCHER_ENABLED
                    }
                };
                Response::State { enabled }
            }
            Request::SetWatcherState { enabled } => self.write_enabled(enabled),
        }
    }

    pub fn throttle_ms(&self) -> u64 {
        self.throttle_ms
    }

    fn write_enabled(&mut self, enabled: bool) -> Response {
        let now = self.clock.now_ms();
        if self.in_throttle_window(now) {
            // Acknowledged but dropped; the flag will settle on the
            // next accepted write.
            return Response::Write {
                success: true,
                throttled: Some(true),
            };
        }
        match self.store.write_enabled(enabled) {
            Ok(()) => {
                self.last_write_ms = Some(now);
                Response::Write {
                    success: true,
                    throttled: None,
                }
            }
            Err(err) => {
                if matches!(err, StorageError::QuotaExceeded) {
                    self.raise_throttle();
                }
                warn!(error = %err, "enable-flag write failed");
                Response::Write {
                    success: false,
                    throttled: None,
                }
            }
        }
    }

    fn in_throttle_window(&self, now: u64) -> bool {
        self.last_write_ms
            .is_some_and(|last| now < last + self.throttle_ms)
    }

    fn raise_throttle(&mut self) {
        if self.throttle_ms < RAISED_WRITE_THROTTLE_MS {
            self.throttle_ms = RAISED_WRITE_THROTTLE_MS;
            warn!(
                throttle_ms = self.throttle_ms,
                "quota pressure, raising write throttle"
            );
        }
    }
}
