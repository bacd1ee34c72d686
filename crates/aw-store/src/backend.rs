//! The storage backend interface.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::error::StorageError;

/// A single key change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyChange {
    pub key: String,
    pub new_value: Value,
}

/// Flat key/value persistence with change notification.
///
/// The store is shared with the settings surface and may be mutated
/// externally at any time; callers must treat every read as possibly
/// stale and keep draining change notifications rather than caching.
pub trait StorageBackend {
    /// Adapter name for logs and the negotiation report.
    fn name(&self) -> &'static str;

    /// Availability probe used by capability negotiation.
    fn probe(&self) -> Result<(), StorageError>;

    /// Read the requested keys; absent keys are simply missing from the
    /// result map.
    fn get(&mut self, keys: &[&str]) -> Result<HashMap<String, Value>, StorageError>;

    /// Write the given entries atomically with respect to this backend.
    fn set(&mut self, entries: Vec<(String, Value)>) -> Result<(), StorageError>;

    /// Change notifications accumulated since the last drain, in write
    /// order. A write that does not change the stored value produces no
    /// notification.
    fn drain_changes(&mut self) -> Vec<KeyChange>;
}

/// Shared handle to the negotiated backend. Single-threaded cooperative
/// model: the watcher, the coordinator, and the settings surface all hold
/// the same handle and never run concurrently.
pub type SharedBackend = Rc<RefCell<dyn StorageBackend>>;
