//! Primary in-memory backend with fault injection.

use std::collections::{HashMap, VecDeque};

use serde_json::Value;

use crate::backend::{KeyChange, StorageBackend};
use crate::error::{InjectedFault, StorageError};

/// Stand-in for the quota-governed shared store, used as the primary
/// adapter and as the test double for every storage failure mode.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, Value>,
    changes: VecDeque<KeyChange>,
    available: bool,
    get_faults: VecDeque<InjectedFault>,
    set_faults: VecDeque<InjectedFault>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            available: true,
            ..Self::default()
        }
    }

    /// An unreachable backend, for negotiation tests.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::default()
        }
    }

    /// Fail the next `get` with the given fault.
    pub fn inject_get_fault(&mut self, fault: InjectedFault) {
        self.get_faults.push_back(fault);
    }

    /// Fail the next `set` with the given fault.
    pub fn inject_set_fault(&mut self, fault: InjectedFault) {
        self.set_faults.push_back(fault);
    }

    /// Raw value access for assertions.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }
}

impl StorageBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn probe(&self) -> Result<(), StorageError> {
        if self.available {
            Ok(())
        } else {
            Err(StorageError::Unavailable)
        }
    }

    fn get(&mut self, keys: &[&str]) -> Result<HashMap<String, Value>, StorageError> {
        if let Some(fault) = self.get_faults.pop_front() {
            return Err(fault.into_error());
        }
        if !self.available {
            return Err(StorageError::Unavailable);
        }
        let mut result = HashMap::new();
        for &key in keys {
            if let Some(value) = self.entries.get(key) {
                result.insert(key.to_string(), value.clone());
            }
        }
        Ok(result)
    }

    fn set(&mut self, entries: Vec<(String, Value)>) -> Result<(), StorageError> {
        if let Some(fault) = self.set_faults.pop_front() {
            return Err(fault.into_error());
        }
        if !self.available {
            return Err(StorageError::Unavailable);
        }
        for (key, value) in entries {
            let changed = self.entries.get(&key) != Some(&value);
            if changed {
                self.changes.push_back(KeyChange {
                    key: key.clone(),
                    new_value: value.clone(),
                });
                self.entries.insert(key, value);
            }
        }
        Ok(())
    }

    fn drain_changes(&mut self) -> Vec<KeyChange> {
        self.changes.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_returns_only_present_keys() {
        let mut backend = MemoryBackend::new();
        backend
            .set(vec![("muteAdSound".to_string(), json!(true))])
            .unwrap();
        let result = backend.get(&["muteAdSound", "blurAds"]).unwrap();
        assert_eq!(result.get("muteAdSound"), Some(&json!(true)));
        assert!(!result.contains_key("blurAds"));
    }

    #[test]
    fn test_unchanged_write_emits_no_notification() {
        let mut backend = MemoryBackend::new();
        backend
            .set(vec![("watcherEnabled".to_string(), json!(true))])
            .unwrap();
        backend.drain_changes();

        backend
            .set(vec![("watcherEnabled".to_string(), json!(true))])
            .unwrap();
        assert!(backend.drain_changes().is_empty());

        backend
            .set(vec![("watcherEnabled".to_string(), json!(false))])
            .unwrap();
        assert_eq!(backend.drain_changes().len(), 1);
    }

    #[test]
    fn test_injected_fault_fires_once() {
        let mut backend = MemoryBackend::new();
        backend.inject_set_fault(InjectedFault::QuotaExceeded);
        let err = backend
            .set(vec![("adsSkipped".to_string(), json!(1))])
            .unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded));
        backend
            .set(vec![("adsSkipped".to_string(), json!(1))])
            .unwrap();
    }

    #[test]
    fn test_unavailable_backend_fails_probe() {
        let backend = MemoryBackend::unavailable();
        assert!(matches!(backend.probe(), Err(StorageError::Unavailable)));
    }
}
