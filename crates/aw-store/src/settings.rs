//! Typed settings facade over the negotiated backend.

use serde_json::{json, Value};
use tracing::debug;

use aw_common::keys;
use aw_common::settings::WatcherSettings;

use crate::backend::SharedBackend;
use crate::error::StorageError;

/// A change to one of the watched fields, decoded from raw key
/// notifications. Unknown keys and wrong-typed values are dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingsChange {
    Enabled(bool),
    MuteAdSound(bool),
    BlurAds(bool),
    AdsSkipped(i64),
}

/// Clonable handle performing all typed reads/writes against the shared
/// backend. Every read goes to the backend; nothing is cached here.
#[derive(Clone)]
pub struct SettingsStore {
    backend: SharedBackend,
}

impl SettingsStore {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    /// Read the three behavior toggles, substituting the documented
    /// default for any absent or wrong-typed field.
    pub fn read_settings(&self) -> Result<WatcherSettings, StorageError> {
        let result = self.backend.borrow_mut().get(&[
            keys::WATCHER_ENABLED,
            keys::MUTE_AD_SOUND,
            keys::BLUR_ADS,
        ])?;
        let bool_or = |key: &str, default: bool| -> bool {
            result.get(key).and_then(Value::as_bool).unwrap_or(default)
        };
        Ok(WatcherSettings {
            enabled: bool_or(keys::WATCHER_ENABLED, keys::DEFAULT_WATCHER_ENABLED),
            mute_ad_sound: bool_or(keys::MUTE_AD_SOUND, keys::DEFAULT_MUTE_AD_SOUND),
            blur_ads: bool_or(keys::BLUR_ADS, keys::DEFAULT_BLUR_ADS),
        })
    }

    /// Current skip tally, defaulting to 0 if absent or wrong-typed.
    pub fn read_counter(&self) -> Result<i64, StorageError> {
        let result = self.backend.borrow_mut().get(&[keys::ADS_SKIPPED])?;
        Ok(result
            .get(keys::ADS_SKIPPED)
            .and_then(Value::as_i64)
            .unwrap_or(keys::DEFAULT_ADS_SKIPPED))
    }

    /// Read-modify-write increment of the skip tally. Returns the new
    /// value.
    pub fn increment_counter(&self) -> Result<i64, StorageError> {
        let current = self.read_counter()?;
        let next = current + 1;
        self.backend
            .borrow_mut()
            .set(vec![(keys::ADS_SKIPPED.to_string(), json!(next))])?;
        debug!(from = current, to = next, "skip counter incremented");
        Ok(next)
    }

    pub fn read_enabled(&self) -> Result<bool, StorageError> {
        let result = self.backend.borrow_mut().get(&[keys::WATCHER_ENABLED])?;
        Ok(result
            .get(keys::WATCHER_ENABLED)
            .and_then(Value::as_bool)
            .unwrap_or(keys::DEFAULT_WATCHER_ENABLED))
    }

    pub fn write_enabled(&self, enabled: bool) -> Result<(), StorageError> {
        self.backend
            .borrow_mut()
            .set(vec![(keys::WATCHER_ENABLED.to_string(), json!(enabled))])
    }

    /// The persisted fields still missing their first-run default.
    pub fn missing_defaults(&self) -> Result<Vec<(String, Value)>, StorageError> {
        let result = self.backend.borrow_mut().get(&[
            keys::WATCHER_ENABLED,
            keys::MUTE_AD_SOUND,
            keys::BLUR_ADS,
            keys::ADS_SKIPPED,
        ])?;
        let mut missing = Vec::new();
        if !result.contains_key(keys::WATCHER_ENABLED) {
            missing.push((
                keys::WATCHER_ENABLED.to_string(),
                json!(keys::DEFAULT_WATCHER_ENABLED),
            ));
        }
        if !result.contains_key(keys::MUTE_AD_SOUND) {
            missing.push((
                keys::MUTE_AD_SOUND.to_string(),
                json!(keys::DEFAULT_MUTE_AD_SOUND),
            ));
        }
        if !result.contains_key(keys::BLUR_ADS) {
            missing.push((keys::BLUR_ADS.to_string(), json!(keys::DEFAULT_BLUR_ADS)));
        }
        if !result.contains_key(keys::ADS_SKIPPED) {
            missing.push((
                keys::ADS_SKIPPED.to_string(),
                json!(keys::DEFAULT_ADS_SKIPPED),
            ));
        }
        Ok(missing)
    }

    /// Raw entry write, used by the coordinator's default initialization.
    pub fn write_entries(&self, entries: Vec<(String, Value)>) -> Result<(), StorageError> {
        self.backend.borrow_mut().set(entries)
    }

    /// Decode pending change notifications into typed settings changes.
    pub fn drain_changes(&self) -> Vec<SettingsChange> {
        self.backend
            .borrow_mut()
            .drain_changes()
            .into_iter()
            .filter_map(|change| match change.key.as_str() {
                keys::WATCHER_ENABLED => change.new_value.as_bool().map(SettingsChange::Enabled),
                keys::MUTE_AD_SOUND => {
                    change.new_value.as_bool().map(SettingsChange::MuteAdSound)
                }
                keys::BLUR_ADS => change.new_value.as_bool().map(SettingsChange::BlurAds),
                keys::ADS_SKIPPED => change.new_value.as_i64().map(SettingsChange::AdsSkipped),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn test_store() -> SettingsStore {
        SettingsStore::new(Rc::new(RefCell::new(MemoryBackend::new())))
    }

    #[test]
    fn test_reads_default_when_absent() {
        let store = test_store();
        let settings = store.read_settings().unwrap();
        assert_eq!(settings, WatcherSettings::default());
        assert_eq!(store.read_counter().unwrap(), 0);
    }

    #[test]
    fn test_wrong_typed_value_falls_back_to_default() {
        let store = test_store();
        store
            .write_entries(vec![(keys::MUTE_AD_SOUND.to_string(), json!("yes"))])
            .unwrap();
        let settings = store.read_settings().unwrap();
        assert!(settings.mute_ad_sound);
    }

    #[test]
    fn test_increment_counter_is_read_modify_write() {
        let store = test_store();
        assert_eq!(store.increment_counter().unwrap(), 1);
        assert_eq!(store.increment_counter().unwrap(), 2);
        assert_eq!(store.read_counter().unwrap(), 2);
    }

    #[test]
    fn test_missing_defaults_shrink_as_fields_appear() {
        let store = test_store();
        assert_eq!(store.missing_defaults().unwrap().len(), 4);

        store.write_enabled(true).unwrap();
        let missing = store.missing_defaults().unwrap();
        assert_eq!(missing.len(), 3);
        assert!(missing.iter().all(|(k, _)| k != keys::WATCHER_ENABLED));
    }

    #[test]
    fn test_drain_changes_decodes_known_keys() {
        let store = test_store();
        store
            .write_entries(vec![
                (keys::BLUR_ADS.to_string(), json!(true)),
                ("unrelatedKey".to_string(), json!(42)),
                (keys::ADS_SKIPPED.to_string(), json!(3)),
            ])
            .unwrap();
        let changes = store.drain_changes();
        assert_eq!(
            changes,
            vec![SettingsChange::BlurAds(true), SettingsChange::AdsSkipped(3)]
        );
    }
}
