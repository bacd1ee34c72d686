//! Local single-origin fallback store.
//!
//! A flat JSON object persisted under the platform data directory. Used
//! when capability negotiation finds no primary backend; the watcher then
//! continues in degraded mode with local-only settings.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::backend::{KeyChange, StorageBackend};
use crate::error::StorageError;

const STORE_DIR: &str = "store";
const STORE_FILE: &str = "settings.json";

/// File-backed fallback adapter.
#[derive(Debug)]
pub struct LocalFileBackend {
    store_path: PathBuf,
    changes: VecDeque<KeyChange>,
}

impl LocalFileBackend {
    /// Create a backend rooted at a specific data directory.
    pub fn from_data_dir(data_dir: &Path) -> Self {
        Self {
            store_path: data_dir.join(STORE_DIR).join(STORE_FILE),
            changes: VecDeque::new(),
        }
    }

    fn load(&self) -> Result<Map<String, Value>, StorageError> {
        if !self.store_path.exists() {
            return Ok(Map::new());
        }
        let content = fs::read_to_string(&self.store_path).map_err(|e| StorageError::Io {
            path: self.store_path.clone(),
            source: e,
        })?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        let value: Value =
            serde_json::from_str(&content).map_err(|e| StorageError::Json { source: e })?;
        match value {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        }
    }

    fn save(&self, map: &Map<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.store_path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let content = serde_json::to_string_pretty(&Value::Object(map.clone()))
            .map_err(|e| StorageError::Json { source: e })?;
        fs::write(&self.store_path, content).map_err(|e| StorageError::Io {
            path: self.store_path.clone(),
            source: e,
        })
    }
}

impl StorageBackend for LocalFileBackend {
    fn name(&self) -> &'static str {
        "local-file"
    }

    fn probe(&self) -> Result<(), StorageError> {
        // The fallback is always reachable; the directory is created on
        // first write.
        Ok(())
    }

    fn get(&mut self, keys: &[&str]) -> Result<HashMap<String, Value>, StorageError> {
        let map = self.load()?;
        let mut result = HashMap::new();
        for &key in keys {
            if let Some(value) = map.get(key) {
                result.insert(key.to_string(), value.clone());
            }
        }
        Ok(result)
    }

    fn set(&mut self, entries: Vec<(String, Value)>) -> Result<(), StorageError> {
        let mut map = self.load()?;
        let mut dirty = false;
        for (key, value) in entries {
            let changed = map.get(&key) != Some(&value);
            if changed {
                self.changes.push_back(KeyChange {
                    key: key.clone(),
                    new_value: value.clone(),
                });
                map.insert(key, value);
                dirty = true;
            }
        }
        if dirty {
            self.save(&map)?;
        }
        Ok(())
    }

    fn drain_changes(&mut self) -> Vec<KeyChange> {
        self.changes.drain(..).collect()
    }
}
