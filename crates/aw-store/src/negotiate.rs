//! Capability negotiation over the closed adapter set.
//!
//! Replaces duck-typed backend probing with one explicit startup step:
//! probe the primary adapter, and on `Unavailable` select the local
//! fallback. Any other probe outcome keeps the primary (mid-run failures
//! are the context guard's concern, not negotiation's).

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{info, warn};

use crate::backend::{SharedBackend, StorageBackend};
use crate::error::StorageError;
use crate::local::LocalFileBackend;

/// Which adapter negotiation selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendChoice {
    Primary,
    FallbackLocal,
}

/// Negotiation result.
pub struct Negotiated {
    pub backend: SharedBackend,
    pub choice: BackendChoice,
}

/// Probe the primary adapter and fall back to the local file store if it
/// is unreachable.
pub fn negotiate(
    primary: Box<dyn StorageBackend>,
    fallback_data_dir: &Path,
) -> Negotiated {
    match primary.probe() {
        Ok(()) => {
            info!(backend = primary.name(), "storage negotiation: primary selected");
            Negotiated {
                backend: Rc::new(RefCell::new(BoxedBackend(primary))),
                choice: BackendChoice::Primary,
            }
        }
        Err(StorageError::Unavailable) => {
            warn!("storage negotiation: primary unavailable, using local fallback");
            let fallback = LocalFileBackend::from_data_dir(fallback_data_dir);
            Negotiated {
                backend: Rc::new(RefCell::new(fallback)),
                choice: BackendChoice::FallbackLocal,
            }
        }
        Err(err) => {
            warn!(error = %err, "storage negotiation: primary probe failed, keeping primary");
            Negotiated {
                backend: Rc::new(RefCell::new(BoxedBackend(primary))),
                choice: BackendChoice::Primary,
            }
        }
    }
}

/// Resolve the fallback data directory.
pub fn resolve_data_dir() -> Result<PathBuf, StorageError> {
    const ENV_DATA_DIR: &str = "ADWATCH_DATA";
    const DIR_NAME: &str = "adwatch";

    // 1) Explicit override
    if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(dir));
    }

    // 2) XDG_DATA_HOME
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return Ok(PathBuf::from(xdg).join(DIR_NAME));
    }

    // 3) Platform default
    if let Some(base) = dirs::data_dir() {
        return Ok(base.join(DIR_NAME));
    }

    Err(StorageError::Unavailable)
}

/// Adapter so a `Box<dyn StorageBackend>` can live behind the shared
/// handle without re-boxing.
struct BoxedBackend(Box<dyn StorageBackend>);

impl StorageBackend for BoxedBackend {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn probe(&self) -> Result<(), StorageError> {
        self.0.probe()
    }

    fn get(
        &mut self,
        keys: &[&str],
    ) -> Result<std::collections::HashMap<String, serde_json::Value>, StorageError> {
        self.0.get(keys)
    }

    fn set(&mut self, entries: Vec<(String, serde_json::Value)>) -> Result<(), StorageError> {
        self.0.set(entries)
    }

    fn drain_changes(&mut self) -> Vec<crate::backend::KeyChange> {
        self.0.drain_changes()
    }
}
