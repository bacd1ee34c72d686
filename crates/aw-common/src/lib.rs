//! adwatch shared types: persisted keys, watcher settings, and errors.

pub mod error;
pub mod keys;
pub mod settings;

pub use error::{Error, Result};
pub use settings::WatcherSettings;
