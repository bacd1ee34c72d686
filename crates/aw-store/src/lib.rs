//! Configuration store boundary for adwatch.
//!
//! The persistence mechanism itself is an external collaborator; this
//! crate specifies it at its interface:
//! - [`StorageBackend`]: get/set over a flat key/value namespace of JSON
//!   values, plus drainable change notifications
//! - Two concrete adapters forming a closed set: [`MemoryBackend`] (the
//!   primary, quota-governed shared store) and [`LocalFileBackend`] (the
//!   single-origin local fallback)
//! - [`negotiate`]: the explicit capability-negotiation step that picks
//!   one adapter at startup
//! - [`SettingsStore`]: typed facade over the four persisted fields

pub mod backend;
pub mod error;
pub mod local;
pub mod memory;
pub mod negotiate;
pub mod settings;

pub use backend::{KeyChange, SharedBackend, StorageBackend};
pub use error::{InjectedFault, StorageError};
pub use local::LocalFileBackend;
pub use memory::MemoryBackend;
pub use negotiate::{negotiate, resolve_data_dir, BackendChoice, Negotiated};
pub use settings::{SettingsChange, SettingsStore};
