//! Storage failure taxonomy.
//!
//! Every failure the persistence layer can report is one of these; the
//! context guard maps each to a disposition (degrade, retry, abandon, or
//! teardown) and nothing propagates further as a raised failure.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from storage backend operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No persistence backend reachable. Negotiation falls back to the
    /// local store; mid-run it is treated as transient.
    #[error("storage backend unavailable")]
    Unavailable,

    /// Host execution context torn down. The single failure that cascades
    /// into mandatory teardown.
    #[error("execution context invalidated")]
    ContextInvalidated,

    /// Write-rate limit hit. The pending claim is retried with a larger
    /// interval, never dropped.
    #[error("storage write quota exceeded")]
    QuotaExceeded,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("sandboxed frame: storage not accessible")]
    SandboxedFrame,

    #[error("network error: {0}")]
    Network(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse stored JSON: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
    },
}

/// Copyable fault kinds for backend fault injection in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFault {
    Unavailable,
    ContextInvalidated,
    QuotaExceeded,
    PermissionDenied,
    SandboxedFrame,
    Network,
}

impl InjectedFault {
    pub fn into_error(self) -> StorageError {
        match self {
            InjectedFault::Unavailable => StorageError::Unavailable,
            InjectedFault::ContextInvalidated => StorageError::ContextInvalidated,
            InjectedFault::QuotaExceeded => StorageError::QuotaExceeded,
            InjectedFault::PermissionDenied => {
                StorageError::PermissionDenied("injected".to_string())
            }
            InjectedFault::SandboxedFrame => StorageError::SandboxedFrame,
            InjectedFault::Network => StorageError::Network("injected".to_string()),
        }
    }
}
