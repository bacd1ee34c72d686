//! Error types for adwatch.

use thiserror::Error;

/// Result type alias for adwatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for adwatch.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid scenario file: {0}")]
    InvalidScenario(String),

    // Storage errors (20-29)
    #[error("storage error: {0}")]
    Storage(String),

    #[error("execution context invalidated")]
    ContextInvalidated,

    // Classification errors (30-39)
    #[error("classification failed: {0}")]
    Classification(String),

    // Automation errors (40-49)
    #[error("automation failed: {0}")]
    Automation(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in JSON output.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidScenario(_) => 11,
            Error::Storage(_) => 20,
            Error::ContextInvalidated => 21,
            Error::Classification(_) => 30,
            Error::Automation(_) => 40,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }
}
