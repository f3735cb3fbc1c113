//! Custom error types for vibegrep
//!
//! Uses thiserror for ergonomic error definitions with automatic
//! Display and Error trait implementations.

use thiserror::Error;

/// Application-specific errors for vibegrep
#[derive(Error, Debug)]
pub enum VibegrepError {
    /// IO operations failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request never produced an HTTP response (connect, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The matching service answered with a non-success status
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Every attempt hit a transient status
    #[error("gave up after {attempts} attempts (last status {status})")]
    RetriesExhausted { attempts: u32, status: u16 },

    /// The service answered 2xx but the body was not a chat completion
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// JSON parsing failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid `--glob` pattern
    #[error("Invalid glob: {0}")]
    Glob(#[from] globset::Error),

    /// Invalid file or directory path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A dispatch worker panicked or was cancelled
    #[error("Worker error: {0}")]
    Task(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, VibegrepError>;
