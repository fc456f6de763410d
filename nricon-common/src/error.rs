//! Error types for nricon

use thiserror::Error;

/// Error types for the nricon library.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rule-string parse errors that cannot be skipped per-entry.
    #[error("Parse error: {0}")]
    Parse(String),

    /// State machine errors.
    #[error("State machine error: {0}")]
    StateMachine(String),

    /// Task channel errors (the display task has shut down).
    #[error("Task error: {0}")]
    Task(String),

    /// File I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

/// Result alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
