//! Error types for the tunic core library.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the core [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for model and export operations.
#[derive(Debug, Error)]
pub enum Error {
    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A `host:port` string that could not be split
    #[error("Invalid server address: {0}")]
    InvalidAddress(String),

    /// A persisted file that is expected but not on disk
    #[error("Missing artifact: {}", .0.display())]
    MissingArtifact(PathBuf),
}
