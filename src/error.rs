//! Error types for build environment resolution and keystore provisioning.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SetupError>;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Invalid build mode '{0}' (expected 'dev' or 'prod')")]
    InvalidMode(String),

    #[error("No editor version given; cannot search for an installation")]
    MissingVersion,

    #[error("Keystore already exists: {}\n   Choose a different path or remove the existing file first", .0.display())]
    KeystoreExists(PathBuf),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Command execution failed: {0}")]
    CommandExecution(String),

    #[error("Cancelled by operator")]
    Cancelled,

    #[error("Gave up after {0} invalid attempts")]
    RetriesExhausted(u32),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SetupError {
    /// Whether the operator should be shown the CLI usage line alongside the error.
    #[must_use]
    pub fn wants_usage(&self) -> bool {
        matches!(self, Self::InvalidMode(_))
    }
}
