/*!
Error types for the Snapvault core engine.
*/

use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout the Snapvault core.
pub type Result<T> = std::result::Result<T, SnapvaultError>;

/// Errors that can occur during a backup run.
///
/// Every variant is fatal for the run: nothing is retried and no partial
/// archive is ever written.
#[derive(Error, Debug)]
pub enum SnapvaultError {
    /// Missing or malformed required settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A single collection could not be read from the remote store
    #[error("Failed to fetch collection '{collection}': {cause}")]
    Fetch { collection: String, cause: String },

    /// The encryption key is present but unusable
    #[error("Encryption configuration error: {0}")]
    EncryptionConfig(String),

    /// The cipher primitive rejected the operation
    #[error("Cipher error: {0}")]
    Cipher(String),

    /// Filesystem failure while writing an archive file
    #[error("Failed to write {}: {cause}", .path.display())]
    Write { path: PathBuf, cause: String },

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SnapvaultError {
    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a new fetch error for the given collection
    pub fn fetch<C: Into<String>, S: Into<String>>(collection: C, cause: S) -> Self {
        Self::Fetch {
            collection: collection.into(),
            cause: cause.into(),
        }
    }

    /// Create a new encryption configuration error
    pub fn encryption_config<S: Into<String>>(msg: S) -> Self {
        Self::EncryptionConfig(msg.into())
    }

    /// Create a new cipher error
    pub fn cipher<S: Into<String>>(msg: S) -> Self {
        Self::Cipher(msg.into())
    }

    /// Create a new write error for the given path
    pub fn write<P: Into<PathBuf>, S: Into<String>>(path: P, cause: S) -> Self {
        Self::Write {
            path: path.into(),
            cause: cause.into(),
        }
    }

    /// Name of the run stage that produced this error, used in diagnostics
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Fetch { .. } => "fetch",
            Self::EncryptionConfig(_) => "encryption-config",
            Self::Cipher(_) => "encrypt",
            Self::Write { .. } => "write",
            Self::Json(_) => "serialize",
        }
    }

    /// Process exit code reported for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 2,
            Self::Fetch { .. } => 3,
            Self::EncryptionConfig(_) => 4,
            Self::Cipher(_) => 5,
            Self::Write { .. } => 6,
            Self::Json(_) => 1,
        }
    }
}
