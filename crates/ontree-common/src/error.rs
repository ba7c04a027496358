//! Unified error types for the ontree workspace.
//!
//! Each higher-level crate defines its own domain-specific error enum that wraps
//! these common variants when appropriate.

use std::path::PathBuf;

use thiserror::Error;

use crate::naming::NameError;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum OntreeError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A container or directory name does not fit the naming scheme.
    #[error(transparent)]
    Name(#[from] NameError),

    /// A call to the container runtime failed.
    #[error("container runtime {operation} failed: {message}")]
    Runtime {
        /// Runtime operation that was attempted (`list`, `inspect`, ...).
        operation: &'static str,
        /// Message reported by the runtime.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl OntreeError {
    /// Builds an [`OntreeError::Io`] for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, OntreeError>;
