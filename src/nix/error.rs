//! Error types for container operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while opening, mutating or saving a container.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP archive error.
    #[error("Archive error: {0}")]
    Archive(String),

    /// JSON (de)serialization error of the metadata tree or manifest.
    #[error("JSON error: {0}")]
    Json(String),

    /// The file is not a container or was written by an unknown version.
    #[error("Invalid container: {0}")]
    Format(String),

    /// Opening a missing file read-only.
    #[error("Container not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The container was opened read-only.
    #[error("Container is read-only")]
    ReadOnly,

    /// Text the storage encoding cannot represent.
    #[error("Unsupported characters in {field}: {value:?}")]
    Encoding { field: &'static str, value: String },

    /// A sibling with the same name already exists.
    #[error("Duplicate {kind} name: {name}")]
    DuplicateName { kind: &'static str, name: String },

    /// A type tag with no container counterpart.
    #[error("Unknown odML type: {0}")]
    UnknownOdmlType(String),
}

impl ContainerError {
    /// Create an archive error.
    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive(message.into())
    }

    /// Create a JSON error.
    pub fn json(message: impl Into<String>) -> Self {
        Self::Json(message.into())
    }

    /// Create a format error.
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    /// Returns true for failures caused by the storage text encoding.
    pub fn is_encoding(&self) -> bool {
        matches!(self, Self::Encoding { .. })
    }
}
