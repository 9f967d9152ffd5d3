//! Errors that abort the conversion of one file.

use std::path::PathBuf;

use thiserror::Error;

use crate::nix::ContainerError;
use crate::odml::DocumentError;

/// A per-file conversion failure.
///
/// Problems local to one property or section never surface here; they are
/// logged and counted while the file is written.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The source document could not be loaded or upgraded.
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// The container could not be opened, written or closed.
    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The input path does not exist or is not a file.
    #[error("No such file: {}", .0.display())]
    NotFound(PathBuf),

    /// The file extension selects no conversion direction.
    #[error("Unknown file format: {}", .0.display())]
    UnknownFormat(PathBuf),

    /// Two nodes of the source tree share an id.
    #[error("Structural integrity error: {0}")]
    Structure(String),

    /// The confirmation policy refused an overwrite or upgrade.
    #[error("{action} of {} was declined", .path.display())]
    Declined { action: &'static str, path: PathBuf },

    /// Container to document export is not available.
    #[error("Export of {} to an odML document is not supported", .0.display())]
    ExportUnsupported(PathBuf),
}

impl ConvertError {
    /// Create a structural integrity error.
    pub fn structure(message: impl Into<String>) -> Self {
        Self::Structure(message.into())
    }

    /// Create a declined-confirmation error.
    pub fn declined(action: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::Declined {
            action,
            path: path.into(),
        }
    }
}
