//! Errors of the measurement-folder pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::convert::ConvertError;
use crate::odml::DocumentError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The measurement archive could not be extracted.
    #[error("Archive error: {0}")]
    Archive(String),

    #[error("metadata.xml not found in {}", .0.display())]
    MetadataMissing(PathBuf),

    #[error("No .vhdr recordings with .eeg and .vmrk files found in {}", .0.display())]
    NoRecordings(PathBuf),

    /// The measurement metadata could not be rewritten.
    #[error("Metadata error: {0}")]
    Metadata(#[from] DocumentError),

    /// The external signal converter did not produce a container.
    #[error("Signal conversion of {} failed: {message}", .header.display())]
    SignalConversion { header: PathBuf, message: String },

    /// The metadata could not be appended to the signal container.
    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),
}

impl PipelineError {
    /// Create an archive error.
    pub fn archive(message: impl Into<String>) -> Self {
        Self::Archive(message.into())
    }

    /// Create a signal conversion error.
    pub fn signal(header: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::SignalConversion {
            header: header.into(),
            message: message.into(),
        }
    }
}
