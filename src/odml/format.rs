//! Common trait for odML on-disk dialects.

use super::DocumentError;
use super::model::Document;

/// Trait for odML document formats.
///
/// Implementations translate between the in-memory [`Document`] tree and
/// one on-disk dialect (XML, YAML, JSON). Reading checks the declared
/// format version and reports [`DocumentError::OutdatedVersion`] for
/// documents that need an upgrade first.
pub trait DocumentFormat: Send + Sync {
    /// Human-readable name of the format.
    fn name(&self) -> &'static str;

    /// File extension(s) for this format.
    fn extensions(&self) -> &'static [&'static str];

    /// Read a document from bytes.
    fn read(&self, input: &[u8]) -> Result<Document, DocumentError>;

    /// Write a document to bytes.
    fn write(&self, document: &Document) -> Result<Vec<u8>, DocumentError>;

    /// Whether the version converter can upgrade outdated input of this format.
    fn supports_upgrade(&self) -> bool {
        false
    }

    /// Validate that the input is well-formed for this format.
    ///
    /// This is a quick check that doesn't fully parse the content.
    fn validate(&self, input: &[u8]) -> Result<(), DocumentError> {
        let _ = input;
        Ok(())
    }
}
