//! odML JSON dialect.

use super::dict::RawFile;
use super::model::Document;
use super::{DocumentError, DocumentFormat};

/// odML JSON format handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct OdmlJson;

impl DocumentFormat for OdmlJson {
    fn name(&self) -> &'static str {
        "odML JSON"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["json"]
    }

    fn read(&self, input: &[u8]) -> Result<Document, DocumentError> {
        let raw: RawFile = serde_json::from_slice(input)
            .map_err(|e| DocumentError::json(format!("JSON parse error: {e}")))?;
        raw.into_document()
    }

    fn write(&self, document: &Document) -> Result<Vec<u8>, DocumentError> {
        serde_json::to_vec_pretty(&RawFile::from_document(document))
            .map_err(|e| DocumentError::json(format!("JSON write error: {e}")))
    }

    fn validate(&self, input: &[u8]) -> Result<(), DocumentError> {
        match input.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => Ok(()),
            _ => Err(DocumentError::json("Expected a JSON object")),
        }
    }
}
