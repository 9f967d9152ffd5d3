//! odML metadata documents.
//!
//! This module provides the editable attribute/value tree and its on-disk
//! dialects:
//!
//! - **XML** - the canonical odML serialization (`.xml`, `.odml`)
//! - **YAML** - same tree as a YAML mapping (`.yaml`, `.yml`)
//! - **JSON** - same tree as a JSON object (`.json`)
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │   XML file   │     │  YAML file   │     │  JSON file   │
//! └──────┬───────┘     └──────┬───────┘     └──────┬───────┘
//!        │                    │                    │
//!        ▼                    ▼                    ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                 DocumentFormat trait                      │
//! │  - read(&[u8]) -> Result<Document>                       │
//! │  - write(&Document) -> Result<Vec<u8>>                   │
//! └──────────────────────────────────────────────────────────┘
//!        │
//!        ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                       Document                            │
//! │  - sections: Vec<Section> (properties + child sections)  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Outdated XML documents are upgraded with [`VersionConverter`] before
//! they are read.

mod dict;
mod error;
mod format;
mod json;
pub mod model;
pub mod value;
pub mod version;
pub mod xml;
mod yaml;

use std::path::Path;

pub use error::DocumentError;
pub use format::DocumentFormat;
pub use json::OdmlJson;
pub use model::{Document, FORMAT_VERSION, Property, Section, Uid};
pub use value::{DType, Value};
pub use version::VersionConverter;
pub use xml::{OdmlXml, XmlNode};
pub use yaml::OdmlYaml;

fn formats() -> [Box<dyn DocumentFormat>; 3] {
    [Box::new(OdmlXml), Box::new(OdmlYaml), Box::new(OdmlJson)]
}

/// Supported document file extensions.
pub fn supported_extensions() -> Vec<&'static str> {
    formats()
        .iter()
        .flat_map(|format| format.extensions().iter().copied())
        .collect()
}

/// Detect the document format from a file extension.
pub fn detect_format(path: &Path) -> Option<Box<dyn DocumentFormat>> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    formats()
        .into_iter()
        .find(|format| format.extensions().contains(&ext.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_detect_format_by_extension() {
        let name = |p: &str| detect_format(&PathBuf::from(p)).map(|f| f.name());
        assert_eq!(name("session.xml"), Some("odML XML"));
        assert_eq!(name("session.ODML"), Some("odML XML"));
        assert_eq!(name("session.yml"), Some("odML YAML"));
        assert_eq!(name("session.json"), Some("odML JSON"));
        assert_eq!(name("session.nix"), None);
        assert_eq!(name("session"), None);
    }
}
