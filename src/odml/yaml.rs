//! odML YAML dialect.

use super::dict::RawFile;
use super::model::Document;
use super::{DocumentError, DocumentFormat};

/// odML YAML format handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct OdmlYaml;

impl DocumentFormat for OdmlYaml {
    fn name(&self) -> &'static str {
        "odML YAML"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["yaml", "yml"]
    }

    fn read(&self, input: &[u8]) -> Result<Document, DocumentError> {
        let raw: RawFile = serde_yaml::from_slice(input)
            .map_err(|e| DocumentError::yaml(format!("YAML parse error: {e}")))?;
        raw.into_document()
    }

    fn write(&self, document: &Document) -> Result<Vec<u8>, DocumentError> {
        let text = serde_yaml::to_string(&RawFile::from_document(document))
            .map_err(|e| DocumentError::yaml(format!("YAML write error: {e}")))?;
        Ok(text.into_bytes())
    }

    fn validate(&self, input: &[u8]) -> Result<(), DocumentError> {
        let content = std::str::from_utf8(input)
            .map_err(|e| DocumentError::yaml(format!("Invalid UTF-8: {e}")))?;

        if content.trim().is_empty() {
            return Err(DocumentError::yaml("Empty YAML content"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odml::value::Value;

    const SAMPLE: &str = r#"
odml-version: 1.1
Document:
  id: doc-1
  author: Jane Doe
  date: '2019-04-01'
  sections:
  - id: sec-1
    name: Subject
    type: subject
    properties:
    - id: prop-1
      name: age
      type: int
      value: [34]
    - name: signal_notes
      type: string
      value: [null, null]
"#;

    #[test]
    fn test_read_yaml_document() {
        let doc = OdmlYaml.read(SAMPLE.as_bytes()).expect("Should read YAML");
        assert_eq!(doc.id.as_str(), "doc-1");
        let subject = &doc.sections[0];
        assert_eq!(subject.properties[0].values, vec![Some(Value::Int(34))]);
        assert_eq!(subject.properties[1].values, vec![None, None]);
    }

    #[test]
    fn test_yaml_write_then_read() {
        let doc = OdmlYaml.read(SAMPLE.as_bytes()).unwrap();
        let bytes = OdmlYaml.write(&doc).expect("Should write YAML");
        assert_eq!(OdmlYaml.read(&bytes).unwrap(), doc);
    }

    #[test]
    fn test_yaml_outdated_version() {
        let old = SAMPLE.replace("odml-version: 1.1", "odml-version: 1");
        assert!(OdmlYaml.read(old.as_bytes()).unwrap_err().is_outdated_version());
    }
}
