//! Upgrade of format-1 odML XML documents to the current format.
//!
//! Format 1 stores every value in its own `<value>` element, with the
//! type, unit and uncertainty nested inside it:
//!
//! ```xml
//! <property>
//!   <name>gain</name>
//!   <value>2<type>float</type><unit>dB</unit></value>
//!   <value>4<type>float</type><unit>dB</unit></value>
//!   <dependency_value>x</dependency_value>
//! </property>
//! ```
//!
//! The current format keeps a single list literal and lifts the per-value
//! attributes onto the property.

use tracing::debug;

use super::DocumentError;
use super::model::{FORMAT_VERSION, OUTDATED_FORMAT_VERSIONS};
use super::value::{Value, render_list};
use super::xml::{ROOT_TAG, XmlNode};

const DOCUMENT_TAGS: &[&str] = &["author", "date", "version", "repository", "id", "section"];

const SECTION_TAGS: &[&str] = &[
    "id",
    "name",
    "type",
    "definition",
    "reference",
    "repository",
    "property",
    "section",
];

const PROPERTY_TAGS: &[&str] = &[
    "id",
    "name",
    "definition",
    "dependency",
    "dependencyvalue",
    "type",
    "unit",
    "uncertainty",
    "reference",
    "value_origin",
];

/// Attributes that format 1 nests inside each `<value>`.
const LIFTED_VALUE_TAGS: &[&str] = &["type", "unit", "uncertainty", "reference", "definition"];

/// Converts outdated odML XML documents to the current format version.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionConverter;

impl VersionConverter {
    pub fn new() -> Self {
        Self
    }

    /// Upgrade `input` and return the current-format XML text.
    ///
    /// Input that already declares the current version is re-serialized
    /// unchanged.
    pub fn convert(&self, input: &[u8]) -> Result<String, DocumentError> {
        let mut root = XmlNode::parse(input)?;
        if root.tag != ROOT_TAG {
            return Err(DocumentError::invalid_element(format!(
                "expected <{ROOT_TAG}> root, found <{}>",
                root.tag
            )));
        }

        let found = root.attribute("version").unwrap_or("1").trim().to_string();
        if found != FORMAT_VERSION {
            if !OUTDATED_FORMAT_VERSIONS.contains(&found.as_str()) {
                return Err(DocumentError::UnsupportedVersion(found));
            }
            debug!(from = %found, to = FORMAT_VERSION, "upgrading odML document");
            root = upgrade_document(root);
        }

        let bytes = root.to_bytes()?;
        String::from_utf8(bytes).map_err(|e| DocumentError::xml(format!("Invalid UTF-8: {e}")))
    }
}

fn upgrade_document(root: XmlNode) -> XmlNode {
    let mut upgraded = XmlNode::new(ROOT_TAG).with_attribute("version", FORMAT_VERSION);
    for child in root.children {
        match child.tag.as_str() {
            "section" => upgraded.children.push(upgrade_section(child)),
            tag if DOCUMENT_TAGS.contains(&tag) => upgraded.children.push(child),
            tag => debug!(tag, "dropping unknown document element"),
        }
    }
    upgraded
}

fn upgrade_section(section: XmlNode) -> XmlNode {
    let mut upgraded = XmlNode::new("section");
    for child in section.children {
        match child.tag.as_str() {
            "section" => upgraded.children.push(upgrade_section(child)),
            "property" => upgraded.children.push(upgrade_property(child)),
            tag if SECTION_TAGS.contains(&tag) => upgraded.children.push(child),
            tag => debug!(tag, "dropping unknown section element"),
        }
    }
    upgraded
}

fn upgrade_property(property: XmlNode) -> XmlNode {
    let mut upgraded = XmlNode::new("property");
    let mut values: Vec<Option<Value>> = Vec::new();
    let mut lifted: Vec<XmlNode> = Vec::new();

    for child in property.children {
        match child.tag.as_str() {
            "value" => {
                if values.is_empty() {
                    lifted.extend(
                        child
                            .children
                            .iter()
                            .filter(|c| LIFTED_VALUE_TAGS.contains(&c.tag.as_str()))
                            .cloned(),
                    );
                }
                values.push(if child.text.is_empty() {
                    None
                } else {
                    Some(Value::String(child.text))
                });
            }
            "dependency_value" => {
                upgraded
                    .children
                    .push(XmlNode::text_element("dependencyvalue", child.text));
            }
            tag if PROPERTY_TAGS.contains(&tag) => upgraded.children.push(child),
            tag => debug!(tag, "dropping unknown property element"),
        }
    }

    for attr in lifted {
        if upgraded.child(&attr.tag).is_none() {
            upgraded.children.push(attr);
        }
    }
    upgraded
        .children
        .push(XmlNode::text_element("value", render_list(&values)));
    upgraded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odml::value::DType;
    use crate::odml::{DocumentFormat, OdmlXml};

    const LEGACY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<odML version="1">
  <author>Jane Doe</author>
  <section>
    <name>Amplifier</name>
    <type>hardware</type>
    <property>
      <name>gain</name>
      <value>2<type>float</type><unit>dB</unit><filename>x.bin</filename></value>
      <value>4<type>float</type><unit>dB</unit></value>
      <dependency_value>left</dependency_value>
    </property>
    <property>
      <name>label</name>
      <value>a, b<type>string</type></value>
    </property>
    <property>
      <name>note</name>
      <value>it's "fine", really<type>string</type></value>
      <value>'kept'<type>string</type></value>
    </property>
  </section>
</odML>
"#;

    #[test]
    fn test_upgrade_merges_values_and_lifts_attributes() {
        let upgraded = VersionConverter::new()
            .convert(LEGACY.as_bytes())
            .expect("Should upgrade");
        let doc = OdmlXml.read(upgraded.as_bytes()).expect("Should read upgraded");

        let gain = &doc.sections[0].properties[0];
        assert_eq!(gain.dtype, DType::Float);
        assert_eq!(gain.unit.as_deref(), Some("dB"));
        assert_eq!(gain.dependency_value.as_deref(), Some("left"));
        assert_eq!(gain.values, vec![Some(Value::Float(2.0)), Some(Value::Float(4.0))]);

        let label = &doc.sections[0].properties[1];
        assert_eq!(label.values, vec![Some(Value::from("a, b"))]);
    }

    #[test]
    fn test_upgrade_keeps_quoted_text_intact() {
        let upgraded = VersionConverter::new().convert(LEGACY.as_bytes()).unwrap();
        let doc = OdmlXml.read(upgraded.as_bytes()).unwrap();

        let note = &doc.sections[0].properties[2];
        assert_eq!(
            note.values,
            vec![
                Some(Value::from(r#"it's "fine", really"#)),
                Some(Value::from("'kept'"))
            ]
        );
    }

    #[test]
    fn test_current_version_passes_through() {
        let current = LEGACY.replace(r#"version="1""#, r#"version="1.1""#);
        let converted = VersionConverter::new().convert(current.as_bytes()).unwrap();
        assert!(converted.contains("<dependency_value>"));
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let future = LEGACY.replace(r#"version="1""#, r#"version="3""#);
        assert!(matches!(
            VersionConverter::new().convert(future.as_bytes()),
            Err(DocumentError::UnsupportedVersion(_))
        ));
    }
}
