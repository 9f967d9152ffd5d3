//! Rewriting of measurement metadata into a single-section odML document.

use std::collections::HashMap;

use tracing::debug;

use crate::odml::{DocumentError, XmlNode};
use crate::odml::xml::ROOT_TAG;

/// Namespace of GUI layout elements embedded in measurement metadata.
pub const GUI_NAMESPACE: &str = "http://www.g-node.org/guiml";

/// Type of the section wrapping the measurement's metadata.
pub const WRAPPER_SECTION_TYPE: &str = "new";

/// Build the format-1 document for one recording.
///
/// GUI elements are removed. The result keeps the original `version` and
/// `date` and holds one section named `section_name` containing every
/// original top-level section.
pub fn rewrite_metadata(input: &[u8], section_name: &str) -> Result<Vec<u8>, DocumentError> {
    let mut original = XmlNode::parse(input)?;
    let removed = strip_namespace(&mut original, GUI_NAMESPACE);
    debug!(removed, "stripped GUI elements");

    let mut wrapper = XmlNode::new("section")
        .with_child(XmlNode::text_element("name", section_name))
        .with_child(XmlNode::text_element("type", WRAPPER_SECTION_TYPE));
    wrapper
        .children
        .extend(original.children.iter().filter(|c| c.tag == "section").cloned());

    let mut root = XmlNode::new(ROOT_TAG).with_attribute("version", "1");
    root.push_text_opt("version", original.child_text("version"));
    root.push_text_opt("date", original.child_text("date"));
    root.children.push(wrapper);
    root.to_bytes()
}

/// Remove every element bound to `namespace`, returning how many were removed.
pub fn strip_namespace(root: &mut XmlNode, namespace: &str) -> usize {
    let mut scopes = vec![HashMap::new()];
    strip_in_scope(root, namespace, &mut scopes)
}

fn strip_in_scope(
    node: &mut XmlNode,
    namespace: &str,
    scopes: &mut Vec<HashMap<String, String>>,
) -> usize {
    scopes.push(declared_namespaces(node));
    let mut removed = 0;
    let mut kept = Vec::with_capacity(node.children.len());
    for mut child in std::mem::take(&mut node.children) {
        scopes.push(declared_namespaces(&child));
        let in_namespace = resolve(&child.tag, scopes) == Some(namespace);
        scopes.pop();
        if in_namespace {
            removed += 1;
        } else {
            removed += strip_in_scope(&mut child, namespace, scopes);
            kept.push(child);
        }
    }
    node.children = kept;
    scopes.pop();
    removed
}

fn declared_namespaces(node: &XmlNode) -> HashMap<String, String> {
    node.attributes
        .iter()
        .filter_map(|(key, value)| {
            if key == "xmlns" {
                Some((String::new(), value.clone()))
            } else {
                key.strip_prefix("xmlns:")
                    .map(|prefix| (prefix.to_string(), value.clone()))
            }
        })
        .collect()
}

fn resolve<'a>(tag: &str, scopes: &'a [HashMap<String, String>]) -> Option<&'a str> {
    let prefix = tag.split_once(':').map_or("", |(prefix, _)| prefix);
    scopes
        .iter()
        .rev()
        .find_map(|scope| scope.get(prefix))
        .map(String::as_str)
        .filter(|uri| !uri.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEASUREMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<odML version="1" xmlns:gui="http://www.g-node.org/guiml">
  <version>2</version>
  <date>2015-06-02</date>
  <author>EEG base</author>
  <section>
    <name>Experiment</name>
    <type>experiment</type>
    <gui:layout><gui:x>10</gui:x></gui:layout>
    <property>
      <name>Paradigm</name>
      <value>P300<type>string</type></value>
    </property>
  </section>
  <section>
    <name>Subject</name>
    <type>subject</type>
    <hint xmlns="http://www.g-node.org/guiml">collapsed</hint>
  </section>
</odML>
"#;

    #[test]
    fn test_strip_namespace_handles_prefixes_and_defaults() {
        let mut root = XmlNode::parse(MEASUREMENT.as_bytes()).unwrap();
        assert_eq!(strip_namespace(&mut root, GUI_NAMESPACE), 2);
        let experiment = root.child("section").unwrap();
        assert!(experiment.child("gui:layout").is_none());
        assert!(experiment.child("property").is_some());
    }

    #[test]
    fn test_rewrite_wraps_sections() {
        let bytes = rewrite_metadata(MEASUREMENT.as_bytes(), "rec01.xml").unwrap();
        let root = XmlNode::parse(&bytes).unwrap();

        assert_eq!(root.attribute("version"), Some("1"));
        assert_eq!(root.child_text("version"), Some("2"));
        assert_eq!(root.child_text("date"), Some("2015-06-02"));
        assert!(root.child("author").is_none());

        let sections: Vec<&XmlNode> = root.children_named("section").collect();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].child_text("name"), Some("rec01.xml"));
        assert_eq!(sections[0].child_text("type"), Some(WRAPPER_SECTION_TYPE));
        let inner: Vec<&str> = sections[0]
            .children_named("section")
            .filter_map(|s| s.child_text("name"))
            .collect();
        assert_eq!(inner, ["Experiment", "Subject"]);
        assert!(!String::from_utf8(bytes).unwrap().contains("guiml"));
    }
}
