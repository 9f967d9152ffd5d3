//! odML XML dialect.
//!
//! ## Structure
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <odML version="1.1">
//!   <author>Jane Doe</author>
//!   <date>2019-04-01</date>
//!   <id>0c3c6e2e-8d54-4f3b-9d3a-0d1c3f7e5a10</id>
//!   <section>
//!     <id>...</id>
//!     <name>Subject</name>
//!     <type>subject</type>
//!     <property>
//!       <id>...</id>
//!       <name>age</name>
//!       <value>[34]</value>
//!       <type>int</type>
//!     </property>
//!   </section>
//! </odML>
//! ```
//!
//! Parsing goes through a small generic [`XmlNode`] tree, which the version
//! converter and the measurement pipeline also use to rewrite documents
//! before they are read as odML.

use chrono::NaiveDate;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::model::{Document, Property, Section, Uid, FORMAT_VERSION, check_format_version};
use super::value::{DATE_FORMAT, DType, Value, parse_list, render_list};
use super::{DocumentError, DocumentFormat};

/// Root tag of an odML XML document.
pub const ROOT_TAG: &str = "odML";

// ============================================================================
// GENERIC XML TREE
// ============================================================================

/// A parsed XML element with its attributes, text and children.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XmlNode {
    /// Tag name including any namespace prefix.
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    /// Concatenated, trimmed text content.
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Create a text-only element.
    pub fn text_element(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    /// Set or replace an attribute.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// Non-empty text of the first child with the given tag.
    pub fn child_text(&self, tag: &str) -> Option<&str> {
        self.child(tag)
            .map(|c| c.text.as_str())
            .filter(|t| !t.is_empty())
    }

    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Append a text child only when the value is present.
    pub(crate) fn push_text_opt(&mut self, tag: &str, text: Option<&str>) {
        if let Some(t) = text {
            self.children.push(Self::text_element(tag, t));
        }
    }

    /// Parse a complete XML document and return its root element.
    pub fn parse(input: &[u8]) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    stack.push(Self::from_start(e)?);
                }
                Ok(Event::Empty(ref e)) => {
                    let node = Self::from_start(e)?;
                    Self::attach(&mut stack, &mut root, node)?;
                }
                Ok(Event::End(_)) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| DocumentError::xml("Unbalanced end tag"))?;
                    Self::attach(&mut stack, &mut root, node)?;
                }
                Ok(Event::Text(ref t)) => {
                    let text = t
                        .unescape()
                        .map_err(|e| DocumentError::xml(format!("Text error: {e}")))?;
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&text);
                    }
                }
                Ok(Event::CData(c)) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(DocumentError::xml(format!(
                        "XML parse error at position {}: {e}",
                        reader.error_position()
                    )));
                }
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = stack.last() {
            return Err(DocumentError::xml(format!("Unclosed element <{}>", open.tag)));
        }
        root.ok_or_else(|| DocumentError::missing_element("root"))
    }

    fn from_start(e: &BytesStart<'_>) -> Result<Self, DocumentError> {
        let tag = std::str::from_utf8(e.name().as_ref())
            .map_err(|e| DocumentError::xml(format!("Invalid tag name: {e}")))?
            .to_string();
        let mut node = Self::new(tag);
        for attr_result in e.attributes() {
            let attr =
                attr_result.map_err(|e| DocumentError::xml(format!("Attribute error: {e}")))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| DocumentError::xml(format!("Attribute key error: {e}")))?
                .to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| DocumentError::xml(format!("Attribute value error: {e}")))?
                .to_string();
            node.attributes.push((key, value));
        }
        Ok(node)
    }

    fn attach(
        stack: &mut [XmlNode],
        root: &mut Option<XmlNode>,
        node: XmlNode,
    ) -> Result<(), DocumentError> {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(node);
        } else if root.is_none() {
            *root = Some(node);
        } else {
            return Err(DocumentError::xml("Multiple root elements"));
        }
        Ok(())
    }

    /// Serialize this element as a complete, indented XML document.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        let mut buffer = std::io::Cursor::new(Vec::new());
        let mut writer = Writer::new_with_indent(&mut buffer, b' ', 2);

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| DocumentError::xml(format!("Write error: {e}")))?;
        self.write_into(&mut writer)?;

        let mut output = buffer.into_inner();
        output.push(b'\n');
        Ok(output)
    }

    fn write_into<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<(), DocumentError> {
        let mut start = BytesStart::new(self.tag.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.text.is_empty() && self.children.is_empty() {
            return writer
                .write_event(Event::Empty(start))
                .map_err(|e| DocumentError::xml(format!("Write error: {e}")));
        }

        writer
            .write_event(Event::Start(start))
            .map_err(|e| DocumentError::xml(format!("Write error: {e}")))?;
        if !self.text.is_empty() {
            writer
                .write_event(Event::Text(BytesText::new(&self.text)))
                .map_err(|e| DocumentError::xml(format!("Write error: {e}")))?;
        }
        for child in &self.children {
            child.write_into(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.tag.as_str())))
            .map_err(|e| DocumentError::xml(format!("Write error: {e}")))?;
        Ok(())
    }
}

// ============================================================================
// ODML XML FORMAT
// ============================================================================

/// odML XML format handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct OdmlXml;

impl DocumentFormat for OdmlXml {
    fn name(&self) -> &'static str {
        "odML XML"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["xml", "odml"]
    }

    fn read(&self, input: &[u8]) -> Result<Document, DocumentError> {
        let root = XmlNode::parse(input)?;
        read_document(&root)
    }

    fn write(&self, document: &Document) -> Result<Vec<u8>, DocumentError> {
        write_document(document).to_bytes()
    }

    fn supports_upgrade(&self) -> bool {
        true
    }

    fn validate(&self, input: &[u8]) -> Result<(), DocumentError> {
        let content = std::str::from_utf8(input)
            .map_err(|e| DocumentError::xml(format!("Invalid UTF-8: {e}")))?;
        if !content.contains("<odML") {
            return Err(DocumentError::xml("Missing odML root element"));
        }
        Ok(())
    }
}

fn read_document(root: &XmlNode) -> Result<Document, DocumentError> {
    if root.tag != ROOT_TAG {
        return Err(DocumentError::invalid_element(format!(
            "expected <{ROOT_TAG}> root, found <{}>",
            root.tag
        )));
    }
    let version = root.attribute("version").ok_or(DocumentError::Missing {
        kind: "attribute",
        name: "version".to_string(),
    })?;
    check_format_version(version)?;

    let date = root
        .child_text("date")
        .map(|d| {
            NaiveDate::parse_from_str(d.trim(), DATE_FORMAT)
                .map_err(|e| DocumentError::invalid_value(format!("document date '{d}': {e}")))
        })
        .transpose()?;

    Ok(Document {
        id: read_id(root),
        author: root.child_text("author").map(str::to_string),
        date,
        version: root.child_text("version").map(str::to_string),
        repository: root.child_text("repository").map(str::to_string),
        sections: root
            .children_named("section")
            .map(read_section)
            .collect::<Result<_, _>>()?,
    })
}

fn read_id(node: &XmlNode) -> Uid {
    node.child_text("id")
        .map(|id| Uid::from(id.trim()))
        .unwrap_or_else(Uid::generate)
}

fn read_section(node: &XmlNode) -> Result<Section, DocumentError> {
    let name = node
        .child_text("name")
        .ok_or_else(|| DocumentError::missing_element("section name"))?;

    Ok(Section {
        id: read_id(node),
        name: name.to_string(),
        section_type: node.child_text("type").unwrap_or("n.s.").to_string(),
        definition: node.child_text("definition").map(str::to_string),
        reference: node.child_text("reference").map(str::to_string),
        repository: node.child_text("repository").map(str::to_string),
        properties: node
            .children_named("property")
            .map(read_property)
            .collect::<Result<_, _>>()?,
        sections: node
            .children_named("section")
            .map(read_section)
            .collect::<Result<_, _>>()?,
    })
}

fn read_property(node: &XmlNode) -> Result<Property, DocumentError> {
    let name = node
        .child_text("name")
        .ok_or_else(|| DocumentError::missing_element("property name"))?;
    let dtype = DType::parse(node.child_text("type").unwrap_or("string"));
    let values = node
        .child_text("value")
        .map(parse_list)
        .unwrap_or_default()
        .into_iter()
        .map(|item| item.map(|text| Value::parse(&text, &dtype)))
        .collect();
    let text = |tag: &str| node.child_text(tag).map(str::to_string);

    Ok(Property {
        id: read_id(node),
        name: name.to_string(),
        values,
        unit: text("unit"),
        definition: text("definition"),
        uncertainty: text("uncertainty"),
        reference: text("reference"),
        value_origin: text("value_origin"),
        dependency: text("dependency"),
        dependency_value: text("dependencyvalue"),
        dtype,
    })
}

fn write_document(document: &Document) -> XmlNode {
    let mut root = XmlNode::new(ROOT_TAG).with_attribute("version", FORMAT_VERSION);
    root.push_text_opt("author", document.author.as_deref());
    let date = document.date.map(|d| d.format(DATE_FORMAT).to_string());
    root.push_text_opt("date", date.as_deref());
    root.push_text_opt("version", document.version.as_deref());
    root.push_text_opt("repository", document.repository.as_deref());
    root.push_text_opt("id", Some(document.id.as_str()));
    root.children
        .extend(document.sections.iter().map(write_section));
    root
}

fn write_section(section: &Section) -> XmlNode {
    let mut node = XmlNode::new("section");
    node.push_text_opt("id", Some(section.id.as_str()));
    node.push_text_opt("name", Some(&section.name));
    node.push_text_opt("type", Some(&section.section_type));
    node.push_text_opt("definition", section.definition.as_deref());
    node.push_text_opt("reference", section.reference.as_deref());
    node.push_text_opt("repository", section.repository.as_deref());
    node.children
        .extend(section.properties.iter().map(write_property));
    node.children.extend(section.sections.iter().map(write_section));
    node
}

fn write_property(property: &Property) -> XmlNode {
    let mut node = XmlNode::new("property");
    node.push_text_opt("id", Some(property.id.as_str()));
    node.push_text_opt("name", Some(&property.name));
    node.push_text_opt("value", Some(&render_list(&property.values)));
    node.push_text_opt("type", Some(&property.dtype.to_string()));
    node.push_text_opt("unit", property.unit.as_deref());
    node.push_text_opt("uncertainty", property.uncertainty.as_deref());
    node.push_text_opt("reference", property.reference.as_deref());
    node.push_text_opt("definition", property.definition.as_deref());
    node.push_text_opt("dependency", property.dependency.as_deref());
    node.push_text_opt("dependencyvalue", property.dependency_value.as_deref());
    node.push_text_opt("value_origin", property.value_origin.as_deref());
    node
}
