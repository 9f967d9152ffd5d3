//! In-memory odML document tree.
//!
//! A [`Document`] owns its [`Section`]s, which own their [`Property`]
//! leaves and child sections. Ownership is strictly tree-shaped; the only
//! way two nodes can alias is by sharing an id, which
//! [`Document::find_aliased_id`] detects.
//!
//! ```text
//! Document
//! ├── author / date / version / repository
//! └── sections: Vec<Section>
//!     ├── properties: Vec<Property>   (values: Vec<Option<Value>>)
//!     └── sections: Vec<Section>
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use rustc_hash::FxHashSet;

use super::DocumentError;
use super::value::{DType, Value};

/// Format version written and accepted without upgrade.
pub const FORMAT_VERSION: &str = "1.1";

/// Format versions that load after running the version converter.
pub const OUTDATED_FORMAT_VERSIONS: &[&str] = &["1", "1.0"];

/// Check a declared format version against [`FORMAT_VERSION`].
pub fn check_format_version(found: &str) -> Result<(), DocumentError> {
    let found = found.trim();
    if found == FORMAT_VERSION {
        Ok(())
    } else if OUTDATED_FORMAT_VERSIONS.contains(&found) {
        Err(DocumentError::OutdatedVersion {
            found: found.to_string(),
            current: FORMAT_VERSION,
        })
    } else {
        Err(DocumentError::UnsupportedVersion(found.to_string()))
    }
}

// ============================================================================
// IDs
// ============================================================================

/// Unique identifier of a document, section or property.
///
/// Ids travel unchanged from the document into the container.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Uid(pub Arc<str>);

impl Uid {
    /// Create an id from an existing string.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh UUID v4 id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string().into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Uid {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Uid {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// PROPERTY
// ============================================================================

/// A named leaf holding an ordered sequence of values.
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    pub id: Uid,
    pub name: String,
    /// Declared data type.
    pub dtype: DType,
    /// Raw values in document order; `None` is a missing value.
    pub values: Vec<Option<Value>>,
    pub unit: Option<String>,
    pub definition: Option<String>,
    pub uncertainty: Option<String>,
    pub reference: Option<String>,
    pub value_origin: Option<String>,
    pub dependency: Option<String>,
    pub dependency_value: Option<String>,
}

impl Property {
    /// Create an empty property with a generated id.
    pub fn new(name: impl Into<String>, dtype: DType) -> Self {
        Self {
            id: Uid::generate(),
            name: name.into(),
            dtype,
            values: Vec::new(),
            unit: None,
            definition: None,
            uncertainty: None,
            reference: None,
            value_origin: None,
            dependency: None,
            dependency_value: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<Uid>) -> Self {
        self.id = id.into();
        self
    }

    /// Append a present value.
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.values.push(Some(value.into()));
        self
    }

    /// Replace all values.
    pub fn with_values(mut self, values: Vec<Option<Value>>) -> Self {
        self.values = values;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }
}

// ============================================================================
// SECTION
// ============================================================================

/// A named tree node owning properties and child sections.
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    pub id: Uid,
    pub name: String,
    /// The section type tag, e.g. `subject` or `recording`.
    pub section_type: String,
    pub definition: Option<String>,
    pub reference: Option<String>,
    pub repository: Option<String>,
    pub properties: Vec<Property>,
    pub sections: Vec<Section>,
}

impl Section {
    /// Create an empty section with a generated id.
    pub fn new(name: impl Into<String>, section_type: impl Into<String>) -> Self {
        Self {
            id: Uid::generate(),
            name: name.into(),
            section_type: section_type.into(),
            definition: None,
            reference: None,
            repository: None,
            properties: Vec::new(),
            sections: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<Uid>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }
}

// ============================================================================
// DOCUMENT
// ============================================================================

/// Root of an odML metadata tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: Uid,
    pub author: Option<String>,
    pub date: Option<NaiveDate>,
    /// The document's own version (not the file format version).
    pub version: Option<String>,
    pub repository: Option<String>,
    pub sections: Vec<Section>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with a generated id.
    pub fn new() -> Self {
        Self {
            id: Uid::generate(),
            author: None,
            date: None,
            version: None,
            repository: None,
            sections: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<Uid>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Visit every section depth-first, parents before children.
    pub fn walk_sections<'a>(&'a self, mut visit: impl FnMut(&'a Section)) {
        fn recurse<'a>(sections: &'a [Section], visit: &mut impl FnMut(&'a Section)) {
            for section in sections {
                visit(section);
                recurse(&section.sections, visit);
            }
        }
        recurse(&self.sections, &mut visit);
    }

    /// Total number of sections in the tree.
    pub fn section_count(&self) -> usize {
        let mut count = 0;
        self.walk_sections(|_| count += 1);
        count
    }

    /// Total number of properties in the tree.
    pub fn property_count(&self) -> usize {
        let mut count = 0;
        self.walk_sections(|s| count += s.properties.len());
        count
    }

    /// Return the first id that occurs on more than one node, if any.
    pub fn find_aliased_id(&self) -> Option<Uid> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        seen.insert(self.id.as_str());
        let mut aliased = None;
        self.walk_sections(|section| {
            if aliased.is_some() {
                return;
            }
            let ids = std::iter::once(&section.id).chain(section.properties.iter().map(|p| &p.id));
            for id in ids {
                if !seen.insert(id.as_str()) {
                    aliased = Some(id.clone());
                    return;
                }
            }
        });
        aliased
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document::new().with_id("doc").with_section(
            Section::new("Subject", "subject")
                .with_id("s1")
                .with_property(Property::new("age", DType::Int).with_id("p1").with_value(34))
                .with_section(Section::new("Hand", "anatomy").with_id("s2")),
        )
    }

    #[test]
    fn test_uid_generation() {
        assert_ne!(Uid::generate(), Uid::generate());
    }

    #[test]
    fn test_counts() {
        let doc = sample();
        assert_eq!(doc.section_count(), 2);
        assert_eq!(doc.property_count(), 1);
    }

    #[test]
    fn test_walk_order_is_preorder() {
        let mut names = Vec::new();
        sample().walk_sections(|s| names.push(s.name.clone()));
        assert_eq!(names, vec!["Subject", "Hand"]);
    }

    #[test]
    fn test_find_aliased_id() {
        assert_eq!(sample().find_aliased_id(), None);

        let mut doc = sample();
        doc.sections[0].sections[0].id = Uid::from("p1");
        assert_eq!(doc.find_aliased_id(), Some(Uid::from("p1")));
    }

    #[test]
    fn test_check_format_version() {
        assert!(check_format_version("1.1").is_ok());
        assert!(check_format_version("1").unwrap_err().is_outdated_version());
        assert!(matches!(
            check_format_version("2.0"),
            Err(DocumentError::UnsupportedVersion(_))
        ));
    }
}
