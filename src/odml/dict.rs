//! Shared serde layout of the YAML and JSON odML dialects.
//!
//! ```yaml
//! odml-version: '1.1'
//! Document:
//!   id: 0c3c6e2e-...
//!   author: Jane Doe
//!   sections:
//!   - name: Subject
//!     type: subject
//!     properties:
//!     - name: age
//!       type: int
//!       value: [34]
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::DocumentError;
use super::model::{Document, FORMAT_VERSION, Property, Section, Uid, check_format_version};
use super::value::{DATE_FORMAT, DType, Value};

/// A scalar as it appears in YAML/JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub(super) enum RawScalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawScalar {
    fn to_text(&self) -> String {
        match self {
            Self::Bool(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Text(v) => v.clone(),
        }
    }

    fn into_value(self, dtype: &DType) -> Value {
        match (self, dtype) {
            (Self::Text(text), dtype) => Value::parse(&text, dtype),
            (scalar, dtype) if dtype.is_textual() || dtype.is_temporal() => {
                Value::parse(&scalar.to_text(), dtype)
            }
            (Self::Int(v), DType::Float) => Value::Float(v as f64),
            (Self::Int(v), _) => Value::Int(v),
            (Self::Float(v), _) => Value::Float(v),
            (Self::Bool(v), _) => Value::Bool(v),
        }
    }

    fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s.clone()),
            Value::Int(v) => Self::Int(*v),
            Value::Float(v) => Self::Float(*v),
            Value::Bool(v) => Self::Bool(*v),
            other => Self::Text(other.to_text()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct RawFile {
    #[serde(rename = "odml-version")]
    odml_version: RawScalar,
    #[serde(rename = "Document")]
    document: RawDocument,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<RawScalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repository: Option<String>,
    #[serde(default)]
    sections: Vec<RawSection>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    section_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repository: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    properties: Vec<RawProperty>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    sections: Vec<RawSection>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    dtype: Option<String>,
    #[serde(default)]
    value: Vec<Option<RawScalar>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uncertainty: Option<RawScalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dependency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dependency_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value_origin: Option<String>,
}

fn uid_or_generate(id: Option<String>) -> Uid {
    id.map(Uid::from).unwrap_or_else(Uid::generate)
}

impl RawFile {
    pub(super) fn into_document(self) -> Result<Document, DocumentError> {
        check_format_version(&self.odml_version.to_text())?;
        let raw = self.document;
        let date = raw
            .date
            .map(|d| {
                NaiveDate::parse_from_str(d.trim(), DATE_FORMAT).map_err(|e| {
                    DocumentError::invalid_value(format!("document date '{d}': {e}"))
                })
            })
            .transpose()?;

        Ok(Document {
            id: uid_or_generate(raw.id),
            author: raw.author,
            date,
            version: raw.version.map(|v| v.to_text()),
            repository: raw.repository,
            sections: raw.sections.into_iter().map(RawSection::into_section).collect(),
        })
    }

    pub(super) fn from_document(document: &Document) -> Self {
        Self {
            odml_version: RawScalar::Text(FORMAT_VERSION.to_string()),
            document: RawDocument {
                id: Some(document.id.to_string()),
                author: document.author.clone(),
                date: document.date.map(|d| d.format(DATE_FORMAT).to_string()),
                version: document.version.clone().map(RawScalar::Text),
                repository: document.repository.clone(),
                sections: document.sections.iter().map(RawSection::from_section).collect(),
            },
        }
    }
}

impl RawSection {
    fn into_section(self) -> Section {
        Section {
            id: uid_or_generate(self.id),
            name: self.name,
            section_type: self.section_type.unwrap_or_else(|| "n.s.".to_string()),
            definition: self.definition,
            reference: self.reference,
            repository: self.repository,
            properties: self.properties.into_iter().map(RawProperty::into_property).collect(),
            sections: self.sections.into_iter().map(RawSection::into_section).collect(),
        }
    }

    fn from_section(section: &Section) -> Self {
        Self {
            id: Some(section.id.to_string()),
            name: section.name.clone(),
            section_type: Some(section.section_type.clone()),
            definition: section.definition.clone(),
            reference: section.reference.clone(),
            repository: section.repository.clone(),
            properties: section.properties.iter().map(RawProperty::from_property).collect(),
            sections: section.sections.iter().map(RawSection::from_section).collect(),
        }
    }
}

impl RawProperty {
    fn into_property(self) -> Property {
        let dtype = DType::parse(self.dtype.as_deref().unwrap_or("string"));
        let values = self
            .value
            .into_iter()
            .map(|item| item.map(|scalar| scalar.into_value(&dtype)))
            .collect();
        Property {
            id: uid_or_generate(self.id),
            name: self.name,
            values,
            unit: self.unit,
            definition: self.definition,
            uncertainty: self.uncertainty.map(|u| u.to_text()),
            reference: self.reference,
            value_origin: self.value_origin,
            dependency: self.dependency,
            dependency_value: self.dependency_value,
            dtype,
        }
    }

    fn from_property(property: &Property) -> Self {
        Self {
            id: Some(property.id.to_string()),
            name: property.name.clone(),
            dtype: Some(property.dtype.to_string()),
            value: property
                .values
                .iter()
                .map(|v| v.as_ref().map(RawScalar::from_value))
                .collect(),
            unit: property.unit.clone(),
            uncertainty: property.uncertainty.clone().map(RawScalar::Text),
            reference: property.reference.clone(),
            definition: property.definition.clone(),
            dependency: property.dependency.clone(),
            dependency_value: property.dependency_value.clone(),
            value_origin: property.value_origin.clone(),
        }
    }
}
