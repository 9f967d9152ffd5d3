//! Container file handle and its section/property tree.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::archive::{self, ArchiveContents, Manifest};
use super::types::{DataType, NixValue, OdmlType, TextEncoding};
use super::ContainerError;

/// How a container file is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileMode {
    /// Existing file, never written back.
    ReadOnly,
    /// Existing content is kept; a missing file starts empty.
    ReadWrite,
    /// Always starts empty; existing content is replaced on close.
    Overwrite,
}

// ============================================================================
// PROPERTY
// ============================================================================

/// A container leaf holding homogeneous values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NixProperty {
    pub id: String,
    pub name: String,
    pub data_type: DataType,
    values: Vec<NixValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    odml_type: Option<OdmlType>,
    #[serde(skip)]
    encoding: TextEncoding,
}

impl NixProperty {
    fn new(id: String, name: String, data_type: DataType, encoding: TextEncoding) -> Self {
        Self {
            id,
            name,
            data_type,
            values: Vec::new(),
            unit: None,
            definition: None,
            uncertainty: None,
            reference: None,
            value_origin: None,
            dependency: None,
            dependency_value: None,
            odml_type: None,
            encoding,
        }
    }

    pub fn values(&self) -> &[NixValue] {
        &self.values
    }

    /// Replace the stored values.
    ///
    /// Fails with [`ContainerError::Encoding`] when a string value cannot be
    /// represented; the stored values are left untouched in that case.
    pub fn set_values(&mut self, values: Vec<NixValue>) -> Result<(), ContainerError> {
        for text in values.iter().filter_map(NixValue::as_str) {
            self.encoding.check("property values", text)?;
        }
        self.values = values;
        Ok(())
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn set_unit(&mut self, unit: Option<String>) -> Result<(), ContainerError> {
        if let Some(text) = unit.as_deref() {
            self.encoding.check("unit", text)?;
        }
        self.unit = unit;
        Ok(())
    }

    pub fn odml_type(&self) -> Option<OdmlType> {
        self.odml_type
    }

    /// Tag the property with its declared odML type.
    pub fn set_odml_type(&mut self, type_name: &str) -> Result<(), ContainerError> {
        self.odml_type = Some(OdmlType::from_name(type_name)?);
        Ok(())
    }
}

// ============================================================================
// SECTION
// ============================================================================

/// A container section holding properties and child sections.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NixSection {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub section_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default)]
    pub properties: Vec<NixProperty>,
    #[serde(default)]
    pub sections: Vec<NixSection>,
    #[serde(skip)]
    encoding: TextEncoding,
}

impl NixSection {
    fn new(id: String, name: String, section_type: String, encoding: TextEncoding) -> Self {
        Self {
            id,
            name,
            section_type,
            definition: None,
            reference: None,
            repository: None,
            properties: Vec::new(),
            sections: Vec::new(),
            encoding,
        }
    }

    /// Create a child section. Sibling names must be unique.
    pub fn create_section(
        &mut self,
        name: &str,
        section_type: &str,
        id: &str,
    ) -> Result<&mut NixSection, ContainerError> {
        push_section(&mut self.sections, name, section_type, id, self.encoding)
    }

    /// Create an empty property. Sibling names must be unique.
    pub fn create_property(
        &mut self,
        name: &str,
        data_type: DataType,
        id: &str,
    ) -> Result<&mut NixProperty, ContainerError> {
        if self.property(name).is_some() {
            return Err(ContainerError::DuplicateName {
                kind: "property",
                name: name.to_string(),
            });
        }
        self.properties.push(NixProperty::new(
            id.to_string(),
            name.to_string(),
            data_type,
            self.encoding,
        ));
        let created = self.properties.len() - 1;
        Ok(&mut self.properties[created])
    }

    pub fn section(&self, name: &str) -> Option<&NixSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn property(&self, name: &str) -> Option<&NixProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    fn apply_encoding(&mut self, encoding: TextEncoding) {
        self.encoding = encoding;
        for property in &mut self.properties {
            property.encoding = encoding;
        }
        for child in &mut self.sections {
            child.apply_encoding(encoding);
        }
    }
}

fn push_section<'a>(
    siblings: &'a mut Vec<NixSection>,
    name: &str,
    section_type: &str,
    id: &str,
    encoding: TextEncoding,
) -> Result<&'a mut NixSection, ContainerError> {
    if siblings.iter().any(|s| s.name == name) {
        return Err(ContainerError::DuplicateName {
            kind: "section",
            name: name.to_string(),
        });
    }
    siblings.push(NixSection::new(
        id.to_string(),
        name.to_string(),
        section_type.to_string(),
        encoding,
    ));
    let created = siblings.len() - 1;
    Ok(&mut siblings[created])
}

// ============================================================================
// FILE
// ============================================================================

/// An open container file.
///
/// All mutation happens in memory; [`NixFile::close`] persists the result.
/// A handle dropped without closing discards its changes.
#[derive(Debug)]
pub struct NixFile {
    path: PathBuf,
    mode: FileMode,
    encoding: TextEncoding,
    manifest: Manifest,
    sections: Vec<NixSection>,
    data: IndexMap<String, Vec<u8>>,
}

impl NixFile {
    /// Open a container with UTF-8 text storage.
    pub fn open(path: impl AsRef<Path>, mode: FileMode) -> Result<Self, ContainerError> {
        Self::open_with_encoding(path, mode, TextEncoding::Utf8)
    }

    /// Open a container whose storage layer accepts only `encoding`.
    pub fn open_with_encoding(
        path: impl AsRef<Path>,
        mode: FileMode,
        encoding: TextEncoding,
    ) -> Result<Self, ContainerError> {
        let path = path.as_ref().to_path_buf();
        let exists = path.exists();

        let contents = match (mode, exists) {
            (FileMode::ReadOnly, false) => return Err(ContainerError::NotFound(path)),
            (FileMode::ReadOnly | FileMode::ReadWrite, true) => {
                let bytes = std::fs::read(&path)?;
                archive::read_archive(&bytes)?
            }
            (FileMode::ReadWrite, false) | (FileMode::Overwrite, _) => ArchiveContents::empty(),
        };
        debug!(path = %path.display(), ?mode, sections = contents.sections.len(), "opened container");

        let mut file = Self {
            path,
            mode,
            encoding,
            manifest: contents.manifest,
            sections: contents.sections,
            data: contents.data,
        };
        for section in &mut file.sections {
            section.apply_encoding(encoding);
        }
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    /// Top-level sections in creation order.
    pub fn sections(&self) -> &[NixSection] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&NixSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Create a top-level section. Names must be unique.
    pub fn create_section(
        &mut self,
        name: &str,
        section_type: &str,
        id: &str,
    ) -> Result<&mut NixSection, ContainerError> {
        self.ensure_writable()?;
        push_section(&mut self.sections, name, section_type, id, self.encoding)
    }

    /// Delete a top-level section and everything below it.
    pub fn remove_section(&mut self, name: &str) -> Result<bool, ContainerError> {
        self.ensure_writable()?;
        let before = self.sections.len();
        self.sections.retain(|s| s.name != name);
        Ok(self.sections.len() != before)
    }

    /// Names of stored numeric payload entries.
    pub fn data_entries(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// Store a raw numeric payload under `name`.
    pub fn put_data(&mut self, name: &str, bytes: Vec<u8>) -> Result<(), ContainerError> {
        self.ensure_writable()?;
        self.data.insert(name.to_string(), bytes);
        Ok(())
    }

    pub fn data(&self, name: &str) -> Option<&[u8]> {
        self.data.get(name).map(Vec::as_slice)
    }

    /// Flush all changes to disk and release the file.
    pub fn close(self) -> Result<(), ContainerError> {
        if self.mode == FileMode::ReadOnly {
            return Ok(());
        }
        let contents = ArchiveContents {
            manifest: self.manifest.touched(),
            sections: self.sections,
            data: self.data,
        };
        let bytes = archive::write_archive(&contents)?;
        std::fs::write(&self.path, bytes)?;
        debug!(path = %self.path.display(), "closed container");
        Ok(())
    }

    fn ensure_writable(&self) -> Result<(), ContainerError> {
        match self.mode {
            FileMode::ReadOnly => Err(ContainerError::ReadOnly),
            _ => Ok(()),
        }
    }
}
