//! On-disk layout of a container file.
//!
//! ```text
//! session.nix (ZIP archive)
//! ├── META-INF/
//! │   └── manifest.json      # Format name, version, timestamps
//! ├── metadata/
//! │   └── sections.json      # Section/property tree
//! └── data/
//!     └── ...                # Raw numeric payloads, kept as-is
//! ```

use std::io::{Cursor, Read, Write};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use super::ContainerError;
use super::file::NixSection;

/// Standard paths within a container archive.
pub mod paths {
    /// Manifest file location.
    pub const MANIFEST: &str = "META-INF/manifest.json";
    /// Metadata tree location.
    pub const SECTIONS: &str = "metadata/sections.json";
    /// Prefix of raw payload entries.
    pub const DATA_DIR: &str = "data/";
}

/// Format name written to every manifest.
pub const CONTAINER_FORMAT: &str = "nix";
/// Container layout version written by this crate.
pub const CONTAINER_VERSION: &str = "1.2";

/// Container manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format: String,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Manifest {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            format: CONTAINER_FORMAT.to_string(),
            version: CONTAINER_VERSION.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Same manifest with a fresh modification time.
    pub fn touched(self) -> Self {
        Self {
            updated_at: Utc::now(),
            ..self
        }
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything stored in one container archive.
#[derive(Debug, Default)]
pub(crate) struct ArchiveContents {
    pub manifest: Manifest,
    pub sections: Vec<NixSection>,
    pub data: IndexMap<String, Vec<u8>>,
}

impl ArchiveContents {
    pub fn empty() -> Self {
        Self::default()
    }
}

// ============================================================================
// READER
// ============================================================================

pub(crate) fn read_archive(input: &[u8]) -> Result<ArchiveContents, ContainerError> {
    let mut archive = ZipArchive::new(Cursor::new(input))
        .map_err(|e| ContainerError::archive(format!("Failed to open archive: {e}")))?;

    let manifest: Manifest = serde_json::from_slice(&read_entry(&mut archive, paths::MANIFEST)?)
        .map_err(|e| ContainerError::json(format!("Invalid manifest: {e}")))?;
    if manifest.format != CONTAINER_FORMAT {
        return Err(ContainerError::format(format!(
            "unexpected format '{}'",
            manifest.format
        )));
    }
    if manifest.version != CONTAINER_VERSION {
        return Err(ContainerError::format(format!(
            "unsupported container version {}",
            manifest.version
        )));
    }

    let sections: Vec<NixSection> =
        serde_json::from_slice(&read_entry(&mut archive, paths::SECTIONS)?)
            .map_err(|e| ContainerError::json(format!("Invalid metadata tree: {e}")))?;

    let data_names: Vec<String> = archive
        .file_names()
        .filter(|name| name.starts_with(paths::DATA_DIR) && !name.ends_with('/'))
        .map(str::to_string)
        .collect();
    let mut data = IndexMap::new();
    for name in data_names {
        let bytes = read_entry(&mut archive, &name)?;
        data.insert(name, bytes);
    }

    Ok(ArchiveContents {
        manifest,
        sections,
        data,
    })
}

fn read_entry(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>, ContainerError> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| ContainerError::archive(format!("Failed to read {name}: {e}")))?;
    let mut content = Vec::new();
    entry
        .read_to_end(&mut content)
        .map_err(|e| ContainerError::archive(format!("Failed to read {name}: {e}")))?;
    Ok(content)
}

// ============================================================================
// WRITER
// ============================================================================

pub(crate) fn write_archive(contents: &ArchiveContents) -> Result<Vec<u8>, ContainerError> {
    let mut buffer = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(&mut buffer);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let manifest = serde_json::to_vec_pretty(&contents.manifest)
        .map_err(|e| ContainerError::json(format!("Failed to encode manifest: {e}")))?;
    write_entry(&mut zip, paths::MANIFEST, &manifest, options)?;

    let sections = serde_json::to_vec_pretty(&contents.sections)
        .map_err(|e| ContainerError::json(format!("Failed to encode metadata tree: {e}")))?;
    write_entry(&mut zip, paths::SECTIONS, &sections, options)?;

    for (name, bytes) in &contents.data {
        write_entry(&mut zip, name, bytes, options)?;
    }

    zip.finish()
        .map_err(|e| ContainerError::archive(format!("Failed to finalize archive: {e}")))?;
    Ok(buffer.into_inner())
}

fn write_entry<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    bytes: &[u8],
    options: SimpleFileOptions,
) -> Result<(), ContainerError> {
    zip.start_file(name, options)
        .map_err(|e| ContainerError::archive(format!("Failed to create {name}: {e}")))?;
    zip.write_all(bytes)
        .map_err(|e| ContainerError::archive(format!("Failed to write {name}: {e}")))?;
    Ok(())
}
