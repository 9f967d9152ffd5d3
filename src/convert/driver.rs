//! Conversion driver: per-file state machine and batch loop.
//!
//! ```text
//! Idle ─► Loading ─┬──────────────► Writing ─► Reporting ─► Done
//!                  └► VersionCheck ─┘
//!   (any state) ─► Failed
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::document::{ANCHOR_NAME, write_document_anchor};
use super::{ConversionStats, ConvertError, map_sections};
use crate::nix::{self, FileMode, NixFile, TextEncoding};
use crate::odml::{self, Document, DocumentError, DocumentFormat, VersionConverter};

// ============================================================================
// OPTIONS
// ============================================================================

/// How a document is written into an existing container.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum WriteMode {
    /// Add the document next to existing content.
    #[default]
    Append,
    /// Replace the whole container.
    Overwrite,
    /// Replace only a previously written document anchor.
    OverwriteMetadata,
}

impl WriteMode {
    fn file_mode(self) -> FileMode {
        match self {
            Self::Append | Self::OverwriteMetadata => FileMode::ReadWrite,
            Self::Overwrite => FileMode::Overwrite,
        }
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Append => "append",
            Self::Overwrite => "overwrite",
            Self::OverwriteMetadata => "overwrite metadata",
        })
    }
}

/// Conversion direction, derived from the source extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    DocumentToContainer,
    ContainerToDocument,
}

impl Direction {
    pub fn from_path(path: &Path) -> Result<Self, ConvertError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| ConvertError::UnknownFormat(path.to_path_buf()))?;
        if ext == nix::EXTENSION {
            Ok(Self::ContainerToDocument)
        } else if odml::supported_extensions().contains(&ext.as_str()) {
            Ok(Self::DocumentToContainer)
        } else {
            Err(ConvertError::UnknownFormat(path.to_path_buf()))
        }
    }

    /// Extension of the file this direction produces.
    pub fn output_extension(self) -> &'static str {
        match self {
            Self::DocumentToContainer => nix::EXTENSION,
            Self::ContainerToDocument => "xml",
        }
    }
}

/// Options shared by every file of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    pub mode: WriteMode,
    /// Text encoding the destination storage accepts.
    pub encoding: TextEncoding,
}

// ============================================================================
// CONFIRMATION
// ============================================================================

/// Decides on actions the user would be asked to confirm.
pub trait ConfirmPolicy {
    /// Whether an existing destination may be written in `mode`.
    fn confirm_overwrite(&self, destination: &Path, mode: WriteMode) -> bool;

    /// Whether an outdated document may be upgraded from version `found`.
    fn confirm_upgrade(&self, source: &Path, found: &str) -> bool;
}

/// Approves everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct AutoConfirm;

impl ConfirmPolicy for AutoConfirm {
    fn confirm_overwrite(&self, _destination: &Path, _mode: WriteMode) -> bool {
        true
    }

    fn confirm_upgrade(&self, _source: &Path, _found: &str) -> bool {
        true
    }
}

/// Refuses everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct Decline;

impl ConfirmPolicy for Decline {
    fn confirm_overwrite(&self, _destination: &Path, _mode: WriteMode) -> bool {
        false
    }

    fn confirm_upgrade(&self, _source: &Path, _found: &str) -> bool {
        false
    }
}

// ============================================================================
// REPORTS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversionState {
    Idle,
    Loading,
    VersionCheck,
    Writing,
    Reporting,
    Done,
    Failed,
}

/// Outcome of one file.
#[derive(Debug)]
pub struct FileReport {
    pub source: PathBuf,
    /// The written destination, or why the file was abandoned.
    pub outcome: Result<PathBuf, ConvertError>,
}

impl FileReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Outcome of a whole run.
#[derive(Debug)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    pub stats: ConversionStats,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|f| f.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.files.len() - self.succeeded()
    }
}

// ============================================================================
// CONVERTER
// ============================================================================

/// Converts documents into containers, one file at a time.
pub struct Converter {
    options: ConvertOptions,
    policy: Box<dyn ConfirmPolicy>,
    stats: ConversionStats,
    state: ConversionState,
}

impl Converter {
    /// Create a converter that approves every confirmation.
    pub fn new(options: ConvertOptions) -> Self {
        Self::with_policy(options, Box::new(AutoConfirm))
    }

    pub fn with_policy(options: ConvertOptions, policy: Box<dyn ConfirmPolicy>) -> Self {
        Self {
            options,
            policy,
            stats: ConversionStats::default(),
            state: ConversionState::Idle,
        }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Counters accumulated since the last [`Converter::run`].
    pub fn stats(&self) -> &ConversionStats {
        &self.stats
    }

    /// Hand out the accumulated counters and start again from zero.
    pub fn take_stats(&mut self) -> ConversionStats {
        std::mem::take(&mut self.stats)
    }

    /// State reached by the most recent file.
    pub fn state(&self) -> ConversionState {
        self.state
    }

    /// Convert every path in order with fresh statistics.
    ///
    /// A failing file is reported and the next one is attempted.
    pub fn run<P: AsRef<Path>>(&mut self, paths: &[P]) -> BatchReport {
        self.stats = ConversionStats::default();
        let files: Vec<FileReport> = paths
            .iter()
            .map(|path| {
                let source = path.as_ref().to_path_buf();
                let outcome = self.convert(&source);
                FileReport { source, outcome }
            })
            .collect();
        BatchReport {
            files,
            stats: self.stats,
        }
    }

    /// Convert one file, adding to the current statistics.
    pub fn convert(&mut self, source: &Path) -> Result<PathBuf, ConvertError> {
        self.state = ConversionState::Idle;
        let result = self.convert_inner(source);
        match &result {
            Ok(output) => {
                self.transition(ConversionState::Reporting);
                info!(
                    source = %source.display(),
                    output = %output.display(),
                    sections = self.stats.sections_written,
                    properties = self.stats.properties_written,
                    "conversion done"
                );
                self.transition(ConversionState::Done);
            }
            Err(e) => {
                self.transition(ConversionState::Failed);
                error!(source = %source.display(), error = %e, "conversion failed");
            }
        }
        result
    }

    fn convert_inner(&mut self, source: &Path) -> Result<PathBuf, ConvertError> {
        self.transition(ConversionState::Loading);
        let direction = Direction::from_path(source)?;
        if !source.is_file() {
            return Err(ConvertError::NotFound(source.to_path_buf()));
        }

        let output = source.with_extension(direction.output_extension());
        let mode = match direction {
            Direction::ContainerToDocument => WriteMode::Overwrite,
            Direction::DocumentToContainer => self.options.mode,
        };
        if output.exists() && !self.policy.confirm_overwrite(&output, mode) {
            return Err(ConvertError::declined("overwrite", output));
        }

        match direction {
            Direction::DocumentToContainer => {
                let document = self.load_document(source)?;
                if let Some(id) = document.find_aliased_id() {
                    return Err(ConvertError::structure(format!(
                        "id {id} is used by more than one node"
                    )));
                }
                self.transition(ConversionState::Writing);
                self.write_container(&document, &output, mode)?;
                Ok(output)
            }
            Direction::ContainerToDocument => {
                let file = NixFile::open(source, FileMode::ReadOnly)?;
                debug!(sections = file.sections().len(), "opened container for export");
                Err(ConvertError::ExportUnsupported(source.to_path_buf()))
            }
        }
    }

    fn load_document(&mut self, source: &Path) -> Result<Document, ConvertError> {
        let format = odml::detect_format(source)
            .ok_or_else(|| ConvertError::UnknownFormat(source.to_path_buf()))?;
        let bytes = std::fs::read(source)?;
        format.validate(&bytes)?;

        let loaded = match format.read(&bytes) {
            Err(DocumentError::OutdatedVersion { found, current }) => {
                self.transition(ConversionState::VersionCheck);
                warn!(
                    source = %source.display(),
                    found = %found,
                    current,
                    "odML file format version is outdated, converting"
                );
                if !self.policy.confirm_upgrade(source, &found) {
                    return Err(ConvertError::declined("upgrade", source));
                }
                upgrade(format.as_ref(), &bytes, found, current)?
            }
            other => other?,
        };
        debug!(
            format = format.name(),
            sections = loaded.section_count(),
            properties = loaded.property_count(),
            "loaded document"
        );
        Ok(loaded)
    }

    fn write_container(
        &mut self,
        document: &Document,
        output: &Path,
        mode: WriteMode,
    ) -> Result<(), ConvertError> {
        debug!(output = %output.display(), %mode, "writing container");
        let mut file =
            NixFile::open_with_encoding(output, mode.file_mode(), self.options.encoding)?;
        if mode == WriteMode::OverwriteMetadata && file.remove_section(ANCHOR_NAME)? {
            debug!("removed previous document anchor");
        }

        let anchor = write_document_anchor(document, &mut file, &mut self.stats)?;
        map_sections(&document.sections, anchor, &mut self.stats);
        file.close()?;
        Ok(())
    }

    fn transition(&mut self, next: ConversionState) {
        debug!(from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }
}

fn upgrade(
    format: &dyn DocumentFormat,
    bytes: &[u8],
    found: String,
    current: &'static str,
) -> Result<Document, ConvertError> {
    if !format.supports_upgrade() {
        return Err(DocumentError::unsupported(format!(
            "{} documents cannot be upgraded from version {found} to {current}",
            format.name()
        ))
        .into());
    }
    let upgraded = VersionConverter::new().convert(bytes)?;
    Ok(format.read(upgraded.as_bytes())?)
}
