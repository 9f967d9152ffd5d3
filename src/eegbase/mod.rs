//! Measurement-folder pipeline.
//!
//! Turns an exported EEG measurement into a container holding both the
//! signal and the measurement metadata:
//!
//! ```text
//! measurement[.zip]
//! ├── metadata.xml                 ──► NewNIX/<rec>.xml (rewritten)
//! └── Data/
//!     ├── <rec>.vhdr ─► signal converter ─► <rec>.nix ──► NewNIX/<rec>.nix
//!     ├── <rec>.eeg                                        ▲
//!     └── <rec>.vmrk             NewNIX/<rec>.xml ─(append)┘
//! ```

mod error;
pub mod metadata;
mod signal;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

pub use error::PipelineError;
pub use signal::{ProcessSignalConverter, SignalConverter, expected_output};

use crate::convert::{
    AutoConfirm, ConfirmPolicy, ConversionStats, ConvertOptions, Converter, WriteMode,
};

pub const METADATA_FILE: &str = "metadata.xml";
pub const DATA_DIR: &str = "Data";
pub const OUTPUT_DIR: &str = "NewNIX";

/// One recording: a header with its data and marker files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recording {
    pub header: PathBuf,
    pub data: PathBuf,
    pub markers: PathBuf,
}

impl Recording {
    /// Recording name, taken from the header file name.
    pub fn stem(&self) -> &str {
        self.header
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }

    /// `NewNIX` directory next to the header's parent directory.
    pub fn output_dir(&self) -> PathBuf {
        let parent = self.header.parent().unwrap_or_else(|| Path::new(""));
        parent
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(OUTPUT_DIR)
    }
}

/// Files produced for one recording.
#[derive(Debug)]
pub struct RecordingOutput {
    pub metadata: PathBuf,
    pub container: PathBuf,
    pub stats: ConversionStats,
}

/// Outcome of one recording.
#[derive(Debug)]
pub struct RecordingReport {
    pub recording: Recording,
    pub outcome: Result<RecordingOutput, PipelineError>,
}

/// Outcome of a whole measurement.
#[derive(Debug)]
pub struct PipelineReport {
    pub recordings: Vec<RecordingReport>,
    /// Counters of every recording that made it through.
    pub stats: ConversionStats,
}

impl PipelineReport {
    pub fn succeeded(&self) -> usize {
        self.recordings.iter().filter(|r| r.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.recordings.len() - self.succeeded()
    }
}

/// Find every complete recording below `dir`, sorted by header path.
pub fn discover_recordings(dir: &Path) -> Vec<Recording> {
    let mut recordings: Vec<Recording> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "vhdr"))
        .filter_map(|entry| {
            let header = entry.into_path();
            let recording = Recording {
                data: header.with_extension("eeg"),
                markers: header.with_extension("vmrk"),
                header,
            };
            if recording.data.is_file() && recording.markers.is_file() {
                Some(recording)
            } else {
                debug!(header = %recording.header.display(), "incomplete recording, skipping");
                None
            }
        })
        .collect();
    recordings.sort_by(|a, b| a.header.cmp(&b.header));
    recordings
}

/// Extract `archive` into a sibling directory named after its stem.
pub fn extract_archive(archive: &Path) -> Result<PathBuf, PipelineError> {
    let stem = archive
        .file_stem()
        .ok_or_else(|| PipelineError::archive(format!("no file name: {}", archive.display())))?;
    let target = archive.with_file_name(stem);
    fs::create_dir_all(&target)?;

    let file = fs::File::open(archive)?;
    let mut zip = ZipArchive::new(file)
        .map_err(|e| PipelineError::archive(format!("Failed to open archive: {e}")))?;
    zip.extract(&target)
        .map_err(|e| PipelineError::archive(format!("Failed to extract archive: {e}")))?;
    info!(archive = %archive.display(), target = %target.display(), "extracted measurement");
    Ok(target)
}

/// The measurement pipeline with its signal converter.
pub struct Pipeline {
    signal: Box<dyn SignalConverter>,
    converter: Converter,
}

impl Pipeline {
    pub fn new(signal: Box<dyn SignalConverter>) -> Self {
        Self::with_policy(signal, ConvertOptions::default(), Box::new(AutoConfirm))
    }

    /// Pipeline whose metadata step uses `options` and asks `policy`.
    /// The write mode is always append.
    pub fn with_policy(
        signal: Box<dyn SignalConverter>,
        options: ConvertOptions,
        policy: Box<dyn ConfirmPolicy>,
    ) -> Self {
        let options = ConvertOptions {
            mode: WriteMode::Append,
            ..options
        };
        Self {
            signal,
            converter: Converter::with_policy(options, policy),
        }
    }

    /// Process the measurement at `input`, a folder or a `.zip` archive.
    ///
    /// A failing recording is reported and the next one is attempted.
    pub fn run(&mut self, input: &Path) -> Result<PipelineReport, PipelineError> {
        let root = if input.extension().is_some_and(|ext| ext == "zip") {
            measurement_root(extract_archive(input)?)
        } else {
            input.to_path_buf()
        };

        let metadata = root.join(METADATA_FILE);
        if !metadata.is_file() {
            return Err(PipelineError::MetadataMissing(root));
        }
        let data_dir = root.join(DATA_DIR);
        let recordings = discover_recordings(&data_dir);
        if recordings.is_empty() {
            return Err(PipelineError::NoRecordings(data_dir));
        }

        let source = fs::read(&metadata)?;
        let mut stats = ConversionStats::default();
        let mut reports = Vec::with_capacity(recordings.len());
        for recording in recordings {
            let outcome = self.process(&source, &recording);
            match &outcome {
                Ok(output) => stats.merge(&output.stats),
                Err(e) => {
                    warn!(header = %recording.header.display(), error = %e, "recording skipped");
                }
            }
            reports.push(RecordingReport { recording, outcome });
        }
        Ok(PipelineReport {
            recordings: reports,
            stats,
        })
    }

    fn process(
        &mut self,
        source: &[u8],
        recording: &Recording,
    ) -> Result<RecordingOutput, PipelineError> {
        let stem = recording.stem().to_string();
        let output_dir = recording.output_dir();
        fs::create_dir_all(&output_dir)?;

        let document = output_dir.join(format!("{stem}.xml"));
        fs::write(&document, metadata::rewrite_metadata(source, &format!("{stem}.xml"))?)?;
        info!(metadata = %document.display(), "wrote measurement metadata");

        let produced = self.signal.convert(&recording.header)?;
        let container = document.with_extension(crate::nix::EXTENSION);
        move_file(&produced, &container)?;
        info!(from = %produced.display(), to = %container.display(), "moved signal container");

        let result = self.converter.convert(&document);
        let stats = self.converter.take_stats();
        let written = result?;
        debug!(container = %written.display(), "appended metadata");

        Ok(RecordingOutput {
            metadata: document,
            container,
            stats,
        })
    }
}

/// Use a single wrapping folder when the archive contents live inside one.
fn measurement_root(extracted: PathBuf) -> PathBuf {
    if extracted.join(METADATA_FILE).is_file() {
        return extracted;
    }
    let subdirs: Vec<PathBuf> = fs::read_dir(&extracted)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect()
        })
        .unwrap_or_default();
    match subdirs.as_slice() {
        [only] if only.join(METADATA_FILE).is_file() => only.clone(),
        _ => extracted,
    }
}

fn move_file(from: &Path, to: &Path) -> Result<(), PipelineError> {
    if fs::rename(from, to).is_err() {
        fs::copy(from, to)?;
        fs::remove_file(from)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_discover_requires_sibling_files() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("Data");
        for name in ["b.vhdr", "b.eeg", "b.vmrk", "a.vhdr", "a.eeg", "a.vmrk", "c.vhdr", "c.eeg"] {
            touch(&data.join("session").join(name));
        }

        let found: Vec<String> = discover_recordings(&data)
            .iter()
            .map(|r| r.stem().to_string())
            .collect();
        assert_eq!(found, ["a", "b"]);
    }

    #[test]
    fn test_output_dir_is_above_header_folder() {
        let recording = Recording {
            header: PathBuf::from("/m/Data/rec.vhdr"),
            data: PathBuf::from("/m/Data/rec.eeg"),
            markers: PathBuf::from("/m/Data/rec.vmrk"),
        };
        assert_eq!(recording.output_dir(), PathBuf::from("/m/NewNIX"));
    }

    #[test]
    fn test_missing_metadata() {
        let dir = TempDir::new().unwrap();
        let signal = ProcessSignalConverter::new("true", Vec::new());
        let mut pipeline = Pipeline::new(Box::new(signal));
        assert!(matches!(
            pipeline.run(dir.path()),
            Err(PipelineError::MetadataMissing(_))
        ));
    }

    #[test]
    fn test_no_recordings() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join(METADATA_FILE));
        let signal = ProcessSignalConverter::new("true", Vec::new());
        let mut pipeline = Pipeline::new(Box::new(signal));
        assert!(matches!(
            pipeline.run(dir.path()),
            Err(PipelineError::NoRecordings(_))
        ));
    }
}
