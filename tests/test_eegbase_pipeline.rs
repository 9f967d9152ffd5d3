//! Measurement folder to container, with a stand-in signal converter.

#![allow(clippy::unwrap_used)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use nixodml::convert::{ANCHOR_NAME, ConvertError, ConvertOptions, Decline};
use nixodml::eegbase::{Pipeline, PipelineError, SignalConverter, expected_output};
use nixodml::nix::{FileMode, NixFile, NixValue};
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const METADATA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<odML version="1" xmlns:gui="http://www.g-node.org/guiml">
  <version>3</version>
  <date>2015-06-02</date>
  <author>EEG base</author>
  <gui:window><gui:width>800</gui:width></gui:window>
  <section>
    <name>Experiment</name>
    <type>experiment</type>
    <gui:layout><gui:x>10</gui:x></gui:layout>
    <property>
      <name>Paradigm</name>
      <value>P300<type>string</type></value>
    </property>
    <property>
      <name>Sampling rate</name>
      <value>1000<type>int</type><unit>Hz</unit></value>
    </property>
  </section>
  <section>
    <name>Subject</name>
    <type>subject</type>
    <property>
      <name>Handedness</name>
      <value>right<type>string</type></value>
      <value>left<type>string</type></value>
    </property>
  </section>
</odML>
"#;

/// Writes a container with one data entry next to the header.
struct FakeSignalConverter;

impl SignalConverter for FakeSignalConverter {
    fn convert(&self, header: &Path) -> Result<PathBuf, PipelineError> {
        let output = expected_output(header);
        let mut file = NixFile::open(&output, FileMode::Overwrite).unwrap();
        file.create_section("Signal", "nix.session", "signal-1").unwrap();
        file.put_data("data/eeg", vec![7, 7, 7]).unwrap();
        file.close().unwrap();
        Ok(output)
    }
}

/// Produces nothing.
struct FailingSignalConverter;

impl SignalConverter for FailingSignalConverter {
    fn convert(&self, header: &Path) -> Result<PathBuf, PipelineError> {
        Err(PipelineError::signal(header, "converter exited"))
    }
}

/// Fails for one recording and converts the others.
struct FailsOn(&'static str);

impl SignalConverter for FailsOn {
    fn convert(&self, header: &Path) -> Result<PathBuf, PipelineError> {
        if header.file_stem().is_some_and(|stem| stem == self.0) {
            FailingSignalConverter.convert(header)
        } else {
            FakeSignalConverter.convert(header)
        }
    }
}

fn recording(root: &Path, stem: &str) {
    let data = root.join("Data");
    fs::create_dir_all(&data).unwrap();
    for ext in ["vhdr", "eeg", "vmrk"] {
        fs::write(data.join(format!("{stem}.{ext}")), ext).unwrap();
    }
}

fn measurement(root: &Path) {
    recording(root, "P300_01");
    fs::write(root.join("metadata.xml"), METADATA).unwrap();
}

#[test]
fn test_folder_to_container() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("measurement");
    measurement(&root);

    let report = Pipeline::new(Box::new(FakeSignalConverter)).run(&root).unwrap();
    assert_eq!(report.recordings.len(), 1);
    let output = report.recordings[0].outcome.as_ref().unwrap();

    assert_eq!(output.container, root.join("NewNIX").join("P300_01.nix"));
    assert_eq!(output.metadata, root.join("NewNIX").join("P300_01.xml"));
    assert!(!root.join("Data").join("P300_01.nix").exists());

    let rewritten = fs::read_to_string(&output.metadata).unwrap();
    assert!(!rewritten.contains("guiml"));
    assert!(rewritten.contains(r#"version="1""#));

    let file = NixFile::open(&output.container, FileMode::ReadOnly).unwrap();
    assert!(file.section("Signal").is_some());
    assert_eq!(file.data("data/eeg"), Some(&[7u8, 7, 7][..]));

    let anchor = file.section(ANCHOR_NAME).expect("metadata appended");
    let wrapper = anchor.section("P300_01.xml").unwrap();
    assert_eq!(wrapper.section_type, "new");
    let names: Vec<&str> = wrapper.sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Experiment", "Subject"]);

    let experiment = wrapper.section("Experiment").unwrap();
    let rate = experiment.property("Sampling rate").unwrap();
    assert_eq!(rate.values(), &[NixValue::Int(1000)]);
    assert_eq!(rate.unit(), Some("Hz"));

    let handedness = wrapper.section("Subject").unwrap().property("Handedness").unwrap();
    assert_eq!(
        handedness.values(),
        &[NixValue::from("right"), NixValue::from("left")]
    );

    assert_eq!(output.stats.sections_written, 3);
    assert_eq!(output.stats.properties_written, 3);
    assert_eq!(report.stats, output.stats);
}

#[test]
fn test_zip_archive_is_extracted() {
    let dir = TempDir::new().unwrap();
    let staging = dir.path().join("staging");
    measurement(&staging);

    let archive = dir.path().join("P300.zip");
    let mut zip = ZipWriter::new(fs::File::create(&archive).unwrap());
    let options = SimpleFileOptions::default();
    for relative in [
        "metadata.xml",
        "Data/P300_01.vhdr",
        "Data/P300_01.eeg",
        "Data/P300_01.vmrk",
    ] {
        zip.start_file(relative, options).unwrap();
        zip.write_all(&fs::read(staging.join(relative)).unwrap()).unwrap();
    }
    zip.finish().unwrap();

    let report = Pipeline::new(Box::new(FakeSignalConverter)).run(&archive).unwrap();
    let extracted = dir.path().join("P300");
    assert!(extracted.join("metadata.xml").is_file());
    assert_eq!(
        report.recordings[0].outcome.as_ref().unwrap().container,
        extracted.join("NewNIX").join("P300_01.nix")
    );
}

#[test]
fn test_signal_failure_is_reported() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("measurement");
    measurement(&root);

    let report = Pipeline::new(Box::new(FailingSignalConverter))
        .run(&root)
        .unwrap();
    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.recordings[0].outcome,
        Err(PipelineError::SignalConversion { .. })
    ));
    assert!(root.join("NewNIX").join("P300_01.xml").is_file());
    assert!(!root.join("NewNIX").join("P300_01.nix").exists());
}

#[test]
fn test_failed_recording_does_not_stop_the_rest() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("measurement");
    measurement(&root);
    recording(&root, "P300_02");

    let report = Pipeline::new(Box::new(FailsOn("P300_01"))).run(&root).unwrap();
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);

    let [first, second] = report.recordings.as_slice() else {
        panic!("expected two recordings");
    };
    assert!(first.recording.header.ends_with("P300_01.vhdr"));
    assert!(matches!(first.outcome, Err(PipelineError::SignalConversion { .. })));

    let output = second.outcome.as_ref().unwrap();
    assert_eq!(output.container, root.join("NewNIX").join("P300_02.nix"));
    assert_eq!(report.stats, output.stats);
    assert_eq!(report.stats.properties_written, 3);

    let file = NixFile::open(&output.container, FileMode::ReadOnly).unwrap();
    assert!(file.section(ANCHOR_NAME).is_some());
}

#[test]
fn test_declining_policy_applies_to_metadata_step() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("measurement");
    measurement(&root);

    let mut pipeline = Pipeline::with_policy(
        Box::new(FakeSignalConverter),
        ConvertOptions::default(),
        Box::new(Decline),
    );
    let report = pipeline.run(&root).unwrap();
    assert!(matches!(
        report.recordings[0].outcome,
        Err(PipelineError::Convert(ConvertError::Declined { action: "overwrite", .. }))
    ));

    let container = root.join("NewNIX").join("P300_01.nix");
    let file = NixFile::open(&container, FileMode::ReadOnly).unwrap();
    assert!(file.section(ANCHOR_NAME).is_none());
}

#[test]
fn test_incomplete_recording_is_ignored() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("measurement");
    measurement(&root);
    fs::remove_file(root.join("Data").join("P300_01.vmrk")).unwrap();

    let err = Pipeline::new(Box::new(FakeSignalConverter))
        .run(&root)
        .unwrap_err();
    assert!(matches!(err, PipelineError::NoRecordings(_)));
}
