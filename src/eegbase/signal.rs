//! The external raw-signal converter.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use super::PipelineError;
use crate::nix;

/// Turns a raw signal header into a container next to it.
pub trait SignalConverter {
    /// Convert the recording described by `header` and return the path of
    /// the produced container.
    fn convert(&self, header: &Path) -> Result<PathBuf, PipelineError>;
}

/// Path where a converter is expected to leave the container for `header`.
pub fn expected_output(header: &Path) -> PathBuf {
    header.with_extension(nix::EXTENSION)
}

/// Runs an external program with the header path as its last argument.
///
/// Only the presence of the expected container is checked afterwards; the
/// program's exit status and output are logged but not interpreted.
#[derive(Clone, Debug)]
pub struct ProcessSignalConverter {
    program: String,
    args: Vec<String>,
}

impl ProcessSignalConverter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl SignalConverter for ProcessSignalConverter {
    fn convert(&self, header: &Path) -> Result<PathBuf, PipelineError> {
        info!(program = %self.program, header = %header.display(), "running signal converter");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(header)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| PipelineError::signal(header, format!("cannot run {}: {e}", self.program)))?;
        debug!(
            status = %output.status,
            stdout = %String::from_utf8_lossy(&output.stdout),
            stderr = %String::from_utf8_lossy(&output.stderr),
            "signal converter finished"
        );

        let produced = expected_output(header);
        if produced.is_file() {
            Ok(produced)
        } else {
            Err(PipelineError::signal(
                header,
                format!("{} was not created", produced.display()),
            ))
        }
    }
}
