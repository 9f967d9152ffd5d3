//! Configuration file.
//!
//! Looked up at an explicit path or as `nixodml.toml` in the working
//! directory. Every key is optional:
//!
//! ```toml
//! [convert]
//! mode = "overwrite-metadata"   # append | overwrite | overwrite-metadata
//! text_encoding = "ascii"       # utf8 | ascii
//! confirm = "approve"           # approve | decline
//!
//! [signal]
//! program = "python3"
//! args = ["mnetonix.py"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::convert::{AutoConfirm, ConfirmPolicy, ConvertOptions, Decline, WriteMode};
use crate::eegbase::ProcessSignalConverter;
use crate::nix::TextEncoding;

/// File name searched in the working directory.
pub const CONFIG_FILE: &str = "nixodml.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{}': {message}", .path.display())]
    Parse { path: PathBuf, message: String },
}

/// Answer given to confirmation prompts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmChoice {
    #[default]
    Approve,
    Decline,
}

impl ConfirmChoice {
    pub fn policy(self) -> Box<dyn ConfirmPolicy> {
        match self {
            Self::Approve => Box::new(AutoConfirm),
            Self::Decline => Box::new(Decline),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    pub mode: WriteMode,
    pub text_encoding: TextEncoding,
    pub confirm: ConfirmChoice,
}

impl ConvertConfig {
    pub fn options(&self) -> ConvertOptions {
        ConvertOptions {
            mode: self.mode,
            encoding: self.text_encoding,
        }
    }
}

/// External signal converter invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SignalConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["mnetonix.py".to_string()],
        }
    }
}

impl SignalConfig {
    pub fn converter(&self) -> ProcessSignalConverter {
        ProcessSignalConverter::new(self.program.clone(), self.args.clone())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub convert: ConvertConfig,
    pub signal: SignalConfig,
}

impl Config {
    /// Load from `explicit`, else from [`CONFIG_FILE`] in `cwd` if present,
    /// else defaults.
    ///
    /// An explicit path must exist.
    pub fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::read(path),
            None => {
                let candidate = cwd.join(CONFIG_FILE);
                if candidate.is_file() {
                    Self::read(&candidate)
                } else {
                    debug!("no config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}
