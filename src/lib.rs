//! # nixodml
//!
//! Converts odML metadata documents into NIX data containers.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! eegbase   → Measurement-folder pipeline (signal + metadata)
//!   ↓
//! convert   → Structural converter, driver, statistics
//!   ↓
//! odml, nix → Document tree and formats / container files
//! ```

// ============================================================================
// MODULES (dependency order: odml, nix → convert → eegbase)
// ============================================================================

/// odML documents: tree model, XML/YAML/JSON formats, version upgrade
pub mod odml;

/// NIX containers: sections, typed properties, persistence
pub mod nix;

/// Document to container conversion
pub mod convert;

/// EEG measurement folders to containers
pub mod eegbase;

/// TOML configuration
pub mod config;

pub use config::Config;
pub use convert::{BatchReport, ConversionStats, ConvertError, ConvertOptions, Converter, WriteMode};
pub use nix::{NixFile, TextEncoding};
pub use odml::Document;
