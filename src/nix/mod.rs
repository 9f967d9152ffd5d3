//! NIX data containers.
//!
//! A container holds a metadata tree of named sections and typed
//! properties next to raw numeric payloads. Files are opened with a
//! [`FileMode`], mutated in memory and written back by [`NixFile::close`].
//!
//! Property values are homogeneous: every value of one property shares a
//! single [`DataType`]. The storage layer may restrict text to ASCII, see
//! [`TextEncoding`].

mod archive;
mod error;
mod file;
mod types;

pub use archive::{CONTAINER_FORMAT, CONTAINER_VERSION, Manifest};
pub use error::ContainerError;
pub use file::{FileMode, NixFile, NixProperty, NixSection};
pub use types::{DataType, NixValue, OdmlType, TextEncoding};

/// File extension of container files.
pub const EXTENSION: &str = "nix";
