//! Structural conversion of odML documents into NIX containers.
//!
//! ```text
//! Converter::run(paths)
//!   └─ per file: load (+ upgrade) ─► write_document_anchor
//!                                     └─ map_sections (pre-order)
//!                                          ├─ map_property ─► coerce
//!                                          └─ map_sections ...
//! ```
//!
//! Every mapper receives the run's [`ConversionStats`] explicitly and adds
//! to it as it goes.

mod coerce;
mod document;
mod driver;
mod error;
mod property;
mod section;
mod stats;

pub use coerce::coerce;
pub use document::{
    ANCHOR_NAME, ANCHOR_TYPE, AUTHOR_PROPERTY, DATE_PROPERTY, REPOSITORY_PROPERTY,
    VERSION_PROPERTY, write_document_anchor,
};
pub use driver::{
    AutoConfirm, BatchReport, ConfirmPolicy, ConversionState, ConvertOptions, Converter, Decline,
    Direction, FileReport, WriteMode,
};
pub use error::ConvertError;
pub use property::map_property;
pub use section::{map_section, map_sections};
pub use stats::ConversionStats;
