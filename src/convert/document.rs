//! The top-level container section that anchors a converted document.

use tracing::debug;

use super::ConversionStats;
use super::property::write_values;
use crate::nix::{ContainerError, DataType, NixFile, NixSection, NixValue};
use crate::odml::{Document, Uid};

/// Name of the anchor section.
pub const ANCHOR_NAME: &str = "odML document";
/// Type of the anchor section.
pub const ANCHOR_TYPE: &str = "odML document";

pub const AUTHOR_PROPERTY: &str = "odML author";
pub const DATE_PROPERTY: &str = "odML date";
pub const VERSION_PROPERTY: &str = "odML version";
pub const REPOSITORY_PROPERTY: &str = "odML repository";

/// Create the anchor section for `document` in `file`.
///
/// Document attributes become single-valued string properties; absent or
/// empty attributes produce no property. The returned section is the
/// parent for the document's top-level sections.
pub fn write_document_anchor<'f>(
    document: &Document,
    file: &'f mut NixFile,
    stats: &mut ConversionStats,
) -> Result<&'f mut NixSection, ContainerError> {
    let anchor = file.create_section(ANCHOR_NAME, ANCHOR_TYPE, document.id.as_str())?;
    debug!(id = %document.id, "created document anchor");

    let date = document.date.map(|d| d.format("%Y-%m-%d").to_string());
    let attributes = [
        (AUTHOR_PROPERTY, document.author.as_deref()),
        (DATE_PROPERTY, date.as_deref()),
        (VERSION_PROPERTY, document.version.as_deref()),
        (REPOSITORY_PROPERTY, document.repository.as_deref()),
    ];
    for (name, value) in attributes {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            continue;
        };
        let id = Uid::generate();
        let property = anchor.create_property(name, DataType::String, id.as_str())?;
        write_values(property, vec![NixValue::from(value)], stats)?;
    }
    Ok(anchor)
}
