//! Recursive mapping of document sections into the container.

use tracing::{debug, warn};

use super::{ConversionStats, map_property};
use crate::nix::{ContainerError, NixSection};
use crate::odml::Section;

/// Map `sections` in order as children of `parent`.
///
/// A section that cannot be created is logged and skipped together with
/// its subtree; its siblings are still mapped.
pub fn map_sections(sections: &[Section], parent: &mut NixSection, stats: &mut ConversionStats) {
    for section in sections {
        if let Err(e) = map_section(section, parent, stats) {
            warn!(section = %section.name, error = %e, "skipping section");
        }
    }
}

/// Copy `source` and everything below it under `parent`.
///
/// Pre-order: the section's own properties are written before its
/// children are visited.
pub fn map_section(
    source: &Section,
    parent: &mut NixSection,
    stats: &mut ConversionStats,
) -> Result<(), ContainerError> {
    stats.sections_read += 1;

    let target = parent.create_section(&source.name, &source.section_type, source.id.as_str())?;
    stats.sections_written += 1;
    debug!(section = %source.name, id = %source.id, "mapped section");

    target.definition = source.definition.clone();
    if let Some(reference) = &source.reference {
        target.reference = Some(reference.clone());
    }
    if let Some(repository) = &source.repository {
        target.repository = Some(repository.clone());
    }

    for property in &source.properties {
        if let Err(e) = map_property(property, target, stats) {
            warn!(property = %property.name, error = %e, "skipping property");
        }
    }
    map_sections(&source.sections, target, stats);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nix::{FileMode, NixFile};
    use crate::odml::{DType, Property};
    use tempfile::TempDir;

    fn recording() -> Section {
        Section::new("Recording", "recording")
            .with_id("sec-rec")
            .with_definition("One session")
            .with_property(Property::new("duration", DType::Float).with_value(12.5))
            .with_section(Section::new("Channel 1", "channel").with_id("sec-c1"))
            .with_section(
                Section::new("Channel 2", "channel")
                    .with_id("sec-c2")
                    .with_reference("montage.xml"),
            )
    }

    #[test]
    fn test_preserves_ids_and_order() {
        let dir = TempDir::new().unwrap();
        let mut file = NixFile::open(dir.path().join("s.nix"), FileMode::Overwrite).unwrap();
        let root = file.create_section("root", "root", "root").unwrap();
        let mut stats = ConversionStats::default();

        map_section(&recording(), root, &mut stats).unwrap();

        let rec = &root.sections[0];
        assert_eq!(rec.id, "sec-rec");
        assert_eq!(rec.definition.as_deref(), Some("One session"));
        let ids: Vec<&str> = rec.sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["sec-c1", "sec-c2"]);
        assert_eq!(rec.sections[0].reference, None);
        assert_eq!(rec.sections[1].reference.as_deref(), Some("montage.xml"));
        assert_eq!(rec.sections[0].repository, None);

        assert_eq!(stats.sections_read, 3);
        assert_eq!(stats.sections_written, 3);
        assert_eq!(stats.properties_written, 1);
    }

    #[test]
    fn test_duplicate_sibling_skips_only_that_subtree() {
        let dir = TempDir::new().unwrap();
        let mut file = NixFile::open(dir.path().join("d.nix"), FileMode::Overwrite).unwrap();
        let root = file.create_section("root", "root", "root").unwrap();
        let mut stats = ConversionStats::default();

        let sections = vec![
            Section::new("A", "a"),
            Section::new("A", "a").with_section(Section::new("lost", "x")),
            Section::new("B", "b"),
        ];
        map_sections(&sections, root, &mut stats);

        let names: Vec<&str> = root.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(stats.sections_read, 3);
        assert_eq!(stats.sections_written, 2);
    }
}
