//! Mapping of a single property into a container section.

use tracing::{debug, warn};

use super::{ConversionStats, coerce};
use crate::nix::{ContainerError, DataType, NixProperty, NixSection, NixValue};
use crate::odml::{Property, Value};

/// Ohm signs storage layers choke on: GREEK CAPITAL LETTER OMEGA and OHM SIGN.
const OHM_SIGNS: [char; 2] = ['\u{03A9}', '\u{2126}'];

/// Copy `source` into `parent` as a new container property.
///
/// Properties without surviving values are skipped. Encoding failures on
/// values and unit are repaired and logged; any other container error is
/// returned and leaves `parent` without the property.
pub fn map_property(
    source: &Property,
    parent: &mut NixSection,
    stats: &mut ConversionStats,
) -> Result<(), ContainerError> {
    stats.properties_read += 1;

    let values: Vec<NixValue> = source
        .values
        .iter()
        .filter_map(|raw| coerce(raw.as_ref(), &source.dtype, stats))
        .map(NixValue::from)
        .collect();

    let Some(first) = values.first() else {
        stats.skipped_empty_properties += 1;
        debug!(property = %source.name, "no values left, skipping property");
        return Ok(());
    };
    let data_type = DataType::of(first);

    let target = parent.create_property(&source.name, data_type, source.id.as_str())?;
    write_values(target, values, stats)?;
    write_unit(target, source.unit.as_deref())?;

    target.definition = source.definition.clone();
    target.uncertainty = source.uncertainty.clone();
    target.reference = source.reference.clone();
    target.value_origin = source.value_origin.clone();
    target.dependency = source.dependency.clone();
    target.dependency_value = source.dependency_value.clone();

    if let Err(e) = target.set_odml_type(&source.dtype.to_string()) {
        warn!(property = %source.name, error = %e, "cannot set odml type");
        stats.odml_types_omitted += 1;
    }

    stats.properties_written += 1;
    Ok(())
}

/// Store `values`, stripping non-ASCII text when the storage rejects it.
pub(crate) fn write_values(
    target: &mut NixProperty,
    values: Vec<NixValue>,
    stats: &mut ConversionStats,
) -> Result<(), ContainerError> {
    let stripped: Vec<NixValue> = values.iter().map(strip_non_ascii).collect();
    match target.set_values(values) {
        Err(e) if e.is_encoding() => {
            warn!(
                property = %target.name,
                adjusted = ?stripped,
                "property values do not support unicode, values adjusted"
            );
            target.set_values(stripped)?;
            stats.mod_prop_values += 1;
            Ok(())
        }
        other => other,
    }
}

fn write_unit(target: &mut NixProperty, unit: Option<&str>) -> Result<(), ContainerError> {
    let Some(unit) = unit else {
        return Ok(());
    };
    match target.set_unit(Some(unit.to_string())) {
        Err(e) if e.is_encoding() => {
            let replaced: String = unit
                .replace(&OHM_SIGNS[..], "Ohm")
                .chars()
                .filter(char::is_ascii)
                .collect();
            warn!(property = %target.name, unit, replaced = %replaced, "unit adjusted to ASCII");
            target.set_unit(Some(replaced))
        }
        other => other,
    }
}

fn strip_non_ascii(value: &NixValue) -> NixValue {
    match value {
        NixValue::String(s) => NixValue::String(s.chars().filter(char::is_ascii).collect()),
        other => other.clone(),
    }
}

impl From<Value> for NixValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::String(s),
            Value::Int(v) => Self::Int(v),
            Value::Float(v) => Self::Double(v),
            Value::Bool(v) => Self::Bool(v),
            temporal => Self::String(temporal.iso_string().unwrap_or_else(|| temporal.to_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nix::{FileMode, NixFile, OdmlType, TextEncoding};
    use crate::odml::DType;
    use rstest::rstest;
    use tempfile::TempDir;

    fn with_section<R>(encoding: TextEncoding, f: impl FnOnce(&mut NixSection) -> R) -> R {
        let dir = TempDir::new().unwrap();
        let mut file =
            NixFile::open_with_encoding(dir.path().join("p.nix"), FileMode::Overwrite, encoding)
                .unwrap();
        let section = file.create_section("S", "s", "sec").unwrap();
        f(section)
    }

    #[test]
    fn test_maps_values_and_metadata() {
        let source = Property::new("age", DType::Int)
            .with_id("prop-age")
            .with_value(34)
            .with_unit("years")
            .with_definition("Age at recording");
        let mut stats = ConversionStats::default();

        with_section(TextEncoding::Utf8, |section| {
            map_property(&source, section, &mut stats).unwrap();
            let prop = section.property("age").expect("property written");
            assert_eq!(prop.id, "prop-age");
            assert_eq!(prop.data_type, DataType::Int64);
            assert_eq!(prop.values(), &[NixValue::Int(34)]);
            assert_eq!(prop.unit(), Some("years"));
            assert_eq!(prop.definition.as_deref(), Some("Age at recording"));
            assert_eq!(prop.odml_type(), Some(OdmlType::Int));
        });
        assert_eq!(stats.properties_read, 1);
        assert_eq!(stats.properties_written, 1);
    }

    #[test]
    fn test_storage_type_follows_first_value() {
        let source = Property::new("mixed", DType::Float)
            .with_values(vec![None, Some(Value::Int(1)), Some(Value::Float(2.5))]);
        let mut stats = ConversionStats::default();

        with_section(TextEncoding::Utf8, |section| {
            map_property(&source, section, &mut stats).unwrap();
            let prop = section.property("mixed").unwrap();
            assert_eq!(prop.data_type, DataType::Int64);
            assert_eq!(prop.values().len(), 2);
        });
        assert_eq!(stats.skipped_none_values, 1);
    }

    #[test]
    fn test_all_null_property_skipped() {
        let source = Property::new("signal_notes", DType::String).with_values(vec![None, None]);
        let mut stats = ConversionStats::default();

        with_section(TextEncoding::Utf8, |section| {
            map_property(&source, section, &mut stats).unwrap();
            assert!(section.property("signal_notes").is_none());
        });
        assert_eq!(stats.skipped_none_values, 2);
        assert_eq!(stats.skipped_empty_properties, 1);
        assert_eq!(stats.properties_written, 0);
    }

    #[test]
    fn test_ascii_storage_strips_values() {
        let source = Property::new("amplifier", DType::String).with_value("BrainAmp µV");
        let mut stats = ConversionStats::default();

        with_section(TextEncoding::Ascii, |section| {
            map_property(&source, section, &mut stats).unwrap();
            let prop = section.property("amplifier").unwrap();
            assert_eq!(prop.values(), &[NixValue::from("BrainAmp V")]);
        });
        assert_eq!(stats.mod_prop_values, 1);
        assert_eq!(stats.properties_written, 1);
    }

    #[rstest]
    #[case::greek_capital_omega("k\u{03A9}")]
    #[case::ohm_sign("k\u{2126}")]
    fn test_ascii_storage_spells_out_ohm(#[case] unit: &str) {
        let source = Property::new("impedance", DType::Float)
            .with_value(5.0)
            .with_unit(unit);
        let mut stats = ConversionStats::default();

        with_section(TextEncoding::Ascii, |section| {
            map_property(&source, section, &mut stats).unwrap();
            assert_eq!(section.property("impedance").unwrap().unit(), Some("kOhm"));
        });
        assert_eq!(stats.mod_prop_values, 0);
    }

    #[test]
    fn test_tuple_type_is_not_tagged() {
        let source = Property::new("position", DType::Tuple(3)).with_value("(1;2;3)");
        let mut stats = ConversionStats::default();

        with_section(TextEncoding::Utf8, |section| {
            map_property(&source, section, &mut stats).unwrap();
            assert_eq!(section.property("position").unwrap().odml_type(), None);
        });
        assert_eq!(stats.odml_types_omitted, 1);
        assert_eq!(stats.properties_written, 1);
    }
}
