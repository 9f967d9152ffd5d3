//! Counters accumulated during a conversion run.

use std::fmt;

/// Statistics of one conversion run.
///
/// A fresh register is used per [`Converter::run`](super::Converter::run)
/// and accumulates over every file of that run. Counters only grow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConversionStats {
    pub sections_read: usize,
    pub sections_written: usize,
    pub properties_read: usize,
    pub properties_written: usize,
    /// Properties left without values after coercion.
    pub skipped_empty_properties: usize,
    pub skipped_binary_values: usize,
    pub skipped_none_values: usize,
    /// Values whose runtime kind did not match the declared type.
    pub type_errors: usize,
    /// Value sequences rewritten to fit the storage text encoding.
    pub mod_prop_values: usize,
    /// Declared types without a container type tag.
    pub odml_types_omitted: usize,
}

impl ConversionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the counts of `other` to this register.
    pub fn merge(&mut self, other: &ConversionStats) {
        self.sections_read += other.sections_read;
        self.sections_written += other.sections_written;
        self.properties_read += other.properties_read;
        self.properties_written += other.properties_written;
        self.skipped_empty_properties += other.skipped_empty_properties;
        self.skipped_binary_values += other.skipped_binary_values;
        self.skipped_none_values += other.skipped_none_values;
        self.type_errors += other.type_errors;
        self.mod_prop_values += other.mod_prop_values;
        self.odml_types_omitted += other.odml_types_omitted;
    }
}

impl fmt::Display for ConversionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Conversion info")?;
        let rows = [
            (self.sections_read, "Sections were read"),
            (self.sections_written, "Sections were written"),
            (self.properties_read, "Properties were read"),
            (self.properties_written, "Properties were written"),
            (
                self.skipped_empty_properties,
                "Properties were skipped because they contained only None or binary values",
            ),
            (
                self.skipped_binary_values,
                "Values were skipped because they were of type 'binary'",
            ),
            (
                self.skipped_none_values,
                "Values were skipped because they were empty (None)",
            ),
            (self.type_errors, "Type Errors were encountered"),
            (
                self.mod_prop_values,
                "Values were modified due to unsupported unicode characters",
            ),
            (
                self.odml_types_omitted,
                "Unidentified odml value types omitted (using string instead)",
            ),
        ];
        for (count, label) in rows {
            writeln!(f, "{count}\t {label}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_adds_counters() {
        let mut total = ConversionStats {
            sections_read: 2,
            type_errors: 1,
            ..Default::default()
        };
        let file = ConversionStats {
            sections_read: 3,
            skipped_none_values: 4,
            ..Default::default()
        };
        total.merge(&file);
        assert_eq!(total.sections_read, 5);
        assert_eq!(total.skipped_none_values, 4);
        assert_eq!(total.type_errors, 1);
    }

    #[test]
    fn test_report_lists_every_counter() {
        let stats = ConversionStats {
            properties_written: 7,
            ..Default::default()
        };
        let report = stats.to_string();
        assert!(report.starts_with("Conversion info\n"));
        assert!(report.contains("7\t Properties were written"));
        assert_eq!(report.lines().count(), 11);
    }
}
