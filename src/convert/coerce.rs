//! Per-value normalization applied before a value leaves the document.

use tracing::debug;

use super::ConversionStats;
use crate::odml::{DType, Value};

/// Normalize one raw value for the container.
///
/// Binary-typed and missing values are dropped. Dates, times and datetimes
/// become ISO-8601 strings; strings already holding such text are kept as
/// they are. Everything else passes through unchanged, including values
/// that do not fit the declared type, which are only counted.
pub fn coerce(raw: Option<&Value>, dtype: &DType, stats: &mut ConversionStats) -> Option<Value> {
    if *dtype == DType::Binary {
        stats.skipped_binary_values += 1;
        return None;
    }
    let Some(value) = raw else {
        stats.skipped_none_values += 1;
        return None;
    };

    if !value.matches(dtype) {
        stats.type_errors += 1;
        debug!(%dtype, ?value, "value does not match declared type");
    }

    if dtype.is_temporal() {
        if let Some(iso) = value.iso_string() {
            return Some(Value::String(iso));
        }
    }
    Some(value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use rstest::rstest;

    #[test]
    fn test_binary_dropped_before_null_check() {
        let mut stats = ConversionStats::default();
        assert_eq!(coerce(None, &DType::Binary, &mut stats), None);
        assert_eq!(coerce(Some(&Value::from("AAEC")), &DType::Binary, &mut stats), None);
        assert_eq!(stats.skipped_binary_values, 2);
        assert_eq!(stats.skipped_none_values, 0);
    }

    #[test]
    fn test_null_dropped() {
        let mut stats = ConversionStats::default();
        assert_eq!(coerce(None, &DType::Int, &mut stats), None);
        assert_eq!(stats.skipped_none_values, 1);
    }

    #[rstest]
    #[case(Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()), DType::Date, "2024-03-01")]
    #[case(Value::Time(NaiveTime::from_hms_opt(9, 5, 0).unwrap()), DType::Time, "09:05:00")]
    #[case(
        Value::DateTime(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(9, 5, 0).unwrap()),
        DType::DateTime,
        "2024-03-01T09:05:00"
    )]
    fn test_temporal_rendered_iso(#[case] value: Value, #[case] dtype: DType, #[case] expected: &str) {
        let mut stats = ConversionStats::default();
        let coerced = coerce(Some(&value), &dtype, &mut stats);
        assert_eq!(coerced, Some(Value::from(expected)));

        let again = coerce(coerced.as_ref(), &dtype, &mut stats);
        assert_eq!(again, Some(Value::from(expected)));
        assert_eq!(stats.type_errors, 0);
    }

    #[test]
    fn test_mismatch_passes_through_and_is_counted() {
        let mut stats = ConversionStats::default();
        let value = Value::from("thirty");
        assert_eq!(coerce(Some(&value), &DType::Int, &mut stats), Some(value));
        assert_eq!(stats.type_errors, 1);
    }

    #[test]
    fn test_unknown_type_passes_through() {
        let mut stats = ConversionStats::default();
        let dtype = DType::parse("quaternion");
        let value = Value::from("1,0,0,0");
        assert_eq!(coerce(Some(&value), &dtype, &mut stats), Some(value));
        assert_eq!(stats, ConversionStats::default());
    }
}
