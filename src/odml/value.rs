//! Declared data types and raw values of odML properties.
//!
//! Values are stored on disk as list literals (`[34, 35]`, `["a, b", c]`).
//! An unquoted empty item stands for a missing value.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// On-disk date layout.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// On-disk time layout.
pub const TIME_FORMAT: &str = "%H:%M:%S";
/// On-disk datetime layout.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_PARSE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

const TIME_PARSE_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S"];

// ============================================================================
// DECLARED TYPES
// ============================================================================

/// The declared data type of a property.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum DType {
    #[default]
    String,
    Int,
    Float,
    Boolean,
    Date,
    Time,
    DateTime,
    Text,
    Url,
    Person,
    Binary,
    /// Fixed-arity tuple, written `N-tuple`.
    Tuple(usize),
    /// Any type name this crate does not recognise.
    Unknown(String),
}

impl DType {
    /// Parse a declared type name. Never fails; unknown names are kept.
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "string" => Self::String,
            "int" => Self::Int,
            "float" => Self::Float,
            "boolean" | "bool" => Self::Boolean,
            "date" => Self::Date,
            "time" => Self::Time,
            "datetime" => Self::DateTime,
            "text" => Self::Text,
            "url" => Self::Url,
            "person" => Self::Person,
            "binary" => Self::Binary,
            other => match other.strip_suffix("-tuple").map(str::parse::<usize>) {
                Some(Ok(arity)) => Self::Tuple(arity),
                _ => Self::Unknown(other.to_string()),
            },
        }
    }

    /// Returns true for `date`, `time` and `datetime`.
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Date | Self::Time | Self::DateTime)
    }

    /// Returns true for the types whose values are plain strings.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Text | Self::Url | Self::Person | Self::Tuple(_)
        )
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Boolean => f.write_str("boolean"),
            Self::Date => f.write_str("date"),
            Self::Time => f.write_str("time"),
            Self::DateTime => f.write_str("datetime"),
            Self::Text => f.write_str("text"),
            Self::Url => f.write_str("url"),
            Self::Person => f.write_str("person"),
            Self::Binary => f.write_str("binary"),
            Self::Tuple(arity) => write!(f, "{arity}-tuple"),
            Self::Unknown(name) => f.write_str(name),
        }
    }
}

impl From<&str> for DType {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

// ============================================================================
// VALUES
// ============================================================================

/// A single raw property value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Interpret `text` according to the declared type.
    ///
    /// Text that does not parse as the declared type is kept as a string.
    pub fn parse(text: &str, dtype: &DType) -> Self {
        let trimmed = text.trim();
        let parsed = match dtype {
            DType::Int => trimmed.parse().ok().map(Self::Int),
            DType::Float => trimmed.parse().ok().map(Self::Float),
            DType::Boolean => parse_bool(trimmed).map(Self::Bool),
            DType::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .ok()
                .map(Self::Date),
            DType::Time => parse_time(trimmed).map(Self::Time),
            DType::DateTime => parse_datetime(trimmed).map(Self::DateTime),
            _ => None,
        };
        parsed.unwrap_or_else(|| Self::String(text.to_string()))
    }

    /// Canonical ISO-8601 rendering for temporal values.
    pub fn iso_string(&self) -> Option<String> {
        match self {
            Self::Date(d) => Some(d.format(DATE_FORMAT).to_string()),
            Self::Time(t) => Some(t.format("%H:%M:%S%.f").to_string()),
            Self::DateTime(dt) => Some(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            _ => None,
        }
    }

    /// Whether this value has the runtime shape the declared type expects.
    ///
    /// Unknown and binary types accept anything.
    pub fn matches(&self, dtype: &DType) -> bool {
        match dtype {
            DType::Int => matches!(self, Self::Int(_)),
            DType::Float => matches!(self, Self::Float(_) | Self::Int(_)),
            DType::Boolean => matches!(self, Self::Bool(_)),
            DType::Date => match self {
                Self::Date(_) => true,
                Self::String(s) => NaiveDate::parse_from_str(s, DATE_FORMAT).is_ok(),
                _ => false,
            },
            DType::Time => match self {
                Self::Time(_) => true,
                Self::String(s) => parse_time(s).is_some(),
                _ => false,
            },
            DType::DateTime => match self {
                Self::DateTime(_) => true,
                Self::String(s) => parse_datetime(s).is_some(),
                _ => false,
            },
            t if t.is_textual() => matches!(self, Self::String(_)),
            _ => true,
        }
    }

    /// The on-disk text of this value.
    pub fn to_text(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Bool(v) => v.to_string(),
            Self::Date(d) => d.format(DATE_FORMAT).to_string(),
            Self::Time(t) => t.format(TIME_FORMAT).to_string(),
            Self::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    TIME_PARSE_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(text, fmt).ok())
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    DATETIME_PARSE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

// ============================================================================
// LIST LITERALS
// ============================================================================

/// Split a list literal into its raw items.
///
/// `None` marks an unquoted empty item. A trailing empty item after a
/// separator is dropped, so `[a,]` is `[a]` and `[,]` is a single null.
/// A quote opens a quoted item only as the item's first character; inside
/// it, a backslash escapes the quote character or another backslash.
pub fn parse_list(text: &str) -> Vec<Option<String>> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed);
    if inner.trim().is_empty() {
        return Vec::new();
    }

    let mut items: Vec<ListItem> = Vec::new();
    let mut item = ListItem::default();
    let mut state = ItemState::Start;
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        match (state, ch) {
            (ItemState::Quoted(q), '\\') if chars.peek().is_some_and(|&n| n == q || n == '\\') => {
                item.text.extend(chars.next());
            }
            (ItemState::Quoted(q), c) if c == q => state = ItemState::Closed,
            (ItemState::Quoted(_), c) => item.text.push(c),
            (_, ',') => {
                items.push(std::mem::take(&mut item));
                state = ItemState::Start;
            }
            (ItemState::Start | ItemState::Closed, c) if c.is_whitespace() => {}
            (ItemState::Start, '"' | '\'') => {
                item.quoted = true;
                state = ItemState::Quoted(ch);
            }
            (ItemState::Start, c) => {
                item.text.push(c);
                state = ItemState::Bare;
            }
            (_, c) => item.text.push(c),
        }
    }
    items.push(item);

    if items.len() > 1 && items.last().is_some_and(ListItem::is_null) {
        items.pop();
    }

    items.into_iter().map(ListItem::into_value).collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ItemState {
    Start,
    Bare,
    Quoted(char),
    Closed,
}

#[derive(Default)]
struct ListItem {
    text: String,
    quoted: bool,
}

impl ListItem {
    fn is_null(&self) -> bool {
        !self.quoted && self.text.trim().is_empty()
    }

    fn into_value(self) -> Option<String> {
        if self.quoted {
            Some(self.text)
        } else if self.is_null() {
            None
        } else {
            Some(self.text.trim_end().to_string())
        }
    }
}

/// Render values as a list literal that [`parse_list`] reads back.
pub fn render_list(values: &[Option<Value>]) -> String {
    let mut items: Vec<String> = values
        .iter()
        .map(|value| match value {
            None => String::new(),
            Some(v) => quote_if_needed(&v.to_text()),
        })
        .collect();
    if matches!(values.last(), Some(None)) {
        items.push(String::new());
    }
    format!("[{}]", items.join(", "))
}

fn quote_if_needed(text: &str) -> String {
    let needs_quotes = text.is_empty()
        || text.contains([',', '[', ']'])
        || text.starts_with(['"', '\''])
        || text.ends_with(['"', '\''])
        || text.trim() != text;
    if !needs_quotes {
        return text.to_string();
    }

    let quote = if text.contains('"') && !text.contains('\'') {
        '\''
    } else {
        '"'
    };
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push(quote);
    for ch in text.chars() {
        if ch == quote || ch == '\\' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push(quote);
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("int", DType::Int)]
    #[case("datetime", DType::DateTime)]
    #[case("3-tuple", DType::Tuple(3))]
    #[case("binary", DType::Binary)]
    #[case("quaternion", DType::Unknown("quaternion".to_string()))]
    fn test_dtype_parse(#[case] name: &str, #[case] expected: DType) {
        assert_eq!(DType::parse(name), expected);
        assert_eq!(expected.to_string(), name);
    }

    #[test]
    fn test_value_parse_by_type() {
        assert_eq!(Value::parse("34", &DType::Int), Value::Int(34));
        assert_eq!(Value::parse("T", &DType::Boolean), Value::Bool(true));
        assert_eq!(
            Value::parse("2020-02-29", &DType::Date),
            Value::Date(NaiveDate::from_ymd_opt(2020, 2, 29).unwrap())
        );
        // Unparseable text falls back to a string
        assert_eq!(
            Value::parse("thirty", &DType::Int),
            Value::String("thirty".to_string())
        );
    }

    #[test]
    fn test_datetime_iso_string() {
        let value = Value::parse("2019-04-01 13:05:00", &DType::DateTime);
        assert_eq!(value.iso_string().as_deref(), Some("2019-04-01T13:05:00"));
    }

    #[test]
    fn test_matches_declared_type() {
        assert!(Value::Int(1).matches(&DType::Float));
        assert!(!Value::from("x").matches(&DType::Int));
        assert!(Value::from("2019-04-01").matches(&DType::Date));
        assert!(Value::from("anything").matches(&DType::Unknown("x".into())));
    }

    #[test]
    fn test_parse_list_quotes_and_nulls() {
        assert_eq!(
            parse_list(r#"[a, "b, c", , 'd']"#),
            vec![
                Some("a".to_string()),
                Some("b, c".to_string()),
                None,
                Some("d".to_string())
            ]
        );
        assert_eq!(parse_list("[]"), Vec::<Option<String>>::new());
        assert_eq!(parse_list("[,]"), vec![None]);
        assert_eq!(parse_list("single"), vec![Some("single".to_string())]);
    }

    #[test]
    fn test_render_list_reads_back() {
        let values = vec![Some(Value::from("x, y")), None, Some(Value::Int(3)), None];
        let rendered = render_list(&values);
        let items = parse_list(&rendered);
        assert_eq!(
            items,
            vec![Some("x, y".to_string()), None, Some("3".to_string()), None]
        );
    }

    #[rstest]
    #[case(r#"it's "fine", really"#)]
    #[case("'kept'")]
    #[case(r#""quoted""#)]
    #[case("it's")]
    #[case(r#"say "hi""#)]
    #[case(r"C:\data\, raw")]
    #[case(r#"both ' and " \ here"#)]
    #[case("  padded ")]
    #[case("")]
    fn test_render_list_keeps_text(#[case] text: &str) {
        let values = vec![Some(Value::from(text)), Some(Value::from("tail"))];
        assert_eq!(
            parse_list(&render_list(&values)),
            vec![Some(text.to_string()), Some("tail".to_string())]
        );
    }

    #[test]
    fn test_quotes_inside_bare_items_are_text() {
        assert_eq!(
            parse_list(r#"[it's, 5", "x, y" , 'z']"#),
            vec![
                Some("it's".to_string()),
                Some("5\"".to_string()),
                Some("x, y".to_string()),
                Some("z".to_string())
            ]
        );
    }
}
