//! Storage types, type tags and values of container properties.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ContainerError;

/// Native storage type of a property's values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Bool,
    Int64,
    Double,
    String,
}

impl DataType {
    /// Storage type of a single value.
    pub fn of(value: &NixValue) -> Self {
        match value {
            NixValue::Bool(_) => Self::Bool,
            NixValue::Int(_) => Self::Int64,
            NixValue::Double(_) => Self::Double,
            NixValue::String(_) => Self::String,
        }
    }
}

/// A stored property value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NixValue {
    Bool(bool),
    Int(i64),
    Double(#[serde(with = "double_repr")] f64),
    String(String),
}

/// JSON has no NaN or infinity; those are stored as `{"float": "NaN"}`,
/// `{"float": "inf"}` and `{"float": "-inf"}`.
mod double_repr {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Finite(f64),
        NonFinite { float: String },
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            return serializer.serialize_f64(*value);
        }
        let float = if value.is_nan() {
            "NaN"
        } else if value.is_sign_positive() {
            "inf"
        } else {
            "-inf"
        };
        Repr::NonFinite {
            float: float.to_string(),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Finite(value) => Ok(value),
            Repr::NonFinite { float } => match float.as_str() {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("invalid float value: {other}"))),
            },
        }
    }
}

impl NixValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for NixValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
        }
    }
}

impl From<&str> for NixValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for NixValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for NixValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for NixValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for NixValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// The odML type a property was declared with, kept so a later export can
/// restore it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OdmlType {
    Boolean,
    Int,
    Float,
    String,
    Text,
    Person,
    Url,
    Datetime,
    Date,
    Time,
}

impl OdmlType {
    /// Look up a tag by odML type name.
    pub fn from_name(name: &str) -> Result<Self, ContainerError> {
        match name {
            "boolean" => Ok(Self::Boolean),
            "int" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            "string" => Ok(Self::String),
            "text" => Ok(Self::Text),
            "person" => Ok(Self::Person),
            "url" => Ok(Self::Url),
            "datetime" => Ok(Self::Datetime),
            "date" => Ok(Self::Date),
            "time" => Ok(Self::Time),
            other => Err(ContainerError::UnknownOdmlType(other.to_string())),
        }
    }
}

/// Text encoding accepted by the storage layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    /// Any UTF-8 text.
    #[default]
    Utf8,
    /// 7-bit ASCII only, as legacy storage layers require.
    Ascii,
}

impl TextEncoding {
    /// Check that `text` can be stored in `field`.
    pub fn check(self, field: &'static str, text: &str) -> Result<(), ContainerError> {
        match self {
            Self::Ascii if !text.is_ascii() => Err(ContainerError::Encoding {
                field,
                value: text.to_string(),
            }),
            _ => Ok(()),
        }
    }
}
