//! Field types and bound field values.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::{ClassKey, ModelInstance};

/// The declared type of a model field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Text.
    String,
    /// Any finite floating point number.
    Number,
    /// A 64-bit signed integer.
    Int,
    /// `true` or `false`.
    Bool,
    /// A UTC timestamp.
    Date,
    /// Another declared model, bound from a nested object.
    Model(ClassKey),
    /// A list whose elements all have the inner type.
    Array(Box<FieldType>),
}

impl FieldType {
    /// A nested model of `class`.
    pub fn model(class: impl Into<ClassKey>) -> Self {
        Self::Model(class.into())
    }

    /// A list of `inner`.
    pub fn array_of(inner: FieldType) -> Self {
        Self::Array(Box::new(inner))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Int => write!(f, "int"),
            Self::Bool => write!(f, "bool"),
            Self::Date => write!(f, "date"),
            Self::Model(class) => write!(f, "{class}"),
            Self::Array(inner) => write!(f, "array of {inner}"),
        }
    }
}

/// A value held by a [`ModelInstance`].
///
/// Absence of a field is represented by the field missing from the instance;
/// `Null` is an explicit null.  Values that failed coercion are kept as they
/// arrived, which is usually `String` or `Raw`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Explicit null.
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A floating point number.
    Number(f64),
    /// Text.
    String(String),
    /// A timestamp, serialized as RFC 3339.
    Date(DateTime<Utc>),
    /// A list of values.
    List(Vec<FieldValue>),
    /// A nested model.
    Model(Box<ModelInstance>),
    /// JSON that has no closer representation.
    Raw(Value),
}

impl FieldValue {
    /// Converts JSON into the closest value without consulting a field type.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map(Self::Number).unwrap_or_else(|| Self::Raw(value.clone())),
            },
            Value::String(s) => Self::String(s.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            Value::Object(_) => Self::Raw(value.clone()),
        }
    }

    /// The value as JSON.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::String(s) => Value::String(s.clone()),
            Self::Date(d) => Value::String(d.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Model(model) => model.to_json(),
            Self::Raw(value) => value.clone(),
        }
    }

    /// True for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The text, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The integer, if this is an int.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The number, if this is an int or a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The boolean, if this is a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The timestamp, if this is a date.
    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::Date(d) => Some(d),
            _ => None,
        }
    }

    /// The nested model, if this is one.
    pub fn as_model(&self) -> Option<&ModelInstance> {
        match self {
            Self::Model(m) => Some(m),
            _ => None,
        }
    }
}

/// True when a field is undefined, null or the empty string.
pub(crate) fn is_blank(value: Option<&FieldValue>) -> bool {
    match value {
        None | Some(FieldValue::Null) => true,
        Some(FieldValue::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{}", d.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::List(items) => {
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Self::Model(model) => write!(f, "{}", model.to_json()),
            Self::Raw(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        Self::Int(i.into())
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(d: DateTime<Utc>) -> Self {
        Self::Date(d)
    }
}

impl From<ModelInstance> for FieldValue {
    fn from(m: ModelInstance) -> Self {
        Self::Model(Box::new(m))
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

impl From<&Value> for FieldValue {
    fn from(value: &Value) -> Self {
        Self::from_json(value)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn json_conversion_picks_closest_variant() {
        assert_eq!(FieldValue::from_json(&json!(null)), FieldValue::Null);
        assert_eq!(FieldValue::from_json(&json!(3)), FieldValue::Int(3));
        assert_eq!(FieldValue::from_json(&json!(3.5)), FieldValue::Number(3.5));
        assert_eq!(FieldValue::from_json(&json!("x")), FieldValue::from("x"));
        assert_eq!(
            FieldValue::from_json(&json!([1, "a"])),
            FieldValue::List(vec![FieldValue::Int(1), FieldValue::from("a")])
        );
        assert_eq!(
            FieldValue::from_json(&json!({"a": 1})),
            FieldValue::Raw(json!({"a": 1}))
        );
    }

    #[test]
    fn dates_render_as_rfc3339() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let value = FieldValue::from(date);
        assert_eq!(value.to_json(), json!("2024-05-01T00:00:00Z"));
        assert_eq!(value.to_string(), "2024-05-01T00:00:00Z");
    }

    #[test]
    fn blankness() {
        assert!(is_blank(None));
        assert!(is_blank(Some(&FieldValue::Null)));
        assert!(is_blank(Some(&FieldValue::from(""))));
        assert!(!is_blank(Some(&FieldValue::from(" "))));
        assert!(!is_blank(Some(&FieldValue::Int(0))));
        assert!(!is_blank(Some(&FieldValue::Bool(false))));
    }

    #[test]
    fn field_type_display() {
        assert_eq!(FieldType::array_of(FieldType::Int).to_string(), "array of int");
        assert_eq!(FieldType::model("Address").to_string(), "Address");
    }
}
