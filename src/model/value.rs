//! Free-form properties carried on nodes and links.
//!
//! The walk only reads the typed physics fields of `Node` / `Link`.
//! Properties are what the store keeps beside them: a crystallized
//! narrative's rendered `content`, its `created_at`, ingest tags.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One property value. Serializes as plain JSON (`"text"`, `0.5`, `true`,
/// `["a", "b"]`, RFC 3339 for timestamps).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Flag(bool),
    Number(f64),
    Timestamp(DateTime<Utc>),
    Text(String),
    Tags(Vec<String>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Tags, or the single text value as a one-element tag list.
    pub fn tags(&self) -> Vec<&str> {
        match self {
            Value::Tags(t) => t.iter().map(String::as_str).collect(),
            Value::Text(s) => vec![s.as_str()],
            _ => Vec::new(),
        }
    }
}

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Flag(v) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Number(v as f64) } }
impl From<f32> for Value { fn from(v: f32) -> Self { Value::Number(v as f64) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Number(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::Text(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::Text(v.to_owned()) } }
impl From<DateTime<Utc>> for Value { fn from(v: DateTime<Utc>) -> Self { Value::Timestamp(v) } }
impl From<Vec<String>> for Value { fn from(v: Vec<String>) -> Self { Value::Tags(v) } }
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Flag(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Text(s) => write!(f, "{s}"),
            Value::Tags(t) => write!(f, "#{}", t.join(" #")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from() {
        assert_eq!(Value::from("forge"), Value::Text("forge".into()));
        assert_eq!(Value::from(3i64), Value::Number(3.0));
        assert_eq!(Value::from(true), Value::Flag(true));
        assert_eq!(Value::from(None::<f64>), Value::Null);
    }

    #[test]
    fn test_plain_json_shape() {
        let v: Value = serde_json::from_str("\"Ada → Forge\"").unwrap();
        assert_eq!(v.as_str(), Some("Ada → Forge"));
        let v: Value = serde_json::from_str("0.25").unwrap();
        assert_eq!(v.as_f64(), Some(0.25));
        let v: Value = serde_json::from_str("[\"war\", \"memory\"]").unwrap();
        assert_eq!(v.tags(), vec!["war", "memory"]);
        assert_eq!(serde_json::to_string(&Value::Null).unwrap(), "null");
    }

    #[test]
    fn test_timestamp_roundtrips_as_rfc3339() {
        let t: DateTime<Utc> = "2024-05-01T12:00:00Z".parse().unwrap();
        let json = serde_json::to_string(&Value::from(t)).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_timestamp(), Some(t));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(vec!["a".to_string(), "b".to_string()]).to_string(), "#a #b");
        assert_eq!(Value::from("x").to_string(), "x");
    }
}
