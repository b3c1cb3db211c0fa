//! Claim value model and conversion from `serde_json::Value`

use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Nested claim object
pub type ClaimMap = BTreeMap<String, ClaimValue>;

/// A decoded token claim
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ClaimValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<ClaimValue>),
    Map(ClaimMap),
}

impl ClaimValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClaimValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ClaimValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ClaimValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ClaimValue]> {
        match self {
            ClaimValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ClaimMap> {
        match self {
            ClaimValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// List of strings; `None` unless every element is a string
    pub fn as_string_list(&self) -> Option<Vec<String>> {
        self.as_list()?
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect()
    }
}

impl From<JsonValue> for ClaimValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => ClaimValue::Null,
            JsonValue::Bool(b) => ClaimValue::Bool(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ClaimValue::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    ClaimValue::Float(f)
                } else {
                    ClaimValue::Null
                }
            }
            JsonValue::String(s) => ClaimValue::String(s),
            JsonValue::Array(items) => {
                ClaimValue::List(items.into_iter().map(ClaimValue::from).collect())
            }
            JsonValue::Object(obj) => ClaimValue::Map(
                obj.into_iter()
                    .map(|(k, v)| (k, ClaimValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        ClaimValue::String(value.to_string())
    }
}

impl From<bool> for ClaimValue {
    fn from(value: bool) -> Self {
        ClaimValue::Bool(value)
    }
}
