//! Verified token claims
//!
//! Claims are addressed with dotted paths: `realm_access.roles` walks the
//! `realm_access` object and returns its `roles` member. A path that runs
//! into a missing key or a non-object value before its last segment
//! resolves to nothing.

mod value;

pub use value::{ClaimMap, ClaimValue};

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::{Result, ViravaError};

/// Path separator for nested claims
pub const PATH_SEPARATOR: char = '.';

/// Top-level claim set of a verified token
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Claims {
    map: ClaimMap,
}

impl Claims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build claims from a JSON document, which must be an object
    pub fn from_json(value: JsonValue) -> Result<Self> {
        match value {
            JsonValue::Object(obj) => Ok(Self::from(obj)),
            other => Err(ViravaError::authentication(format!(
                "Token payload is not a JSON object: {}",
                json_kind(&other)
            ))),
        }
    }

    /// Build claims from an already converted map
    pub fn from_map(map: ClaimMap) -> Self {
        Self { map }
    }

    /// Insert or replace a top-level claim
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ClaimValue>) {
        self.map.insert(name.into(), value.into());
    }

    /// Top-level claim by exact name; no path splitting
    pub fn get(&self, name: &str) -> Option<&ClaimValue> {
        self.map.get(name)
    }

    /// Resolve a dotted path to a raw claim value
    pub fn lookup(&self, path: &str) -> Option<&ClaimValue> {
        let mut segments = path.split(PATH_SEPARATOR);
        let mut current = self.map.get(segments.next()?)?;

        for segment in segments {
            current = current.as_map()?.get(segment)?;
        }

        Some(current)
    }

    pub fn string(&self, path: &str) -> Option<&str> {
        self.lookup(path)?.as_str()
    }

    pub fn boolean(&self, path: &str) -> Option<bool> {
        self.lookup(path)?.as_bool()
    }

    pub fn integer(&self, path: &str) -> Option<i64> {
        self.lookup(path)?.as_i64()
    }

    /// String list at `path`; `None` when absent or not a list of strings
    pub fn string_list(&self, path: &str) -> Option<Vec<String>> {
        self.lookup(path)?.as_string_list()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ClaimValue)> {
        self.map.iter()
    }
}

impl From<serde_json::Map<String, JsonValue>> for Claims {
    fn from(obj: serde_json::Map<String, JsonValue>) -> Self {
        Self {
            map: obj
                .into_iter()
                .map(|(k, v)| (k, ClaimValue::from(v)))
                .collect(),
        }
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
