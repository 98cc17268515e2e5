//! The message envelope that flows into and out of every adapter.
//!
//! A [`Message`] is an open JSON object. Adapters read a fixed subset of its
//! fields and write a fixed subset back before forwarding it; everything
//! else passes through untouched. No field is guaranteed to be present, so
//! all typed accessors return `Option`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A host message: a mapping of named JSON fields.
///
/// Serialises transparently as the underlying JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Map<String, Value>);

impl Message {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// A message carrying only `payload`.
    pub fn with_payload(payload: impl Into<Value>) -> Self {
        Self::new().with("payload", payload)
    }

    /// Builder-style [`Message::set`].
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Wrap a JSON value. Returns `None` unless `value` is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn payload(&self) -> Option<&Value> {
        self.get("payload")
    }

    /// `true` if the field exists and is not `null`.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_null())
    }

    /// Read an identifier-like field (database name, document id).
    ///
    /// Non-empty strings are returned as-is and numbers are rendered in
    /// decimal. Empty strings, `null`, booleans, arrays and objects read as
    /// absent.
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).and_then(as_text)
    }

    /// Read a boolean option. Accepts JSON booleans and the strings
    /// `"true"` / `"false"`; anything else reads as absent.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// `true` when the field is present and truthy in the host's sense:
    /// not `null`, `false`, `0` or `""`.
    pub fn truthy(&self, key: &str) -> bool {
        self.get(key).is_some_and(is_truthy)
    }

    /// Read a non-negative count (`limit`, `skip`). Accepts integers,
    /// non-negative floats (truncated) and numeric strings.
    pub fn count(&self, key: &str) -> Option<u64> {
        match self.get(key)? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// The field if it is a JSON object.
    pub fn object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.get(key).and_then(Value::as_object)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Message {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Identifier reading shared with node configuration parsing.
pub(crate) fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
