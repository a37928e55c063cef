//! The message envelope exchanged between engine and embedded content.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An opaque JSON record.
///
/// The connector only passes messages through; the accessors exist for the
/// engine side, which interprets the well-known keys (`action`, `name`, `key`,
/// `id`, `payload`, `error`). Unknown keys are preserved exactly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Map<String, Value>);

impl Message {
    /// Creates an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts a raw JSON value; `None` if it is not an object.
    pub fn from_value(raw: Value) -> Option<Self> {
        match raw {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Converts back into a raw JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Sets a field, replacing any previous value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Returns a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns a string field.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn action(&self) -> Option<&str> {
        self.get_str("action")
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    pub fn key(&self) -> Option<&str> {
        self.get_str("key")
    }

    pub fn id(&self) -> Option<u64> {
        self.0.get("id").and_then(Value::as_u64)
    }

    pub fn payload(&self) -> Option<&Value> {
        self.0.get("payload")
    }

    pub fn error(&self) -> Option<&str> {
        self.get_str("error")
    }

    /// Caller metadata attached to requests.
    pub fn request_info(&self) -> Option<&Value> {
        self.0.get("requestInfo")
    }

    /// Returns the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Message {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
