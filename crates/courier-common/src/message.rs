//! The message payload model: the unit of application data carried
//! end-to-end.
//!
//! A message is a JSON object: string keys mapped to the closed set of
//! JSON value variants (null, bool, number, string, array, object). Key
//! order is preserved across an encode/decode round trip. Anything that
//! is not a JSON object is rejected at the encode/decode boundary rather
//! than coerced.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A structured message payload.
///
/// Wraps an ordered `serde_json` object map. Construct one from key/value
/// pairs with [`Message::insert`], or convert from an existing
/// `serde_json::Value` with [`Message::from_value`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(pub Map<String, Value>);

impl Message {
    /// Create an empty message.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Insert a key/value pair, replacing any previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Convert a JSON value into a message.
    ///
    /// Fails unless the value is a JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::serialization(format!(
                "message payload must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Serialize the message to its canonical byte encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.0).map_err(Error::serialization)
    }

    /// Deserialize a message from bytes produced by [`Message::to_bytes`].
    ///
    /// Fails on invalid JSON and on any top-level value that is not an
    /// object.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes).map_err(Error::serialization)?;
        Self::from_value(value)
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the message carries no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up a top-level value by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl From<Map<String, Value>> for Message {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
