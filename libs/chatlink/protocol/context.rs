//! Conversation context
//!
//! An open record describing what the conversation is about (a document, a
//! quotation, a product...). Only the `type` discriminator is fixed, the
//! remaining fields depend on the type.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Tagged, open context record
///
/// Serialized as a flat JSON object: `{"type": "quotation", "id": "Q-1", ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Context {
    kind: String,
    fields: Map<String, Value>,
}

impl Context {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: Map::new(),
        }
    }

    /// Add a type-specific field. A `type` key is ignored.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != "type" {
            self.fields.insert(key, value.into());
        }
        self
    }

    /// The `type` discriminator
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl TryFrom<Map<String, Value>> for Context {
    type Error = String;

    fn try_from(mut map: Map<String, Value>) -> Result<Self, Self::Error> {
        match map.remove("type") {
            Some(Value::String(kind)) => Ok(Self { kind, fields: map }),
            Some(other) => Err(format!("context type must be a string, got {}", other)),
            None => Err("context is missing its type".to_string()),
        }
    }
}

impl From<Context> for Map<String, Value> {
    fn from(context: Context) -> Self {
        let mut map = Map::with_capacity(context.fields.len() + 1);
        map.insert("type".to_string(), Value::String(context.kind));
        map.extend(context.fields);
        map
    }
}
