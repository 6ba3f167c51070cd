use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{deserialization_error, serialization_error, OrmResult};
use crate::model::DocumentKey;

/// Field data of a single document, keyed by top-level field name.
pub type FieldMap = serde_json::Map<String, Value>;

/// A document as it travels to and from the backing store.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    key: DocumentKey,
    fields: FieldMap,
}

impl Record {
    pub fn new(key: DocumentKey, fields: FieldMap) -> Self {
        Self { key, fields }
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn into_fields(self) -> FieldMap {
        self.fields
    }

    /// Convenience accessor for a single top-level field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Serializes a model into a field map via its `Serialize` implementation.
///
/// The model must serialize to a JSON object; anything else is a
/// serialization error.
pub fn to_field_map<T: Serialize>(model: &T) -> OrmResult<FieldMap> {
    match serde_json::to_value(model) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(serialization_error(format!(
            "Model must serialize to an object, got {}",
            value_kind(&other)
        ))),
        Err(err) => Err(serialization_error(err.to_string())),
    }
}

/// Reconstructs a model from a record's field map via `Deserialize`.
pub fn from_field_map<T: DeserializeOwned>(fields: &FieldMap) -> OrmResult<T> {
    serde_json::from_value(Value::Object(fields.clone()))
        .map_err(|err| deserialization_error(err.to_string()))
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
