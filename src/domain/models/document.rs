//! Document shapes exchanged with the remote store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw document as returned by the remote store: a generated identifier plus
/// schemaless fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub id: String,
    pub fields: Value,
}

impl RawDocument {
    pub fn new(id: impl Into<String>, fields: Value) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// The fields with the id injected at the top level. This is the shape
    /// schemas validate against, so rules may reference `id` like any other
    /// field.
    pub fn merged(&self) -> Value {
        let mut merged = self.fields.clone();
        if let Value::Object(ref mut map) = merged {
            map.insert("id".to_string(), Value::String(self.id.clone()));
        }
        merged
    }
}

/// A typed entity plus its generated identifier. Every record handed to
/// callers carries a non-empty id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    pub id: String,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Record<T> {
    pub fn new(id: impl Into<String>, data: T) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}
