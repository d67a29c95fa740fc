//! Documents as seen through the `DocumentStore` interface.
//!
//! # Design
//! Field values are plain `serde_json::Value`s. Each backend translates them
//! to its own wire representation, so callers never see store-specific
//! encodings such as Firestore's typed value wrappers.

use serde_json::{Map, Value};

/// Field map of a single document.
pub type Fields = Map<String, Value>;

/// A stored document: its store-assigned id plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// The field as a string, if present and of string type.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}
