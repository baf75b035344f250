//! Persisted form of a parameter tree.
//!
//! The document is what a node stores in its saved data: the schema in its
//! serde form and the values as plain JSON. Expression-mode fields persist as
//! raw text or as `{"type": "reference", "content": "<path>"}`.

use crate::error::DocumentError;
use crate::kind::PropertyKind;
use crate::ordered::OrderedMap;
use crate::schema::PropertySchema;
use crate::tree::ParameterTree;
use crate::value::{LiteralValue, ValueBinding};
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A parameter tree in plain nested-object form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDocument {
    /// The root schema.
    pub schema: PropertySchema,
    /// The values as plain JSON, keyed like the schema.
    #[serde(default)]
    pub values: JsonValue,
}

impl ParameterDocument {
    /// Parses a document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::Parse` for malformed JSON.
    pub fn from_json_str(json: &str) -> Result<Self, Report<DocumentError>> {
        let document = serde_json::from_str(json).map_err(|e| DocumentError::Parse {
            details: e.to_string(),
        })?;
        Ok(document)
    }

    /// Serializes the document to JSON text.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        serde_json::to_value(self)
            .map(|value| value.to_string())
            .unwrap_or_default()
    }
}

impl ParameterTree {
    /// Converts the tree to its persisted form.
    #[must_use]
    pub fn to_document(&self) -> ParameterDocument {
        ParameterDocument {
            schema: self.schema().clone(),
            values: ValueBinding::Literal(LiteralValue::Object(self.values().clone())).to_plain(),
        }
    }

    /// Rebuilds a tree from its persisted form.
    ///
    /// Values are decoded against the schema, so stale or hand-edited
    /// documents load with their values coerced rather than failing.
    ///
    /// # Errors
    ///
    /// Returns an error if the root schema is not an object or the values are
    /// not an object.
    pub fn from_document(document: &ParameterDocument) -> Result<Self, Report<DocumentError>> {
        if document.schema.kind() != PropertyKind::Object {
            return Err(DocumentError::RootNotObject {
                found: document.schema.kind(),
            }
            .into());
        }
        if !matches!(document.values, JsonValue::Object(_) | JsonValue::Null) {
            return Err(DocumentError::ValuesNotObject.into());
        }

        let values = match ValueBinding::from_plain(&document.schema, &document.values) {
            ValueBinding::Literal(LiteralValue::Object(map)) => map,
            _ => OrderedMap::new(),
        };
        let tree = ParameterTree::from_parts(document.schema.clone(), values).map_err(|e| {
            DocumentError::Parse {
                details: e.to_string(),
            }
        })?;
        Ok(tree)
    }
}
