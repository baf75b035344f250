//! Value bindings.
//!
//! Every schema node is paired with a `ValueBinding`: either a literal whose
//! shape follows the schema kind, or a reference path into the variables
//! visible to the node.
//!
//! The plain form used for persistence is ordinary JSON for literals and
//! `{"type": "reference", "content": "<path>"}` for references. Decoding is
//! schema-directed, so a plain value that does not fit its schema is coerced
//! rather than rejected.

use crate::kind::PropertyKind;
use crate::ordered::OrderedMap;
use crate::schema::PropertySchema;
use serde_json::Value as JsonValue;

/// A literal value. One variant per data kind.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    String(String),
    Number(f64),
    Integer(i64),
    Boolean(bool),
    /// Opaque file handle issued by the upload service.
    File(String),
    Object(OrderedMap<ValueBinding>),
    Array(Vec<ValueBinding>),
}

/// The value paired with a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueBinding {
    Literal(LiteralValue),
    /// Dot-delimited path into a variable scope. Not validated on write.
    Reference(String),
}

impl LiteralValue {
    /// Returns the kind this literal satisfies.
    #[must_use]
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::String(_) => PropertyKind::String,
            Self::Number(_) => PropertyKind::Number,
            Self::Integer(_) => PropertyKind::Integer,
            Self::Boolean(_) => PropertyKind::Boolean,
            Self::File(_) => PropertyKind::File,
            Self::Object(_) => PropertyKind::Object,
            Self::Array(_) => PropertyKind::Array,
        }
    }

    /// Returns the zero value of a kind.
    ///
    /// Expression fields hold raw text, so their zero value is the empty
    /// string.
    #[must_use]
    pub fn zero(kind: PropertyKind) -> Self {
        match kind {
            PropertyKind::String | PropertyKind::Expression => Self::String(String::new()),
            PropertyKind::File => Self::File(String::new()),
            PropertyKind::Number => Self::Number(0.0),
            PropertyKind::Integer => Self::Integer(0),
            PropertyKind::Boolean => Self::Boolean(false),
            PropertyKind::Object => Self::Object(OrderedMap::new()),
            PropertyKind::Array => Self::Array(Vec::new()),
        }
    }

    /// Renders the literal as editable text.
    ///
    /// Strings and file handles are returned as-is, numbers and booleans are
    /// stringified, containers are serialized as JSON.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::String(text) | Self::File(text) => text.clone(),
            Self::Number(n) => n.to_string(),
            Self::Integer(n) => n.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Object(_) | Self::Array(_) => self.to_plain().to_string(),
        }
    }

    /// Converts the literal into its plain JSON form.
    #[must_use]
    pub fn to_plain(&self) -> JsonValue {
        match self {
            Self::String(text) | Self::File(text) => JsonValue::String(text.clone()),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::Integer(n) => JsonValue::from(*n),
            Self::Boolean(b) => JsonValue::Bool(*b),
            Self::Object(map) => JsonValue::Object(
                map.iter()
                    .map(|(name, child)| (name.to_string(), child.to_plain()))
                    .collect(),
            ),
            Self::Array(items) => JsonValue::Array(items.iter().map(ValueBinding::to_plain).collect()),
        }
    }
}

impl ValueBinding {
    /// Creates a string literal.
    #[must_use]
    pub fn string(text: impl Into<String>) -> Self {
        Self::Literal(LiteralValue::String(text.into()))
    }

    /// Creates a reference.
    #[must_use]
    pub fn reference(path: impl Into<String>) -> Self {
        Self::Reference(path.into())
    }

    /// Returns the zero value for a kind.
    #[must_use]
    pub fn zero(kind: PropertyKind) -> Self {
        Self::Literal(LiteralValue::zero(kind))
    }

    /// Returns a value for `schema` with every declared child zeroed.
    #[must_use]
    pub fn zero_for(schema: &PropertySchema) -> Self {
        match schema.properties() {
            Some(properties) => Self::Literal(LiteralValue::Object(
                properties
                    .iter()
                    .map(|(name, child)| (name, Self::zero_for(child)))
                    .collect(),
            )),
            None => Self::zero(schema.kind()),
        }
    }

    /// Returns the literal, if this is one.
    #[must_use]
    pub fn as_literal(&self) -> Option<&LiteralValue> {
        match self {
            Self::Literal(literal) => Some(literal),
            Self::Reference(_) => None,
        }
    }

    /// Returns the reference path, if this is a reference.
    #[must_use]
    pub fn as_reference(&self) -> Option<&str> {
        match self {
            Self::Reference(path) => Some(path),
            Self::Literal(_) => None,
        }
    }

    /// Returns the editable text of this value. References yield their path.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Literal(literal) => literal.to_text(),
            Self::Reference(path) => path.clone(),
        }
    }

    /// Converts into the plain persisted form.
    #[must_use]
    pub fn to_plain(&self) -> JsonValue {
        match self {
            Self::Literal(literal) => literal.to_plain(),
            Self::Reference(path) => serde_json::json!({
                "type": "reference",
                "content": path,
            }),
        }
    }

    /// Decodes a plain value against `schema`.
    ///
    /// Values that do not fit are coerced: scalars are parsed from text where
    /// possible and otherwise zeroed, object keys without a schema
    /// counterpart are dropped, and missing keys are zero-filled.
    #[must_use]
    pub fn from_plain(schema: &PropertySchema, value: &JsonValue) -> Self {
        match schema.kind() {
            PropertyKind::Expression => decode_expression(value),
            PropertyKind::Object => {
                let Some(properties) = schema.properties() else {
                    return Self::zero(PropertyKind::Object);
                };
                let object = value.as_object();
                Self::Literal(LiteralValue::Object(
                    properties
                        .iter()
                        .map(|(name, child)| {
                            let binding = match object.and_then(|o| o.get(name)) {
                                Some(plain) => Self::from_plain(child, plain),
                                None => Self::zero_for(child),
                            };
                            (name, binding)
                        })
                        .collect(),
                ))
            }
            PropertyKind::Array => {
                let items = match (schema.items(), value.as_array()) {
                    (Some(item_schema), Some(elements)) => elements
                        .iter()
                        .map(|element| Self::from_plain(item_schema, element))
                        .collect(),
                    _ => Vec::new(),
                };
                Self::Literal(LiteralValue::Array(items))
            }
            kind => Self::Literal(coerce_scalar(kind, value)),
        }
    }

    /// Re-shapes an existing value so it mirrors `schema`.
    #[must_use]
    pub fn conform(&self, schema: &PropertySchema) -> Self {
        match self {
            Self::Reference(_) if schema.is_expression() => self.clone(),
            _ => Self::from_plain(schema, &self.to_plain()),
        }
    }
}

fn decode_expression(value: &JsonValue) -> ValueBinding {
    if let Some(object) = value.as_object() {
        if object.get("type").and_then(JsonValue::as_str) == Some("reference") {
            let path = object
                .get("content")
                .and_then(JsonValue::as_str)
                .unwrap_or_default();
            return ValueBinding::Reference(path.to_string());
        }
        if object.get("type").and_then(JsonValue::as_str) == Some("literal") {
            let text = object.get("content").map(plain_text).unwrap_or_default();
            return ValueBinding::string(text);
        }
    }
    ValueBinding::string(plain_text(value))
}

fn plain_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn coerce_scalar(kind: PropertyKind, value: &JsonValue) -> LiteralValue {
    match kind {
        PropertyKind::String => LiteralValue::String(plain_text(value)),
        PropertyKind::File => LiteralValue::File(plain_text(value)),
        PropertyKind::Number => LiteralValue::Number(match value {
            JsonValue::Number(n) => n.as_f64().unwrap_or(0.0),
            other => parse_float(&plain_text(other)),
        }),
        PropertyKind::Integer => LiteralValue::Integer(match value {
            JsonValue::Number(n) => n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64),
            other => parse_float(&plain_text(other)) as i64,
        }),
        PropertyKind::Boolean => LiteralValue::Boolean(match value {
            JsonValue::Bool(b) => *b,
            other => plain_text(other) == "true",
        }),
        PropertyKind::Object | PropertyKind::Array | PropertyKind::Expression => {
            LiteralValue::zero(kind)
        }
    }
}

/// Parses the longest numeric prefix of `text`, ignoring leading whitespace.
///
/// Returns 0 when there is no numeric prefix or the result is not finite.
#[must_use]
pub fn parse_float(text: &str) -> f64 {
    let trimmed = text.trim_start();
    let candidate_len = trimmed
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    (1..=candidate_len)
        .rev()
        .find_map(|len| trimmed[..len].parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}
