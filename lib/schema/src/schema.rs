//! Property schemas.
//!
//! A `PropertySchema` describes the shape of one parameter: a primitive, an
//! object with ordered named children, or an array with an item schema. The
//! kind and the presence of children are always consistent; every constructor
//! and mutator here upholds that, and deserialization normalizes input that
//! does not.

use crate::kind::PropertyKind;
use crate::ordered::OrderedMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One node of a schema tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SchemaRepr", into = "SchemaRepr")]
pub struct PropertySchema {
    kind: PropertyKind,
    /// Display title. Falls back to the property key when absent.
    pub title: Option<String>,
    /// Free-form description shown next to the field.
    pub description: Option<String>,
    properties: Option<OrderedMap<PropertySchema>>,
    items: Option<Box<PropertySchema>>,
    /// Whether the field must be filled in.
    pub required: bool,
    stashed_kind: Option<PropertyKind>,
    stashed_description: Option<String>,
}

impl PropertySchema {
    /// Creates a schema of the given kind with empty children where the kind
    /// requires them. Arrays default to string items.
    #[must_use]
    pub fn new(kind: PropertyKind) -> Self {
        let mut schema = Self {
            kind: PropertyKind::String,
            title: None,
            description: None,
            properties: None,
            items: None,
            required: false,
            stashed_kind: None,
            stashed_description: None,
        };
        schema.retype(kind);
        schema
    }

    /// Creates a string schema.
    #[must_use]
    pub fn string() -> Self {
        Self::new(PropertyKind::String)
    }

    /// Creates a number schema.
    #[must_use]
    pub fn number() -> Self {
        Self::new(PropertyKind::Number)
    }

    /// Creates an integer schema.
    #[must_use]
    pub fn integer() -> Self {
        Self::new(PropertyKind::Integer)
    }

    /// Creates a boolean schema.
    #[must_use]
    pub fn boolean() -> Self {
        Self::new(PropertyKind::Boolean)
    }

    /// Creates a file schema.
    #[must_use]
    pub fn file() -> Self {
        Self::new(PropertyKind::File)
    }

    /// Creates an object schema with no properties.
    #[must_use]
    pub fn object() -> Self {
        Self::new(PropertyKind::Object)
    }

    /// Creates an array schema with the given item schema.
    #[must_use]
    pub fn array(items: PropertySchema) -> Self {
        let mut schema = Self::new(PropertyKind::Array);
        schema.items = Some(Box::new(items));
        schema
    }

    /// Appends a property. A non-object schema is turned into an object first.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, schema: PropertySchema) -> Self {
        if self.kind != PropertyKind::Object {
            self.retype(PropertyKind::Object);
        }
        self.properties
            .get_or_insert_with(OrderedMap::new)
            .insert(name, schema);
        self
    }

    /// Sets the display title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Returns the current kind.
    #[must_use]
    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Returns true while the field is in expression mode.
    #[must_use]
    pub fn is_expression(&self) -> bool {
        self.kind == PropertyKind::Expression
    }

    /// Returns the kind stashed while in expression mode.
    #[must_use]
    pub fn stashed_kind(&self) -> Option<PropertyKind> {
        self.stashed_kind
    }

    /// Returns the description stashed while in expression mode.
    #[must_use]
    pub fn stashed_description(&self) -> Option<&str> {
        self.stashed_description.as_deref()
    }

    /// Returns the kind the field holds once it leaves expression mode.
    #[must_use]
    pub fn effective_kind(&self) -> PropertyKind {
        match self.kind {
            PropertyKind::Expression => self.stashed_kind.unwrap_or(PropertyKind::String),
            kind => kind,
        }
    }

    /// Returns the ordered children of an object schema.
    #[must_use]
    pub fn properties(&self) -> Option<&OrderedMap<PropertySchema>> {
        self.properties.as_ref()
    }

    /// Returns the child named `name` of an object schema.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertySchema> {
        self.properties.as_ref()?.get(name)
    }

    /// Returns the item schema of an array schema.
    #[must_use]
    pub fn items(&self) -> Option<&PropertySchema> {
        self.items.as_deref()
    }

    /// Returns the title, or `key` when no title is set.
    #[must_use]
    pub fn display_title<'a>(&'a self, key: &'a str) -> &'a str {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title,
            _ => key,
        }
    }

    pub(crate) fn properties_mut(&mut self) -> Option<&mut OrderedMap<PropertySchema>> {
        self.properties.as_mut()
    }

    pub(crate) fn items_mut(&mut self) -> Option<&mut PropertySchema> {
        self.items.as_deref_mut()
    }

    pub(crate) fn set_properties(&mut self, properties: OrderedMap<PropertySchema>) {
        if self.kind == PropertyKind::Object {
            self.properties = Some(properties);
        }
    }

    pub(crate) fn set_items(&mut self, items: PropertySchema) {
        if self.kind == PropertyKind::Array {
            self.items = Some(Box::new(items));
        }
    }

    /// Changes the kind, keeping children consistent with it.
    ///
    /// Leaving `object` drops every child property and leaving `array` drops
    /// the item schema; neither can be recovered. Any expression stash is
    /// cleared. Entering expression mode goes through the parameter tree's
    /// reference toggle instead, which stashes the previous kind.
    pub fn retype(&mut self, kind: PropertyKind) {
        match kind {
            PropertyKind::Object => {
                if self.properties.is_none() {
                    self.properties = Some(OrderedMap::new());
                }
                self.items = None;
            }
            PropertyKind::Array => {
                if self.items.is_none() {
                    self.items = Some(Box::new(Self::string()));
                }
                self.properties = None;
            }
            _ => {
                self.properties = None;
                self.items = None;
            }
        }
        if kind != PropertyKind::Expression {
            self.stashed_kind = None;
            self.stashed_description = None;
        }
        self.kind = kind;
    }

    /// Switches into expression mode, stashing kind and description.
    pub(crate) fn enter_expression(&mut self) {
        if self.is_expression() {
            return;
        }
        self.stashed_kind = Some(self.kind);
        self.stashed_description = self.description.take();
        self.properties = None;
        self.items = None;
        self.kind = PropertyKind::Expression;
    }

    /// Leaves expression mode, restoring the stashed kind and description.
    ///
    /// Returns the restored kind, which defaults to `string` when nothing was
    /// stashed.
    pub(crate) fn leave_expression(&mut self) -> PropertyKind {
        let restored = self.stashed_kind.take().unwrap_or(PropertyKind::String);
        let description = self.stashed_description.take();
        self.retype(restored);
        self.description = description;
        restored
    }

    /// Infers a schema from a plain JSON value.
    ///
    /// Whole numbers become `integer`, other numbers `number`, `null` becomes
    /// `string`. Array items follow the first element.
    #[must_use]
    pub fn infer(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null | JsonValue::String(_) => Self::string(),
            JsonValue::Bool(_) => Self::boolean(),
            JsonValue::Number(n) if n.is_i64() || n.is_u64() => Self::integer(),
            JsonValue::Number(_) => Self::number(),
            JsonValue::Array(items) => {
                Self::array(items.first().map(Self::infer).unwrap_or_else(Self::string))
            }
            JsonValue::Object(map) => map
                .iter()
                .fold(Self::object(), |schema, (name, child)| {
                    schema.with_property(name.clone(), Self::infer(child))
                }),
        }
    }
}

impl Default for PropertySchema {
    fn default() -> Self {
        Self::object()
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Persisted form. Normalized into a consistent schema on the way in.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaRepr {
    #[serde(rename = "type")]
    kind: PropertyKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    properties: Option<OrderedMap<PropertySchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    items: Option<Box<PropertySchema>>,
    #[serde(default, skip_serializing_if = "is_false")]
    required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stashed_kind: Option<PropertyKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stashed_description: Option<String>,
}

impl From<SchemaRepr> for PropertySchema {
    fn from(repr: SchemaRepr) -> Self {
        let (properties, items) = match repr.kind {
            PropertyKind::Object => (Some(repr.properties.unwrap_or_default()), None),
            PropertyKind::Array => (
                None,
                Some(repr.items.unwrap_or_else(|| Box::new(Self::string()))),
            ),
            _ => (None, None),
        };
        let expression = repr.kind == PropertyKind::Expression;
        Self {
            kind: repr.kind,
            title: repr.title,
            description: repr.description,
            properties,
            items,
            required: repr.required,
            stashed_kind: repr.stashed_kind.filter(|_| expression),
            stashed_description: repr.stashed_description.filter(|_| expression),
        }
    }
}

impl From<PropertySchema> for SchemaRepr {
    fn from(schema: PropertySchema) -> Self {
        Self {
            kind: schema.kind,
            title: schema.title,
            description: schema.description,
            properties: schema.properties,
            items: schema.items,
            required: schema.required,
            stashed_kind: schema.stashed_kind,
            stashed_description: schema.stashed_description,
        }
    }
}
