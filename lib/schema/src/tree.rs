//! Parameter trees.
//!
//! A `ParameterTree` owns one parameter group of a node (its inputs, its
//! outputs, or the custom parameters of an array field): an object schema and
//! a value tree that mirrors it key for key. Every edit goes through this type
//! and touches both trees, so they cannot drift apart. An edit that fails
//! validation returns a `TreeError` before anything is changed.
//!
//! Paths may step through arrays with the `[]` segment. Schema edits below an
//! array apply once to the item schema and value edits apply to every element
//! currently in the array.

use crate::error::TreeError;
use crate::kind::PropertyKind;
use crate::ordered::OrderedMap;
use crate::path::{is_valid_key, PropertyPath, Segment};
use crate::schema::PropertySchema;
use crate::settings::EditorSettings;
use crate::value::{parse_float, LiteralValue, ValueBinding};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

/// Base name used when a property is added without a name.
pub const DEFAULT_PROPERTY_NAME: &str = "param";

/// A schema tree and its paired value tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTree {
    schema: PropertySchema,
    values: OrderedMap<ValueBinding>,
    version: u64,
    default_property_name: String,
}

impl ParameterTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schema: PropertySchema::object(),
            values: OrderedMap::new(),
            version: 0,
            default_property_name: DEFAULT_PROPERTY_NAME.to_string(),
        }
    }

    /// Creates a tree from a template's initial schema and values.
    ///
    /// Values are reshaped to mirror the schema: missing entries are filled
    /// with zero values and entries without a schema counterpart are dropped.
    ///
    /// # Errors
    ///
    /// Returns `NotAnObject` if the root schema is not an object.
    pub fn from_parts(
        schema: PropertySchema,
        values: OrderedMap<ValueBinding>,
    ) -> Result<Self, TreeError> {
        if schema.kind() != PropertyKind::Object {
            return Err(TreeError::NotAnObject {
                path: PropertyPath::root(),
            });
        }
        let values = match ValueBinding::Literal(LiteralValue::Object(values)).conform(&schema) {
            ValueBinding::Literal(LiteralValue::Object(map)) => map,
            _ => OrderedMap::new(),
        };
        Ok(Self {
            schema,
            values,
            ..Self::new()
        })
    }

    /// Sets the base name used by [`add_property`](Self::add_property) when
    /// no name is given.
    #[must_use]
    pub fn with_default_property_name(mut self, name: impl Into<String>) -> Self {
        self.default_property_name = name.into();
        self
    }

    /// Applies the editing settings that concern the tree.
    #[must_use]
    pub fn with_settings(self, settings: &EditorSettings) -> Self {
        self.with_default_property_name(settings.default_property_name.clone())
    }

    /// Returns the root schema. Always an object.
    #[must_use]
    pub fn schema(&self) -> &PropertySchema {
        &self.schema
    }

    /// Returns the top-level values, in schema order.
    #[must_use]
    pub fn values(&self) -> &OrderedMap<ValueBinding> {
        &self.values
    }

    /// Returns the edit counter. It increases on every successful edit and
    /// never on a rejected or no-op one.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the schema node at `path`.
    #[must_use]
    pub fn schema_at(&self, path: &PropertyPath) -> Option<&PropertySchema> {
        path.segments()
            .iter()
            .try_fold(&self.schema, |node, segment| match segment {
                Segment::Key(name) => node.property(name),
                Segment::Items => node.items(),
            })
    }

    /// Returns the value at `path`. Through arrays, the first element is used.
    #[must_use]
    pub fn value_at(&self, path: &PropertyPath) -> Option<&ValueBinding> {
        let (first, rest) = path.segments().split_first()?;
        let Segment::Key(name) = first else {
            return None;
        };
        rest.iter()
            .try_fold(self.values.get(name)?, |binding, segment| {
                match (segment, binding) {
                    (Segment::Key(name), ValueBinding::Literal(LiteralValue::Object(map))) => {
                        map.get(name)
                    }
                    (Segment::Items, ValueBinding::Literal(LiteralValue::Array(items))) => {
                        items.first()
                    }
                    _ => None,
                }
            })
    }

    /// Adds a `string` property under the object at `parent`.
    ///
    /// A missing, blank or already taken name is replaced by the base name
    /// with the smallest numeric suffix that is free (`url`, `url1`, `url2`).
    /// The paired value is an empty string. Returns the name actually used.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` if the name contains `.` or is `[]`, and
    /// `PathNotFound` or `NotAnObject` if `parent` does not name an object.
    pub fn add_property(
        &mut self,
        parent: &PropertyPath,
        name: Option<&str>,
    ) -> Result<String, TreeError> {
        let requested = name.map(str::trim).filter(|name| !name.is_empty());
        if let Some(requested) = requested.filter(|name| !is_valid_key(name)) {
            return Err(TreeError::InvalidName {
                name: requested.to_string(),
            });
        }
        let properties = object_properties_mut(&mut self.schema, parent)?;
        let base = requested.unwrap_or(&self.default_property_name);
        let name = unique_name(properties, base);

        properties.insert(name.clone(), PropertySchema::string());
        for map in maps_at_mut(&mut self.values, parent.segments()) {
            map.insert(name.clone(), ValueBinding::string(""));
        }

        self.bump();
        debug!(parent = %parent, name = %name, "property added");
        Ok(name)
    }

    /// Renames a property of the object at `parent`, keeping its position.
    ///
    /// The new name is trimmed. Renaming to the same name or to a blank name
    /// does nothing.
    ///
    /// # Errors
    ///
    /// Returns `InvalidName` if `new_name` contains `.` or is `[]`,
    /// `DuplicateKey` if a sibling already uses it, or `PathNotFound` if
    /// `old_name` does not exist. Nothing changes on error.
    pub fn rename_property(
        &mut self,
        parent: &PropertyPath,
        old_name: &str,
        new_name: &str,
    ) -> Result<(), TreeError> {
        let new_name = new_name.trim();
        if new_name.is_empty() || new_name == old_name {
            return Ok(());
        }
        if !is_valid_key(new_name) {
            return Err(TreeError::InvalidName {
                name: new_name.to_string(),
            });
        }
        let properties = object_properties_mut(&mut self.schema, parent)?;
        if !properties.contains_key(old_name) {
            return Err(TreeError::PathNotFound {
                path: parent.child(old_name),
            });
        }
        if properties.contains_key(new_name) {
            return Err(TreeError::DuplicateKey {
                name: new_name.to_string(),
            });
        }

        properties.rename(old_name, new_name);
        for map in maps_at_mut(&mut self.values, parent.segments()) {
            map.rename(old_name, new_name);
        }

        self.bump();
        debug!(parent = %parent, from = old_name, to = new_name, "property renamed");
        Ok(())
    }

    /// Changes the kind of the property at `path` and resets its value to
    /// the zero value of the new kind.
    ///
    /// Leaving `object` permanently discards all child properties, and
    /// leaving `array` discards the item schema. Changing to `expression`
    /// behaves like [`toggle_reference`](Self::toggle_reference). Changing to
    /// the current kind does nothing.
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` for an unknown path and `RootNotEditable` for
    /// the root.
    pub fn change_kind(&mut self, path: &PropertyPath, kind: PropertyKind) -> Result<(), TreeError> {
        if path.is_root() {
            return Err(TreeError::RootNotEditable);
        }
        let node = schema_node_mut(&mut self.schema, path)?;
        if kind == PropertyKind::Expression {
            if node.is_expression() {
                return Ok(());
            }
            return self.toggle_reference(path).map(|_| ());
        }
        let previous = node.kind();
        if previous == kind {
            return Ok(());
        }

        if node.is_expression() {
            node.leave_expression();
        }
        node.retype(kind);
        for binding in bindings_at_mut(&mut self.values, path.segments()) {
            *binding = ValueBinding::zero(kind);
        }

        self.bump();
        debug!(path = %path, from = %previous, to = %kind, "property retyped");
        Ok(())
    }

    /// Switches the property at `path` into or out of expression mode.
    ///
    /// Entering stashes the kind and description and replaces the literal
    /// with its text form. Leaving restores the stashed kind (`string` if
    /// none) and parses the text back into it. Text that does not parse as
    /// the restored container kind becomes an empty container; object and
    /// array children are re-derived from the parsed JSON. Returns the kind
    /// the property now has.
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` for an unknown path and `RootNotEditable` for
    /// the root.
    pub fn toggle_reference(&mut self, path: &PropertyPath) -> Result<PropertyKind, TreeError> {
        if path.is_root() {
            return Err(TreeError::RootNotEditable);
        }
        let node = schema_node_mut(&mut self.schema, path)?;
        let bindings = bindings_at_mut(&mut self.values, path.segments());

        if node.is_expression() {
            let restored = node.leave_expression();
            restore_values(node, bindings, restored, path);
        } else {
            node.enter_expression();
            for binding in bindings {
                let text = match &*binding {
                    ValueBinding::Literal(literal) => Some(literal.to_text()),
                    ValueBinding::Reference(_) => None,
                };
                if let Some(text) = text {
                    *binding = ValueBinding::string(text);
                }
            }
        }

        let kind = self.schema_at(path).map_or(PropertyKind::String, PropertySchema::kind);
        self.bump();
        debug!(path = %path, kind = %kind, "reference mode toggled");
        Ok(kind)
    }

    /// Removes a property of the object at `parent` together with its value.
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` if there is no such property.
    pub fn delete_property(&mut self, parent: &PropertyPath, name: &str) -> Result<(), TreeError> {
        let properties = object_properties_mut(&mut self.schema, parent)?;
        if properties.remove(name).is_none() {
            return Err(TreeError::PathNotFound {
                path: parent.child(name),
            });
        }
        for map in maps_at_mut(&mut self.values, parent.segments()) {
            map.remove(name);
        }

        self.bump();
        debug!(parent = %parent, name, "property deleted");
        Ok(())
    }

    /// Stores a literal at `path`.
    ///
    /// Expression fields accept raw text only. Container literals are
    /// reshaped to mirror the schema.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the literal's kind differs from the
    /// property's kind.
    pub fn set_literal(&mut self, path: &PropertyPath, literal: LiteralValue) -> Result<(), TreeError> {
        if path.is_root() {
            return Err(TreeError::RootNotEditable);
        }
        let node = self.schema_at(path).ok_or_else(|| TreeError::PathNotFound {
            path: path.clone(),
        })?;
        let expected = match node.kind() {
            PropertyKind::Expression => PropertyKind::String,
            kind => kind,
        };
        if literal.kind() != expected {
            return Err(TreeError::ShapeMismatch {
                path: path.clone(),
                expected,
                found: literal.kind(),
            });
        }

        let value = ValueBinding::Literal(literal).conform(node);
        for binding in bindings_at_mut(&mut self.values, path.segments()) {
            *binding = value.clone();
        }

        self.bump();
        debug!(path = %path, kind = %expected, "literal stored");
        Ok(())
    }

    /// Stores a reference path at `path`. The target is not validated.
    ///
    /// # Errors
    ///
    /// Returns `NotAnExpression` unless the property is in expression mode.
    pub fn set_reference(&mut self, path: &PropertyPath, target: &str) -> Result<(), TreeError> {
        let node = self.schema_at(path).ok_or_else(|| TreeError::PathNotFound {
            path: path.clone(),
        })?;
        if !node.is_expression() {
            return Err(TreeError::NotAnExpression { path: path.clone() });
        }
        for binding in bindings_at_mut(&mut self.values, path.segments()) {
            *binding = ValueBinding::reference(target);
        }

        self.bump();
        debug!(path = %path, target, "reference stored");
        Ok(())
    }

    /// Sets or clears the display title of the node at `path`.
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` for an unknown path.
    pub fn set_title(&mut self, path: &PropertyPath, title: Option<String>) -> Result<(), TreeError> {
        let node = schema_node_mut(&mut self.schema, path)?;
        if node.title == title {
            return Ok(());
        }
        node.title = title;
        self.bump();
        debug!(path = %path, "title set");
        Ok(())
    }

    /// Sets or clears the description of the node at `path`.
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` for an unknown path.
    pub fn set_description(
        &mut self,
        path: &PropertyPath,
        description: Option<String>,
    ) -> Result<(), TreeError> {
        let node = schema_node_mut(&mut self.schema, path)?;
        if node.description == description {
            return Ok(());
        }
        node.description = description;
        self.bump();
        debug!(path = %path, "description set");
        Ok(())
    }

    /// Marks the node at `path` as required or optional.
    ///
    /// # Errors
    ///
    /// Returns `PathNotFound` for an unknown path.
    pub fn set_required(&mut self, path: &PropertyPath, required: bool) -> Result<(), TreeError> {
        let node = schema_node_mut(&mut self.schema, path)?;
        if node.required == required {
            return Ok(());
        }
        node.required = required;
        self.bump();
        debug!(path = %path, required, "required flag set");
        Ok(())
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}

impl Default for ParameterTree {
    fn default() -> Self {
        Self::new()
    }
}

fn schema_node_mut<'a>(
    root: &'a mut PropertySchema,
    path: &PropertyPath,
) -> Result<&'a mut PropertySchema, TreeError> {
    let mut node = root;
    for segment in path.segments() {
        let next = match segment {
            Segment::Key(name) => node.properties_mut().and_then(|p| p.get_mut(name)),
            Segment::Items => node.items_mut(),
        };
        node = next.ok_or_else(|| TreeError::PathNotFound { path: path.clone() })?;
    }
    Ok(node)
}

fn object_properties_mut<'a>(
    root: &'a mut PropertySchema,
    parent: &PropertyPath,
) -> Result<&'a mut OrderedMap<PropertySchema>, TreeError> {
    schema_node_mut(root, parent)?
        .properties_mut()
        .ok_or_else(|| TreeError::NotAnObject {
            path: parent.clone(),
        })
}

fn unique_name(properties: &OrderedMap<PropertySchema>, base: &str) -> String {
    if !properties.contains_key(base) {
        return base.to_string();
    }
    let mut suffix = 1u32;
    loop {
        let candidate = format!("{base}{suffix}");
        if !properties.contains_key(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Collects every value bound to `path`. Array steps fan out to all elements.
fn bindings_at_mut<'a>(
    map: &'a mut OrderedMap<ValueBinding>,
    path: &[Segment],
) -> Vec<&'a mut ValueBinding> {
    let mut found = Vec::new();
    if let Some((Segment::Key(name), rest)) = path.split_first() {
        if let Some(binding) = map.get_mut(name) {
            descend(binding, rest, &mut found);
        }
    }
    found
}

fn descend<'a>(binding: &'a mut ValueBinding, path: &[Segment], found: &mut Vec<&'a mut ValueBinding>) {
    let Some((segment, rest)) = path.split_first() else {
        found.push(binding);
        return;
    };
    match binding {
        ValueBinding::Literal(LiteralValue::Object(map)) => {
            if let Segment::Key(name) = segment {
                if let Some(child) = map.get_mut(name) {
                    descend(child, rest, found);
                }
            }
        }
        ValueBinding::Literal(LiteralValue::Array(items)) => {
            if let Segment::Items = segment {
                for item in items.iter_mut() {
                    descend(item, rest, found);
                }
            }
        }
        _ => {}
    }
}

/// Collects every value-side object map that mirrors the object at `path`.
fn maps_at_mut<'a>(
    map: &'a mut OrderedMap<ValueBinding>,
    path: &[Segment],
) -> Vec<&'a mut OrderedMap<ValueBinding>> {
    if path.is_empty() {
        return vec![map];
    }
    bindings_at_mut(map, path)
        .into_iter()
        .filter_map(|binding| match binding {
            ValueBinding::Literal(LiteralValue::Object(map)) => Some(map),
            _ => None,
        })
        .collect()
}

fn restore_values(
    node: &mut PropertySchema,
    bindings: Vec<&mut ValueBinding>,
    restored: PropertyKind,
    path: &PropertyPath,
) {
    if restored.is_container() {
        let parsed: Vec<JsonValue> = bindings
            .iter()
            .map(|binding| parse_container(restored, &binding.to_text(), path))
            .collect();
        if let Some(first) = parsed.first() {
            let inferred = PropertySchema::infer(first);
            match restored {
                PropertyKind::Object => {
                    node.set_properties(inferred.properties().cloned().unwrap_or_default());
                }
                _ => node.set_items(inferred.items().cloned().unwrap_or_else(PropertySchema::string)),
            }
        }
        for (binding, plain) in bindings.into_iter().zip(parsed) {
            *binding = ValueBinding::from_plain(node, &plain);
        }
        return;
    }

    for binding in bindings {
        let text = binding.to_text();
        *binding = ValueBinding::Literal(match restored {
            PropertyKind::Number => LiteralValue::Number(parse_float(&text)),
            PropertyKind::Integer => LiteralValue::Integer(parse_float(&text) as i64),
            PropertyKind::Boolean => LiteralValue::Boolean(text == "true"),
            PropertyKind::File => LiteralValue::File(text),
            PropertyKind::String => LiteralValue::String(text),
            other => LiteralValue::zero(other),
        });
    }
}

/// Parses container text, falling back to an empty container.
fn parse_container(kind: PropertyKind, text: &str, path: &PropertyPath) -> JsonValue {
    match (kind, serde_json::from_str::<JsonValue>(text)) {
        (PropertyKind::Object, Ok(value @ JsonValue::Object(_)))
        | (PropertyKind::Array, Ok(value @ JsonValue::Array(_))) => value,
        _ => {
            if !text.trim().is_empty() {
                warn!(path = %path, kind = %kind, "malformed literal, using an empty container");
            }
            match kind {
                PropertyKind::Array => JsonValue::Array(Vec::new()),
                _ => JsonValue::Object(serde_json::Map::new()),
            }
        }
    }
}
