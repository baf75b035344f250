//! Variables that reference bindings can point at.

use flowform_schema::{OrderedMap, PropertySchema};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One referenceable variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Property name within the producing source.
    pub key: String,
    /// Shape of the variable.
    pub schema: PropertySchema,
    /// Dotted path stored in reference bindings.
    pub path: String,
    /// Whether nodes may assign to the variable.
    pub readonly: bool,
}

impl Variable {
    /// Returns the human-readable name of the variable.
    #[must_use]
    pub fn title(&self) -> &str {
        self.schema.display_title(&self.key)
    }
}

/// Which global list a variable belongs to. Also the first segment of its
/// path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlobalGroup {
    /// Provided by the platform.
    System,
    /// Declared by the workflow author.
    User,
}

impl GlobalGroup {
    /// Returns the path segment for the group.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
        }
    }
}

impl fmt::Display for GlobalGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A snapshot of the global variable lists, taken when a scope is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalVariables {
    /// Platform-provided variables.
    #[serde(default)]
    pub system: OrderedMap<PropertySchema>,
    /// Author-declared variables.
    #[serde(default)]
    pub user: OrderedMap<PropertySchema>,
}

impl GlobalVariables {
    /// Creates empty lists.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a system variable.
    #[must_use]
    pub fn with_system(mut self, name: impl Into<String>, schema: PropertySchema) -> Self {
        self.system.insert(name, schema);
        self
    }

    /// Adds a user variable.
    #[must_use]
    pub fn with_user(mut self, name: impl Into<String>, schema: PropertySchema) -> Self {
        self.user.insert(name, schema);
        self
    }

    /// Returns the variables of one group.
    #[must_use]
    pub fn group(&self, group: GlobalGroup) -> &OrderedMap<PropertySchema> {
        match group {
            GlobalGroup::System => &self.system,
            GlobalGroup::User => &self.user,
        }
    }

    /// Returns true if both lists are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.system.is_empty() && self.user.is_empty()
    }
}
