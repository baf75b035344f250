//! Property kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The type of a schema node.
///
/// `Expression` is not a data type: it marks a field whose value is currently
/// a reference (or raw reference text) instead of a literal. The field's real
/// kind is stashed on the schema while it is in that mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    String,
    Number,
    Integer,
    Boolean,
    File,
    Object,
    Array,
    Expression,
}

impl PropertyKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::String,
        Self::Number,
        Self::Integer,
        Self::Boolean,
        Self::File,
        Self::Object,
        Self::Array,
        Self::Expression,
    ];

    /// Returns the lowercase name used in persisted documents.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::File => "file",
            Self::Object => "object",
            Self::Array => "array",
            Self::Expression => "expression",
        }
    }

    /// Returns true for kinds that own child schemas.
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self, Self::Object | Self::Array)
    }

    /// Returns true for `number` and `integer`.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Number | Self::Integer)
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a kind name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseKindError {
    /// The rejected input.
    pub input: String,
}

impl fmt::Display for ParseKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown property kind: {}", self.input)
    }
}

impl std::error::Error for ParseKindError {}

impl FromStr for PropertyKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseKindError {
                input: s.to_string(),
            })
    }
}
