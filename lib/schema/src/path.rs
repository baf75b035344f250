//! Addresses of nodes inside a parameter tree.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker used in the dotted form for an array's item schema.
pub const ITEMS_SEGMENT: &str = "[]";

/// Returns true if `name` can be used as a property name.
///
/// A name must survive the dotted form unchanged, so it cannot be empty,
/// contain `.`, or be the items marker.
#[must_use]
pub fn is_valid_key(name: &str) -> bool {
    !name.is_empty() && !name.contains('.') && name != ITEMS_SEGMENT
}

/// One step of a property path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A named child of an object.
    Key(String),
    /// The item schema of an array. Value edits fan out to every element.
    Items,
}

/// A path from the root of a parameter tree to one of its nodes.
///
/// The root itself is the empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    segments: Vec<Segment>,
}

impl PropertyPath {
    /// The root of the tree.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses the dotted form, e.g. `headers.[].name`.
    ///
    /// Empty segments are skipped, so `""` is the root.
    #[must_use]
    pub fn parse(dotted: &str) -> Self {
        let segments = dotted
            .split('.')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment {
                ITEMS_SEGMENT => Segment::Items,
                key => Segment::Key(key.to_string()),
            })
            .collect();
        Self { segments }
    }

    /// Returns this path extended with a named child.
    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut path = self.clone();
        path.segments.push(Segment::Key(name.into()));
        path
    }

    /// Returns this path extended with the array item step.
    #[must_use]
    pub fn items(&self) -> Self {
        let mut path = self.clone();
        path.segments.push(Segment::Items);
        path
    }

    /// Returns true for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the segments in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                f.write_str(".")?;
            }
            match segment {
                Segment::Key(key) => f.write_str(key)?,
                Segment::Items => f.write_str(ITEMS_SEGMENT)?,
            }
        }
        Ok(())
    }
}

impl From<&str> for PropertyPath {
    fn from(dotted: &str) -> Self {
        Self::parse(dotted)
    }
}

impl Serialize for PropertyPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PropertyPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let dotted = String::deserialize(deserializer)?;
        Ok(Self::parse(&dotted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_agree() {
        let path = PropertyPath::parse("headers.[].name");
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("headers".to_string()),
                Segment::Items,
                Segment::Key("name".to_string()),
            ]
        );
        assert_eq!(path.to_string(), "headers.[].name");
    }

    #[test]
    fn empty_string_is_root() {
        assert!(PropertyPath::parse("").is_root());
        assert_eq!(PropertyPath::root().to_string(), "");
    }

    #[test]
    fn builders_extend_path() {
        let path = PropertyPath::root().child("rows").items().child("id");
        assert_eq!(path, PropertyPath::from("rows.[].id"));
    }
}
