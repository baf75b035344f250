//! Versioned snapshots of parameter trees.
//!
//! Read-only views (a node's collapsed summary, a side panel) hold a
//! `TreeObserver` and ask it for a fresh snapshot whenever they render. The
//! observer compares the tree's edit counter against the last version it
//! handed out, so an unchanged tree costs one integer comparison.

use crate::ordered::OrderedMap;
use crate::schema::PropertySchema;
use crate::tree::ParameterTree;
use crate::value::ValueBinding;

/// An immutable copy of a tree at one version.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeSnapshot {
    /// The tree version this snapshot was taken at.
    pub version: u64,
    /// The root schema.
    pub schema: PropertySchema,
    /// The top-level values.
    pub values: OrderedMap<ValueBinding>,
}

impl ParameterTree {
    /// Copies the current state.
    #[must_use]
    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            version: self.version(),
            schema: self.schema().clone(),
            values: self.values().clone(),
        }
    }
}

/// Tracks the last version a reader has seen.
#[derive(Debug, Clone, Default)]
pub struct TreeObserver {
    last_seen: Option<u64>,
}

impl TreeObserver {
    /// Creates an observer that has seen nothing yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the tree changed since the last snapshot.
    #[must_use]
    pub fn is_stale(&self, tree: &ParameterTree) -> bool {
        self.last_seen != Some(tree.version())
    }

    /// Returns a snapshot if the tree changed since the last call.
    pub fn poll(&mut self, tree: &ParameterTree) -> Option<TreeSnapshot> {
        if !self.is_stale(tree) {
            return None;
        }
        self.last_seen = Some(tree.version());
        Some(tree.snapshot())
    }

    /// Returns the last version handed out.
    #[must_use]
    pub fn last_seen(&self) -> Option<u64> {
        self.last_seen
    }
}
