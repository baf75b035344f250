//! Error types for the reference crate.

use flowform_core::NodeId;
use std::fmt;

/// Errors from canvas graph operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasError {
    /// Node with the given ID is not on the canvas.
    NodeNotFound { node_id: NodeId },
    /// A node names a container that is not on the canvas.
    ParentNotFound { node_id: NodeId, parent: NodeId },
    /// Containment forms a cycle.
    ContainmentCycle { node_id: NodeId },
    /// The canvas document could not be parsed.
    Parse { details: String },
}

impl fmt::Display for CanvasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeNotFound { node_id } => write!(f, "node not found: {node_id}"),
            Self::ParentNotFound { node_id, parent } => {
                write!(f, "node {node_id} is nested in missing container {parent}")
            }
            Self::ContainmentCycle { node_id } => {
                write!(f, "node {node_id} is nested inside itself")
            }
            Self::Parse { details } => write!(f, "failed to parse canvas: {details}"),
        }
    }
}

impl std::error::Error for CanvasError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_not_found_names_the_node() {
        let node_id = NodeId::new();
        let err = CanvasError::NodeNotFound { node_id };
        assert_eq!(err.to_string(), format!("node not found: {node_id}"));
    }
}
