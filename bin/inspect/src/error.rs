//! Domain error types for the inspector.

use std::fmt;

/// Errors from inspector commands.
#[derive(Debug)]
pub enum InspectError {
    /// Settings could not be loaded from the environment.
    Config { details: String },
    /// The input file could not be read.
    Read { path: String, details: String },
    /// The input file is not a valid canvas document.
    Parse { details: String },
    /// No node matches the given title or ID.
    NodeNotFound { node: String },
    /// A `--kind` argument is not a property kind.
    InvalidKind { details: String },
    /// The variable scope could not be built.
    Scope { details: String },
}

impl fmt::Display for InspectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "invalid configuration: {details}"),
            Self::Read { path, details } => write!(f, "failed to read '{path}': {details}"),
            Self::Parse { details } => write!(f, "invalid canvas document: {details}"),
            Self::NodeNotFound { node } => write!(f, "no node titled or identified by '{node}'"),
            Self::InvalidKind { details } => write!(f, "invalid --kind: {details}"),
            Self::Scope { details } => write!(f, "failed to build variable scope: {details}"),
        }
    }
}

impl std::error::Error for InspectError {}
