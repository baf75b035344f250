//! Error types for the schema crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `TreeError`: structural edits on a parameter tree. Returned directly,
//!   the caller decides whether to surface it.
//! - `DocumentError`: loading a persisted parameter document.
//! - `TemplateError`: instantiating parameters from node templates.

use crate::kind::PropertyKind;
use crate::path::PropertyPath;
use std::fmt;

/// Errors from parameter tree edits.
///
/// A failed edit leaves both the schema tree and the value tree untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// A sibling with this name already exists.
    DuplicateKey { name: String },
    /// The name cannot be addressed by a dotted path.
    InvalidName { name: String },
    /// No schema node at the path.
    PathNotFound { path: PropertyPath },
    /// The node at the path is not an object, so it has no named children.
    NotAnObject { path: PropertyPath },
    /// The node at the path is not in expression mode.
    NotAnExpression { path: PropertyPath },
    /// A literal does not fit the kind of the node at the path.
    ShapeMismatch {
        path: PropertyPath,
        expected: PropertyKind,
        found: PropertyKind,
    },
    /// The root of a tree is always an object and cannot be retyped.
    RootNotEditable,
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey { name } => write!(f, "a property named '{name}' already exists"),
            Self::InvalidName { name } => {
                write!(f, "'{name}' is not a valid property name")
            }
            Self::PathNotFound { path } => write!(f, "no property at '{path}'"),
            Self::NotAnObject { path } => write!(f, "property '{path}' is not an object"),
            Self::NotAnExpression { path } => {
                write!(f, "property '{path}' is not in reference mode")
            }
            Self::ShapeMismatch {
                path,
                expected,
                found,
            } => write!(
                f,
                "property '{path}' expects a {expected} value, got {found}"
            ),
            Self::RootNotEditable => write!(f, "the root of a parameter tree cannot be retyped"),
        }
    }
}

impl std::error::Error for TreeError {}

/// Errors from loading persisted parameter documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The document is not valid JSON or does not match the layout.
    Parse { details: String },
    /// The root schema is not an object.
    RootNotObject { found: PropertyKind },
    /// The values are neither an object nor null.
    ValuesNotObject,
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { details } => write!(f, "failed to parse parameter document: {details}"),
            Self::RootNotObject { found } => {
                write!(f, "parameter document root must be an object, found {found}")
            }
            Self::ValuesNotObject => write!(f, "parameter document values must be an object"),
        }
    }
}

impl std::error::Error for DocumentError {}

/// Errors from node template instantiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// No template is registered for the node type.
    UnknownNodeType { node_type: String },
    /// The template refuses another instance on the canvas.
    AddRefused { node_type: String },
    /// The template's initial parameters are not a valid tree.
    InvalidTemplate { node_type: String, reason: String },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNodeType { node_type } => write!(f, "unknown node type: {node_type}"),
            Self::AddRefused { node_type } => {
                write!(f, "node type '{node_type}' cannot be added to this canvas")
            }
            Self::InvalidTemplate { node_type, reason } => {
                write!(f, "invalid template for '{node_type}': {reason}")
            }
        }
    }
}

impl std::error::Error for TemplateError {}
