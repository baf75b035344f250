//! Reference resolution for flowform node editors.
//!
//! This crate decides what a field in expression mode may point at:
//!
//! - **Canvas**: petgraph view of nodes, edges and containment
//! - **Scope**: variables visible to a node, with their stored paths
//! - **Matching**: weak or strong type compatibility
//! - **Resolver**: the picker tree, leaf-only selection and display labels

pub mod canvas;
pub mod error;
pub mod matcher;
pub mod resolver;
pub mod scope;
pub mod variable;

pub use canvas::{CanvasEdge, CanvasGraph, CanvasNode};
pub use error::CanvasError;
pub use matcher::TypeMatcher;
pub use resolver::{ReferenceLabel, ReferenceNode, ReferenceResolver};
pub use scope::{LOOP_INDEX, LOOP_ITEM, ResolvedPath, SourceKind, VariableScope, VariableSource};
pub use variable::{GlobalGroup, GlobalVariables, Variable};
