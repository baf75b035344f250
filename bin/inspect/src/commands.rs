//! Command implementations.
//!
//! Every command returns its output as text so it can be checked without a
//! terminal.

use crate::cli::{Command, LabelArgs, NodeArgs, ScopeArgs, TreeArgs};
use crate::error::InspectError;
use flowform_core::NodeId;
use flowform_reference::{
    CanvasGraph, GlobalVariables, ReferenceNode, ReferenceResolver, VariableScope,
};
use flowform_schema::{EditorSettings, PropertyKind, PropertySchema, TypeEquality};
use rootcause::prelude::Report;
use serde::Deserialize;
use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, instrument};

/// A canvas with the global variables in effect for it.
#[derive(Debug, Deserialize)]
pub struct CanvasDocument {
    /// The canvas.
    pub canvas: CanvasGraph,
    /// Global variable lists.
    #[serde(default)]
    pub globals: GlobalVariables,
}

impl CanvasDocument {
    /// Reads and checks a canvas document.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// describes broken containment.
    pub fn load(path: &Path) -> Result<Self, Report<InspectError>> {
        let text = std::fs::read_to_string(path).map_err(|e| InspectError::Read {
            path: path.display().to_string(),
            details: e.to_string(),
        })?;
        let mut document: Self = serde_json::from_str(&text).map_err(|e| InspectError::Parse {
            details: e.to_string(),
        })?;
        document.canvas.rebuild_index_map();
        document
            .canvas
            .validate()
            .map_err(|e| InspectError::Parse {
                details: e.to_string(),
            })?;
        debug!(nodes = document.canvas.node_count(), "canvas loaded");
        Ok(document)
    }

    /// Finds a node by ID, falling back to its title.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if neither matches.
    pub fn node_id(&self, node: &str) -> Result<NodeId, Report<InspectError>> {
        let by_id = node
            .parse::<NodeId>()
            .ok()
            .filter(|id| self.canvas.get_node(*id).is_some());
        let id = by_id
            .or_else(|| self.canvas.find_by_title(node).map(|found| found.id))
            .ok_or_else(|| InspectError::NodeNotFound {
                node: node.to_string(),
            })?;
        Ok(id)
    }

    fn scope(
        &self,
        target: &NodeArgs,
        settings: &EditorSettings,
    ) -> Result<VariableScope, Report<InspectError>> {
        let node_id = self.node_id(&target.node)?;
        let scope = VariableScope::for_node(
            &self.canvas,
            node_id,
            &self.globals,
            settings.path_strategy,
        )
        .map_err(|e| InspectError::Scope {
            details: e.to_string(),
        })?;
        Ok(scope)
    }
}

/// Runs a command.
///
/// # Errors
///
/// Returns an error if the input cannot be loaded or the node is unknown.
pub fn run(command: &Command, settings: &EditorSettings) -> Result<String, Report<InspectError>> {
    match command {
        Command::Tree(args) => tree(args, settings),
        Command::Label(args) => label(args, settings),
        Command::Scope(args) => scope(args, settings),
    }
}

#[instrument(skip(settings), fields(node = %args.target.node))]
fn tree(args: &TreeArgs, settings: &EditorSettings) -> Result<String, Report<InspectError>> {
    let document = CanvasDocument::load(&args.target.in_path)?;
    let scope = document.scope(&args.target, settings)?;

    let targets = args
        .kinds
        .iter()
        .map(|kind| {
            kind.parse::<PropertyKind>()
                .map(PropertySchema::new)
                .map_err(|e| InspectError::InvalidKind {
                    details: e.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut settings = settings.clone();
    if args.strong {
        settings.type_equality = TypeEquality::Strong;
    }
    if args.keep_incompatible {
        settings.prune_incompatible = false;
    }
    let resolver = ReferenceResolver::from_settings(&settings);

    let mut output = String::new();
    for node in resolver.build(&scope, &targets) {
        write_node(&mut output, &node, 0, true);
    }
    Ok(output)
}

fn write_node(output: &mut String, node: &ReferenceNode, depth: usize, group: bool) {
    let indent = "  ".repeat(depth);
    let disabled = if node.disabled { " [disabled]" } else { "" };
    let _ = if group {
        writeln!(output, "{indent}{}{disabled}", node.label)
    } else {
        writeln!(output, "{indent}{} ({}){disabled}", node.label, node.path)
    };
    for child in &node.children {
        write_node(output, child, depth + 1, false);
    }
}

#[instrument(skip(settings), fields(node = %args.target.node))]
fn label(args: &LabelArgs, settings: &EditorSettings) -> Result<String, Report<InspectError>> {
    let document = CanvasDocument::load(&args.target.in_path)?;
    let scope = document.scope(&args.target, settings)?;
    let label = ReferenceResolver::from_settings(settings).label_for(&scope, &args.path);
    let suffix = if label.is_resolved() { "" } else { " (unresolved)" };
    Ok(format!("{label}{suffix}\n"))
}

#[instrument(skip(settings), fields(node = %args.target.node))]
fn scope(args: &ScopeArgs, settings: &EditorSettings) -> Result<String, Report<InspectError>> {
    let document = CanvasDocument::load(&args.target.in_path)?;
    let scope = document.scope(&args.target, settings)?;

    let mut output = String::new();
    for source in scope.sources() {
        let _ = writeln!(output, "{}", source.label);
        for variable in &source.variables {
            let readonly = if variable.readonly { " readonly" } else { "" };
            let _ = writeln!(
                output,
                "  {}: {}{readonly}",
                variable.path,
                variable.schema.effective_kind()
            );
        }
    }
    Ok(output)
}
