//! The reference picker.
//!
//! The resolver turns a variable scope into the tree a user picks a
//! reference from. Group headers and objects with enabled children are not
//! selectable, so a selection always lands on a leaf. Disabled children shown
//! when pruning is off do not count, which keeps selectability the same in
//! both modes.

use crate::matcher::TypeMatcher;
use crate::scope::{VariableScope, VariableSource};
use flowform_schema::{EditorSettings, PropertyKind, PropertySchema};
use std::fmt;
use tracing::{debug, instrument};

/// One entry of the picker tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceNode {
    /// Display title.
    pub label: String,
    /// Value stored when the entry is selected.
    pub path: String,
    /// True if neither the entry nor any descendant matches the target.
    pub disabled: bool,
    /// True if the entry matches the target and has no enabled children.
    pub selectable: bool,
    /// Nested entries.
    pub children: Vec<ReferenceNode>,
}

impl ReferenceNode {
    /// Returns true if choosing this entry commits its path.
    #[must_use]
    pub fn is_selectable_leaf(&self) -> bool {
        self.selectable && !self.disabled && self.children.iter().all(|child| child.disabled)
    }

    /// Finds the entry with the given path in this subtree.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&ReferenceNode> {
        if self.path == path {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(path))
    }
}

/// Display text for a stored reference path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceLabel {
    /// The path matches a live variable; holds the title chain.
    Resolved(String),
    /// Nothing in scope matches; holds the raw path.
    Unresolved(String),
}

impl ReferenceLabel {
    /// Returns the text to show.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Resolved(text) | Self::Unresolved(text) => text,
        }
    }

    /// Returns true if the path matched a variable.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

impl fmt::Display for ReferenceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Builds picker trees and interprets selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceResolver {
    matcher: TypeMatcher,
    prune_incompatible: bool,
}

impl Default for ReferenceResolver {
    fn default() -> Self {
        Self::new(TypeMatcher::default())
    }
}

impl ReferenceResolver {
    /// Creates a resolver that omits incompatible entries.
    #[must_use]
    pub const fn new(matcher: TypeMatcher) -> Self {
        Self {
            matcher,
            prune_incompatible: true,
        }
    }

    /// Creates a resolver from editor settings.
    #[must_use]
    pub fn from_settings(settings: &EditorSettings) -> Self {
        Self::new(TypeMatcher::new(settings.type_equality))
            .with_pruning(settings.prune_incompatible)
    }

    /// Sets whether incompatible entries are omitted or shown disabled.
    ///
    /// Disabled entries never change what can be selected.
    #[must_use]
    pub const fn with_pruning(mut self, prune_incompatible: bool) -> Self {
        self.prune_incompatible = prune_incompatible;
        self
    }

    /// Returns the matcher.
    #[must_use]
    pub const fn matcher(&self) -> TypeMatcher {
        self.matcher
    }

    /// Builds the picker tree for a field accepting any of `targets`.
    ///
    /// Loop groups come first, then the system and user groups, then the
    /// upstream nodes with the nearest producer first. Groups left without
    /// entries are omitted.
    #[instrument(skip(self, scope, targets), fields(node_id = %scope.node_id(), targets = targets.len()))]
    pub fn build(&self, scope: &VariableScope, targets: &[PropertySchema]) -> Vec<ReferenceNode> {
        let groups: Vec<ReferenceNode> = scope
            .loop_sources()
            .iter()
            .chain(scope.global_sources())
            .chain(scope.node_sources().iter().rev())
            .filter_map(|source| self.render_source(source, targets))
            .collect();
        debug!(groups = groups.len(), "reference tree built");
        groups
    }

    /// Applies a selection.
    ///
    /// Calls `on_change` with the path and returns true only if `path`
    /// names a selectable leaf. Anything else leaves the current selection
    /// untouched.
    pub fn select<F>(&self, nodes: &[ReferenceNode], path: &str, on_change: F) -> bool
    where
        F: FnOnce(&str),
    {
        match nodes.iter().find_map(|node| node.find(path)) {
            Some(node) if node.is_selectable_leaf() => {
                on_change(&node.path);
                true
            }
            _ => false,
        }
    }

    /// Returns the display text for a stored path.
    #[must_use]
    pub fn label_for(&self, scope: &VariableScope, path: &str) -> ReferenceLabel {
        match scope.resolve(path) {
            Some(resolved) => ReferenceLabel::Resolved(resolved.label),
            None => {
                debug!(path, "reference does not resolve");
                ReferenceLabel::Unresolved(path.to_string())
            }
        }
    }

    fn render_source(
        &self,
        source: &VariableSource,
        targets: &[PropertySchema],
    ) -> Option<ReferenceNode> {
        let children: Vec<ReferenceNode> = source
            .variables
            .iter()
            .filter_map(|variable| {
                self.render(variable.title(), &variable.path, &variable.schema, targets)
            })
            .collect();
        if children.is_empty() {
            return None;
        }
        Some(ReferenceNode {
            label: source.label.clone(),
            path: source.path.clone(),
            disabled: children.iter().all(|child| child.disabled),
            selectable: false,
            children,
        })
    }

    fn render(
        &self,
        label: &str,
        path: &str,
        schema: &PropertySchema,
        targets: &[PropertySchema],
    ) -> Option<ReferenceNode> {
        let compatible = self.matcher.matches_any(schema, targets);

        let children: Vec<ReferenceNode> = match schema.properties() {
            Some(properties) if schema.effective_kind() == PropertyKind::Object => properties
                .iter()
                .filter_map(|(key, child)| {
                    self.render(
                        child.display_title(key),
                        &format!("{path}.{key}"),
                        child,
                        targets,
                    )
                })
                .collect(),
            _ => Vec::new(),
        };

        let only_disabled_children = children.iter().all(|child| child.disabled);
        let disabled = !compatible && only_disabled_children;
        if disabled && self.prune_incompatible {
            return None;
        }
        Some(ReferenceNode {
            label: label.to_string(),
            path: path.to_string(),
            disabled,
            selectable: compatible && only_disabled_children,
            children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{CanvasGraph, CanvasNode};
    use crate::variable::GlobalVariables;
    use flowform_core::NodeId;
    use flowform_schema::{PathStrategy, TypeEquality};
    use std::cell::RefCell;

    fn canvas() -> (CanvasGraph, NodeId) {
        let mut canvas = CanvasGraph::new();
        let first = canvas.add_node(
            CanvasNode::new("First", "code").with_outputs(
                PropertySchema::object()
                    .with_property(
                        "obj",
                        PropertySchema::object()
                            .with_property("x", PropertySchema::number())
                            .with_property("y", PropertySchema::string().with_title("Why")),
                    )
                    .with_property("scalarNumber", PropertySchema::number()),
            ),
        );
        let second = canvas.add_node(
            CanvasNode::new("Second", "code")
                .with_outputs(PropertySchema::object().with_property("text", PropertySchema::string())),
        );
        let target = canvas.add_node(CanvasNode::new("Target", "llm"));
        canvas.add_edge(first, second).expect("edge");
        canvas.add_edge(second, target).expect("edge");
        (canvas, target)
    }

    fn scope(globals: &GlobalVariables) -> VariableScope {
        let (canvas, target) = canvas();
        VariableScope::for_node(&canvas, target, globals, PathStrategy::Title).expect("scope")
    }

    fn labels(nodes: &[ReferenceNode]) -> Vec<&str> {
        nodes.iter().map(|node| node.label.as_str()).collect()
    }

    #[test]
    fn object_with_matching_descendant_is_kept() {
        let resolver = ReferenceResolver::default();
        let tree = resolver.build(&scope(&GlobalVariables::new()), &[PropertySchema::string()]);

        let first = tree
            .iter()
            .find(|group| group.label == "First")
            .expect("first group");
        assert_eq!(labels(&first.children), vec!["obj"]);

        let obj = &first.children[0];
        assert!(!obj.disabled);
        assert!(!obj.selectable);
        assert_eq!(labels(&obj.children), vec!["Why"]);
        assert_eq!(obj.children[0].path, "First.obj.y");
    }

    #[test]
    fn nearest_producer_comes_first() {
        let resolver = ReferenceResolver::default();
        let globals = GlobalVariables::new().with_user("token", PropertySchema::string());
        let tree = resolver.build(&scope(&globals), &[]);
        assert_eq!(labels(&tree), vec!["user", "Second", "First"]);
    }

    #[test]
    fn empty_groups_are_omitted() {
        let resolver = ReferenceResolver::default();
        let tree = resolver.build(&scope(&GlobalVariables::new()), &[PropertySchema::boolean()]);
        assert!(tree.is_empty());
    }

    #[test]
    fn without_pruning_incompatible_entries_are_disabled() {
        let resolver = ReferenceResolver::default().with_pruning(false);
        let tree = resolver.build(&scope(&GlobalVariables::new()), &[PropertySchema::string()]);

        let first = tree.iter().find(|g| g.label == "First").expect("first group");
        let scalar = first.find("First.scalarNumber").expect("scalar shown");
        assert!(scalar.disabled);
        assert!(first.find("First.obj.x").expect("x shown").disabled);
        assert!(!first.find("First.obj").expect("obj shown").disabled);
    }

    #[test]
    fn strong_equality_filters_objects_by_shape() {
        let settings = EditorSettings {
            type_equality: TypeEquality::Strong,
            ..EditorSettings::default()
        };
        let resolver = ReferenceResolver::from_settings(&settings);
        let target = PropertySchema::object()
            .with_property("x", PropertySchema::number())
            .with_property("y", PropertySchema::string());
        let tree = resolver.build(&scope(&GlobalVariables::new()), &[target]);

        assert_eq!(labels(&tree), vec!["First"]);
        let obj = tree[0].find("First.obj").expect("obj");
        assert!(obj.is_selectable_leaf());
    }

    #[test]
    fn selecting_group_or_object_is_a_no_op() {
        let resolver = ReferenceResolver::default();
        let tree = resolver.build(&scope(&GlobalVariables::new()), &[PropertySchema::string()]);
        let committed = RefCell::new(Vec::new());

        assert!(!resolver.select(&tree, "First.obj", |path| {
            committed.borrow_mut().push(path.to_string());
        }));
        assert!(!resolver.select(&tree, "First", |path| {
            committed.borrow_mut().push(path.to_string());
        }));
        assert!(committed.borrow().is_empty());

        assert!(resolver.select(&tree, "First.obj.y", |path| {
            committed.borrow_mut().push(path.to_string());
        }));
        assert_eq!(*committed.borrow(), vec!["First.obj.y".to_string()]);
    }

    #[test]
    fn disabled_leaf_is_not_selectable() {
        let resolver = ReferenceResolver::default().with_pruning(false);
        let tree = resolver.build(&scope(&GlobalVariables::new()), &[PropertySchema::string()]);
        let mut called = false;
        assert!(!resolver.select(&tree, "First.scalarNumber", |_| called = true));
        assert!(!called);
    }

    #[test]
    fn label_uses_titles_and_falls_back_to_raw_path() {
        let resolver = ReferenceResolver::default();
        let scope = scope(&GlobalVariables::new());

        let label = resolver.label_for(&scope, "First.obj.y");
        assert_eq!(label, ReferenceLabel::Resolved("First.obj.Why".to_string()));

        let label = resolver.label_for(&scope, "Deleted.node.value");
        assert!(!label.is_resolved());
        assert_eq!(label.to_string(), "Deleted.node.value");
    }

    #[test]
    fn matching_object_is_selectable_with_or_without_pruning() {
        let target = PropertySchema::object()
            .with_property("x", PropertySchema::number())
            .with_property("y", PropertySchema::string());
        let scope = scope(&GlobalVariables::new());

        for prune in [true, false] {
            let resolver = ReferenceResolver::new(TypeMatcher::strong()).with_pruning(prune);
            let tree = resolver.build(&scope, std::slice::from_ref(&target));
            let first = tree.iter().find(|g| g.label == "First").expect("first group");
            let obj = first.find("First.obj").expect("obj");
            assert!(obj.is_selectable_leaf(), "prune = {prune}");

            let mut committed = None;
            assert!(resolver.select(&tree, "First.obj", |path| {
                committed = Some(path.to_string());
            }));
            assert_eq!(committed.as_deref(), Some("First.obj"));
        }
    }
}
