//! Variables visible to one node.
//!
//! A scope is built from a canvas and a snapshot of the global variable
//! lists. It is never updated in place: when the canvas changes, build a new
//! one.

use crate::canvas::{CanvasGraph, CanvasNode};
use crate::error::CanvasError;
use crate::variable::{GlobalGroup, GlobalVariables, Variable};
use flowform_core::NodeId;
use flowform_schema::{PathStrategy, PropertySchema};
use tracing::{debug, instrument};

/// Name of the loop-local iteration counter.
pub const LOOP_INDEX: &str = "index";
/// Name of the loop-local current element.
pub const LOOP_ITEM: &str = "item";

/// Where a group of variables comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Locals of an enclosing loop.
    Loop,
    /// A global variable list.
    Global(GlobalGroup),
    /// Outputs of an upstream node.
    Node,
}

/// A group of variables with a common producer.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSource {
    /// Kind of producer.
    pub kind: SourceKind,
    /// Producing node, for loop and node sources.
    pub node_id: Option<NodeId>,
    /// Display name of the producer.
    pub label: String,
    /// Path prefix shared by all variables of the group.
    pub path: String,
    /// Variables in declaration order.
    pub variables: Vec<Variable>,
}

/// A stored path matched against a scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPath<'a> {
    /// The group the variable belongs to.
    pub source: &'a VariableSource,
    /// The variable the path starts with.
    pub variable: &'a Variable,
    /// Schema at the full path, which may be nested inside the variable.
    pub schema: &'a PropertySchema,
    /// Dotted chain of display titles.
    pub label: String,
}

/// The catalog of variables a node may reference.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableScope {
    node_id: NodeId,
    loops: Vec<VariableSource>,
    globals: Vec<VariableSource>,
    nodes: Vec<VariableSource>,
}

impl VariableScope {
    /// Builds the scope of a node.
    ///
    /// Loop sources are ordered innermost first, node sources upstream
    /// first. Nodes without outputs and empty global lists produce no source.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is not on the canvas or containment is
    /// broken.
    #[instrument(skip(canvas, globals), fields(canvas_id = %canvas.id))]
    pub fn for_node(
        canvas: &CanvasGraph,
        node_id: NodeId,
        globals: &GlobalVariables,
        strategy: PathStrategy,
    ) -> Result<Self, CanvasError> {
        let mut loops = Vec::new();
        for container in canvas.containers(node_id)?.into_iter().rev() {
            if let Some(item) = &container.loop_item {
                let path = node_path(canvas, container, strategy)?;
                let variables = vec![
                    Variable {
                        key: LOOP_INDEX.to_string(),
                        schema: PropertySchema::integer(),
                        path: format!("{path}.{LOOP_INDEX}"),
                        readonly: true,
                    },
                    Variable {
                        key: LOOP_ITEM.to_string(),
                        schema: item.clone(),
                        path: format!("{path}.{LOOP_ITEM}"),
                        readonly: true,
                    },
                ];
                loops.push(VariableSource {
                    kind: SourceKind::Loop,
                    node_id: Some(container.id),
                    label: container.title.clone(),
                    path,
                    variables,
                });
            }
        }

        let globals = [GlobalGroup::System, GlobalGroup::User]
            .into_iter()
            .filter(|group| !globals.group(*group).is_empty())
            .map(|group| VariableSource {
                kind: SourceKind::Global(group),
                node_id: None,
                label: group.as_str().to_string(),
                path: group.as_str().to_string(),
                variables: globals
                    .group(group)
                    .iter()
                    .map(|(name, schema)| Variable {
                        key: name.to_string(),
                        schema: schema.clone(),
                        path: format!("{group}.{name}"),
                        readonly: group == GlobalGroup::System,
                    })
                    .collect(),
            })
            .collect();

        let mut nodes = Vec::new();
        for ancestor in canvas.ancestors(node_id)? {
            let Some(outputs) = ancestor.outputs.properties().filter(|p| !p.is_empty()) else {
                continue;
            };
            let path = node_path(canvas, ancestor, strategy)?;
            let variables = outputs
                .iter()
                .map(|(key, schema)| Variable {
                    key: key.to_string(),
                    schema: schema.clone(),
                    path: format!("{path}.{key}"),
                    readonly: true,
                })
                .collect();
            nodes.push(VariableSource {
                kind: SourceKind::Node,
                node_id: Some(ancestor.id),
                label: ancestor.title.clone(),
                path,
                variables,
            });
        }

        debug!(
            loops = loops.len(),
            nodes = nodes.len(),
            "variable scope built"
        );
        Ok(Self {
            node_id,
            loops,
            globals,
            nodes,
        })
    }

    /// Returns the node the scope was built for.
    #[must_use]
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Returns the loop-local sources, innermost loop first.
    #[must_use]
    pub fn loop_sources(&self) -> &[VariableSource] {
        &self.loops
    }

    /// Returns the global sources, system before user.
    #[must_use]
    pub fn global_sources(&self) -> &[VariableSource] {
        &self.globals
    }

    /// Returns the upstream node sources in topological order.
    #[must_use]
    pub fn node_sources(&self) -> &[VariableSource] {
        &self.nodes
    }

    /// Returns every source.
    pub fn sources(&self) -> impl Iterator<Item = &VariableSource> {
        self.loops.iter().chain(&self.globals).chain(&self.nodes)
    }

    /// Returns every variable.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.sources().flat_map(|source| source.variables.iter())
    }

    /// Returns true if nothing is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables().next().is_none()
    }

    /// Matches a stored path against the scope.
    ///
    /// The longest variable path that is a prefix of `path` wins, and any
    /// remaining segments descend into the variable's object properties.
    /// Returns `None` when nothing matches.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<ResolvedPath<'_>> {
        let (source, variable, rest) = self
            .sources()
            .flat_map(|source| source.variables.iter().map(move |v| (source, v)))
            .filter_map(|(source, variable)| {
                let rest = if path == variable.path {
                    ""
                } else {
                    path.strip_prefix(variable.path.as_str())?.strip_prefix('.')?
                };
                Some((source, variable, rest))
            })
            .max_by_key(|(_, variable, _)| variable.path.len())?;

        let mut label = format!("{}.{}", source.label, variable.title());
        let mut schema = &variable.schema;
        for segment in rest.split('.').filter(|segment| !segment.is_empty()) {
            schema = schema.property(segment)?;
            label.push('.');
            label.push_str(schema.display_title(segment));
        }

        Some(ResolvedPath {
            source,
            variable,
            schema,
            label,
        })
    }
}

fn node_path(
    canvas: &CanvasGraph,
    node: &CanvasNode,
    strategy: PathStrategy,
) -> Result<String, CanvasError> {
    match strategy {
        PathStrategy::Title => {
            let mut titles: Vec<&str> = canvas
                .containers(node.id)?
                .into_iter()
                .map(|container| container.title.as_str())
                .collect();
            titles.push(&node.title);
            Ok(titles.join("."))
        }
        PathStrategy::StableId => Ok(node.id.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowform_schema::PropertyKind;

    struct Fixture {
        canvas: CanvasGraph,
        fetch: NodeId,
        each: NodeId,
        inner: NodeId,
    }

    fn fixture() -> Fixture {
        let mut canvas = CanvasGraph::new();
        let start = canvas.add_node(
            CanvasNode::new("Start", "start")
                .with_outputs(PropertySchema::object().with_property("query", PropertySchema::string())),
        );
        let fetch = canvas.add_node(
            CanvasNode::new("Fetch", "http").with_outputs(
                PropertySchema::object()
                    .with_property("status", PropertySchema::integer())
                    .with_property(
                        "body",
                        PropertySchema::object()
                            .with_title("Response")
                            .with_property("text", PropertySchema::string().with_title("Text")),
                    ),
            ),
        );
        let each = canvas.add_node(
            CanvasNode::new("Each", "loop").looping_over(
                PropertySchema::object().with_property("name", PropertySchema::string()),
            ),
        );
        let step = canvas.add_node(
            CanvasNode::new("Step", "code")
                .inside(each)
                .with_outputs(PropertySchema::object().with_property("out", PropertySchema::number())),
        );
        let inner = canvas.add_node(CanvasNode::new("Inner", "code").inside(each));
        canvas.add_edge(start, fetch).expect("edge");
        canvas.add_edge(fetch, each).expect("edge");
        canvas.add_edge(step, inner).expect("edge");
        Fixture {
            canvas,
            fetch,
            each,
            inner,
        }
    }

    fn globals() -> GlobalVariables {
        GlobalVariables::new()
            .with_system("now", PropertySchema::string())
            .with_user("apiKey", PropertySchema::string())
    }

    fn paths(source: &VariableSource) -> Vec<&str> {
        source.variables.iter().map(|v| v.path.as_str()).collect()
    }

    #[test]
    fn nested_node_sees_loop_locals_globals_and_upstream() {
        let fixture = fixture();
        let scope = VariableScope::for_node(
            &fixture.canvas,
            fixture.inner,
            &globals(),
            PathStrategy::Title,
        )
        .expect("scope");

        assert_eq!(scope.loop_sources().len(), 1);
        assert_eq!(paths(&scope.loop_sources()[0]), vec!["Each.index", "Each.item"]);

        let globals: Vec<_> = scope.global_sources().iter().map(paths).collect();
        assert_eq!(globals, vec![vec!["system.now"], vec!["user.apiKey"]]);
        assert!(scope.global_sources()[0].variables[0].readonly);
        assert!(!scope.global_sources()[1].variables[0].readonly);

        let nodes: Vec<_> = scope.node_sources().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(nodes, vec!["Start", "Fetch", "Step"]);
        assert_eq!(paths(&scope.node_sources()[2]), vec!["Each.Step.out"]);
    }

    #[test]
    fn top_level_node_has_no_loop_locals() {
        let fixture = fixture();
        let scope = VariableScope::for_node(
            &fixture.canvas,
            fixture.each,
            &GlobalVariables::new(),
            PathStrategy::Title,
        )
        .expect("scope");

        assert!(scope.loop_sources().is_empty());
        assert!(scope.global_sources().is_empty());
        assert_eq!(scope.node_sources().len(), 2);
    }

    #[test]
    fn paths_are_deterministic() {
        let fixture = fixture();
        let build = || {
            VariableScope::for_node(&fixture.canvas, fixture.inner, &globals(), PathStrategy::Title)
                .expect("scope")
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn stable_id_paths_survive_retitling() {
        let mut fixture = fixture();
        let before = VariableScope::for_node(
            &fixture.canvas,
            fixture.inner,
            &globals(),
            PathStrategy::StableId,
        )
        .expect("scope");

        fixture
            .canvas
            .get_node_mut(fixture.fetch)
            .expect("fetch")
            .title = "Download".to_string();
        let after = VariableScope::for_node(
            &fixture.canvas,
            fixture.inner,
            &globals(),
            PathStrategy::StableId,
        )
        .expect("scope");

        let stored = format!("{}.status", fixture.fetch);
        assert!(before.resolve(&stored).is_some());
        let resolved = after.resolve(&stored).expect("still resolves");
        assert_eq!(resolved.label, "Download.status");
    }

    #[test]
    fn resolve_descends_into_nested_properties() {
        let fixture = fixture();
        let scope = VariableScope::for_node(
            &fixture.canvas,
            fixture.inner,
            &globals(),
            PathStrategy::Title,
        )
        .expect("scope");

        let resolved = scope.resolve("Fetch.body.text").expect("resolves");
        assert_eq!(resolved.variable.key, "body");
        assert_eq!(resolved.schema.kind(), PropertyKind::String);
        assert_eq!(resolved.label, "Fetch.Response.Text");

        assert!(scope.resolve("Fetch.body.missing").is_none());
        assert!(scope.resolve("Fetchx.status").is_none());
        assert!(scope.resolve("Gone.status").is_none());
    }

    #[test]
    fn unknown_node_is_an_error() {
        let fixture = fixture();
        let err = VariableScope::for_node(
            &fixture.canvas,
            NodeId::new(),
            &globals(),
            PathStrategy::Title,
        )
        .unwrap_err();
        assert!(matches!(err, CanvasError::NodeNotFound { .. }));
    }
}
