//! Canvas graph using petgraph.
//!
//! The canvas is the read-only view of the editor surface that variable
//! scopes are computed from:
//! - Nodes carry a title, a node type and the schema of their outputs
//! - Edges connect an upstream node to a downstream node
//! - A node may be nested inside a container, and a container may loop over
//!   a collection whose elements it exposes to its children

use crate::error::CanvasError;
use flowform_core::{CanvasId, NodeId};
use flowform_schema::PropertySchema;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef, Reversed};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use tracing::warn;

/// A node placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasNode {
    /// Stable identifier.
    pub id: NodeId,
    /// User-visible title.
    pub title: String,
    /// Node type, as known to the template registry.
    pub node_type: String,
    /// Schema of the outputs this node produces. Always an object.
    #[serde(default)]
    pub outputs: PropertySchema,
    /// Enclosing container, if nested.
    #[serde(default)]
    pub parent: Option<NodeId>,
    /// Element schema of the collection this container loops over.
    #[serde(default)]
    pub loop_item: Option<PropertySchema>,
}

impl CanvasNode {
    /// Creates a node with no outputs.
    #[must_use]
    pub fn new(title: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            title: title.into(),
            node_type: node_type.into(),
            outputs: PropertySchema::object(),
            parent: None,
            loop_item: None,
        }
    }

    /// Sets the output schema.
    #[must_use]
    pub fn with_outputs(mut self, outputs: PropertySchema) -> Self {
        self.outputs = outputs;
        self
    }

    /// Nests the node inside a container.
    #[must_use]
    pub fn inside(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Makes the node a loop over elements of the given schema.
    #[must_use]
    pub fn looping_over(mut self, item: PropertySchema) -> Self {
        self.loop_item = Some(item);
        self
    }

    /// Returns true if the node loops over a collection.
    #[must_use]
    pub fn is_loop(&self) -> bool {
        self.loop_item.is_some()
    }
}

/// An edge as persisted in canvas documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasEdge {
    /// Upstream node.
    pub source: NodeId,
    /// Downstream node.
    pub target: NodeId,
}

/// The canvas as a directed graph of nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasGraph {
    /// Canvas identifier.
    #[serde(default)]
    pub id: CanvasId,
    #[serde(with = "graph_serde")]
    graph: DiGraph<CanvasNode, ()>,
    /// Map from NodeId to petgraph's NodeIndex for O(1) lookup.
    #[serde(skip)]
    node_index_map: HashMap<NodeId, NodeIndex>,
}

impl CanvasGraph {
    /// Creates an empty canvas.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: CanvasId::new(),
            graph: DiGraph::new(),
            node_index_map: HashMap::new(),
        }
    }

    /// Parses a canvas document and checks its containment structure.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, a node names a missing
    /// container, or containment is cyclic.
    pub fn from_json_str(json: &str) -> flowform_core::Result<Self, CanvasError> {
        let mut canvas: Self = serde_json::from_str(json).map_err(|e| CanvasError::Parse {
            details: e.to_string(),
        })?;
        canvas.rebuild_index_map();
        canvas.validate()?;
        Ok(canvas)
    }

    /// Serializes the canvas to JSON text.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Adds a node to the canvas.
    ///
    /// Returns the node ID.
    pub fn add_node(&mut self, node: CanvasNode) -> NodeId {
        let node_id = node.id;
        let index = self.graph.add_node(node);
        self.node_index_map.insert(node_id, index);
        node_id
    }

    /// Connects an upstream node to a downstream node.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if either node is not on the canvas.
    pub fn add_edge(&mut self, source_id: NodeId, target_id: NodeId) -> Result<(), CanvasError> {
        let source = self.index_of(source_id)?;
        let target = self.index_of(target_id)?;
        self.graph.update_edge(source, target, ());
        Ok(())
    }

    /// Returns a node by its ID.
    #[must_use]
    pub fn get_node(&self, node_id: NodeId) -> Option<&CanvasNode> {
        let index = self.node_index_map.get(&node_id)?;
        self.graph.node_weight(*index)
    }

    /// Returns a mutable reference to a node by its ID.
    pub fn get_node_mut(&mut self, node_id: NodeId) -> Option<&mut CanvasNode> {
        let index = self.node_index_map.get(&node_id)?;
        self.graph.node_weight_mut(*index)
    }

    /// Finds the first node with the given title.
    #[must_use]
    pub fn find_by_title(&self, title: &str) -> Option<&CanvasNode> {
        self.nodes().find(|node| node.title == title)
    }

    /// Returns all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &CanvasNode> {
        self.graph.node_weights()
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns how many nodes of the given type are on the canvas.
    #[must_use]
    pub fn count_of_type(&self, node_type: &str) -> usize {
        self.nodes().filter(|node| node.node_type == node_type).count()
    }

    /// Returns the containers enclosing a node, outermost first.
    ///
    /// # Errors
    ///
    /// Returns an error if the node or one of its containers is missing, or
    /// containment is cyclic.
    pub fn containers(&self, node_id: NodeId) -> Result<Vec<&CanvasNode>, CanvasError> {
        let mut node = self
            .get_node(node_id)
            .ok_or(CanvasError::NodeNotFound { node_id })?;
        let mut chain = Vec::new();
        let mut seen = HashSet::from([node_id]);

        while let Some(parent) = node.parent {
            if !seen.insert(parent) {
                return Err(CanvasError::ContainmentCycle { node_id });
            }
            node = self.get_node(parent).ok_or(CanvasError::ParentNotFound {
                node_id: node.id,
                parent,
            })?;
            chain.push(node);
        }

        chain.reverse();
        Ok(chain)
    }

    /// Returns the nodes whose outputs are upstream of a node, in
    /// topological order.
    ///
    /// A node sees everything upstream of itself and everything upstream of
    /// each container it is nested in. The containers themselves are not
    /// included.
    ///
    /// # Errors
    ///
    /// Returns an error if the node is missing or its containment is broken.
    pub fn ancestors(&self, node_id: NodeId) -> Result<Vec<&CanvasNode>, CanvasError> {
        let start = self.index_of(node_id)?;
        let mut starts = vec![start];
        for container in self.containers(node_id)? {
            starts.push(self.index_of(container.id)?);
        }
        let excluded: HashSet<NodeIndex> = starts.iter().copied().collect();

        let reversed = Reversed(&self.graph);
        let mut upstream = HashSet::new();
        for index in starts {
            let mut bfs = Bfs::new(reversed, index);
            while let Some(visited) = bfs.next(reversed) {
                if !excluded.contains(&visited) {
                    upstream.insert(visited);
                }
            }
        }

        Ok(self
            .topological_order()
            .into_iter()
            .filter(|index| upstream.contains(index))
            .filter_map(|index| self.graph.node_weight(index))
            .collect())
    }

    /// Checks that every container exists and containment is acyclic.
    ///
    /// # Errors
    ///
    /// Returns the first containment problem found.
    pub fn validate(&self) -> Result<(), CanvasError> {
        for node in self.nodes() {
            self.containers(node.id)?;
        }
        Ok(())
    }

    /// Rebuilds the node index map after deserialization.
    pub fn rebuild_index_map(&mut self) {
        self.node_index_map.clear();
        for index in self.graph.node_indices() {
            if let Some(node) = self.graph.node_weight(index) {
                self.node_index_map.insert(node.id, index);
            }
        }
    }

    fn index_of(&self, node_id: NodeId) -> Result<NodeIndex, CanvasError> {
        self.node_index_map
            .get(&node_id)
            .copied()
            .ok_or(CanvasError::NodeNotFound { node_id })
    }

    /// Kahn's algorithm, breaking ties by insertion order so the result is
    /// the same for the same canvas.
    fn topological_order(&self) -> Vec<NodeIndex> {
        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|index| {
                let degree = self.graph.neighbors_directed(index, Direction::Incoming).count();
                (index, degree)
            })
            .collect();
        let mut ready: BinaryHeap<Reverse<NodeIndex>> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(index, _)| Reverse(*index))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(index)) = ready.pop() {
            order.push(index);
            for next in self.graph.neighbors_directed(index, Direction::Outgoing) {
                if let Some(degree) = in_degree.get_mut(&next) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse(next));
                    }
                }
            }
        }

        if order.len() < self.graph.node_count() {
            warn!(
                canvas_id = %self.id,
                "canvas contains a cycle, ordering the remaining nodes by insertion"
            );
            let placed: HashSet<NodeIndex> = order.iter().copied().collect();
            order.extend(self.graph.node_indices().filter(|index| !placed.contains(index)));
        }
        order
    }
}

impl Default for CanvasGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Custom serde for petgraph DiGraph.
mod graph_serde {
    use super::*;
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeStruct;

    pub fn serialize<S>(graph: &DiGraph<CanvasNode, ()>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let nodes: Vec<_> = graph.node_weights().collect();
        let edges: Vec<_> = graph
            .edge_references()
            .filter_map(|e| {
                let source = graph.node_weight(e.source())?.id;
                let target = graph.node_weight(e.target())?.id;
                Some(CanvasEdge { source, target })
            })
            .collect();

        let mut state = serializer.serialize_struct("Canvas", 2)?;
        state.serialize_field("nodes", &nodes)?;
        state.serialize_field("edges", &edges)?;
        state.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DiGraph<CanvasNode, ()>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct CanvasVisitor;

        impl<'de> Visitor<'de> for CanvasVisitor {
            type Value = DiGraph<CanvasNode, ()>;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a canvas with nodes and edges")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut nodes: Option<Vec<CanvasNode>> = None;
                let mut edges: Option<Vec<CanvasEdge>> = None;

                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "nodes" => nodes = Some(map.next_value()?),
                        "edges" => edges = Some(map.next_value()?),
                        _ => {
                            let _ = map.next_value::<serde::de::IgnoredAny>()?;
                        }
                    }
                }

                let mut graph = DiGraph::new();
                let mut id_to_index = HashMap::new();

                for node in nodes.unwrap_or_default() {
                    let id = node.id;
                    let index = graph.add_node(node);
                    id_to_index.insert(id, index);
                }

                for edge in edges.unwrap_or_default() {
                    let (Some(&source), Some(&target)) =
                        (id_to_index.get(&edge.source), id_to_index.get(&edge.target))
                    else {
                        continue;
                    };
                    graph.update_edge(source, target, ());
                }

                Ok(graph)
            }
        }

        deserializer.deserialize_struct("Canvas", &["nodes", "edges"], CanvasVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(nodes: &[&CanvasNode]) -> Vec<String> {
        nodes.iter().map(|node| node.title.clone()).collect()
    }

    #[test]
    fn ancestors_follow_edges_upstream() {
        let mut canvas = CanvasGraph::new();
        let start = canvas.add_node(CanvasNode::new("Start", "start"));
        let fetch = canvas.add_node(CanvasNode::new("Fetch", "http"));
        let summarize = canvas.add_node(CanvasNode::new("Summarize", "llm"));
        let unrelated = canvas.add_node(CanvasNode::new("Unrelated", "code"));
        canvas.add_edge(start, fetch).expect("edge");
        canvas.add_edge(fetch, summarize).expect("edge");
        canvas.add_edge(summarize, unrelated).expect("edge");

        let ancestors = canvas.ancestors(summarize).expect("ancestors");
        assert_eq!(titles(&ancestors), vec!["Start", "Fetch"]);
    }

    #[test]
    fn nested_node_sees_upstream_of_its_container() {
        let mut canvas = CanvasGraph::new();
        let start = canvas.add_node(CanvasNode::new("Start", "start"));
        let each = canvas.add_node(
            CanvasNode::new("Each", "loop").looping_over(PropertySchema::string()),
        );
        let inner = canvas.add_node(CanvasNode::new("Inner", "code").inside(each));
        canvas.add_edge(start, each).expect("edge");

        let ancestors = canvas.ancestors(inner).expect("ancestors");
        assert_eq!(titles(&ancestors), vec!["Start"]);

        let containers = canvas.containers(inner).expect("containers");
        assert_eq!(titles(&containers), vec!["Each"]);
    }

    #[test]
    fn edge_to_missing_node_is_rejected() {
        let mut canvas = CanvasGraph::new();
        let start = canvas.add_node(CanvasNode::new("Start", "start"));
        let err = canvas.add_edge(start, NodeId::new()).unwrap_err();
        assert!(matches!(err, CanvasError::NodeNotFound { .. }));
    }

    #[test]
    fn containment_cycle_is_detected() {
        let mut canvas = CanvasGraph::new();
        let a = CanvasNode::new("A", "loop");
        let b = CanvasNode::new("B", "loop").inside(a.id);
        let a = a.inside(b.id);
        let a_id = canvas.add_node(a);
        canvas.add_node(b);

        let err = canvas.containers(a_id).unwrap_err();
        assert!(matches!(err, CanvasError::ContainmentCycle { .. }));
        assert!(canvas.validate().is_err());
    }

    #[test]
    fn cyclic_edges_still_yield_ancestors() {
        let mut canvas = CanvasGraph::new();
        let a = canvas.add_node(CanvasNode::new("A", "code"));
        let b = canvas.add_node(CanvasNode::new("B", "code"));
        let c = canvas.add_node(CanvasNode::new("C", "code"));
        canvas.add_edge(a, b).expect("edge");
        canvas.add_edge(b, a).expect("edge");
        canvas.add_edge(b, c).expect("edge");

        let ancestors = canvas.ancestors(c).expect("ancestors");
        assert_eq!(titles(&ancestors), vec!["A", "B"]);
    }

    #[test]
    fn canvas_json_roundtrip() {
        let mut canvas = CanvasGraph::new();
        let start = canvas.add_node(
            CanvasNode::new("Start", "start")
                .with_outputs(PropertySchema::object().with_property("query", PropertySchema::string())),
        );
        let fetch = canvas.add_node(CanvasNode::new("Fetch", "http"));
        canvas.add_edge(start, fetch).expect("edge");

        let json = canvas.to_json_string();
        let parsed = CanvasGraph::from_json_str(&json).expect("parse");

        assert_eq!(parsed.id, canvas.id);
        assert_eq!(parsed.node_count(), 2);
        assert_eq!(parsed.edge_count(), 1);
        assert_eq!(parsed.get_node(start), canvas.get_node(start));
        assert_eq!(titles(&parsed.ancestors(fetch).expect("ancestors")), vec!["Start"]);
    }

    #[test]
    fn malformed_canvas_is_a_parse_error() {
        let err = CanvasGraph::from_json_str("{\"graph\": 3}").unwrap_err();
        assert!(err.to_string().contains("failed to parse canvas"));
    }

    #[test]
    fn count_of_type_counts_matching_nodes() {
        let mut canvas = CanvasGraph::new();
        canvas.add_node(CanvasNode::new("Start", "start"));
        canvas.add_node(CanvasNode::new("A", "http"));
        canvas.add_node(CanvasNode::new("B", "http"));
        assert_eq!(canvas.count_of_type("http"), 2);
        assert!(canvas.find_by_title("B").is_some());
    }
}
