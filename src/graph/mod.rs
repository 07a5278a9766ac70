//! The in-memory workflow graph.
//!
//! A [`Graph`] keeps its nodes in insertion order (the order they are saved in)
//! behind an id index, and its edges in insertion order. Node ids are unique.
//! Edges created through [`Graph::connect`] always reference existing nodes;
//! edges loaded from a saved flow are taken as-is and may dangle, which
//! validation reports and the resolver tolerates.

use crate::error::GraphError;
use ahash::AHashMap;

mod node;
mod params;
pub mod template;

pub use node::{LlmConfig, Node, NodeConfig, NodeData, NodeKind, OutputPolicy, ParseMode, Position};
pub use params::{InputParam, OutputParam, ParamType, ValueSource};

/// A directed arc: the outputs of `source` are available as inputs to `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
    pub label: Option<String>,
    pub data: Option<serde_json::Value>,
}

impl Edge {
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            id: edge_id(source, None, target, None),
            source: source.to_string(),
            target: target.to_string(),
            source_handle: None,
            target_handle: None,
            label: None,
            data: None,
        }
    }

    pub fn with_handles(mut self, source_handle: Option<&str>, target_handle: Option<&str>) -> Self {
        self.source_handle = source_handle.map(str::to_string);
        self.target_handle = target_handle.map(str::to_string);
        self.id = edge_id(&self.source, source_handle, &self.target, target_handle);
        self
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    fn same_connection(&self, other: &Edge) -> bool {
        self.source == other.source
            && self.target == other.target
            && self.source_handle == other.source_handle
            && self.target_handle == other.target_handle
    }
}

/// Builds the id the canvas library assigns to a new connection.
pub fn edge_id(
    source: &str,
    source_handle: Option<&str>,
    target: &str,
    target_handle: Option<&str>,
) -> String {
    format!(
        "reactflow__edge-{}{}-{}{}",
        source,
        source_handle.unwrap_or(""),
        target,
        target_handle.unwrap_or("")
    )
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    index: AHashMap<String, usize>,
    edges: Vec<Edge>,
    next_node_seq: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new workflow: a start node and an end node, not yet connected.
    pub fn starter() -> Self {
        let mut graph = Self::new();
        for node in template::starter_nodes() {
            graph.index.insert(node.id.clone(), graph.nodes.len());
            graph.nodes.push(node);
        }
        graph
    }

    /// Assembles a graph from loaded parts. Node ids must be unique; edges are
    /// kept verbatim.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        for node in nodes {
            graph.insert_node(node)?;
        }
        graph.edges = edges;
        Ok(graph)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.index.contains_key(node_id)
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.index.get(node_id).map(|&i| &self.nodes[i])
    }

    pub fn node_mut(&mut self, node_id: &str) -> Option<&mut Node> {
        self.index.get(node_id).map(|&i| &mut self.nodes[i])
    }

    pub fn insert_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.index.contains_key(&node.id) {
            return Err(GraphError::DuplicateNodeId(node.id));
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Removes a node together with every edge touching it.
    pub fn remove_node(&mut self, node_id: &str) -> Result<Node, GraphError> {
        let position = self
            .index
            .remove(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
        let node = self.nodes.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        self.edges
            .retain(|e| e.source != node_id && e.target != node_id);
        Ok(node)
    }

    /// Adds an edge between two existing nodes. Connecting the same pair of
    /// handles twice is a no-op that returns the existing edge id.
    pub fn connect(&mut self, edge: Edge) -> Result<String, GraphError> {
        for endpoint in [&edge.source, &edge.target] {
            if !self.contains(endpoint) {
                return Err(GraphError::NodeNotFound(endpoint.clone()));
            }
        }
        if let Some(existing) = self.edges.iter().find(|e| e.same_connection(&edge)) {
            return Ok(existing.id.clone());
        }
        let id = edge.id.clone();
        self.edges.push(edge);
        Ok(id)
    }

    pub fn remove_edge(&mut self, edge_id: &str) -> Result<Edge, GraphError> {
        let position = self
            .edges
            .iter()
            .position(|e| e.id == edge_id)
            .ok_or_else(|| GraphError::EdgeNotFound(edge_id.to_string()))?;
        Ok(self.edges.remove(position))
    }

    /// Hands out the next free `node_<n>` id. The counter belongs to this graph,
    /// so independent graphs never influence each other.
    pub fn next_node_id(&mut self) -> String {
        loop {
            let candidate = format!("node_{}", self.next_node_seq);
            self.next_node_seq += 1;
            if !self.contains(&candidate) {
                return candidate;
            }
        }
    }
}
