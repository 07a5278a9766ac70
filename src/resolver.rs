use crate::graph::{Graph, Node, ParamType, ValueSource};
use ahash::{AHashMap, AHashSet};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::debug;

/// A variable a node can bind one of its inputs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableDescriptor {
    /// Human-readable `"<ancestor label>.<param>"`.
    pub label: String,
    /// Machine reference `"<ancestorId>.output.<param>"`.
    pub value: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
}

/// Collects the output variables produced upstream of a node.
///
/// The reverse adjacency is built once on construction, so one resolver can
/// answer queries for every node of the same graph.
pub struct UpstreamResolver<'a> {
    graph: &'a Graph,
    /// `target -> sources`, in edge order.
    parents: AHashMap<&'a str, Vec<&'a str>>,
}

impl<'a> UpstreamResolver<'a> {
    pub fn new(graph: &'a Graph) -> Self {
        let mut parents: AHashMap<&'a str, Vec<&'a str>> = AHashMap::new();
        for edge in graph.edges() {
            parents
                .entry(edge.target.as_str())
                .or_default()
                .push(edge.source.as_str());
        }
        Self { graph, parents }
    }

    /// Ancestors of `target` in breadth-first discovery order, each listed once.
    ///
    /// The target is marked visited before the walk starts, so it is never
    /// reported even when a cycle leads back to it. Sources that are not nodes
    /// of the graph are skipped.
    pub fn ancestors(&self, target: &str) -> Vec<&'a Node> {
        let mut visited: AHashSet<&str> = AHashSet::new();
        let mut found = Vec::new();
        let mut frontier: VecDeque<&str> = VecDeque::new();

        visited.insert(target);
        frontier.push_back(target);

        while let Some(current) = frontier.pop_front() {
            let Some(sources) = self.parents.get(current) else {
                continue;
            };
            for &source in sources {
                if !visited.insert(source) {
                    continue;
                }
                if let Some(node) = self.graph.node(source) {
                    found.push(node);
                    frontier.push_back(source);
                }
            }
        }
        found
    }

    /// Every output parameter of every ancestor of `target`.
    pub fn variables_for(&self, target: &str) -> Vec<VariableDescriptor> {
        let ancestors = self.ancestors(target);
        debug!(target_node = target, ancestors = ancestors.len(), "resolved upstream nodes");

        ancestors
            .into_iter()
            .flat_map(|node| {
                node.data.output_params.iter().map(move |param| VariableDescriptor {
                    label: format!("{}.{}", node.display_label(), param.name),
                    value: ValueSource::new(&node.id, &param.name).to_string(),
                    param_type: param.param_type.clone(),
                })
            })
            .collect()
    }

    /// Upstream variables for every node in the graph, keyed by node id.
    pub fn resolve_all(&self) -> AHashMap<&'a str, Vec<VariableDescriptor>> {
        self.graph
            .nodes()
            .iter()
            .map(|node| (node.id.as_str(), self.variables_for(&node.id)))
            .collect()
    }
}

/// Convenience wrapper for a single query.
pub fn upstream_variables(graph: &Graph, target: &str) -> Vec<VariableDescriptor> {
    UpstreamResolver::new(graph).variables_for(target)
}
