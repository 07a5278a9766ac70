//! An editing session over one workflow graph.
//!
//! The session is what a front-end holds while a workflow is open: the graph,
//! which node is selected, and the bookkeeping needed to ignore network
//! responses that arrive after the user has moved on.

use crate::error::{FlowError, GraphError};
use crate::flow::{FlowJson, IntoGraph};
use crate::graph::{
    Edge, Graph, InputParam, Node, NodeConfig, NodeData, NodeKind, OutputParam, OutputPolicy,
    Position,
};
use crate::resolver::{UpstreamResolver, VariableDescriptor};
use crate::validate::{ValidationReport, validate};
use itertools::Itertools;
use tracing::debug;

/// Identifies the selection a request was issued for.
///
/// Any selection change invalidates outstanding tickets, so a response carrying
/// an old ticket can be dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionTicket {
    epoch: u64,
    node_id: Option<String>,
}

impl SelectionTicket {
    pub fn node_id(&self) -> Option<&str> {
        self.node_id.as_deref()
    }
}

/// A partial update to a node. Only `Some` fields are applied.
#[derive(Debug, Clone, Default)]
pub struct NodeUpdate {
    pub label: Option<String>,
    pub description: Option<String>,
    pub config: Option<NodeConfig>,
    pub input_params: Option<Vec<InputParam>>,
    pub output_params: Option<Vec<OutputParam>>,
    pub extra: Option<serde_json::Map<String, serde_json::Value>>,
}

/// What the property panel shows for the selected node.
#[derive(Debug, Clone)]
pub struct NodeInspection<'a> {
    pub node: &'a Node,
    /// Sources its inputs may be bound to.
    pub variables: Vec<VariableDescriptor>,
    pub accepts_inputs: bool,
    pub output_policy: OutputPolicy,
    pub header_editable: bool,
}

#[derive(Debug, Clone)]
pub struct EditorSession {
    agent_id: Option<String>,
    graph: Graph,
    selected: Option<String>,
    epoch: u64,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSession {
    /// A new, unsaved workflow built from the start/end template.
    pub fn new() -> Self {
        Self::with_graph(None, Graph::starter())
    }

    /// Opens a saved workflow.
    pub fn open(agent_id: &str, flow: FlowJson) -> Result<Self, FlowError> {
        Ok(Self::with_graph(Some(agent_id.to_string()), flow.into_graph()?))
    }

    pub fn with_graph(agent_id: Option<String>, graph: Graph) -> Self {
        Self {
            agent_id,
            graph,
            selected: None,
            epoch: 0,
        }
    }

    pub fn agent_id(&self) -> Option<&str> {
        self.agent_id.as_deref()
    }

    /// Records the id the backend assigned on first save.
    pub fn set_agent_id(&mut self, agent_id: &str) {
        self.agent_id = Some(agent_id.to_string());
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Drops a new node of `kind` onto the canvas and returns its id.
    pub fn add_node(&mut self, kind: NodeKind, label: &str, position: Position) -> String {
        let id = self.graph.next_node_id();
        let label = if label.is_empty() {
            kind.display_name()
        } else {
            label
        };
        let inserted = self.graph.insert_node(Node::new(&id, kind, label, position));
        debug_assert!(inserted.is_ok(), "next_node_id returned a taken id");
        debug!(node_id = %id, kind = %kind, "added node");
        id
    }

    pub fn remove_node(&mut self, node_id: &str) -> Result<Node, GraphError> {
        let node = self.graph.remove_node(node_id)?;
        if self.selected.as_deref() == Some(node_id) {
            self.clear_selection();
        }
        debug!(node_id, "removed node");
        Ok(node)
    }

    pub fn move_node(&mut self, node_id: &str, position: Position) -> Result<(), GraphError> {
        let node = self
            .graph
            .node_mut(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
        node.position = position;
        Ok(())
    }

    pub fn connect(&mut self, source: &str, target: &str) -> Result<String, GraphError> {
        self.graph.connect(Edge::new(source, target))
    }

    pub fn connect_handles(
        &mut self,
        source: &str,
        source_handle: Option<&str>,
        target: &str,
        target_handle: Option<&str>,
    ) -> Result<String, GraphError> {
        self.graph
            .connect(Edge::new(source, target).with_handles(source_handle, target_handle))
    }

    pub fn remove_edge(&mut self, edge_id: &str) -> Result<Edge, GraphError> {
        self.graph.remove_edge(edge_id)
    }

    /// Merges `update` into a node, honoring what its kind allows to change.
    pub fn update_node(&mut self, node_id: &str, update: NodeUpdate) -> Result<(), GraphError> {
        let node = self
            .graph
            .node_mut(node_id)
            .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
        let kind = node.kind();
        let refuse = |what: &str| GraphError::NotEditable {
            node_id: node_id.to_string(),
            kind: kind.to_string(),
            what: what.to_string(),
        };

        if (update.label.is_some() || update.description.is_some()) && !kind.header_editable() {
            return Err(refuse("a new label or description"));
        }
        if let Some(config) = &update.config {
            if config.kind() != kind {
                return Err(refuse(&format!("{} configuration", config.kind())));
            }
        }
        if let Some(inputs) = &update.input_params {
            if !inputs.is_empty() && !kind.accepts_inputs() {
                return Err(refuse("input parameters"));
            }
        }
        if let Some(extra) = &update.extra {
            if let Some(key) = extra.keys().find(|k| NodeData::is_reserved(kind, k)) {
                return Err(refuse(&format!("'{}' as a free-form field", key)));
            }
        }
        if let Some(outputs) = &update.output_params {
            match kind.output_policy() {
                OutputPolicy::Editable => {
                    if let Some(bad) = outputs.iter().find(|p| !p.param_type.is_user_selectable()) {
                        return Err(GraphError::UnsupportedParamType {
                            node_id: node_id.to_string(),
                            name: bad.name.clone(),
                            type_name: bad.param_type.to_string(),
                        });
                    }
                }
                OutputPolicy::Fixed if *outputs == node.data.output_params => {}
                OutputPolicy::Fixed | OutputPolicy::None => {
                    return Err(refuse("changes to its output parameters"));
                }
            }
        }

        let data = &mut node.data;
        if let Some(label) = update.label {
            data.label = label;
        }
        if let Some(description) = update.description {
            data.description = Some(description).filter(|d| !d.is_empty());
        }
        if let Some(config) = update.config {
            data.config = config;
        }
        if let Some(inputs) = update.input_params {
            data.input_params = inputs;
        }
        if let Some(outputs) = update.output_params {
            data.output_params = outputs;
        }
        if let Some(extra) = update.extra {
            data.extra.extend(extra);
        }
        Ok(())
    }

    pub fn select(&mut self, node_id: &str) -> Result<(), GraphError> {
        if !self.graph.contains(node_id) {
            return Err(GraphError::NodeNotFound(node_id.to_string()));
        }
        if self.selected.as_deref() != Some(node_id) {
            self.selected = Some(node_id.to_string());
            self.epoch += 1;
        }
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        if self.selected.take().is_some() {
            self.epoch += 1;
        }
    }

    pub fn selected(&self) -> Option<&Node> {
        self.selected.as_deref().and_then(|id| self.graph.node(id))
    }

    /// Captures the current selection before issuing an async request.
    pub fn ticket(&self) -> SelectionTicket {
        SelectionTicket {
            epoch: self.epoch,
            node_id: self.selected.clone(),
        }
    }

    /// Whether a response issued under `ticket` still applies.
    pub fn is_current(&self, ticket: &SelectionTicket) -> bool {
        ticket.epoch == self.epoch && ticket.node_id == self.selected
    }

    /// The property-panel view of the selected node, recomputed on each call.
    pub fn inspect(&self) -> Option<NodeInspection<'_>> {
        let node = self.selected()?;
        let kind = node.kind();
        Some(NodeInspection {
            node,
            variables: UpstreamResolver::new(&self.graph).variables_for(&node.id),
            accepts_inputs: kind.accepts_inputs(),
            output_policy: kind.output_policy(),
            header_editable: kind.header_editable(),
        })
    }

    pub fn upstream_variables(&self, node_id: &str) -> Vec<VariableDescriptor> {
        UpstreamResolver::new(&self.graph).variables_for(node_id)
    }

    /// Distinct component names in use, in node order.
    pub fn used_components(&self) -> Vec<String> {
        self.graph
            .nodes()
            .iter()
            .map(|n| {
                if n.data.label.is_empty() {
                    n.kind().as_str().to_string()
                } else {
                    n.data.label.clone()
                }
            })
            .unique()
            .collect()
    }

    pub fn validate(&self) -> ValidationReport {
        validate(&self.graph)
    }

    pub fn to_flow_json(&self) -> FlowJson {
        self.graph.to_flow_json()
    }
}
