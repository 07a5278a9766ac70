use super::wire::{FlowJson, WireEdge, WireNode};
use crate::error::{FlowError, GraphError};
use crate::graph::{
    Edge, Graph, LlmConfig, Node, NodeConfig, NodeData, NodeKind, ParseMode, edge_id,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::warn;

/// A trait for saved representations that can be turned into a [`Graph`].
///
/// [`FlowJson`] implements it for the backend's flow format; other formats
/// (an import from another tool, a generated draft) can implement it too and
/// get validation and variable resolution for free.
///
/// # Example
///
/// ```rust,no_run
/// use flowstudio::prelude::*;
/// use flowstudio::error::FlowError;
///
/// struct Pipeline { steps: Vec<String> }
///
/// impl IntoGraph for Pipeline {
///     fn into_graph(self) -> std::result::Result<Graph, FlowError> {
///         let mut graph = Graph::starter();
///         let mut previous = "start-node".to_string();
///         for step in self.steps {
///             let id = graph.next_node_id();
///             graph
///                 .insert_node(Node::new(&id, NodeKind::Llm, &step, Position::default()))
///                 .map_err(|e| FlowError::DuplicateNodeId(e.to_string()))?;
///             graph
///                 .connect(Edge::new(&previous, &id))
///                 .map_err(|e| FlowError::JsonParseError(e.to_string()))?;
///             previous = id;
///         }
///         Ok(graph)
///     }
/// }
/// ```
pub trait IntoGraph {
    /// Consumes the object and converts it into an editable workflow graph.
    fn into_graph(self) -> Result<Graph, FlowError>;
}

const PLACEHOLDER_TYPE: &str = "common";

impl IntoGraph for FlowJson {
    fn into_graph(self) -> Result<Graph, FlowError> {
        let nodes = self
            .nodes
            .into_iter()
            .map(decode_node)
            .collect::<Result<Vec<_>, _>>()?;

        let edges: Vec<Edge> = self.edges.into_iter().map(decode_edge).collect();

        let graph = Graph::from_parts(nodes, edges).map_err(|e| match e {
            GraphError::DuplicateNodeId(id) => FlowError::DuplicateNodeId(id),
            other => FlowError::JsonParseError(other.to_string()),
        })?;

        for edge in graph.edges() {
            for endpoint in [&edge.source, &edge.target] {
                if !graph.contains(endpoint) {
                    warn!(edge = %edge.id, missing = %endpoint, "edge references an unknown node");
                }
            }
        }
        Ok(graph)
    }
}

impl FlowJson {
    pub fn from_json(json: &str) -> Result<Self, FlowError> {
        serde_json::from_str(json).map_err(|e| FlowError::JsonParseError(e.to_string()))
    }
}

impl From<&Graph> for FlowJson {
    fn from(graph: &Graph) -> Self {
        graph.to_flow_json()
    }
}

impl Graph {
    /// Shapes the graph into the saved-flow payload. Nodes are written with
    /// their semantic type, never the canvas placeholder.
    pub fn to_flow_json(&self) -> FlowJson {
        FlowJson {
            nodes: self.nodes().iter().map(encode_node).collect(),
            edges: self.edges().iter().map(encode_edge).collect(),
        }
    }
}

fn decode_node(wire: WireNode) -> Result<Node, FlowError> {
    let id = wire.id;
    let mut data = wire.data;

    let original_type = data.remove("originalType");
    let type_name = if wire.node_type == PLACEHOLDER_TYPE {
        match original_type {
            Some(Value::String(name)) => name,
            _ => {
                return Err(FlowError::UnknownNodeType {
                    node_id: id,
                    type_name: wire.node_type,
                });
            }
        }
    } else {
        wire.node_type
    };

    let kind: NodeKind = type_name
        .parse()
        .map_err(|type_name| FlowError::UnknownNodeType {
            node_id: id.clone(),
            type_name,
        })?;

    let mut fields = FieldReader {
        node_id: &id,
        data: &mut data,
    };
    let label = fields.string("label")?.unwrap_or_default();
    let description = fields.string("description")?;
    let output_params = fields.list("output_params")?;
    let input_params = fields.list("input_params")?;
    let config = decode_config(kind, &mut fields)?;

    Ok(Node {
        position: wire.position.unwrap_or_default(),
        data: NodeData {
            label,
            description,
            config,
            output_params,
            input_params,
            extra: data,
        },
        id,
    })
}

fn decode_config(kind: NodeKind, fields: &mut FieldReader<'_>) -> Result<NodeConfig, FlowError> {
    let config = match kind {
        NodeKind::Start => NodeConfig::Start {
            reply_template: fields.string("reply_template")?,
        },
        NodeKind::End => NodeConfig::End {
            reply_template: fields.string("reply_template")?,
        },
        NodeKind::Llm => {
            let defaults = LlmConfig::default();
            NodeConfig::Llm(LlmConfig {
                model: fields.string("model")?.unwrap_or(defaults.model),
                temperature: fields.number("temperature")?.unwrap_or(defaults.temperature),
                system_prompt: fields.string("system_prompt")?,
            })
        }
        NodeKind::Knowledge => NodeConfig::Knowledge {
            knowledge_base_id: fields.string("knowledge_base_id")?,
        },
        NodeKind::Tool => NodeConfig::Tool {
            tool_name: fields.string("tool_name")?,
        },
        NodeKind::Mcp => NodeConfig::Mcp {
            server: fields.string("mcp_server")?,
        },
        NodeKind::DocParser => {
            let parse_mode = match fields.string("parse_mode")?.as_deref() {
                None | Some("fast") => ParseMode::Fast,
                Some("accurate") => ParseMode::Accurate,
                Some(other) => {
                    return Err(fields.invalid("parse_mode", format!("unknown mode '{}'", other)));
                }
            };
            NodeConfig::DocParser { parse_mode }
        }
        NodeKind::Vision => NodeConfig::Vision,
        NodeKind::Intent => NodeConfig::Intent,
    };
    Ok(config)
}

/// Pulls known fields out of a node's free-form data map, leaving the rest.
struct FieldReader<'a> {
    node_id: &'a str,
    data: &'a mut Map<String, Value>,
}

impl FieldReader<'_> {
    fn invalid(&self, field: &str, message: String) -> FlowError {
        FlowError::InvalidField {
            node_id: self.node_id.to_string(),
            field: field.to_string(),
            message,
        }
    }

    /// Empty strings and nulls both read as "not set".
    fn string(&mut self, field: &str) -> Result<Option<String>, FlowError> {
        match self.data.remove(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(self.invalid(field, format!("expected a string, found {}", other))),
        }
    }

    /// Accepts numbers and numeric strings, which form inputs tend to produce.
    fn number(&mut self, field: &str) -> Result<Option<f64>, FlowError> {
        match self.data.remove(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| self.invalid(field, format!("'{}' is not a number", s))),
            Some(other) => Err(self.invalid(field, format!("expected a number, found {}", other))),
        }
    }

    fn list<T: DeserializeOwned>(&mut self, field: &str) -> Result<Vec<T>, FlowError> {
        match self.data.remove(field) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => {
                serde_json::from_value(value).map_err(|e| self.invalid(field, e.to_string()))
            }
        }
    }
}

fn decode_edge(wire: WireEdge) -> Edge {
    let id = wire.id.filter(|id| !id.is_empty()).unwrap_or_else(|| {
        edge_id(
            &wire.source,
            wire.source_handle.as_deref(),
            &wire.target,
            wire.target_handle.as_deref(),
        )
    });
    Edge {
        id,
        source: wire.source,
        target: wire.target,
        source_handle: wire.source_handle,
        target_handle: wire.target_handle,
        label: wire.label,
        data: wire.data,
    }
}

fn encode_node(node: &Node) -> WireNode {
    let kind = node.kind();
    let mut data: Map<String, Value> = node
        .data
        .extra
        .iter()
        .filter(|(key, _)| !NodeData::is_reserved(kind, key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    let mut put = |key: &str, value: Value| {
        data.insert(key.to_string(), value);
    };

    put("label", Value::from(node.data.label.as_str()));
    if let Some(description) = &node.data.description {
        put("description", Value::from(description.as_str()));
    }

    match &node.data.config {
        NodeConfig::Start { reply_template } | NodeConfig::End { reply_template } => {
            if let Some(template) = reply_template {
                put("reply_template", Value::from(template.as_str()));
            }
        }
        NodeConfig::Llm(llm) => {
            put("model", Value::from(llm.model.as_str()));
            put("temperature", Value::from(llm.temperature));
            if let Some(prompt) = &llm.system_prompt {
                put("system_prompt", Value::from(prompt.as_str()));
            }
        }
        NodeConfig::Knowledge { knowledge_base_id } => {
            if let Some(kb) = knowledge_base_id {
                put("knowledge_base_id", Value::from(kb.as_str()));
            }
        }
        NodeConfig::Tool { tool_name } => {
            if let Some(tool) = tool_name {
                put("tool_name", Value::from(tool.as_str()));
            }
        }
        NodeConfig::Mcp { server } => {
            if let Some(server) = server {
                put("mcp_server", Value::from(server.as_str()));
            }
        }
        NodeConfig::DocParser { parse_mode } => {
            put("parse_mode", Value::from(parse_mode.as_str()));
        }
        NodeConfig::Vision | NodeConfig::Intent => {}
    }

    if !node.data.output_params.is_empty() {
        put("output_params", to_value(&node.data.output_params));
    }
    if !node.data.input_params.is_empty() {
        put("input_params", to_value(&node.data.input_params));
    }

    WireNode {
        id: node.id.clone(),
        node_type: kind.as_str().to_string(),
        position: Some(node.position),
        data,
    }
}

fn encode_edge(edge: &Edge) -> WireEdge {
    WireEdge {
        id: Some(edge.id.clone()),
        source: edge.source.clone(),
        target: edge.target.clone(),
        source_handle: edge.source_handle.clone(),
        target_handle: edge.target_handle.clone(),
        label: edge.label.clone(),
        data: edge.data.clone(),
    }
}

// Parameter lists are plain derive(Serialize) structs of strings; this cannot fail.
fn to_value<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
