use super::params::{InputParam, OutputParam, ParamType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The semantic type of a workflow node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Start,
    End,
    Llm,
    Knowledge,
    Tool,
    DocParser,
    Mcp,
    Vision,
    Intent,
}

/// How the output parameters of a node may be edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPolicy {
    /// The node produces nothing.
    None,
    /// System-defined outputs, shown read-only.
    Fixed,
    /// The user declares the outputs.
    Editable,
}

impl NodeKind {
    pub const ALL: [NodeKind; 9] = [
        NodeKind::Start,
        NodeKind::End,
        NodeKind::Llm,
        NodeKind::Knowledge,
        NodeKind::Tool,
        NodeKind::DocParser,
        NodeKind::Mcp,
        NodeKind::Vision,
        NodeKind::Intent,
    ];


    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::End => "end",
            NodeKind::Llm => "llm",
            NodeKind::Knowledge => "knowledge",
            NodeKind::Tool => "tool",
            NodeKind::DocParser => "doc_parser",
            NodeKind::Mcp => "mcp",
            NodeKind::Vision => "vision",
            NodeKind::Intent => "intent",
        }
    }

    /// The visual renderer used by the canvas. Everything but start/end shares
    /// the generic `common` renderer.
    pub fn renderer(&self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::End => "end",
            _ => "common",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            NodeKind::Start => "Start",
            NodeKind::End => "End",
            NodeKind::Llm => "LLM",
            NodeKind::Knowledge => "Knowledge Base",
            NodeKind::Tool => "Tool Call",
            NodeKind::DocParser => "Document Parser",
            NodeKind::Mcp => "MCP Service",
            NodeKind::Vision => "Vision",
            NodeKind::Intent => "Intent Recognition",
        }
    }

    pub fn accepts_inputs(&self) -> bool {
        !matches!(self, NodeKind::Start)
    }

    pub fn output_policy(&self) -> OutputPolicy {
        match self {
            NodeKind::End => OutputPolicy::None,
            NodeKind::Start
            | NodeKind::Llm
            | NodeKind::Knowledge
            | NodeKind::Tool
            | NodeKind::DocParser => OutputPolicy::Fixed,
            NodeKind::Mcp | NodeKind::Vision | NodeKind::Intent => OutputPolicy::Editable,
        }
    }

    /// Saved-flow field names holding this kind's [`NodeConfig`].
    pub fn config_fields(&self) -> &'static [&'static str] {
        match self {
            NodeKind::Start | NodeKind::End => &["reply_template"],
            NodeKind::Llm => &["model", "temperature", "system_prompt"],
            NodeKind::Knowledge => &["knowledge_base_id"],
            NodeKind::Tool => &["tool_name"],
            NodeKind::Mcp => &["mcp_server"],
            NodeKind::DocParser => &["parse_mode"],
            NodeKind::Vision | NodeKind::Intent => &[],
        }
    }

    /// Whether label and description can be changed by the user.
    pub fn header_editable(&self) -> bool {
        !matches!(self, NodeKind::Start | NodeKind::End)
    }

    /// Outputs a freshly dropped node of this kind starts with.
    pub fn default_outputs(&self) -> Vec<OutputParam> {
        match self {
            NodeKind::Llm => vec![
                OutputParam::new("text", ParamType::String, "Generated text"),
                OutputParam::new("usage", ParamType::Object, "Token usage"),
            ],
            NodeKind::Knowledge => vec![OutputParam::new(
                "chunks",
                ParamType::ObjectList,
                "Retrieved knowledge chunks",
            )],
            NodeKind::Tool => vec![OutputParam::new(
                "result",
                ParamType::String,
                "Tool execution result",
            )],
            NodeKind::DocParser => vec![OutputParam::new(
                "content",
                ParamType::String,
                "Parsed document text",
            )],
            NodeKind::Start => super::template::start_outputs(),
            NodeKind::End | NodeKind::Mcp | NodeKind::Vision | NodeKind::Intent => Vec::new(),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Parsing strategy of a document parser node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    #[default]
    Fast,
    /// OCR-backed parsing.
    Accurate,
}

impl ParseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMode::Fast => "fast",
            ParseMode::Accurate => "accurate",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub model: String,
    pub temperature: f64,
    pub system_prompt: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            temperature: 0.7,
            system_prompt: None,
        }
    }
}

/// Per-kind system parameters of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeConfig {
    Start { reply_template: Option<String> },
    End { reply_template: Option<String> },
    Llm(LlmConfig),
    Knowledge { knowledge_base_id: Option<String> },
    Tool { tool_name: Option<String> },
    Mcp { server: Option<String> },
    DocParser { parse_mode: ParseMode },
    Vision,
    Intent,
}

impl NodeConfig {
    pub fn default_for(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Start => NodeConfig::Start {
                reply_template: None,
            },
            NodeKind::End => NodeConfig::End {
                reply_template: None,
            },
            NodeKind::Llm => NodeConfig::Llm(LlmConfig::default()),
            NodeKind::Knowledge => NodeConfig::Knowledge {
                knowledge_base_id: None,
            },
            NodeKind::Tool => NodeConfig::Tool { tool_name: None },
            NodeKind::Mcp => NodeConfig::Mcp { server: None },
            NodeKind::DocParser => NodeConfig::DocParser {
                parse_mode: ParseMode::default(),
            },
            NodeKind::Vision => NodeConfig::Vision,
            NodeKind::Intent => NodeConfig::Intent,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeConfig::Start { .. } => NodeKind::Start,
            NodeConfig::End { .. } => NodeKind::End,
            NodeConfig::Llm(_) => NodeKind::Llm,
            NodeConfig::Knowledge { .. } => NodeKind::Knowledge,
            NodeConfig::Tool { .. } => NodeKind::Tool,
            NodeConfig::Mcp { .. } => NodeKind::Mcp,
            NodeConfig::DocParser { .. } => NodeKind::DocParser,
            NodeConfig::Vision => NodeKind::Vision,
            NodeConfig::Intent => NodeKind::Intent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Everything a node carries besides its id and position.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    pub label: String,
    pub description: Option<String>,
    pub config: NodeConfig,
    pub output_params: Vec<OutputParam>,
    pub input_params: Vec<InputParam>,
    /// Free-form fields this toolkit does not interpret, kept for round trips.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NodeData {
    /// Saved-flow fields owned by the typed members, whatever the kind.
    pub const RESERVED_FIELDS: [&'static str; 5] = [
        "label",
        "description",
        "originalType",
        "output_params",
        "input_params",
    ];

    /// Whether `key` is written from a typed member for a node of `kind`,
    /// and so may not live in `extra`.
    pub fn is_reserved(kind: NodeKind, key: &str) -> bool {
        Self::RESERVED_FIELDS.contains(&key) || kind.config_fields().contains(&key)
    }

    pub fn new(kind: NodeKind, label: &str) -> Self {
        Self {
            label: label.to_string(),
            description: None,
            config: NodeConfig::default_for(kind),
            output_params: kind.default_outputs(),
            input_params: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }
}

/// A vertex of the workflow graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub position: Position,
    pub data: NodeData,
}

impl Node {
    pub fn new(id: &str, kind: NodeKind, label: &str, position: Position) -> Self {
        Self {
            id: id.to_string(),
            position,
            data: NodeData::new(kind, label),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.data.config.kind()
    }

    /// The label shown in menus; falls back to the id for unlabeled nodes.
    pub fn display_label(&self) -> &str {
        if self.data.label.is_empty() {
            &self.id
        } else {
            &self.data.label
        }
    }

    pub fn with_outputs(mut self, outputs: Vec<OutputParam>) -> Self {
        self.data.output_params = outputs;
        self
    }

    pub fn with_inputs(mut self, inputs: Vec<InputParam>) -> Self {
        self.data.input_params = inputs;
        self
    }
}
