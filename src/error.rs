use thiserror::Error;

/// Errors that can occur while decoding or converting a saved flow.
#[derive(Error, Debug, Clone)]
pub enum FlowError {
    #[error("Failed to parse flow JSON: {0}")]
    JsonParseError(String),

    #[error("Node '{node_id}' has an unknown node type: '{type_name}'")]
    UnknownNodeType { node_id: String, type_name: String },

    #[error("Node id '{0}' appears more than once in the flow")]
    DuplicateNodeId(String),

    #[error("Node '{node_id}' has an invalid field '{field}': {message}")]
    InvalidField {
        node_id: String,
        field: String,
        message: String,
    },

    #[error("Could not access flow file '{path}': {message}")]
    Io { path: String, message: String },
}

/// Errors raised by edits to an in-memory graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node '{0}' not found")]
    NodeNotFound(String),

    #[error("Edge '{0}' not found")]
    EdgeNotFound(String),

    #[error("A node with id '{0}' already exists")]
    DuplicateNodeId(String),

    #[error("Node '{node_id}' ({kind}) does not accept {what}")]
    NotEditable {
        node_id: String,
        kind: String,
        what: String,
    },

    #[error("Output parameter '{name}' on node '{node_id}' cannot have type '{type_name}'")]
    UnsupportedParamType {
        node_id: String,
        name: String,
        type_name: String,
    },
}

/// Errors returned by the workflow backend client.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request to '{url}' failed: {message}")]
    Transport { url: String, message: String },

    #[error("Backend returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Failed to decode response from '{url}': {message}")]
    Decode { url: String, message: String },

    #[error("Invalid JSON payload: {0}")]
    InvalidPayload(String),

    #[error("Could not read '{path}': {message}")]
    File { path: String, message: String },

    #[error("Document '{document_id}' is not in knowledge base '{kb_id}'")]
    DocumentNotFound { kb_id: String, document_id: String },
}

impl ApiError {
    /// Returns the HTTP status code when the backend answered with an error status.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file '{path}': {message}")]
    Read { path: String, message: String },

    #[error("Invalid config file '{path}': {message}")]
    Parse { path: String, message: String },
}
