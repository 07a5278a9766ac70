use super::conversion::IntoGraph;
use super::wire::FlowJson;
use crate::error::FlowError;
use crate::graph::Graph;
use std::fs;
use std::path::Path;

/// Flow JSON on disk: the file format used for importing and exporting
/// workflows outside the backend.
pub struct FlowDocument;

impl FlowDocument {
    /// Reads and decodes a flow file into a graph.
    pub fn load(path: impl AsRef<Path>) -> Result<Graph, FlowError> {
        Self::read(path)?.into_graph()
    }

    /// Reads a flow file without interpreting node types.
    pub fn read(path: impl AsRef<Path>) -> Result<FlowJson, FlowError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| FlowError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        FlowJson::from_json(&content)
    }

    /// Decodes flow JSON text into a graph.
    pub fn parse(json: &str) -> Result<Graph, FlowError> {
        FlowJson::from_json(json)?.into_graph()
    }

    /// Writes the graph as pretty-printed flow JSON.
    pub fn save(graph: &Graph, path: impl AsRef<Path>) -> Result<(), FlowError> {
        let path = path.as_ref();
        let content = Self::to_string_pretty(graph)?;
        fs::write(path, content).map_err(|e| FlowError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn to_string_pretty(graph: &Graph) -> Result<String, FlowError> {
        serde_json::to_string_pretty(&graph.to_flow_json())
            .map_err(|e| FlowError::JsonParseError(format!("Serialization failed: {}", e)))
    }
}
