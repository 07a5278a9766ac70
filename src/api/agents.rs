use super::client::ApiClient;
use crate::error::ApiError;
use crate::flow::FlowJson;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

/// A saved workflow as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Every save creates a new version; the flow endpoint returns the latest.
    #[serde(default)]
    pub latest_version: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentCreate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub flow_json: FlowJson,
}

impl AgentCreate {
    pub fn new(name: &str, flow_json: FlowJson) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            icon: None,
            flow_json,
        }
    }
}

/// Partial update; `None` fields are left as they are.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_json: Option<FlowJson>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExportedYaml {
    pub yaml: String,
    pub filename: String,
}

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    inputs: &'a Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    description: &'a str,
}

/// Result of executing a workflow on the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunResponse {
    pub status: String,
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub full_state: Option<String>,
    #[serde(default)]
    pub trace_logs: Vec<Value>,
}

impl RunResponse {
    /// The text to show the user: the output itself when it is a string, its
    /// `content` field when it is a message object, else the JSON text.
    pub fn output_text(&self) -> String {
        match &self.output {
            Value::String(text) => text.clone(),
            other => match other.get("content") {
                Some(Value::String(content)) if !content.is_empty() => content.clone(),
                _ => other.to_string(),
            },
        }
    }
}

/// Agent CRUD and execution, under `/agents`.
#[derive(Debug, Clone, Copy)]
pub struct Agents<'a> {
    client: &'a ApiClient,
}

impl<'a> Agents<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Agent>, ApiError> {
        let agents: Vec<Agent> = self.client.get("/agents/").await?;
        debug!(count = agents.len(), "listed agents");
        Ok(agents)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Agent, ApiError> {
        self.client.get(&format!("/agents/{}", id)).await
    }

    #[instrument(skip(self, agent), fields(name = %agent.name))]
    pub async fn create(&self, agent: &AgentCreate) -> Result<Agent, ApiError> {
        self.client.post("/agents/", agent).await
    }

    #[instrument(skip(self, update))]
    pub async fn update(&self, id: &str, update: &AgentUpdate) -> Result<Agent, ApiError> {
        self.client.put(&format!("/agents/{}", id), update).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let (request, url) = self.client.delete_request(&format!("/agents/{}", id));
        self.client.execute(request, &url).await
    }

    #[instrument(skip(self))]
    pub async fn export_yaml(&self, id: &str) -> Result<ExportedYaml, ApiError> {
        self.client.get(&format!("/agents/{}/export", id)).await
    }

    /// The flow JSON of the agent's latest version.
    #[instrument(skip(self))]
    pub async fn flow(&self, id: &str) -> Result<FlowJson, ApiError> {
        self.client.get(&format!("/agents/{}/flow", id)).await
    }

    #[instrument(skip(self, inputs))]
    pub async fn run(&self, id: &str, inputs: &Map<String, Value>) -> Result<RunResponse, ApiError> {
        let response: RunResponse = self
            .client
            .post(&format!("/agents/{}/run", id), &RunRequest { inputs })
            .await?;
        debug!(status = %response.status, traces = response.trace_logs.len(), "agent run finished");
        Ok(response)
    }

    /// Runs the agent with a single chat message as its `input`.
    pub async fn chat(&self, id: &str, message: &str) -> Result<RunResponse, ApiError> {
        let mut inputs = Map::new();
        inputs.insert("input".to_string(), Value::String(message.to_string()));
        self.run(id, &inputs).await
    }

    /// Drafts a workflow from a natural-language description.
    #[instrument(skip(self))]
    pub async fn generate(&self, description: &str) -> Result<FlowJson, ApiError> {
        self.client
            .post("/agents/generate", &GenerateRequest { description })
            .await
    }
}
