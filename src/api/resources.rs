use super::client::ApiClient;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use tracing::{debug, instrument};

/// Marker in a vision test template where an image data URL goes.
pub const IMAGE_PLACEHOLDER: &str = "<IMAGE_BASE64_PLACEHOLDER>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    TextLlm,
    VisionLlm,
    OcrPaddle,
    OcrDeepseek,
    Embedding,
    Reranker,
    /// A type this client does not know yet.
    #[serde(other)]
    Unknown,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::TextLlm,
        ResourceKind::VisionLlm,
        ResourceKind::OcrPaddle,
        ResourceKind::OcrDeepseek,
        ResourceKind::Embedding,
        ResourceKind::Reranker,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::TextLlm => "text_llm",
            ResourceKind::VisionLlm => "vision_llm",
            ResourceKind::OcrPaddle => "ocr_paddle",
            ResourceKind::OcrDeepseek => "ocr_deepseek",
            ResourceKind::Embedding => "embedding",
            ResourceKind::Reranker => "reranker",
            ResourceKind::Unknown => "unknown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::TextLlm => "Text LLM",
            ResourceKind::VisionLlm => "Vision LLM",
            ResourceKind::OcrPaddle => "PaddleOCR",
            ResourceKind::OcrDeepseek => "DeepSeek-OCR",
            ResourceKind::Embedding => "Embedding Model",
            ResourceKind::Reranker => "Reranker",
            ResourceKind::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown resource type '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    #[default]
    Unknown,
    Healthy,
    Unhealthy,
}

/// A model endpoint registered with the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiResource {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub endpoint: String,
    /// Masked by the backend.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub config: Map<String, Value>,
    pub is_enabled: bool,
    pub is_default: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub health_status: HealthStatus,
    #[serde(default)]
    pub last_health_check_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// The short form used by node property panels to pick a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub is_default: bool,
    pub is_enabled: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub health_status: HealthStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct AiResourceCreate {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub config: Map<String, Value>,
    pub is_enabled: bool,
    pub is_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AiResourceCreate {
    pub fn new(name: &str, kind: ResourceKind, endpoint: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            endpoint: endpoint.to_string(),
            api_key: None,
            config: Map::new(),
            is_enabled: true,
            is_default: false,
            description: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AiResourceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ResourceKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConnectionTest {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub latency_ms: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AvailableResponse {
    data: Vec<ResourceSummary>,
}

#[derive(Debug, Serialize)]
struct SetDefaultRequest<'a> {
    resource_id: &'a str,
}

#[derive(Debug, Serialize)]
struct KindFilter {
    #[serde(rename = "type")]
    kind: ResourceKind,
}

/// AI resource management, under `/ai-resources`.
#[derive(Debug, Clone, Copy)]
pub struct AiResources<'a> {
    client: &'a ApiClient,
}

impl<'a> AiResources<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<AiResource>, ApiError> {
        self.client.get("/ai-resources/").await
    }

    /// Enabled resources, optionally of one kind.
    #[instrument(skip(self))]
    pub async fn available(&self, kind: Option<ResourceKind>) -> Result<Vec<ResourceSummary>, ApiError> {
        let response: AvailableResponse = match kind {
            Some(kind) => {
                self.client
                    .get_query("/ai-resources/available", &KindFilter { kind })
                    .await?
            }
            None => self.client.get("/ai-resources/available").await?,
        };
        debug!(count = response.data.len(), "available resources");
        Ok(response.data)
    }

    #[instrument(skip(self, resource), fields(name = %resource.name, kind = %resource.kind))]
    pub async fn create(&self, resource: &AiResourceCreate) -> Result<AiResource, ApiError> {
        self.client.post("/ai-resources/", resource).await
    }

    #[instrument(skip(self, update))]
    pub async fn update(&self, id: &str, update: &AiResourceUpdate) -> Result<AiResource, ApiError> {
        self.client.put(&format!("/ai-resources/{}", id), update).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let (request, url) = self.client.delete_request(&format!("/ai-resources/{}", id));
        self.client.execute(request, &url).await
    }

    /// Asks the backend to probe the endpoint. A failed probe is a successful
    /// call with `success: false`.
    #[instrument(skip(self))]
    pub async fn test_connection(&self, id: &str) -> Result<ConnectionTest, ApiError> {
        let result: ConnectionTest = self
            .client
            .post_empty(&format!("/ai-resources/{}/test-connection", id))
            .await?;
        debug!(success = result.success, latency_ms = ?result.latency_ms, "connection test");
        Ok(result)
    }

    #[instrument(skip(self))]
    pub async fn set_default(&self, id: &str) -> Result<(), ApiError> {
        let (request, url) = self.client.post_request("/ai-resources/set-default");
        self.client
            .execute(request.json(&SetDefaultRequest { resource_id: id }), &url)
            .await
    }

    /// Forwards a raw request body to the resource and returns its reply.
    #[instrument(skip(self, payload))]
    pub async fn run_test(&self, id: &str, payload: &Value) -> Result<Value, ApiError> {
        self.client
            .post(&format!("/ai-resources/{}/test", id), payload)
            .await
    }
}

/// Parses a hand-edited test body. Nothing is sent when this fails.
pub fn parse_test_payload(text: &str) -> Result<Value, ApiError> {
    serde_json::from_str(text).map_err(|e| ApiError::InvalidPayload(e.to_string()))
}

/// The starting request body offered for testing a resource of `kind`.
///
/// `model` defaults to a typical model name for the kind.
pub fn test_template(kind: ResourceKind, model: Option<&str>) -> Value {
    match kind {
        ResourceKind::VisionLlm => json!({
            "model": model.unwrap_or("gpt-4-vision-preview"),
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": "What is in this image?"},
                    {"type": "image_url", "image_url": {"url": IMAGE_PLACEHOLDER}}
                ]
            }],
            "max_tokens": 300
        }),
        ResourceKind::Reranker => json!({
            "model": model.unwrap_or("qwen3-4b-reranker"),
            "query": "How do I make scrambled eggs with tomatoes?",
            "documents": [
                "Scrambled eggs with tomatoes is a classic home-style dish made from eggs and tomatoes.",
                "Braised pork belly: blanch the pork, then simmer with soy sauce and sugar until tender.",
                "Tomatoes are rich in vitamin C and eggs provide protein, so the pairing is balanced.",
                "Kung pao chicken is stir-fried with peanuts, dried chilies and chicken breast."
            ]
        }),
        ResourceKind::Embedding => json!({
            "input": [
                "Qwen is an open-source large language model family.",
                "Qwen3 supports strong reasoning and coding capabilities."
            ],
            "model": model.unwrap_or("Qwen3-Embedding-0.6B")
        }),
        ResourceKind::TextLlm
        | ResourceKind::OcrPaddle
        | ResourceKind::OcrDeepseek
        | ResourceKind::Unknown => json!({
            "model": model.unwrap_or("gpt-3.5-turbo"),
            "messages": [
                {"role": "system", "content": "You are a helpful assistant."},
                {"role": "user", "content": "Hello, this is a test message."}
            ],
            "temperature": 0.7
        }),
    }
}

/// Replaces the first image placeholder in a test body with `data_url`.
/// Returns `None` when the body has no placeholder.
pub fn insert_image(body: &str, data_url: &str) -> Option<String> {
    body.contains(IMAGE_PLACEHOLDER)
        .then(|| body.replacen(IMAGE_PLACEHOLDER, data_url, 1))
}
