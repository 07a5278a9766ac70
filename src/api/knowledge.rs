use super::client::ApiClient;
use crate::error::ApiError;
use crate::search::{SearchQuery, SearchResult};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl DocumentStatus {
    /// Whether processing has finished, successfully or not.
    pub fn is_settled(&self) -> bool {
        matches!(self, DocumentStatus::Completed | DocumentStatus::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub knowledge_base_id: String,
    pub filename: String,
    pub file_type: String,
    pub status: DocumentStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub chunk_count: u32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
    /// Present in listings, which omit `documents`.
    #[serde(default)]
    pub document_count: Option<u32>,
    #[serde(default)]
    pub documents: Vec<Document>,
}

impl KnowledgeBase {
    /// Whether any document is still being parsed and embedded.
    pub fn is_processing(&self) -> bool {
        self.documents
            .iter()
            .any(|d| d.status == DocumentStatus::Processing)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeBaseCreate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DocumentPreview {
    content: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

/// Knowledge bases and their documents, under `/knowledge-bases`.
#[derive(Debug, Clone, Copy)]
pub struct KnowledgeBases<'a> {
    client: &'a ApiClient,
}

impl<'a> KnowledgeBases<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<KnowledgeBase>, ApiError> {
        self.client.get("/knowledge-bases/").await
    }

    #[instrument(skip(self, kb), fields(name = %kb.name))]
    pub async fn create(&self, kb: &KnowledgeBaseCreate) -> Result<KnowledgeBase, ApiError> {
        self.client.post("/knowledge-bases/", kb).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<KnowledgeBase, ApiError> {
        self.client.get(&format!("/knowledge-bases/{}", id)).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let (request, url) = self.client.delete_request(&format!("/knowledge-bases/{}", id));
        self.client.execute(request, &url).await
    }

    /// Uploads a local file. The document starts out `pending` until
    /// [`process_document`](Self::process_document) is called.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn upload_document(&self, kb_id: &str, path: &Path) -> Result<Document, ApiError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| ApiError::File {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        self.upload_bytes(kb_id, &filename, bytes).await
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_bytes(
        &self,
        kb_id: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<Document, ApiError> {
        let form = Form::new().part("file", Part::bytes(bytes).file_name(filename.to_string()));
        let document: Document = self
            .client
            .post_multipart(&format!("/knowledge-bases/{}/upload", kb_id), form)
            .await?;
        debug!(document_id = %document.id, "uploaded document");
        Ok(document)
    }

    /// Starts parsing and embedding a document in the background.
    #[instrument(skip(self))]
    pub async fn process_document(&self, kb_id: &str, doc_id: &str) -> Result<(), ApiError> {
        let (request, url) = self
            .client
            .post_request(&format!("/knowledge-bases/{}/documents/{}/process", kb_id, doc_id));
        self.client.execute(request, &url).await
    }

    /// The document's extracted text.
    #[instrument(skip(self))]
    pub async fn document_preview(&self, kb_id: &str, doc_id: &str) -> Result<String, ApiError> {
        let preview: DocumentPreview = self
            .client
            .get(&format!("/knowledge-bases/{}/documents/{}/preview", kb_id, doc_id))
            .await?;
        Ok(preview.content)
    }

    #[instrument(skip(self))]
    pub async fn document_chunks(
        &self,
        kb_id: &str,
        doc_id: &str,
    ) -> Result<Vec<SearchResult>, ApiError> {
        self.client
            .get(&format!("/knowledge-bases/{}/documents/{}/chunks", kb_id, doc_id))
            .await
    }

    /// Hits in the order the backend returned them; see [`crate::search::rank`].
    #[instrument(skip(self, query), fields(top_k = query.top_k))]
    pub async fn search(&self, kb_id: &str, query: &SearchQuery) -> Result<Vec<SearchResult>, ApiError> {
        let response: SearchResponse = self
            .client
            .post(&format!("/knowledge-bases/{}/search", kb_id), query)
            .await?;
        debug!(hits = response.results.len(), "search finished");
        Ok(response.results)
    }

    #[instrument(skip(self))]
    pub async fn publish(&self, id: &str) -> Result<KnowledgeBase, ApiError> {
        self.client
            .post_empty(&format!("/knowledge-bases/{}/publish", id))
            .await
    }

    #[instrument(skip(self))]
    pub async fn unpublish(&self, id: &str) -> Result<KnowledgeBase, ApiError> {
        self.client
            .post_empty(&format!("/knowledge-bases/{}/unpublish", id))
            .await
    }

    /// Re-fetches the knowledge base every `interval` until no document is
    /// `processing`, and returns that state. Documents still `pending` do not
    /// hold it up; use [`wait_for_document`](Self::wait_for_document) to follow
    /// one document that was just queued.
    #[instrument(skip(self))]
    pub async fn wait_until_processed(
        &self,
        id: &str,
        interval: Duration,
    ) -> Result<KnowledgeBase, ApiError> {
        loop {
            let kb = self.get(id).await?;
            if !kb.is_processing() {
                return Ok(kb);
            }
            debug!("documents still processing");
            tokio::time::sleep(interval).await;
        }
    }

    /// Re-fetches the knowledge base every `interval` until `document_id` is
    /// `completed` or `error`, and returns that document.
    ///
    /// Processing is scheduled in the background, so a document may still be
    /// `pending` for a while after [`process_document`](Self::process_document)
    /// returns.
    #[instrument(skip(self))]
    pub async fn wait_for_document(
        &self,
        kb_id: &str,
        document_id: &str,
        interval: Duration,
    ) -> Result<Document, ApiError> {
        loop {
            let kb = self.get(kb_id).await?;
            let document = kb
                .documents
                .into_iter()
                .find(|d| d.id == document_id)
                .ok_or_else(|| ApiError::DocumentNotFound {
                    kb_id: kb_id.to_string(),
                    document_id: document_id.to_string(),
                })?;
            if document.status.is_settled() {
                return Ok(document);
            }
            debug!(status = ?document.status, "document not settled yet");
            tokio::time::sleep(interval).await;
        }
    }
}
