use super::agents::Agents;
use super::knowledge::KnowledgeBases;
use super::resources::AiResources;
use crate::config::ApiConfig;
use crate::error::ApiError;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const FALLBACK_DETAIL: &str = "API request failed";

/// HTTP client for the workflow backend.
///
/// Cheap to clone; the underlying connection pool is shared. Failed requests
/// are reported once and never retried.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| ApiError::Transport {
            url: config.base_url.clone(),
            message: format!("Failed to create HTTP client: {}", e),
        })?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::new(&ApiConfig {
            base_url: base_url.into(),
            ..ApiConfig::default()
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn agents(&self) -> Agents<'_> {
        Agents::new(self)
    }

    pub fn resources(&self) -> AiResources<'_> {
        AiResources::new(self)
    }

    pub fn knowledge(&self) -> KnowledgeBases<'_> {
        KnowledgeBases::new(self)
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        self.fetch(self.client.get(&url), &url).await
    }

    pub(crate) async fn get_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        self.fetch(self.client.get(&url).query(query), &url).await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        self.fetch(self.client.post(&url).json(body), &url).await
    }

    /// POST without a body.
    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        self.fetch(self.client.post(&url), &url).await
    }

    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        self.fetch(self.client.put(&url).json(body), &url).await
    }

    pub(crate) async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        self.fetch(self.client.post(&url).multipart(form), &url).await
    }

    /// Sends a request whose response body, if any, is not needed.
    pub(crate) async fn execute(&self, request: RequestBuilder, url: &str) -> Result<(), ApiError> {
        self.send(request, url).await.map(|_| ())
    }

    pub(crate) fn delete_request(&self, path: &str) -> (RequestBuilder, String) {
        let url = self.url(path);
        (self.client.delete(&url), url)
    }

    pub(crate) fn post_request(&self, path: &str) -> (RequestBuilder, String) {
        let url = self.url(path);
        (self.client.post(&url), url)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> Result<T, ApiError> {
        let response = self.send(request, url).await?;
        response.json::<T>().await.map_err(|e| ApiError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|e| map_transport_error(url, e))?;
        let status = response.status();
        debug!(url, status = status.as_u16(), "backend responded");

        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            detail: error_detail(&body),
        })
    }
}

fn map_transport_error(url: &str, error: reqwest::Error) -> ApiError {
    let message = if error.is_timeout() {
        format!("Request timeout: {}", error)
    } else if error.is_connect() {
        format!("Connection error: {}", error)
    } else {
        error.to_string()
    };
    ApiError::Transport {
        url: url.to_string(),
        message,
    }
}

/// Pulls the human-readable message out of an error body.
///
/// The backend answers errors with `{"detail": ...}`, where `detail` is a
/// string for handled errors and a list of field errors for rejected payloads.
fn error_detail(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return FALLBACK_DETAIL.to_string();
    };
    match value.get("detail") {
        Some(serde_json::Value::String(detail)) if !detail.is_empty() => detail.clone(),
        Some(serde_json::Value::Null) | None => FALLBACK_DETAIL.to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_detail_variants() {
        assert_eq!(error_detail(r#"{"detail":"Agent not found"}"#), "Agent not found");
        assert_eq!(error_detail("<html>bad gateway</html>"), FALLBACK_DETAIL);
        assert_eq!(error_detail(r#"{"message":"x"}"#), FALLBACK_DETAIL);
        assert_eq!(
            error_detail(r#"{"detail":[{"loc":["body","name"]}]}"#),
            r#"[{"loc":["body","name"]}]"#
        );
    }
}
