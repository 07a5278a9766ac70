//! Tests for the backend REST client against a mock server.
#![cfg(feature = "remote")]

use flowstudio::api::{
    AgentCreate, AgentUpdate, AiResourceCreate, AiResourceUpdate, ApiClient, DocumentStatus,
    HealthStatus, IMAGE_PLACEHOLDER, ResourceKind, RunResponse, insert_image, parse_test_payload,
    test_template,
};
use flowstudio::prelude::*;
use serde_json::{Value, json};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, body_partial_json, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup_test_client() -> (MockServer, ApiClient) {
    let mock_server = MockServer::start().await;
    let client = ApiClient::with_base_url(mock_server.uri()).expect("client builds");
    (mock_server, client)
}

fn agent_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": null,
        "created_at": "2025-01-01T00:00:00",
        "updated_at": "2025-01-02T00:00:00",
        "latest_version": 3
    })
}

fn resource_json(id: &str, name: &str, kind: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "type": kind,
        "endpoint": "http://models/rerank",
        "api_key": "sk-***",
        "config": {},
        "is_enabled": true,
        "is_default": false,
        "health_status": "unknown",
        "created_at": "2025-01-01T00:00:00",
        "updated_at": "2025-01-01T00:00:00"
    })
}

fn run_response(output: Value) -> RunResponse {
    RunResponse {
        status: "success".to_string(),
        output,
        full_state: None,
        trace_logs: Vec::new(),
    }
}

fn kb_json(status: &str) -> Value {
    json!({
        "id": "kb1",
        "name": "Manuals",
        "description": "Product manuals",
        "is_published": false,
        "created_at": "2025-01-01T00:00:00",
        "updated_at": "2025-01-01T00:00:00",
        "documents": [{
            "id": "doc1",
            "knowledge_base_id": "kb1",
            "filename": "guide.pdf",
            "file_type": "pdf",
            "status": status,
            "error_message": null,
            "chunk_count": 12,
            "created_at": "2025-01-01T00:00:00",
            "updated_at": "2025-01-01T00:00:00"
        }]
    })
}

#[tokio::test]
async fn test_list_agents() {
    let (mock_server, client) = setup_test_client().await;
    Mock::given(method("GET"))
        .and(path("/agents/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([agent_json("a1", "Helper"), agent_json("a2", "Triage")])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let agents = assert_ok!(client.agents().list().await);
    assert_eq!(agents.len(), 2);
    assert_eq!(agents[1].name, "Triage");
    assert_eq!(agents[0].latest_version, Some(3));
}

#[tokio::test]
async fn test_error_status_carries_backend_detail() {
    let (mock_server, client) = setup_test_client().await;
    Mock::given(method("GET"))
        .and(path("/agents/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Agent not found"})))
        .mount(&mock_server)
        .await;

    let err = assert_err!(client.agents().get("missing").await);
    assert_eq!(err.status(), Some(404));
    match err {
        ApiError::Status { detail, .. } => assert_eq!(detail, "Agent not found"),
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_error_without_detail_uses_fallback() {
    let (mock_server, client) = setup_test_client().await;
    Mock::given(method("DELETE"))
        .and(path("/ai-resources/r1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let err = assert_err!(client.resources().delete("r1").await);
    match err {
        ApiError::Status { status, detail } => {
            assert_eq!(status, 500);
            assert_eq!(detail, "API request failed");
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_undecodable_body_is_a_decode_error() {
    let (mock_server, client) = setup_test_client().await;
    Mock::given(method("GET"))
        .and(path("/knowledge-bases/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&mock_server)
        .await;

    let err = assert_err!(client.knowledge().list().await);
    assert!(matches!(err, ApiError::Decode { .. }));
}

#[tokio::test]
async fn test_unreachable_backend_is_a_transport_error() {
    let client = ApiClient::with_base_url("http://127.0.0.1:9").unwrap();
    let err = assert_err!(client.agents().list().await);
    assert!(matches!(err, ApiError::Transport { .. }));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_create_agent_sends_flow() {
    let (mock_server, client) = setup_test_client().await;
    Mock::given(method("POST"))
        .and(path("/agents/"))
        .and(body_partial_json(json!({
            "name": "Helper",
            "flow_json": {"edges": []}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(agent_json("a1", "Helper")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let create = AgentCreate::new("Helper", Graph::starter().to_flow_json());
    let agent = assert_ok!(client.agents().create(&create).await);
    assert_eq!(agent.id, "a1");
}

#[tokio::test]
async fn test_flow_decodes_into_graph() {
    let (mock_server, client) = setup_test_client().await;
    let flow = Graph::starter().to_flow_json();
    Mock::given(method("GET"))
        .and(path("/agents/a1/flow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&flow))
        .mount(&mock_server)
        .await;

    let fetched = assert_ok!(client.agents().flow("a1").await);
    let graph = assert_ok!(fetched.into_graph());
    assert_eq!(graph.len(), 2);
}

#[tokio::test]
async fn test_run_agent_with_chat_input() {
    let (mock_server, client) = setup_test_client().await;
    Mock::given(method("POST"))
        .and(path("/agents/a1/run"))
        .and(body_json(json!({"inputs": {"input": "hello"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "output": {"content": "Hi! How can I help?"},
            "full_state": "{...}",
            "trace_logs": [{"node": "llm"}]
        })))
        .mount(&mock_server)
        .await;

    let response = assert_ok!(client.agents().chat("a1", "hello").await);
    assert_eq!(response.output_text(), "Hi! How can I help?");
    assert_eq!(response.trace_logs.len(), 1);
}

#[tokio::test]
async fn test_export_yaml() {
    let (mock_server, client) = setup_test_client().await;
    Mock::given(method("GET"))
        .and(path("/agents/a1/export"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "yaml": "name: Helper\n",
            "filename": "Helper.yaml"
        })))
        .mount(&mock_server)
        .await;

    let exported = assert_ok!(client.agents().export_yaml("a1").await);
    assert_eq!(exported.filename, "Helper.yaml");
}

#[tokio::test]
async fn test_available_resources_filtered_by_kind() {
    let (mock_server, client) = setup_test_client().await;
    Mock::given(method("GET"))
        .and(path("/ai-resources/available"))
        .and(query_param("type", "embedding"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": "r1",
                "name": "bge-m3",
                "type": "embedding",
                "is_default": true,
                "is_enabled": true,
                "description": null,
                "health_status": "healthy"
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let resources = assert_ok!(client.resources().available(Some(ResourceKind::Embedding)).await);
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].kind, ResourceKind::Embedding);
    assert_eq!(resources[0].health_status, HealthStatus::Healthy);
}

#[tokio::test]
async fn test_create_resource_and_set_default() {
    let (mock_server, client) = setup_test_client().await;
    Mock::given(method("POST"))
        .and(path("/ai-resources/"))
        .and(body_partial_json(json!({"type": "reranker", "is_enabled": true})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(resource_json("r9", "rerank", "reranker")),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ai-resources/set-default"))
        .and(body_json(json!({"resource_id": "r9"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let create = AiResourceCreate::new("rerank", ResourceKind::Reranker, "http://models/rerank");
    let resource = assert_ok!(client.resources().create(&create).await);
    assert_eq!(resource.kind, ResourceKind::Reranker);
    assert_ok!(client.resources().set_default(&resource.id).await);
}

#[tokio::test]
async fn test_connection_probe_failure_is_not_an_error() {
    let (mock_server, client) = setup_test_client().await;
    Mock::given(method("POST"))
        .and(path("/ai-resources/r1/test-connection"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "connection refused"
        })))
        .mount(&mock_server)
        .await;

    let result = assert_ok!(client.resources().test_connection("r1").await);
    assert!(!result.success);
    assert_eq!(result.latency_ms, None);
}

#[tokio::test]
async fn test_search_posts_query_and_unwraps_results() {
    let (mock_server, client) = setup_test_client().await;
    Mock::given(method("POST"))
        .and(path("/knowledge-bases/kb1/search"))
        .and(body_json(json!({"query": "reset password", "top_k": 3})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": "c1", "content": "low", "metadata": {}, "score": 0.2},
                {"id": "c2", "content": "high", "metadata": {"page": 4}, "score": 0.8}
            ]
        })))
        .mount(&mock_server)
        .await;

    let query = SearchQuery::new("reset password").top_k(3);
    let hits = assert_ok!(client.knowledge().search("kb1", &query).await);
    let ranked = rank(hits, ScoreOrder::HigherIsBetter);
    assert_eq!(ranked[0].id, "c2");
    assert_eq!(ranked[0].metadata["page"], 4);
}

#[tokio::test]
async fn test_upload_document_as_multipart() {
    let (mock_server, client) = setup_test_client().await;
    Mock::given(method("POST"))
        .and(path("/knowledge-bases/kb1/upload"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(kb_json("pending")["documents"][0].clone()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("guide.pdf");
    std::fs::write(&file, b"%PDF-1.4").unwrap();

    let document = assert_ok!(client.knowledge().upload_document("kb1", &file).await);
    assert_eq!(document.status, DocumentStatus::Pending);

    let missing = dir.path().join("absent.pdf");
    let err = assert_err!(client.knowledge().upload_document("kb1", &missing).await);
    assert!(matches!(err, ApiError::File { .. }));
}

#[tokio::test]
async fn test_wait_until_processed_polls() {
    let (mock_server, client) = setup_test_client().await;
    Mock::given(method("GET"))
        .and(path("/knowledge-bases/kb1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(kb_json("processing")))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/knowledge-bases/kb1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(kb_json("completed")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let kb = assert_ok!(
        client
            .knowledge()
            .wait_until_processed("kb1", Duration::from_millis(5))
            .await
    );
    assert!(!kb.is_processing());
    assert_eq!(kb.documents[0].status, DocumentStatus::Completed);
}

#[tokio::test]
async fn test_publish_and_preview() {
    let (mock_server, client) = setup_test_client().await;
    let mut published = kb_json("completed");
    published["is_published"] = json!(true);
    Mock::given(method("POST"))
        .and(path("/knowledge-bases/kb1/publish"))
        .respond_with(ResponseTemplate::new(200).set_body_json(published))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/knowledge-bases/kb1/documents/doc1/preview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": "# Guide"})))
        .mount(&mock_server)
        .await;

    let kb = assert_ok!(client.knowledge().publish("kb1").await);
    assert!(kb.is_published);
    let preview = assert_ok!(client.knowledge().document_preview("kb1", "doc1").await);
    assert_eq!(preview, "# Guide");
}

#[tokio::test]
async fn test_wait_for_document_outlasts_pending() {
    let (mock_server, client) = setup_test_client().await;
    for status in ["pending", "processing"] {
        Mock::given(method("GET"))
            .and(path("/knowledge-bases/kb1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(kb_json(status)))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/knowledge-bases/kb1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(kb_json("completed")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let document = assert_ok!(
        client
            .knowledge()
            .wait_for_document("kb1", "doc1", Duration::from_millis(5))
            .await
    );
    assert_eq!(document.status, DocumentStatus::Completed);
    assert_eq!(document.chunk_count, 12);
}

#[tokio::test]
async fn test_wait_for_document_stops_on_error_status() {
    let (mock_server, client) = setup_test_client().await;
    let mut failed = kb_json("error");
    failed["documents"][0]["error_message"] = json!("unsupported encoding");
    Mock::given(method("GET"))
        .and(path("/knowledge-bases/kb1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(failed))
        .expect(1)
        .mount(&mock_server)
        .await;

    let document = assert_ok!(
        client
            .knowledge()
            .wait_for_document("kb1", "doc1", Duration::from_millis(5))
            .await
    );
    assert_eq!(document.status, DocumentStatus::Error);
    assert_eq!(document.error_message.as_deref(), Some("unsupported encoding"));
}

#[tokio::test]
async fn test_wait_for_missing_document_fails() {
    let (mock_server, client) = setup_test_client().await;
    Mock::given(method("GET"))
        .and(path("/knowledge-bases/kb1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(kb_json("pending")))
        .mount(&mock_server)
        .await;

    let err = assert_err!(
        client
            .knowledge()
            .wait_for_document("kb1", "doc2", Duration::from_millis(5))
            .await
    );
    assert!(matches!(err, ApiError::DocumentNotFound { document_id, .. } if document_id == "doc2"));
}

#[tokio::test]
async fn test_update_and_delete_agent() {
    let (mock_server, client) = setup_test_client().await;
    Mock::given(method("PUT"))
        .and(path("/agents/a1"))
        .and(body_json(json!({"name": "Renamed"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(agent_json("a1", "Renamed")))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/agents/a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "deleted"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let update = AgentUpdate {
        name: Some("Renamed".to_string()),
        ..Default::default()
    };
    let agent = assert_ok!(client.agents().update("a1", &update).await);
    assert_eq!(agent.name, "Renamed");
    assert_ok!(client.agents().delete("a1").await);
}

#[tokio::test]
async fn test_generate_drafts_a_flow() {
    let (mock_server, client) = setup_test_client().await;
    Mock::given(method("POST"))
        .and(path("/agents/generate"))
        .and(body_json(json!({"description": "answer product questions"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(Graph::starter().to_flow_json()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let flow = assert_ok!(client.agents().generate("answer product questions").await);
    let graph = assert_ok!(flow.into_graph());
    assert!(graph.contains("start-node"));
}

#[test]
fn test_output_text_variants() {
    assert_eq!(run_response(json!("hello")).output_text(), "hello");
    assert_eq!(
        run_response(json!({"role": "assistant", "content": "hi there"})).output_text(),
        "hi there"
    );
    assert_eq!(
        run_response(json!({"answer": 42})).output_text(),
        r#"{"answer":42}"#
    );
    assert_eq!(run_response(Value::Null).output_text(), "null");
}

#[tokio::test]
async fn test_update_and_delete_resource() {
    let (mock_server, client) = setup_test_client().await;
    Mock::given(method("PUT"))
        .and(path("/ai-resources/r9"))
        .and(body_json(json!({"is_enabled": false})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(resource_json("r9", "rerank", "reranker")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/ai-resources/r9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "deleted"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let update = AiResourceUpdate {
        is_enabled: Some(false),
        ..Default::default()
    };
    let resource = assert_ok!(client.resources().update("r9", &update).await);
    assert_eq!(resource.id, "r9");
    assert_ok!(client.resources().delete("r9").await);
}

#[tokio::test]
async fn test_run_test_forwards_payload() {
    let (mock_server, client) = setup_test_client().await;
    let payload = test_template(ResourceKind::Embedding, None);
    Mock::given(method("POST"))
        .and(path("/ai-resources/r2/test"))
        .and(body_json(payload.clone()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": [{"embedding": [0.1, 0.2]}]})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let reply = assert_ok!(client.resources().run_test("r2", &payload).await);
    assert_eq!(reply["data"][0]["embedding"][1], 0.2);
}

#[test]
fn test_unknown_resource_kind_deserializes() {
    let kind: ResourceKind = serde_json::from_str("\"speech_to_text\"").unwrap();
    assert_eq!(kind, ResourceKind::Unknown);
    assert_eq!("reranker".parse::<ResourceKind>(), Ok(ResourceKind::Reranker));
    assert!("unknown".parse::<ResourceKind>().is_err());
}

#[test]
fn test_templates_per_kind() {
    let vision = test_template(ResourceKind::VisionLlm, Some("qwen-vl"));
    assert_eq!(vision["model"], "qwen-vl");
    assert!(vision.to_string().contains(IMAGE_PLACEHOLDER));

    assert!(test_template(ResourceKind::Reranker, None)["documents"].is_array());
    assert_eq!(
        test_template(ResourceKind::Embedding, None)["model"],
        "Qwen3-Embedding-0.6B"
    );
    assert_eq!(test_template(ResourceKind::OcrPaddle, None)["temperature"], 0.7);
}

#[test]
fn test_test_payload_is_checked_locally() {
    let err = parse_test_payload("{\"model\": ").unwrap_err();
    assert!(matches!(err, ApiError::InvalidPayload(_)));

    let body = serde_json::to_string(&test_template(ResourceKind::VisionLlm, None)).unwrap();
    let filled = insert_image(&body, "data:image/png;base64,AAAA").unwrap();
    assert!(filled.contains("data:image/png;base64,AAAA"));
    assert!(!filled.contains(IMAGE_PLACEHOLDER));
    assert_eq!(insert_image("{}", "data:x"), None);
}

#[test]
fn test_base_url_trailing_slash_is_trimmed() {
    let client = ApiClient::with_base_url("http://localhost:8001/").unwrap();
    assert_eq!(client.base_url(), "http://localhost:8001");
}

#[tokio::test]
async fn test_delete_and_process_knowledge_documents() {
    let (mock_server, client) = setup_test_client().await;
    Mock::given(method("POST"))
        .and(path("/knowledge-bases/kb1/documents/doc1/process"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "queued"})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/knowledge-bases/kb1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "deleted"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    assert_ok!(client.knowledge().process_document("kb1", "doc1").await);
    assert_ok!(client.knowledge().delete("kb1").await);
}

#[tokio::test]
async fn test_document_chunks_and_unpublish() {
    let (mock_server, client) = setup_test_client().await;
    Mock::given(method("GET"))
        .and(path("/knowledge-bases/kb1/documents/doc1/chunks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "c1", "content": "Step one", "metadata": {"page": 1}, "score": 0.0},
            {"id": "c2", "content": "Step two", "score": 0.0}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/knowledge-bases/kb1/unpublish"))
        .respond_with(ResponseTemplate::new(200).set_body_json(kb_json("completed")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let chunks = assert_ok!(client.knowledge().document_chunks("kb1", "doc1").await);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[1].content, "Step two");
    assert!(chunks[1].metadata.is_empty());

    let kb = assert_ok!(client.knowledge().unpublish("kb1").await);
    assert!(!kb.is_published);
}
