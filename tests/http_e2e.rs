//! HTTP end-to-end tests.
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot` over an
//! in-memory graph.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use heritage_kg::HeritageConfig;
use heritage_kg::http::{AppState, build_router};
use heritage_kg::services::voice::SpeechService;
use heritage_kg::storage::GraphStore;
use heritage_kg::storage::graph::InMemoryGraphStore;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    app_with(|state| state)
}

fn app_with(customize: impl FnOnce(AppState) -> AppState) -> Router {
    let config = HeritageConfig::default();
    let store: Arc<dyn GraphStore> = Arc::new(InMemoryGraphStore::new());
    let state = customize(AppState::new(store, &config));
    build_router(state, &config.server)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        },
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

async fn seed(app: &Router) {
    for name in ["张三", "李四", "鎏金铜佛像"] {
        let (status, _) = send(
            app,
            Method::POST,
            "/api/data/nodes",
            Some(json!({ "label": "Entity", "properties": { "name": name } })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = send(
        app,
        Method::POST,
        "/api/data/relationships",
        Some(json!({
            "startNodeName": "张三",
            "endNodeName": "李四",
            "relationshipType": "认识",
            "properties": { "since": 2001 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_health_reports_graph_counts() {
    let app = app();
    seed(&app).await;

    let (status, body) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["graph"]["nodeCount"], 3);
    assert_eq!(body["graph"]["relationshipCount"], 1);
    assert_eq!(body["speech"], Value::Null);
}

#[tokio::test]
async fn test_security_and_request_id_headers() {
    let app = app();
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_browse_children_and_parents() {
    let app = app();
    seed(&app).await;

    let (status, body) = send(&app, Method::GET, "/api/data/张三", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["relationship"], "认识");
    assert_eq!(body[0]["node2"]["name"], "李四");

    let (status, body) = send(&app, Method::GET, "/api/data/parents/李四", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["node1"]["name"], "张三");

    let (status, _) = send(&app, Method::GET, "/api/data/无名氏", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sample_honors_limit() {
    let app = app();
    seed(&app).await;

    let (status, body) = send(&app, Method::GET, "/api/data?limit=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_node_validation() {
    let app = app();

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/data/nodes",
        Some(json!({ "label": "Bad Label", "properties": { "name": "x" } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/data/nodes",
        Some(json!({ "properties": { "name": "x" } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = app();
    let request = Request::post("/api/data/semantic-search")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_and_delete_node() {
    let app = app();
    seed(&app).await;

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/api/data/nodes/李四",
        Some(json!({ "dynasty": "明" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dynasty"], "明");
    assert_eq!(body["name"], "李四");

    let (status, body) = send(&app, Method::DELETE, "/api/data/nodes/李四", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nodesDeleted"], 1);
    assert_eq!(body["relationshipsDeleted"], 1);

    let (status, _) = send(&app, Method::DELETE, "/api/data/nodes/李四", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_relationship_request_is_rejected() {
    let app = app();
    seed(&app).await;

    let body = json!({
        "startNodeName": "李四",
        "endNodeName": "张三",
        "relationshipType": "认识"
    });
    let (status, created) =
        send(&app, Method::POST, "/api/data/relationships", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["type"], "认识");
    assert_eq!(created["wasUpdated"], false);

    let (status, duplicate) = send(&app, Method::POST, "/api/data/relationships", Some(body)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(duplicate["duplicate"], true);
}

#[tokio::test]
async fn test_relationship_to_missing_node_is_not_found() {
    let app = app();
    seed(&app).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/data/relationships",
        Some(json!({
            "startNodeName": "张三",
            "endNodeName": "王五",
            "relationshipType": "认识"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_relationships() {
    let app = app();
    seed(&app).await;

    let body = json!({
        "startNodeName": "张三",
        "endNodeName": "李四",
        "relationshipType": "认识"
    });
    let (status, deleted) =
        send(&app, Method::DELETE, "/api/data/relationships", Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["relationshipsDeleted"], 1);

    let (status, _) = send(&app, Method::DELETE, "/api/data/relationships", Some(body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_semantic_search_resolves_question() {
    let app = app();
    seed(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/data/semantic-search",
        Some(json!({ "question": "张三是谁？" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["searchInfo"]["originalQuery"], "张三");
    assert_eq!(body["nodes"][0]["name"], "张三");
    assert_eq!(body["nodes"][0]["matchType"], "exact");
    assert_eq!(body["relationships"][0]["type"], "认识");
}

#[tokio::test]
async fn test_semantic_search_rejects_blank_question() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/data/semantic-search",
        Some(json!({ "question": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_fuzzy_search_by_pinyin() {
    let app = app();
    seed(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/data/fuzzy-search",
        Some(json!({ "searchText": "刘金同佛象", "threshold": 0.7 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nodes"][0]["name"], "鎏金铜佛像");
    assert_eq!(body["nodes"][0]["matchType"], "pinyin");
    assert_eq!(body["searchInfo"]["threshold"], 0.7);
}

#[tokio::test]
async fn test_voice_chat_uses_scripted_rules() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/voice/chat",
        Some(json!({ "message": "你好" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["source"], "cultural_heritage_model");
    assert!(!body["text"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_voice_interact_without_speech_is_unavailable() {
    let app = app();
    let request = Request::post("/api/voice/interact")
        .body(Body::from(vec![0_u8; 64]))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

struct EchoSpeech;

impl SpeechService for EchoSpeech {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn transcribe(&self, _audio: &[u8]) -> heritage_kg::Result<String> {
        Ok("张三是谁".to_string())
    }

    fn synthesize(&self, text: &str) -> heritage_kg::Result<Vec<u8>> {
        Ok(text.as_bytes().to_vec())
    }
}

#[tokio::test]
async fn test_voice_interact_answers_from_graph() {
    let app = app_with(|state| state.with_speech(Arc::new(EchoSpeech)));
    seed(&app).await;

    let request = Request::post("/api/voice/interact")
        .body(Body::from(vec![0_u8; 64]))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["transcript"], "张三是谁");
    assert_eq!(body["source"], "knowledge_graph");
    assert_eq!(body["format"], "pcm");
    assert_eq!(body["fallback"], false);
    assert!(body["answer"].as_str().unwrap().contains("张三"));
}

#[tokio::test]
async fn test_metrics_route_disabled_by_default() {
    let app = app();
    let (status, _) = send(&app, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
