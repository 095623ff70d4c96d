use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

use ragswitch::backends::{BackendInstanceConfig, BackendMetrics, BackendType};
use ragswitch::core::config::{AppConfig, AppPaths};
use ragswitch::rag::StorageBackend;
use ragswitch::server::router::router;
use ragswitch::state::AppState;

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    _dir: TempDir,
}

impl TestServer {
    async fn get(&self, path: &str) -> (u16, Value) {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn delete(&self, path: &str) -> (u16, Value) {
        let response = self
            .client
            .delete(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }
}

async fn spawn_server() -> TestServer {
    let dir = TempDir::new().unwrap();
    let paths = Arc::new(AppPaths::with_data_dir(
        dir.path().to_path_buf(),
        dir.path().join("data"),
    ));

    let mut config = AppConfig::default();
    config.light_rag.storage.backend = StorageBackend::Memory;
    config.light_rag.similarity_threshold = 0.05;
    config.migration.tick_interval_ms = 1;
    config.migration.compatibility_failure_floor = 0;
    config.migration.seed = Some(7);
    config.backends = vec![
        BackendInstanceConfig {
            id: "portable-1".to_string(),
            backend_type: BackendType::Portable,
            is_active: true,
            metrics: BackendMetrics::default(),
        },
        BackendInstanceConfig {
            id: "legal-archive".to_string(),
            backend_type: BackendType::Legal,
            is_active: false,
            metrics: BackendMetrics::default(),
        },
    ];

    let state = AppState::from_config(paths, config).await.unwrap();
    let app = router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        client: reqwest::Client::new(),
        _dir: dir,
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let server = spawn_server().await;
    let (status, body) = server.get("/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["chunk_count"], 0);
}

#[tokio::test]
async fn documents_can_be_ingested_queried_and_deleted() {
    let server = spawn_server().await;

    let (status, body) = server
        .post(
            "/api/documents",
            json!({
                "content": "Rust ownership and borrowing rules keep memory safe without a collector",
                "metadata": {"document_id": "rust-notes", "source": "handbook"}
            }),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(body["document_id"], "rust-notes");

    server
        .post(
            "/api/documents",
            json!({"content": "Sourdough bread needs a long cold fermentation"}),
        )
        .await;

    let (status, results) = server
        .post(
            "/api/documents/query",
            json!({"text": "ownership borrowing memory", "limit": 1}),
        )
        .await;
    assert_eq!(status, 200);
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0]["content"].as_str().unwrap().contains("ownership"));
    assert_eq!(results[0]["metadata"]["source"], "handbook");

    let (_, stats) = server.get("/api/documents/stats").await;
    assert_eq!(stats["document_count"], 2);

    let (status, document) = server.get("/api/documents/rust-notes").await;
    assert_eq!(status, 200);
    assert!(document["content"].as_str().unwrap().starts_with("Rust ownership"));

    let (status, _) = server.delete("/api/documents/rust-notes").await;
    assert_eq!(status, 200);
    let (status, body) = server.get("/api/documents/rust-notes").await;
    assert_eq!(status, 404);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn empty_documents_and_queries_are_rejected() {
    let server = spawn_server().await;
    let (status, _) = server
        .post("/api/documents", json!({"content": "   "}))
        .await;
    assert_eq!(status, 400);

    let (status, _) = server
        .post("/api/documents/query", json!({"text": ""}))
        .await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn selection_and_fallback_endpoints() {
    let server = spawn_server().await;

    let (status, decision) = server
        .post("/api/selection", json!({"file_size": 2048}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(decision["selected_type"], "lightrag");
    assert_eq!(decision["applied_rule"], "small_file");

    let (_, decision) = server
        .post("/api/selection", json!({"user_plan": "enterprise"}))
        .await;
    assert_eq!(decision["selected_type"], "lightrag");
    assert_eq!(decision["applied_rule"], "default");

    let (status, body) = server.get("/api/selection/fallback/multimodal").await;
    assert_eq!(status, 200);
    assert_eq!(body["fallback"], "managed_vector");

    let (status, _) = server.get("/api/selection/fallback/graphdb").await;
    assert_eq!(status, 400);

    let (_, body) = server.get("/api/selection/high-reliability").await;
    assert_eq!(body["chain"], json!(["lightrag", "portable"]));
}

#[tokio::test]
async fn compatibility_and_plan_endpoints() {
    let server = spawn_server().await;

    let (status, info) = server.get("/api/compatibility/multimodal/lightrag").await;
    assert_eq!(status, 200);
    assert_eq!(info["score"], 35);
    assert_eq!(info["transfer_complexity"], "complex");
    assert_eq!(info["needs_reembedding"], true);

    let (status, plan) = server
        .post(
            "/api/transfers/plan",
            json!({"source": "lightrag", "target": "portable", "document_count": 5}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(plan["compatibility_score"], 90);
    assert_eq!(plan["estimated_time"], "3 seconds");
}

#[tokio::test]
async fn transfer_runs_to_completion() {
    let server = spawn_server().await;

    let (status, body) = server
        .post(
            "/api/transfers",
            json!({
                "source_id": "lightrag-local",
                "target_id": "portable-1",
                "document_ids": ["a", "b", "c"]
            }),
        )
        .await;
    assert_eq!(status, 202);
    let operation_id = body["operation_id"].as_str().unwrap().to_string();

    let mut last = Value::Null;
    for _ in 0..200 {
        let (status, operation) = server
            .get(&format!("/api/transfers/{}", operation_id))
            .await;
        assert_eq!(status, 200);
        last = operation;
        if last["status"] == "completed" || last["status"] == "failed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(last["status"], "completed");
    assert_eq!(last["progress"], 100);
    assert_eq!(last["documents_processed"], 3);

    let (_, listed) = server.get("/api/transfers").await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = server
        .post(&format!("/api/transfers/{}/cancel", operation_id), json!({}))
        .await;
    assert_eq!(status, 400);

    let (_, backends) = server.get("/api/backends").await;
    let portable = backends
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["id"] == "portable-1")
        .unwrap();
    assert_eq!(portable["metrics"]["document_count"], 3);
}

#[tokio::test]
async fn transfer_validation_errors() {
    let server = spawn_server().await;

    let (status, _) = server
        .post(
            "/api/transfers",
            json!({"source_id": "lightrag-local", "target_id": "nope", "document_ids": ["a"]}),
        )
        .await;
    assert_eq!(status, 404);

    let (status, _) = server
        .post(
            "/api/transfers",
            json!({"source_id": "lightrag-local", "target_id": "legal-archive", "document_ids": ["a"]}),
        )
        .await;
    assert_eq!(status, 400);

    let (status, _) = server
        .post(
            "/api/transfers",
            json!({"source_id": "portable-1", "target_id": "portable-1", "document_ids": ["a"]}),
        )
        .await;
    assert_eq!(status, 400);

    let (status, _) = server.get("/api/transfers/missing-op").await;
    assert_eq!(status, 404);
}
