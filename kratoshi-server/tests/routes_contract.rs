use std::sync::Arc;

use kratoshi_rag::{FlatIndex, HashingEmbeddingProvider, RagConfig, RagPipeline};
use kratoshi_server::{AppState, app_router};
use reqwest::multipart::{Form, Part};
use serde_json::Value;

const DOC: &str = "Rust guarantees memory safety without a garbage collector. \
Volcanoes erupt when magma rises through the crust.";

fn pipeline(index_dir: &std::path::Path) -> RagPipeline {
    let config = RagConfig::builder()
        .chunk_size(60)
        .chunk_overlap(10)
        .top_k(4)
        .max_context_chars(2000)
        .build()
        .expect("valid config");
    RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(HashingEmbeddingProvider::new(64).expect("embedder")))
        .vector_index(Arc::new(FlatIndex::new(64).expect("index")))
        .index_path(index_dir.to_path_buf())
        .build()
        .expect("pipeline")
}

async fn spawn_server(pipeline: RagPipeline) -> (String, tokio::task::JoinHandle<()>) {
    let app = app_router(AppState { pipeline: Arc::new(pipeline) });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}", addr), handle)
}

fn upload(filename: &str, body: &str) -> Form {
    Form::new().part("file", Part::text(body.to_string()).file_name(filename.to_string()))
}

#[tokio::test]
async fn health_reports_ok() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (base, handle) = spawn_server(pipeline(dir.path())).await;

    let response = reqwest::get(format!("{}/health", base)).await.expect("health response");
    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("health json");
    assert_eq!(body["status"], "ok");

    handle.abort();
}

#[tokio::test]
async fn ingest_then_query_returns_grounded_answer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (base, handle) = spawn_server(pipeline(dir.path())).await;
    let client = reqwest::Client::new();

    let ingest = client
        .post(format!("{}/ingest", base))
        .multipart(upload("notes.txt", DOC))
        .send()
        .await
        .expect("ingest response");
    assert!(ingest.status().is_success());
    let ingested: Value = ingest.json().await.expect("ingest json");
    assert_eq!(ingested["message"], "Document ingested");
    assert!(ingested["chunks_added"].as_u64().expect("chunks_added") > 0);

    assert!(dir.path().join("index.json").exists());
    assert!(dir.path().join("chunks.json").exists());

    let query = client
        .post(format!("{}/query", base))
        .json(&serde_json::json!({ "query": "magma volcanoes" }))
        .send()
        .await
        .expect("query response");
    assert!(query.status().is_success());
    let answer: Value = query.json().await.expect("query json");
    assert_eq!(answer["query"], "magma volcanoes");
    let sources = answer["sources"].as_array().expect("sources array");
    assert!(!sources.is_empty());
    assert!(sources.iter().all(|s| s["source"] == "notes.txt"));
    assert!(!answer["answer"].as_str().expect("answer text").is_empty());

    handle.abort();
}

#[tokio::test]
async fn ingest_rejects_non_text_upload() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (base, handle) = spawn_server(pipeline(dir.path())).await;

    let response = reqwest::Client::new()
        .post(format!("{}/ingest", base))
        .multipart(upload("report.pdf", DOC))
        .send()
        .await
        .expect("ingest response");
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("error json");
    assert_eq!(body["detail"], "Only .txt files supported");

    handle.abort();
}

#[tokio::test]
async fn query_with_zero_top_k_is_bad_request() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (base, handle) = spawn_server(pipeline(dir.path())).await;

    let response = reqwest::Client::new()
        .post(format!("{}/query", base))
        .json(&serde_json::json!({ "query": "anything", "top_k": 0 }))
        .send()
        .await
        .expect("query response");
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("error json");
    assert!(body["detail"].as_str().is_some());

    handle.abort();
}

#[tokio::test]
async fn query_on_empty_index_says_it_does_not_know() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (base, handle) = spawn_server(pipeline(dir.path())).await;

    let response = reqwest::Client::new()
        .post(format!("{}/query", base))
        .json(&serde_json::json!({ "query": "what is rust?", "top_k": 3 }))
        .send()
        .await
        .expect("query response");
    assert!(response.status().is_success());
    let answer: Value = response.json().await.expect("query json");
    assert_eq!(answer["answer"], kratoshi_rag::generation::NO_ANSWER);
    assert_eq!(answer["sources"].as_array().map(Vec::len), Some(0));

    handle.abort();
}
