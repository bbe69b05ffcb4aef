use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use kratoshi_rag::{
    Answer, EmbeddingProvider, ExtractiveGenerator, FlatIndex, Generator,
    HashingEmbeddingProvider, RagError, RagPipeline,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::config::ServerConfig;

/// Shared request context: one pipeline built at startup.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RagPipeline>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub message: String,
    pub chunks_added: usize,
}

/// An error rendered as `{"detail": ...}` with a matching status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, detail: detail.into() }
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        let status = if err.is_validation() {
            StatusCode::BAD_REQUEST
        } else if matches!(
            err,
            RagError::EmbeddingError { .. } | RagError::GenerationError { .. }
        ) {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        if status.is_server_error() {
            error!(error = %err, "request failed");
        }
        Self { status, detail: err.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ingest", post(ingest))
        .route("/query", post(query))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Build the pipeline described by `config`.
///
/// With the `openai` feature and `OPENAI_API_KEY` set, embeddings and answers
/// come from OpenAI; otherwise the offline hashing embedder and extractive
/// generator are used.
pub fn build_pipeline(config: &ServerConfig) -> anyhow::Result<RagPipeline> {
    let (embedder, generator) = providers(config)?;
    let pipeline = RagPipeline::builder()
        .config(config.rag)
        .embedding_provider(embedder)
        .vector_index(Arc::new(FlatIndex::new(config.embedding_dim)?))
        .generator(generator)
        .index_path(config.index_path.clone())
        .build()?;
    Ok(pipeline)
}

type Providers = (Arc<dyn EmbeddingProvider>, Arc<dyn Generator>);

#[cfg(feature = "openai")]
fn providers(config: &ServerConfig) -> anyhow::Result<Providers> {
    use kratoshi_rag::{OpenAIEmbeddingProvider, OpenAIGenerator};

    if std::env::var("OPENAI_API_KEY").is_ok() {
        info!("using OpenAI embedding and generation");
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(
            OpenAIEmbeddingProvider::from_env()?.with_dimensions(config.embedding_dim),
        );
        let generator: Arc<dyn Generator> = Arc::new(OpenAIGenerator::from_env()?);
        return Ok((embedder, generator));
    }
    offline_providers(config)
}

#[cfg(not(feature = "openai"))]
fn providers(config: &ServerConfig) -> anyhow::Result<Providers> {
    offline_providers(config)
}

fn offline_providers(config: &ServerConfig) -> anyhow::Result<Providers> {
    info!(dimensions = config.embedding_dim, "using offline hashing embedder");
    let embedder: Arc<dyn EmbeddingProvider> =
        Arc::new(HashingEmbeddingProvider::new(config.embedding_dim)?);
    Ok((embedder, Arc::new(ExtractiveGenerator)))
}

pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let pipeline = Arc::new(build_pipeline(&config)?);
    if pipeline.load_persisted().await? {
        info!(
            path = %config.index_path.display(),
            chunks = pipeline.vector_index().len().await,
            "loaded persisted index"
        );
    }

    let app = app_router(AppState { pipeline: Arc::clone(&pipeline) });
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for kratoshi server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("kratoshi listening on http://{}", addr);
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    pipeline.flush().await.context("failed to flush index on shutdown")?;
    info!("index flushed, shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn ingest(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>, ApiError> {
    while let Some(field) =
        multipart.next_field().await.map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if !filename.ends_with(".txt") {
            return Err(ApiError::bad_request("Only .txt files supported"));
        }

        let bytes = field.bytes().await.map_err(|e| ApiError::bad_request(e.to_string()))?;
        let content = String::from_utf8(bytes.to_vec())
            .map_err(|_| ApiError::bad_request("File is not valid UTF-8"))?;

        let chunks_added = state.pipeline.ingest(&content, &filename).await?;
        return Ok(Json(IngestResponse { message: "Document ingested".to_string(), chunks_added }));
    }

    Err(ApiError::bad_request("Missing 'file' field"))
}

async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<Answer>, ApiError> {
    let answer = state.pipeline.answer(&request.query, request.top_k).await?;
    Ok(Json(answer))
}
