//! HTTP shell around the kratoshi retrieval pipeline.
//!
//! Routes: `GET /health`, `POST /ingest` (multipart `.txt` upload) and
//! `POST /query` (JSON `{ "query", "top_k" }`).

pub mod config;
pub mod server;

pub use config::ServerConfig;
pub use server::{AppState, app_router, build_pipeline, run_server};
