//! Environment-driven server configuration.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use kratoshi_rag::RagConfig;

/// Settings for the HTTP shell and the pipeline it serves.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory the index is loaded from at startup and saved to after ingestion.
    pub index_path: PathBuf,
    /// Dimension of the offline embedder and the index.
    pub embedding_dim: usize,
    pub rag: RagConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            index_path: PathBuf::from("data/index"),
            embedding_dim: 384,
            rag: RagConfig::default(),
        }
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value.parse().with_context(|| format!("invalid value for {key}: {value:?}")),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    /// Read `KRATOSHI_*` environment variables, falling back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let rag = RagConfig::builder()
            .chunk_size(env_or("KRATOSHI_CHUNK_SIZE", defaults.rag.chunk_size)?)
            .chunk_overlap(env_or("KRATOSHI_CHUNK_OVERLAP", defaults.rag.chunk_overlap)?)
            .top_k(env_or("KRATOSHI_TOP_K", defaults.rag.top_k)?)
            .max_context_chars(env_or(
                "KRATOSHI_MAX_CONTEXT_CHARS",
                defaults.rag.max_context_chars,
            )?)
            .build()
            .context("invalid retrieval configuration")?;

        Ok(Self {
            host: std::env::var("KRATOSHI_HOST").unwrap_or(defaults.host),
            port: env_or("KRATOSHI_PORT", defaults.port)?,
            index_path: std::env::var("KRATOSHI_INDEX_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.index_path),
            embedding_dim: env_or("KRATOSHI_EMBEDDING_DIM", defaults.embedding_dim)?,
            rag,
        })
    }
}
