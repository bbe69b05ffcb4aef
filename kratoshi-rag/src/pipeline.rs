//! Retrieval pipeline orchestrator.
//!
//! The [`RagPipeline`] is the single context object an application builds at
//! startup and hands to whatever serves requests. It composes a [`Chunker`],
//! an [`EmbeddingProvider`], a [`VectorIndex`] and a [`Generator`], and owns
//! the optional directory the index is persisted to.
//!
//! # Example
//!
//! ```rust,ignore
//! use kratoshi_rag::{RagPipeline, RagConfig, FlatIndex, HashingEmbeddingProvider};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(HashingEmbeddingProvider::new(384)?))
//!     .vector_index(Arc::new(FlatIndex::new(384)?))
//!     .index_path("data/index")
//!     .build()?;
//!
//! pipeline.load_persisted().await?;
//! pipeline.ingest(&text, "notes.txt").await?;
//! let answer = pipeline.answer("What is UNDAC?", 5).await?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::chunking::Chunker;
use crate::config::RagConfig;
use crate::document::{RetrievalResult, SourceRef};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{ExtractiveGenerator, Generator};
use crate::retriever::Retriever;
use crate::vectorstore::VectorIndex;

/// A generated answer with the sources its context was built from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The question asked.
    pub query: String,
    /// The generator's answer.
    pub answer: String,
    /// Attribution for every context piece handed to the generator.
    pub sources: Vec<SourceRef>,
}

/// The retrieval pipeline.
///
/// Coordinates ingestion (chunk → embed → add → persist) and querying
/// (embed → search → assemble → generate). Construct one via
/// [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    chunker: Arc<dyn Chunker>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    generator: Arc<dyn Generator>,
    retriever: Retriever,
    index_path: Option<PathBuf>,
    /// Serializes ingestion so a failed persist can roll back only its own add.
    ingest_lock: Mutex<()>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the vector index.
    pub fn vector_index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// The directory the index is persisted to, if any.
    pub fn index_path(&self) -> Option<&Path> {
        self.index_path.as_deref()
    }

    /// Load the persisted index, if one was saved before.
    ///
    /// Returns `Ok(false)` when no persistence directory is configured or
    /// nothing has been saved yet; the pipeline then starts empty.
    ///
    /// # Errors
    ///
    /// Propagates [`RagError::Corruption`], [`RagError::DimensionMismatch`]
    /// and I/O failures from the index.
    pub async fn load_persisted(&self) -> Result<bool> {
        let Some(path) = &self.index_path else {
            return Ok(false);
        };
        match self.index.load(path).await {
            Ok(()) => Ok(true),
            Err(RagError::NotFound { .. }) => {
                info!(path = %path.display(), "no persisted index, starting empty");
                Ok(false)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to load persisted index");
                Err(e)
            }
        }
    }

    /// Save the index to the persistence directory, if one is configured.
    pub async fn flush(&self) -> Result<()> {
        match &self.index_path {
            Some(path) => self.index.save(path).await,
            None => Ok(()),
        }
    }

    /// Ingest one document: chunk → embed → add → persist.
    ///
    /// Returns the number of chunks added. Empty text adds nothing and does
    /// not touch the persisted state. Concurrent calls are applied one at a
    /// time.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if the embedding provider returns
    /// the wrong number of vectors, and propagates embedding, index and
    /// persistence errors. On any error the in-memory index is left as it was
    /// before the call, so retrying the same document never duplicates it.
    pub async fn ingest(&self, text: &str, source: &str) -> Result<usize> {
        let chunks = self.chunker.chunk(text, source);
        if chunks.is_empty() {
            info!(source, chunk_count = 0, "ingested document (empty)");
            return Ok(0);
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedding_provider.embed_batch(&texts).await.map_err(|e| {
            error!(source, error = %e, "embedding failed during ingestion");
            e
        })?;
        if embeddings.len() != chunks.len() {
            warn!(
                source,
                embeddings = embeddings.len(),
                chunks = chunks.len(),
                "embedding count does not match chunk count"
            );
            return Err(RagError::PipelineError(format!(
                "embedding provider returned {} vectors for {} chunks of '{source}'",
                embeddings.len(),
                chunks.len()
            )));
        }

        let _guard = self.ingest_lock.lock().await;
        let previous_len = self.index.len().await;
        self.index.add(&embeddings, &chunks).await.map_err(|e| {
            error!(source, error = %e, "index insert failed during ingestion");
            e
        })?;
        if let Err(e) = self.flush().await {
            error!(source, error = %e, "persisting index failed, rolling back ingestion");
            self.index.truncate(previous_len).await?;
            return Err(e);
        }

        let chunk_count = chunks.len();
        info!(source, chunk_count, "ingested document");
        Ok(chunk_count)
    }

    /// Assemble the context for `query` from the `top_k` nearest chunks,
    /// within the configured `max_context_chars`.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<RetrievalResult> {
        self.retriever.retrieve(query, top_k, self.config.max_context_chars).await
    }

    /// Retrieve a context for `query` and generate an answer from it.
    pub async fn answer(&self, query: &str, top_k: usize) -> Result<Answer> {
        let retrieved = self.retrieve(query, top_k).await?;
        let generation = self.generator.generate(query, &retrieved.context).await.map_err(|e| {
            error!(error = %e, "generation failed");
            e
        })?;

        info!(source_count = retrieved.sources.len(), "answered query");
        Ok(Answer { query: retrieved.query, answer: generation.answer, sources: retrieved.sources })
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `embedding_provider` and `vector_index` are required. The config defaults
/// to [`RagConfig::default()`], the chunker to the
/// [`FixedSizeChunker`](crate::FixedSizeChunker) described by the config, and
/// the generator to [`ExtractiveGenerator`].
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    chunker: Option<Arc<dyn Chunker>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<Arc<dyn VectorIndex>>,
    generator: Option<Arc<dyn Generator>>,
    index_path: Option<PathBuf>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector index.
    pub fn vector_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the answer generator.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Persist the index under this directory after every ingestion.
    pub fn index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = Some(path.into());
        self
    }

    /// Build the [`RagPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if a required component is missing,
    /// the config is invalid, or the embedding provider's dimension differs
    /// from the index dimension.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let index = self
            .index
            .ok_or_else(|| RagError::ConfigError("vector_index is required".to_string()))?;
        if embedding_provider.dimensions() != index.dimension() {
            return Err(RagError::ConfigError(format!(
                "embedding provider produces {}-dimensional vectors but the index expects {}",
                embedding_provider.dimensions(),
                index.dimension()
            )));
        }

        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(config.chunker()?),
        };
        let generator = self.generator.unwrap_or_else(|| Arc::new(ExtractiveGenerator));
        let retriever = Retriever::new(Arc::clone(&embedding_provider), Arc::clone(&index));

        Ok(RagPipeline {
            config,
            chunker,
            embedding_provider,
            index,
            generator,
            retriever,
            index_path: self.index_path,
            ingest_lock: Mutex::new(()),
        })
    }
}
