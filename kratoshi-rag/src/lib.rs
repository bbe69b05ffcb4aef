//! # kratoshi-rag
//!
//! The retrieval core of a retrieval-augmented generation service.
//!
//! Documents are cut into overlapping fixed-size chunks, the chunks are
//! embedded and stored in an exact inner-product [`VectorIndex`], and at query
//! time the nearest chunks are packed into a character-bounded context with
//! per-piece source attribution.
//!
//! ## Components
//!
//! - [`FixedSizeChunker`]: character windows with overlap and offsets
//! - [`FlatIndex`]: exact search over unit vectors, persisted as JSON
//! - [`Retriever`]: query embedding, search and greedy context assembly
//! - [`RagPipeline`]: the context object tying ingestion and answering together
//!
//! Embedding and generation are consumed through the [`EmbeddingProvider`]
//! and [`Generator`] traits. [`HashingEmbeddingProvider`] and
//! [`ExtractiveGenerator`] work offline; the `openai` feature adds
//! API-backed implementations.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kratoshi_rag::{FlatIndex, HashingEmbeddingProvider, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::builder().chunk_size(350).chunk_overlap(50).build()?)
//!     .embedding_provider(Arc::new(HashingEmbeddingProvider::new(384)?))
//!     .vector_index(Arc::new(FlatIndex::new(384)?))
//!     .build()?;
//!
//! pipeline.ingest(&text, "sample_text.txt").await?;
//! let context = pipeline.retrieve("What is the role of UNDAC?", 5).await?;
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod flat;
pub mod generation;
pub mod pipeline;
pub mod retriever;
pub mod vectorstore;

#[cfg(feature = "openai")]
pub mod openai;

pub use chunking::{Chunker, FixedSizeChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, ChunkMetadata, RetrievalResult, SearchResult, SourceRef, load_text};
pub use embedding::{EmbeddingProvider, HashingEmbeddingProvider};
pub use error::{RagError, Result};
pub use flat::FlatIndex;
pub use generation::{ExtractiveGenerator, Generation, Generator, build_prompt};
pub use pipeline::{Answer, RagPipeline, RagPipelineBuilder};
pub use retriever::{CONTEXT_SEPARATOR, Retriever, assemble_context};
pub use vectorstore::VectorIndex;

#[cfg(feature = "openai")]
pub use openai::{OpenAIEmbeddingProvider, OpenAIGenerator};
