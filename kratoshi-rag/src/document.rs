//! Data types for chunks, search hits and retrieval results.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Positional and provenance metadata attached to every [`Chunk`].
///
/// Offsets are half-open and count characters (Unicode scalar values) into
/// the original document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// Identifier of the document the chunk was cut from.
    pub source: String,
    /// Sequence number within the source, starting at 0.
    pub chunk_id: usize,
    /// First character of the chunk.
    pub start_char: usize,
    /// One past the last character of the chunk.
    pub end_char: usize,
}

/// A contiguous substring of a source document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// The text content of the chunk.
    pub text: String,
    /// Where the text came from.
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Number of characters covered by this chunk.
    pub fn char_len(&self) -> usize {
        self.metadata.end_char - self.metadata.start_char
    }
}

/// A stored [`Chunk`] paired with its similarity to a query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Inner product between the query and the stored embedding (higher is closer).
    pub score: f32,
}

/// Attribution for one piece of an assembled context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    /// Identifier of the originating document.
    pub source: String,
    /// Position of the chunk within that document.
    pub chunk_id: usize,
    /// Similarity score of the chunk.
    pub score: f32,
}

impl From<&SearchResult> for SourceRef {
    fn from(result: &SearchResult) -> Self {
        Self {
            source: result.chunk.metadata.source.clone(),
            chunk_id: result.chunk.metadata.chunk_id,
            score: result.score,
        }
    }
}

/// The bounded context assembled for a query.
///
/// `sources[i]` describes the `i`-th piece of `context` when split on
/// [`CONTEXT_SEPARATOR`](crate::retriever::CONTEXT_SEPARATOR).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    /// The query the context was assembled for.
    pub query: String,
    /// Trimmed chunk texts in descending-score order, joined by the separator.
    pub context: String,
    /// One record per piece included in `context`.
    pub sources: Vec<SourceRef>,
}

impl RetrievalResult {
    /// An empty result for `query`.
    pub fn empty(query: impl Into<String>) -> Self {
        Self { query: query.into(), ..Self::default() }
    }

    /// Returns `true` if no piece made it into the context.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Read a UTF-8 text document from disk.
///
/// # Errors
///
/// Returns [`RagError::NotFound`] if the file does not exist and
/// [`RagError::Io`] for any other read failure, including invalid UTF-8.
pub async fn load_text(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    tokio::fs::read_to_string(path).await.map_err(|e| RagError::io(path, e))
}
