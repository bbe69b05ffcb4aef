//! Query-time context assembly.
//!
//! The [`Retriever`] embeds a query, asks the [`VectorIndex`] for the nearest
//! chunks and packs their trimmed texts into a character budget. Packing is a
//! greedy prefix over the score order: the first chunk that does not fit ends
//! the context, even if a later, shorter one would.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::document::{RetrievalResult, SearchResult, SourceRef};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorIndex;

/// Separator placed between chunk texts in an assembled context.
///
/// Chunk text is not escaped. A chunk that itself contains this separator
/// splits into more context pieces than it has entries in
/// [`RetrievalResult::sources`], so pieces and sources only line up one to
/// one when no stored text contains the separator.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Turns nearest-neighbour hits into a bounded, attributed context.
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    /// Create a retriever over `index`, embedding queries with `embedding_provider`.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self { embedding_provider, index }
    }

    /// Retrieve up to `top_k` chunks for `query` and assemble them into a
    /// context of at most `max_context_chars` characters (separators excluded).
    ///
    /// An index with nothing in it yields an empty result, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `top_k` or `max_context_chars` is
    /// zero, and propagates embedding and search failures.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        max_context_chars: usize,
    ) -> Result<RetrievalResult> {
        if top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if max_context_chars == 0 {
            return Err(RagError::ConfigError(
                "max_context_chars must be greater than zero".to_string(),
            ));
        }

        if self.index.is_empty().await {
            debug!("index is empty, returning empty context");
            return Ok(RetrievalResult::empty(query));
        }

        let query_embedding = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(error = %e, "query embedding failed");
            e
        })?;

        let results = self.index.search(&query_embedding, top_k).await.map_err(|e| {
            error!(top_k, error = %e, "vector search failed");
            e
        })?;
        let candidate_count = results.len();

        let result = assemble_context(query, &results, max_context_chars);
        info!(
            top_k,
            candidate_count,
            included = result.sources.len(),
            context_chars = result.context.chars().count(),
            "retrieved context"
        );
        Ok(result)
    }
}

/// Greedily pack `results` (already in descending-score order) into a context.
///
/// Each piece is the trimmed chunk text. A piece is taken only while the
/// running character total plus its own length stays within
/// `max_context_chars`; the first piece that would overflow stops assembly.
pub fn assemble_context(
    query: &str,
    results: &[SearchResult],
    max_context_chars: usize,
) -> RetrievalResult {
    let mut pieces: Vec<&str> = Vec::new();
    let mut sources: Vec<SourceRef> = Vec::new();
    let mut total_chars = 0;

    for result in results {
        let piece = result.chunk.text.trim();
        let piece_chars = piece.chars().count();
        if total_chars + piece_chars > max_context_chars {
            break;
        }
        total_chars += piece_chars;
        pieces.push(piece);
        sources.push(SourceRef::from(result));
    }

    RetrievalResult { query: query.to_string(), context: pieces.join(CONTEXT_SEPARATOR), sources }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Chunk, ChunkMetadata};

    fn hit(text: &str, chunk_id: usize, score: f32) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                text: text.to_string(),
                metadata: ChunkMetadata {
                    source: "notes.txt".into(),
                    chunk_id,
                    start_char: 0,
                    end_char: text.chars().count(),
                },
            },
            score,
        }
    }

    #[test]
    fn joins_trimmed_pieces_in_order() {
        let results = vec![hit("  alpha ", 3, 0.9), hit("\nbeta\n", 1, 0.5)];
        let result = assemble_context("q", &results, 100);
        assert_eq!(result.context, "alpha\n\n---\n\nbeta");
        assert_eq!(result.sources.len(), 2);
        assert_eq!(result.sources[0].chunk_id, 3);
        assert_eq!(result.sources[1].score, 0.5);
    }

    #[test]
    fn stops_at_first_piece_over_budget() {
        let results = vec![hit("aaaa", 0, 0.9), hit("bbbbbbbb", 1, 0.8), hit("cc", 2, 0.7)];
        let result = assemble_context("q", &results, 7);
        assert_eq!(result.context, "aaaa");
        assert_eq!(result.sources.len(), 1);
    }

    #[test]
    fn budget_is_inclusive() {
        let results = vec![hit("aaaa", 0, 0.9), hit("bbb", 1, 0.8)];
        let result = assemble_context("q", &results, 7);
        assert_eq!(result.sources.len(), 2);
    }

    #[test]
    fn first_piece_over_budget_yields_empty() {
        let results = vec![hit("a long first chunk", 0, 0.9), hit("x", 1, 0.1)];
        let result = assemble_context("q", &results, 5);
        assert!(result.context.is_empty());
        assert!(result.is_empty());
        assert_eq!(result.query, "q");
    }

    #[test]
    fn separator_inside_chunk_text_is_not_escaped() {
        let results = vec![hit("intro\n\n---\n\nmore", 0, 0.9)];
        let result = assemble_context("q", &results, 100);
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.context.split(CONTEXT_SEPARATOR).count(), 2);
    }

    #[test]
    fn budget_counts_characters_not_bytes() {
        let results = vec![hit("ééé", 0, 0.9)];
        assert_eq!(assemble_context("q", &results, 3).sources.len(), 1);
    }
}
