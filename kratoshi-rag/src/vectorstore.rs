//! Vector index trait for storing and searching chunk embeddings.

use std::path::Path;

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;

/// A storage backend pairing embeddings with the chunks they were computed from.
///
/// Embeddings and chunks only ever enter the index together through
/// [`add`](VectorIndex::add), so the two can never drift apart. Every
/// embedding has the dimension fixed when the index was created.
///
/// # Thread safety
///
/// Implementations must be safe to share across tasks: an `add` is never
/// observed half-applied by a concurrent `search`, `len` or `save`.
///
/// # Example
///
/// ```rust,ignore
/// use kratoshi_rag::{FlatIndex, VectorIndex};
///
/// let index = FlatIndex::new(384)?;
/// index.add(&embeddings, &chunks).await?;
/// let results = index.search(&query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// The embedding dimension accepted by this index.
    fn dimension(&self) -> usize;

    /// Number of stored (embedding, chunk) pairs.
    async fn len(&self) -> usize;

    /// Returns `true` if nothing has been added yet.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Append `embeddings[i]` paired with `chunks[i]` for every `i`, in order.
    ///
    /// The insert is atomic: on error nothing is stored.
    ///
    /// # Errors
    ///
    /// - [`RagError::LengthMismatch`](crate::RagError::LengthMismatch) if the
    ///   slices have different lengths.
    /// - [`RagError::DimensionMismatch`](crate::RagError::DimensionMismatch) if
    ///   any embedding has the wrong dimension.
    async fn add(&self, embeddings: &[Vec<f32>], chunks: &[Chunk]) -> Result<()>;

    /// Drop every pair stored after the first `len`, keeping insertion order.
    ///
    /// Used to undo an `add` whose follow-up work failed. A `len` at or past
    /// the current size is a no-op.
    async fn truncate(&self, len: usize) -> Result<()>;

    /// Return at most `top_k` chunks ordered by descending inner product with
    /// `query`; equal scores keep insertion order.
    ///
    /// An empty index yields an empty `Vec`.
    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>>;

    /// Persist the full index state under the directory `path`.
    async fn save(&self, path: &Path) -> Result<()>;

    /// Replace the index state with the one persisted under `path`.
    ///
    /// # Errors
    ///
    /// [`RagError::NotFound`](crate::RagError::NotFound) if nothing was saved
    /// there, [`RagError::Corruption`](crate::RagError::Corruption) if the
    /// saved artifacts are incomplete or unreadable.
    async fn load(&self, path: &Path) -> Result<()>;
}
