//! Exact inner-product vector index.
//!
//! This module provides [`FlatIndex`], a brute-force index that keeps every
//! embedding in one contiguous row-major buffer next to the ordered list of
//! chunks, behind a `tokio::sync::RwLock`. Search scores every stored row, so
//! recall is exact.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorIndex;

/// File holding the serialized embedding matrix.
pub const INDEX_FILE: &str = "index.json";

/// File holding the serialized chunk list.
pub const CHUNKS_FILE: &str = "chunks.json";

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Default)]
struct FlatState {
    /// Row `i` occupies `vectors[i * dimension..(i + 1) * dimension]`.
    vectors: Vec<f32>,
    chunks: Vec<Chunk>,
}

#[derive(Serialize)]
struct PersistedMatrixRef<'a> {
    version: u32,
    dimension: usize,
    count: usize,
    vectors: &'a [f32],
}

#[derive(Deserialize)]
struct PersistedMatrix {
    version: u32,
    dimension: usize,
    count: usize,
    vectors: Vec<f32>,
}

/// An in-memory vector index using exact inner-product search.
///
/// Stored embeddings are assumed to be unit-normalized, which makes the inner
/// product equal to cosine similarity. Nothing is re-normalized here.
///
/// # Example
///
/// ```rust,ignore
/// use kratoshi_rag::{FlatIndex, VectorIndex};
///
/// let index = FlatIndex::new(384)?;
/// index.add(&embeddings, &chunks).await?;
/// index.save(Path::new("data/index")).await?;
/// ```
#[derive(Debug)]
pub struct FlatIndex {
    dimension: usize,
    state: RwLock<FlatState>,
}

impl FlatIndex {
    /// Create an empty index for `dimension`-component embeddings.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `dimension` is zero.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::ConfigError("index dimension must be greater than zero".into()));
        }
        Ok(Self { dimension, state: RwLock::new(FlatState::default()) })
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        if actual != self.dimension {
            return Err(RagError::DimensionMismatch { expected: self.dimension, actual });
        }
        Ok(())
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn corruption(path: &Path, message: impl Into<String>) -> RagError {
    RagError::Corruption { path: path.to_path_buf(), message: message.into() }
}

/// Write `bytes` to `path` through a sibling temp file so a crash never leaves
/// a truncated artifact behind.
async fn write_replace(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| RagError::Io { path: tmp.clone(), source: e })?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| RagError::Io { path: path.to_path_buf(), source: e })
}

/// Read an artifact, reporting a missing file as `Ok(None)`.
async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(RagError::Io { path: path.to_path_buf(), source: e }),
    }
}

#[async_trait]
impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn len(&self) -> usize {
        self.state.read().await.chunks.len()
    }

    async fn add(&self, embeddings: &[Vec<f32>], chunks: &[Chunk]) -> Result<()> {
        if embeddings.len() != chunks.len() {
            return Err(RagError::LengthMismatch {
                embeddings: embeddings.len(),
                chunks: chunks.len(),
            });
        }
        for embedding in embeddings {
            self.check_dimension(embedding.len())?;
        }

        let mut state = self.state.write().await;
        state.vectors.reserve(embeddings.len() * self.dimension);
        for embedding in embeddings {
            state.vectors.extend_from_slice(embedding);
        }
        state.chunks.extend_from_slice(chunks);

        debug!(added = chunks.len(), total = state.chunks.len(), "added embeddings to index");
        Ok(())
    }

    async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let state = self.state.read().await;
        if state.chunks.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        self.check_dimension(query.len())?;

        let mut scored: Vec<(usize, f32)> = state
            .vectors
            .chunks_exact(self.dimension)
            .map(|row| dot(row, query))
            .enumerate()
            .collect();

        // Descending score; the earlier insertion wins a tie.
        let by_rank = |a: &(usize, f32), b: &(usize, f32)| -> Ordering {
            b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
        };
        if top_k < scored.len() {
            scored.select_nth_unstable_by(top_k - 1, by_rank);
            scored.truncate(top_k);
        }
        scored.sort_unstable_by(by_rank);

        Ok(scored
            .into_iter()
            .map(|(i, score)| SearchResult { chunk: state.chunks[i].clone(), score })
            .collect())
    }

    async fn truncate(&self, len: usize) -> Result<()> {
        let mut state = self.state.write().await;
        if len < state.chunks.len() {
            state.chunks.truncate(len);
            state.vectors.truncate(len * self.dimension);
            debug!(len, "truncated index");
        }
        Ok(())
    }

    async fn save(&self, path: &Path) -> Result<()> {
        let state = self.state.read().await;

        let matrix = serde_json::to_vec(&PersistedMatrixRef {
            version: FORMAT_VERSION,
            dimension: self.dimension,
            count: state.chunks.len(),
            vectors: &state.vectors,
        })
        .map_err(|e| RagError::PipelineError(format!("failed to serialize index: {e}")))?;
        let chunks = serde_json::to_vec(&state.chunks)
            .map_err(|e| RagError::PipelineError(format!("failed to serialize chunks: {e}")))?;

        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| RagError::Io { path: path.to_path_buf(), source: e })?;
        write_replace(&path.join(INDEX_FILE), &matrix).await?;
        write_replace(&path.join(CHUNKS_FILE), &chunks).await?;

        info!(path = %path.display(), count = state.chunks.len(), "saved index");
        Ok(())
    }

    async fn load(&self, path: &Path) -> Result<()> {
        let index_path: PathBuf = path.join(INDEX_FILE);
        let chunks_path: PathBuf = path.join(CHUNKS_FILE);

        let (matrix_bytes, chunk_bytes) =
            match (read_optional(&index_path).await?, read_optional(&chunks_path).await?) {
                (Some(m), Some(c)) => (m, c),
                (None, None) => return Err(RagError::NotFound { path: path.to_path_buf() }),
                (None, Some(_)) => {
                    return Err(corruption(&index_path, "missing; chunks exist without vectors"));
                }
                (Some(_), None) => {
                    return Err(corruption(&chunks_path, "missing; vectors exist without chunks"));
                }
            };

        let matrix: PersistedMatrix = serde_json::from_slice(&matrix_bytes)
            .map_err(|e| corruption(&index_path, e.to_string()))?;
        let chunks: Vec<Chunk> = serde_json::from_slice(&chunk_bytes)
            .map_err(|e| corruption(&chunks_path, e.to_string()))?;

        if matrix.version != FORMAT_VERSION {
            return Err(corruption(
                &index_path,
                format!("unsupported format version {}", matrix.version),
            ));
        }
        self.check_dimension(matrix.dimension)?;
        let expected_values = matrix.count.checked_mul(matrix.dimension).ok_or_else(|| {
            corruption(&index_path, format!("vector count {} is out of range", matrix.count))
        })?;
        if matrix.vectors.len() != expected_values {
            return Err(corruption(
                &index_path,
                format!(
                    "expected {} values for {} vectors, found {}",
                    expected_values,
                    matrix.count,
                    matrix.vectors.len()
                ),
            ));
        }
        if matrix.count != chunks.len() {
            return Err(corruption(
                path,
                format!("{} vectors but {} chunks", matrix.count, chunks.len()),
            ));
        }

        let mut state = self.state.write().await;
        *state = FlatState { vectors: matrix.vectors, chunks };

        info!(path = %path.display(), count = state.chunks.len(), "loaded index");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ChunkMetadata;

    fn chunk(id: usize) -> Chunk {
        Chunk {
            text: format!("chunk {id}"),
            metadata: ChunkMetadata {
                source: "doc".into(),
                chunk_id: id,
                start_char: id * 10,
                end_char: id * 10 + 10,
            },
        }
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let index = FlatIndex::new(2).unwrap();
        let embeddings = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 0.0]];
        let chunks: Vec<Chunk> = (0..4).map(chunk).collect();
        index.add(&embeddings, &chunks).await.unwrap();

        let results = index.search(&[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<usize> = results.iter().map(|r| r.chunk.metadata.chunk_id).collect();
        assert_eq!(ids, vec![0, 2]);

        let all = index.search(&[1.0, 0.0], 10).await.unwrap();
        let ids: Vec<usize> = all.iter().map(|r| r.chunk.metadata.chunk_id).collect();
        assert_eq!(ids, vec![0, 2, 3, 1]);
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected_without_partial_insert() {
        let index = FlatIndex::new(2).unwrap();
        let err = index
            .add(&[vec![1.0, 0.0], vec![1.0, 0.0, 0.0]], &[chunk(0), chunk(1)])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 3 }));
        assert_eq!(index.len().await, 0);
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(matches!(FlatIndex::new(0), Err(RagError::ConfigError(_))));
    }

    #[tokio::test]
    async fn truncate_drops_newest_entries() {
        let index = FlatIndex::new(2).unwrap();
        let embeddings = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0]];
        let chunks: Vec<Chunk> = (0..3).map(chunk).collect();
        index.add(&embeddings, &chunks).await.unwrap();

        index.truncate(1).await.unwrap();
        assert_eq!(index.len().await, 1);
        let results = index.search(&[0.0, 1.0], 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.metadata.chunk_id, 0);

        index.truncate(5).await.unwrap();
        assert_eq!(index.len().await, 1);
    }

    #[tokio::test]
    async fn query_dimension_is_checked() {
        let index = FlatIndex::new(2).unwrap();
        index.add(&[vec![1.0, 0.0]], &[chunk(0)]).await.unwrap();
        assert!(matches!(
            index.search(&[1.0], 1).await,
            Err(RagError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }
}
