//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`FixedSizeChunker`], which
//! slides a fixed-width character window with overlap across the text.

use tracing::debug;

use crate::document::{Chunk, ChunkMetadata};
use crate::error::{RagError, Result};

/// A strategy for splitting a document into chunks.
///
/// Implementations must be pure: the same `(text, source)` always yields the
/// same chunks.
pub trait Chunker: Send + Sync {
    /// Split `text` into ordered chunks attributed to `source`.
    ///
    /// Returns an empty `Vec` for empty text.
    fn chunk(&self, text: &str, source: &str) -> Vec<Chunk>;
}

/// Splits text into fixed-size chunks by character count with configurable overlap.
///
/// Consecutive windows start `chunk_size - chunk_overlap` characters apart.
/// The last window is clipped to the end of the text and may be shorter than
/// `chunk_size`.
///
/// # Example
///
/// ```rust
/// use kratoshi_rag::{Chunker, FixedSizeChunker};
///
/// let chunker = FixedSizeChunker::new(10, 2).unwrap();
/// let chunks = chunker.chunk("abcdefghijklmno", "alphabet.txt");
/// assert_eq!(chunks.len(), 2);
/// assert_eq!(chunks[1].text, "ijklmno");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: number of characters per chunk
    /// * `chunk_overlap`: number of characters shared by consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `chunk_size` is zero or
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Characters per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Characters shared by consecutive chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, text: &str, source: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char boundary, including the end of the text.
        let boundaries: Vec<usize> =
            text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let char_len = boundaries.len() - 1;

        let mut chunks = Vec::with_capacity(char_len.div_ceil(self.step()));
        let mut start = 0;
        let mut chunk_id = 0;

        while start < char_len {
            let end = (start + self.chunk_size).min(char_len);
            chunks.push(Chunk {
                text: text[boundaries[start]..boundaries[end]].to_string(),
                metadata: ChunkMetadata {
                    source: source.to_string(),
                    chunk_id,
                    start_char: start,
                    end_char: end,
                },
            });
            chunk_id += 1;
            start += self.step();
        }

        debug!(source, chunk_count = chunks.len(), char_len, "chunked document");
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_and_clipping() {
        let chunker = FixedSizeChunker::new(10, 2).unwrap();
        let chunks = chunker.chunk("abcdefghijklmno", "doc");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "abcdefghij");
        assert_eq!(chunks[1].text, "ijklmno");
        assert_eq!((chunks[0].metadata.start_char, chunks[0].metadata.end_char), (0, 10));
        assert_eq!((chunks[1].metadata.start_char, chunks[1].metadata.end_char), (8, 15));
        assert_eq!(chunks[1].metadata.chunk_id, 1);
    }

    #[test]
    fn empty_text_yields_nothing() {
        let chunker = FixedSizeChunker::new(10, 2).unwrap();
        assert!(chunker.chunk("", "doc").is_empty());
    }

    #[test]
    fn short_text_yields_single_chunk() {
        let chunker = FixedSizeChunker::new(500, 50).unwrap();
        let chunks = chunker.chunk("short", "doc");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "short");
        assert_eq!(chunks[0].metadata.end_char, 5);
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(matches!(FixedSizeChunker::new(10, 10), Err(RagError::ConfigError(_))));
        assert!(matches!(FixedSizeChunker::new(10, 11), Err(RagError::ConfigError(_))));
        assert!(matches!(FixedSizeChunker::new(0, 0), Err(RagError::ConfigError(_))));
    }

    #[test]
    fn multibyte_text_counts_characters() {
        let chunker = FixedSizeChunker::new(3, 1).unwrap();
        let chunks = chunker.chunk("ñandú€", "doc");
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["ñan", "ndú", "ú€"]);
        assert_eq!(chunks.last().unwrap().metadata.end_char, 6);
    }
}
