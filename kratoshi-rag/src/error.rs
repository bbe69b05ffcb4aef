//! Error types for the `kratoshi-rag` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in retrieval pipeline operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The number of embeddings and chunks passed to a single insert disagree.
    #[error("Length mismatch: {embeddings} embeddings for {chunks} chunks")]
    LengthMismatch {
        /// Number of embedding vectors supplied.
        embeddings: usize,
        /// Number of chunks supplied.
        chunks: usize,
    },

    /// A vector's dimension does not match the index dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension fixed at index construction.
        expected: usize,
        /// The dimension of the offending vector.
        actual: usize,
    },

    /// No persisted index exists at the given location.
    #[error("No persisted index found at {}", path.display())]
    NotFound {
        /// The location that was searched.
        path: PathBuf,
    },

    /// Persisted artifacts exist but are unreadable or inconsistent.
    #[error("Corrupt persisted index at {}: {message}", path.display())]
    Corruption {
        /// The artifact that failed validation.
        path: PathBuf,
        /// A description of the inconsistency.
        message: String,
    },

    /// An I/O failure while reading or writing persisted state.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// The file or directory being accessed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during answer generation.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The generator that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error in the pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),
}

impl RagError {
    /// Build an [`RagError::Io`] for `path`, turning `ErrorKind::NotFound` into
    /// [`RagError::NotFound`].
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            RagError::NotFound { path }
        } else {
            RagError::Io { path, source }
        }
    }

    /// Returns `true` for errors caused by invalid caller input rather than
    /// by a backend or persisted state.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RagError::ConfigError(_)
                | RagError::LengthMismatch { .. }
                | RagError::DimensionMismatch { .. }
        )
    }
}

/// A convenience result type for retrieval pipeline operations.
pub type Result<T> = std::result::Result<T, RagError>;
