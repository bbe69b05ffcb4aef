//! Answer generation over an assembled context.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::retriever::CONTEXT_SEPARATOR;

/// Reply used when the context holds nothing to answer from.
pub const NO_ANSWER: &str = "I don't know.";

/// The output of a [`Generator`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Generation {
    /// The generated answer text.
    pub answer: String,
}

/// Produces an answer to a query from an opaque text context.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Answer `query` using only `context`.
    async fn generate(&self, query: &str, context: &str) -> Result<Generation>;
}

/// Build the grounding prompt handed to language-model generators.
pub fn build_prompt(query: &str, context: &str) -> String {
    format!(
        "You are a helpful AI assistant.\n\n\
         Use ONLY the provided context to answer the question.\n\n\
         If the answer is not in the context, say \"I don't know\".\n\n\
         Context:\n{context}\n\n\
         Question:\n{query}\n\n\
         Answer:"
    )
}

/// A model-free [`Generator`] that answers with the best-ranked context piece.
///
/// Useful when no language model is configured: the caller still receives the
/// most relevant passage, and an empty context yields [`NO_ANSWER`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractiveGenerator;

#[async_trait]
impl Generator for ExtractiveGenerator {
    async fn generate(&self, _query: &str, context: &str) -> Result<Generation> {
        let answer = context
            .split(CONTEXT_SEPARATOR)
            .map(str::trim)
            .find(|piece| !piece.is_empty())
            .unwrap_or(NO_ANSWER);
        Ok(Generation { answer: answer.to_string() })
    }
}
