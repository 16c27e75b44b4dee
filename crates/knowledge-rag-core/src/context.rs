//! Process-wide application context.
//!
//! [`AppContext`] owns the shared embedding provider, index handle, and
//! generation backend. It is built once at startup and passed by reference
//! (or `Arc`) to every query; nothing is initialized per request.

use std::sync::Arc;

use crate::error::RagError;
use crate::generate::{answer, GenerationBackend};
use crate::models::{Answer, RetrievedChunk};
use crate::retrieve::{retrieve, IndexHandle};

#[derive(Clone)]
pub struct AppContext {
    pub handle: IndexHandle,
    pub backend: Arc<dyn GenerationBackend>,
    /// Chunks retrieved per question.
    pub top_k: usize,
}

impl AppContext {
    pub fn new(handle: IndexHandle, backend: Arc<dyn GenerationBackend>, top_k: usize) -> Self {
        Self {
            handle,
            backend,
            top_k,
        }
    }

    /// Answer a question end to end: validate, retrieve, generate.
    pub async fn ask(&self, query: &str) -> Result<Answer, RagError> {
        let query = validate_query(query)?;
        let chunks = retrieve(query, &self.handle, self.top_k).await?;
        answer(self.backend.as_ref(), query, &chunks).await
    }

    /// Retrieval only, with an explicit `k`.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>, RagError> {
        let query = validate_query(query)?;
        retrieve(query, &self.handle, k).await
    }
}

/// Reject empty or whitespace-only queries.
///
/// Returns the query unchanged (not trimmed) when valid.
pub fn validate_query(query: &str) -> Result<&str, RagError> {
    if query.trim().is_empty() {
        return Err(RagError::Validation("Query cannot be empty.".to_string()));
    }
    Ok(query)
}
