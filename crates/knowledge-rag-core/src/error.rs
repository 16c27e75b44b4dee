//! Error taxonomy for the query and ingestion paths.
//!
//! [`RagError`] is what callers match on. The variants map one-to-one onto
//! the outcomes a front end has to distinguish: bad input, an index that was
//! never built, a generation backend that cannot be reached, and everything
//! else the backend or index reports.

use thiserror::Error;

/// Top-level error returned by retrieval, generation, and [`ask`](crate::context::AppContext::ask).
#[derive(Error, Debug)]
pub enum RagError {
    /// The request itself is invalid (e.g. an empty query).
    #[error("{0}")]
    Validation(String),

    /// The target collection does not exist; ingestion has not been run.
    #[error("{0}")]
    NotReady(String),

    /// The generation backend could not be reached at all.
    #[error("{0}")]
    BackendUnavailable(String),

    /// The generation backend was reached but the call failed.
    #[error("generation backend error: {0}")]
    Backend(String),

    /// The embedding provider failed.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// The vector index failed for a reason other than a missing collection.
    #[error("index error: {0}")]
    Index(String),

    #[error("chunking error: {0}")]
    Chunk(#[from] ChunkError),
}

impl RagError {
    /// Builds the not-ready error for a missing collection.
    pub fn not_ready(collection: &str) -> Self {
        RagError::NotReady(format!(
            "Document collection '{}' not found. Run the ingestion pipeline first: kbrag ingest",
            collection
        ))
    }

    /// Whether a caller may reasonably retry the same request later.
    ///
    /// The core never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RagError::BackendUnavailable(_) | RagError::Backend(_))
    }
}

impl From<IndexError> for RagError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::CollectionNotFound(name) => RagError::not_ready(&name),
            e @ IndexError::DimensionMismatch { .. } => RagError::Index(format!(
                "{}. The embedding configuration changed since ingestion; re-run: kbrag ingest",
                e
            )),
            IndexError::Backend(e) => RagError::Index(format!("{:#}", e)),
        }
    }
}

/// Chunker parameter errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    #[error("invalid chunking configuration: {0}")]
    InvalidConfig(String),
}

/// Errors reported by a [`VectorIndex`](crate::store::VectorIndex).
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// A vector's length differs from the collection's recorded dimensions.
    #[error("collection '{collection}' holds {expected}-dimensional vectors, got {got}")]
    DimensionMismatch {
        collection: String,
        expected: usize,
        got: usize,
    },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}
