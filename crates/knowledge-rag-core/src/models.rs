//! Core data models used throughout knowledge-rag.
//!
//! These types represent the documents, chunks, index entries, and answers
//! that flow through the ingestion and query pipelines.

use serde::{Deserialize, Serialize};

/// A source Markdown document loaded for ingestion.
///
/// Lives only for the duration of an ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File name relative to the data directory; used as the citation source.
    pub filename: String,
    /// First level-1 heading, or `"Untitled"`.
    pub title: String,
    /// Path the content was read from.
    pub path: String,
    pub content: String,
}

/// A trimmed, non-empty window of a document's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    /// 0-based ordinal within the parent document.
    pub index: usize,
}

/// Metadata stored alongside every indexed chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Filename of the parent document.
    pub source: String,
    pub title: String,
    pub chunk_index: usize,
}

/// The unit persisted in a vector index collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedEntry {
    /// Stable identifier: `"{filename}_{chunk_index}"`.
    pub id: String,
    pub text: String,
    pub metadata: EntryMetadata,
}

impl IndexedEntry {
    /// Formats the stable entry identifier.
    pub fn make_id(filename: &str, chunk_index: usize) -> String {
        format!("{}_{}", filename, chunk_index)
    }
}

/// The embedding space a collection was built in.
///
/// Recorded when the collection is created; every vector added to or
/// queried against the collection must have `dims` components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpace {
    /// Embedding model name reported by the provider at ingestion.
    pub model: String,
    pub dims: usize,
}

impl CollectionSpace {
    pub fn new(model: impl Into<String>, dims: usize) -> Self {
        Self {
            model: model.into(),
            dims,
        }
    }
}

/// A chunk returned for a query, in index relevance order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub source: String,
    pub title: String,
    pub chunk_index: usize,
    /// Distance reported by the index (smaller is closer).
    pub distance: f32,
}

/// The final response returned to a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    /// Distinct source filenames in first-seen retrieval order.
    pub sources: Vec<String>,
    pub query: String,
}
