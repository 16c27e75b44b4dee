//! # knowledge-rag core
//!
//! Runtime-agnostic logic for knowledge-rag: document model, the
//! word-boundary chunker, the ingestion pipeline, retrieval against a
//! vector index, prompt assembly, and grounded answer generation.
//!
//! This crate contains no tokio, sqlx, or HTTP client dependencies. The
//! embedding provider, vector index, and generation backend are traits;
//! concrete implementations live in the `knowledge-rag` app crate (and an
//! in-memory index lives in [`store::memory`] for tests).
//!
//! ```text
//! ingest:  Document ─▶ chunk ─▶ embed ─▶ VectorIndex (full rebuild)
//! query:   question ─▶ retrieve ─▶ build_prompt ─▶ GenerationBackend ─▶ Answer
//! ```

pub mod chunk;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generate;
pub mod ingest;
pub mod models;
pub mod prompt;
pub mod retrieve;
pub mod store;

pub use context::AppContext;
pub use error::{ChunkError, IndexError, RagError};
pub use models::{
    Answer, Chunk, CollectionSpace, Document, EntryMetadata, IndexedEntry, RetrievedChunk,
};
