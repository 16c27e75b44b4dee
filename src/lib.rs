//! # knowledge-rag
//!
//! Retrieval-augmented question answering over a directory of Markdown
//! documents, answered by a local Ollama model.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────┐
//! │  data/docs  │──▶│  Pipeline   │──▶│  SQLite  │
//! │  *.md       │   │ Chunk+Embed │   │ vectors  │
//! └─────────────┘   └─────────────┘   └────┬─────┘
//!                                          │ top-K
//!                      ┌───────────────────┤
//!                      ▼                   ▼
//!                 ┌──────────┐       ┌──────────┐
//!                 │   CLI    │       │   HTTP   │──▶ Ollama /api/generate
//!                 │ (kbrag)  │       │ /api/query│
//!                 └──────────┘       └──────────┘
//! ```
//!
//! The pipeline itself (chunking, retrieval, prompt assembly, answer
//! orchestration) lives in `knowledge-rag-core`; this crate supplies the
//! SQLite index, embedding providers, the Ollama backend, and the front ends.
//!
//! ## Quick Start
//!
//! ```bash
//! kbrag documents                       # what will be indexed
//! kbrag ingest                          # rebuild the index
//! kbrag ask "How do I triage a phishing report?"
//! kbrag serve                           # POST /api/query
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | tracing subscriber setup |
//! | [`loader`] | Markdown document discovery |
//! | [`embedding`] | Embedding providers (local, Ollama, OpenAI) |
//! | [`generate`] | Ollama generation backend |
//! | [`sqlite_store`] | SQLite vector index |
//! | [`context`] | Builds the shared query context |
//! | [`ingest`] | `kbrag ingest` |
//! | [`ask`] | `kbrag ask`, `search`, `documents` |
//! | [`server`] | HTTP query server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Index schema |

pub mod ask;
pub mod config;
pub mod context;
pub mod db;
pub mod embedding;
pub mod generate;
pub mod ingest;
pub mod loader;
pub mod logging;
pub mod migrate;
pub mod server;
pub mod sqlite_store;
