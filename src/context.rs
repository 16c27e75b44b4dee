//! Wiring of the process-wide [`AppContext`] from configuration.

use std::sync::Arc;

use anyhow::Result;

use knowledge_rag_core::embedding::EmbeddingProvider;
use knowledge_rag_core::retrieve::IndexHandle;
use knowledge_rag_core::AppContext;

use crate::config::Config;
use crate::embedding::create_provider;
use crate::generate::OllamaBackend;
use crate::sqlite_store::SqliteIndex;

/// Open the index and build the embedding provider for `config`.
pub async fn open_handle(config: &Config) -> Result<IndexHandle> {
    let index = Arc::new(SqliteIndex::open(&config.index.path).await?);
    let embedder: Arc<dyn EmbeddingProvider> = create_provider(&config.embedding)?;
    Ok(IndexHandle::new(
        index,
        embedder,
        config.index.collection.clone(),
    ))
}

/// Build the full query context: index handle plus generation backend.
pub async fn build_context(config: &Config) -> Result<AppContext> {
    let handle = open_handle(config).await?;
    let backend = Arc::new(OllamaBackend::new(&config.generation)?);
    Ok(AppContext::new(handle, backend, config.retrieval.top_k))
}
