//! Top-K retrieval against an already-open index.
//!
//! The index API is batch-oriented; retrieval issues exactly one query with
//! one query vector and flattens slot `[0]` of the response into a list of
//! [`RetrievedChunk`]s, keeping the index's relevance order.

use std::sync::Arc;

use tracing::debug;

use crate::embedding::{embed_query, EmbeddingProvider};
use crate::error::RagError;
use crate::models::RetrievedChunk;
use crate::store::{QueryResult, VectorIndex};

/// Shared handles needed to query one collection.
///
/// Built once at startup and cloned cheaply into every request. The
/// embedding provider must be the one the collection was ingested with.
#[derive(Clone)]
pub struct IndexHandle {
    pub index: Arc<dyn VectorIndex>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub collection: String,
}

impl IndexHandle {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            index,
            embedder,
            collection: collection.into(),
        }
    }

    /// Fail with [`RagError::NotReady`] if the collection has not been
    /// built, or with [`RagError::Index`] if it was built by a different
    /// embedding model than the one configured for queries.
    pub async fn ensure_ready(&self) -> Result<(), RagError> {
        let space = self.index.collection_space(&self.collection).await?;
        let model = self.embedder.model_name();
        if space.model != model {
            return Err(RagError::Index(format!(
                "collection '{}' was built with embedding model '{}' but queries use '{}'; \
                 re-run: kbrag ingest",
                self.collection, space.model, model
            )));
        }
        Ok(())
    }
}

/// Return the `k` chunks most similar to `query`, most relevant first.
///
/// # Errors
///
/// - [`RagError::Validation`] if `k` is zero.
/// - [`RagError::NotReady`] if the collection does not exist.
/// - [`RagError::Index`] if the query embedding is not in the collection's space.
/// - [`RagError::Embedding`] / [`RagError::Index`] for collaborator failures.
pub async fn retrieve(
    query: &str,
    handle: &IndexHandle,
    k: usize,
) -> Result<Vec<RetrievedChunk>, RagError> {
    if k == 0 {
        return Err(RagError::Validation("k must be > 0".to_string()));
    }
    handle.ensure_ready().await?;

    let query_vec = embed_query(handle.embedder.as_ref(), query)
        .await
        .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;

    let result = handle
        .index
        .query(&handle.collection, &[query_vec], k)
        .await?;

    let chunks = unwrap_single(result)?;
    debug!(
        collection = %handle.collection,
        k,
        returned = chunks.len(),
        "retrieved chunks"
    );
    Ok(chunks)
}

/// Flatten the single-query slot of a batch response.
fn unwrap_single(result: QueryResult) -> Result<Vec<RetrievedChunk>, RagError> {
    let QueryResult {
        ids,
        documents,
        metadatas,
        distances,
    } = result;

    let (Some(ids), Some(documents), Some(metadatas), Some(distances)) = (
        ids.into_iter().next(),
        documents.into_iter().next(),
        metadatas.into_iter().next(),
        distances.into_iter().next(),
    ) else {
        return Err(RagError::Index(
            "index returned no result slot for the query".to_string(),
        ));
    };

    if documents.len() != ids.len()
        || metadatas.len() != ids.len()
        || distances.len() != ids.len()
    {
        return Err(RagError::Index(format!(
            "index returned ragged result lists: {} ids, {} documents, {} metadatas, {} distances",
            ids.len(),
            documents.len(),
            metadatas.len(),
            distances.len()
        )));
    }

    Ok(documents
        .into_iter()
        .zip(metadatas)
        .zip(distances)
        .map(|((text, meta), distance)| RetrievedChunk {
            text,
            source: meta.source,
            title: meta.title,
            chunk_index: meta.chunk_index,
            distance,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CollectionSpace, EntryMetadata, IndexedEntry};
    use crate::store::memory::InMemoryIndex;
    use async_trait::async_trait;

    /// Maps every text onto a fixed query direction.
    struct ConstProvider(&'static str, Vec<f32>);

    #[async_trait]
    impl EmbeddingProvider for ConstProvider {
        fn model_name(&self) -> &str {
            self.0
        }
        fn dims(&self) -> usize {
            self.1.len()
        }
        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| self.1.clone()).collect())
        }
    }

    fn entry(source: &str, title: &str, i: usize, text: &str) -> IndexedEntry {
        IndexedEntry {
            id: IndexedEntry::make_id(source, i),
            text: text.to_string(),
            metadata: EntryMetadata {
                source: source.to_string(),
                title: title.to_string(),
                chunk_index: i,
            },
        }
    }

    async fn three_entry_index() -> Arc<InMemoryIndex> {
        let index = InMemoryIndex::new();
        index
            .create_collection("docs", &CollectionSpace::new("const", 2))
            .await
            .unwrap();
        index
            .add(
                "docs",
                &[
                    entry("far.md", "Far", 0, "unrelated"),
                    entry("near.md", "Near", 3, "closest"),
                    entry("mid.md", "Mid", 1, "second"),
                ],
                &[vec![0.0, 1.0], vec![1.0, 0.05], vec![0.7, 0.7]],
            )
            .await
            .unwrap();
        Arc::new(index)
    }

    async fn three_entry_handle() -> IndexHandle {
        IndexHandle::new(
            three_entry_index().await,
            Arc::new(ConstProvider("const", vec![1.0, 0.0])),
            "docs",
        )
    }

    #[tokio::test]
    async fn test_top_k_in_similarity_order_with_metadata() {
        let handle = three_entry_handle().await;
        let chunks = retrieve("which is closest?", &handle, 2).await.unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "closest");
        assert_eq!(chunks[0].source, "near.md");
        assert_eq!(chunks[0].title, "Near");
        assert_eq!(chunks[0].chunk_index, 3);
        assert_eq!(chunks[1].source, "mid.md");
        assert_eq!(chunks[1].title, "Mid");
        assert_eq!(chunks[1].chunk_index, 1);
        assert!(chunks[0].distance < chunks[1].distance);
    }

    #[tokio::test]
    async fn test_k_larger_than_collection() {
        let handle = three_entry_handle().await;
        let chunks = retrieve("anything", &handle, 10).await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].source, "far.md");
    }

    #[tokio::test]
    async fn test_zero_k_is_validation_error() {
        let handle = three_entry_handle().await;
        let err = retrieve("anything", &handle, 0).await.unwrap_err();
        assert!(matches!(err, RagError::Validation(_)));
    }

    #[tokio::test]
    async fn test_missing_collection_is_not_ready() {
        let handle = IndexHandle::new(
            Arc::new(InMemoryIndex::new()),
            Arc::new(ConstProvider("const", vec![1.0])),
            "never_ingested",
        );
        assert!(matches!(
            handle.ensure_ready().await,
            Err(RagError::NotReady(_))
        ));
        let err = retrieve("anything", &handle, 3).await.unwrap_err();
        assert!(matches!(err, RagError::NotReady(ref m) if m.contains("never_ingested")));
    }

    #[tokio::test]
    async fn test_query_from_other_dimension_is_index_error() {
        let handle = IndexHandle::new(
            three_entry_index().await,
            Arc::new(ConstProvider("const", vec![1.0, 0.0, 0.0])),
            "docs",
        );
        let err = retrieve("which is closest?", &handle, 2).await.unwrap_err();
        assert!(
            matches!(err, RagError::Index(ref m) if m.contains("kbrag ingest")),
            "unexpected: {:?}",
            err
        );
    }

    #[tokio::test]
    async fn test_other_embedding_model_is_index_error() {
        let handle = IndexHandle::new(
            three_entry_index().await,
            Arc::new(ConstProvider("other-model", vec![1.0, 0.0])),
            "docs",
        );
        let err = handle.ensure_ready().await.unwrap_err();
        assert!(matches!(err, RagError::Index(ref m) if m.contains("other-model")));
        assert!(matches!(
            retrieve("anything", &handle, 1).await,
            Err(RagError::Index(_))
        ));
    }

    #[test]
    fn test_unwrap_rejects_empty_batch() {
        let err = unwrap_single(QueryResult::default()).unwrap_err();
        assert!(matches!(err, RagError::Index(_)));
    }

    #[test]
    fn test_unwrap_rejects_ragged_lists() {
        let result = QueryResult {
            ids: vec![vec!["a.md_0".to_string()]],
            documents: vec![vec![]],
            metadatas: vec![vec![]],
            distances: vec![vec![0.1]],
        };
        assert!(matches!(unwrap_single(result), Err(RagError::Index(_))));
    }
}
