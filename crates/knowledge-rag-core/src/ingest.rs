//! Ingestion pipeline: documents → chunks → embeddings → full index rebuild.
//!
//! Ingestion always rebuilds the collection from scratch: the existing
//! collection is dropped (a missing collection is fine), recreated, and
//! filled with a single bulk insert. The new collection records the
//! provider's model name and the length of the vectors it produced.
//! Running it twice over identical input yields identical entry ids.
//!
//! Ingestion must not run while queries are served from the same
//! collection; there is no locking here.

use tracing::{debug, info};

use crate::chunk::{chunk_document, validate_params};
use crate::embedding::EmbeddingProvider;
use crate::error::{IndexError, RagError};
use crate::models::{CollectionSpace, Document, EntryMetadata, IndexedEntry};
use crate::store::VectorIndex;

/// Parameters for an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Collection to rebuild.
    pub collection: String,
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters repeated between consecutive chunks.
    pub overlap: usize,
    /// Texts sent to the embedding provider per call.
    pub batch_size: usize,
}

/// Outcome of [`IngestionPipeline::ingest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub documents: usize,
    /// Number of entries stored in the index.
    pub entries: usize,
}

pub struct IngestionPipeline {
    options: IngestOptions,
}

impl IngestionPipeline {
    /// Create a pipeline, validating the chunking parameters up front.
    pub fn new(options: IngestOptions) -> Result<Self, RagError> {
        validate_params(options.chunk_size, options.overlap)?;
        if options.batch_size == 0 {
            return Err(RagError::Validation("batch_size must be > 0".to_string()));
        }
        Ok(Self { options })
    }

    /// Chunk every document and build its index entries.
    ///
    /// Entries keep document order, then chunk order.
    pub fn build_entries(&self, documents: &[Document]) -> Result<Vec<IndexedEntry>, RagError> {
        let mut entries = Vec::new();
        for doc in documents {
            let chunks = chunk_document(doc, self.options.chunk_size, self.options.overlap)?;
            debug!(filename = %doc.filename, chunks = chunks.len(), "chunked document");
            entries.extend(chunks.into_iter().map(|chunk| IndexedEntry {
                id: IndexedEntry::make_id(&doc.filename, chunk.index),
                text: chunk.text,
                metadata: EntryMetadata {
                    source: doc.filename.clone(),
                    title: doc.title.clone(),
                    chunk_index: chunk.index,
                },
            }));
        }
        Ok(entries)
    }

    /// Rebuild the collection from `documents`.
    pub async fn ingest(
        &self,
        documents: &[Document],
        provider: &dyn EmbeddingProvider,
        index: &dyn VectorIndex,
    ) -> Result<IngestReport, RagError> {
        let collection = self.options.collection.as_str();
        let entries = self.build_entries(documents)?;

        // Embed before touching the index so a provider failure leaves the
        // previous collection intact.
        let vectors = self.embed_entries(&entries, provider).await?;

        match index.delete_collection(collection).await {
            Ok(()) => debug!(collection, "dropped existing collection"),
            Err(IndexError::CollectionNotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        let dims = vectors
            .first()
            .map(Vec::len)
            .unwrap_or_else(|| provider.dims());
        let space = CollectionSpace::new(provider.model_name(), dims);
        index.create_collection(collection, &space).await?;

        info!(
            collection,
            documents = documents.len(),
            entries = entries.len(),
            model = provider.model_name(),
            "adding entries to index"
        );
        index.add(collection, &entries, &vectors).await?;

        Ok(IngestReport {
            documents: documents.len(),
            entries: entries.len(),
        })
    }

    async fn embed_entries(
        &self,
        entries: &[IndexedEntry],
        provider: &dyn EmbeddingProvider,
    ) -> Result<Vec<Vec<f32>>, RagError> {
        let mut vectors = Vec::with_capacity(entries.len());
        for batch in entries.chunks(self.options.batch_size) {
            let texts: Vec<String> = batch.iter().map(|e| e.text.clone()).collect();
            let embedded = provider
                .embed(&texts)
                .await
                .map_err(|e| RagError::Embedding(format!("{:#}", e)))?;
            if embedded.len() != texts.len() {
                return Err(RagError::Embedding(format!(
                    "provider returned {} vectors for {} texts",
                    embedded.len(),
                    texts.len()
                )));
            }
            vectors.extend(embedded);
        }
        Ok(vectors)
    }
}
