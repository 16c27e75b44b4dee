//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait models a collection-oriented similarity store:
//! named collections of [`IndexedEntry`]s with precomputed vectors, and a
//! batch nearest-neighbour query. Each collection records the
//! [`CollectionSpace`] it was created in, and vectors of any other length
//! are rejected with [`IndexError::DimensionMismatch`]. Implementations must be `Send + Sync` so a
//! single handle can serve concurrent queries.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`collection_exists`](VectorIndex::collection_exists) | Readiness check |
//! | [`delete_collection`](VectorIndex::delete_collection) | Drop a collection and its entries |
//! | [`create_collection`](VectorIndex::create_collection) | Create an empty collection |
//! | [`collection_space`](VectorIndex::collection_space) | Recorded model and dimensions |
//! | [`add`](VectorIndex::add) | Bulk-insert entries with their vectors |
//! | [`count`](VectorIndex::count) | Number of entries in a collection |
//! | [`query`](VectorIndex::query) | Batch top-K similarity search |

pub mod memory;

use async_trait::async_trait;

use crate::error::IndexError;
use crate::models::{CollectionSpace, EntryMetadata, IndexedEntry};

/// Batch-shaped response of [`VectorIndex::query`].
///
/// Each field holds one inner list per query vector, in the order the
/// query vectors were given. Inner lists are ordered by ascending distance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub ids: Vec<Vec<String>>,
    pub documents: Vec<Vec<String>>,
    pub metadatas: Vec<Vec<EntryMetadata>>,
    pub distances: Vec<Vec<f32>>,
}

impl QueryResult {
    /// Number of query slots in the response.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Abstract similarity store.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn collection_exists(&self, name: &str) -> Result<bool, IndexError>;

    /// Drop a collection. Returns [`IndexError::CollectionNotFound`] if it
    /// does not exist.
    async fn delete_collection(&self, name: &str) -> Result<(), IndexError>;

    /// Create an empty collection. Creating an existing collection is a
    /// no-op and keeps its recorded space.
    async fn create_collection(
        &self,
        name: &str,
        space: &CollectionSpace,
    ) -> Result<(), IndexError>;

    /// The space recorded for `name`, or [`IndexError::CollectionNotFound`].
    async fn collection_space(&self, name: &str) -> Result<CollectionSpace, IndexError>;

    /// Insert entries with their vectors. `entries` and `vectors` are
    /// parallel slices; an entry id that already exists is replaced.
    async fn add(
        &self,
        collection: &str,
        entries: &[IndexedEntry],
        vectors: &[Vec<f32>],
    ) -> Result<(), IndexError>;

    async fn count(&self, collection: &str) -> Result<usize, IndexError>;

    /// Return the `n_results` nearest entries for each query vector.
    async fn query(
        &self,
        collection: &str,
        query_vectors: &[Vec<f32>],
        n_results: usize,
    ) -> Result<QueryResult, IndexError>;
}

/// Check that `entries` and `vectors` line up before an insert.
pub fn check_parallel(
    entries: &[IndexedEntry],
    vectors: &[Vec<f32>],
) -> Result<(), IndexError> {
    if entries.len() != vectors.len() {
        return Err(IndexError::Backend(anyhow::anyhow!(
            "entry/vector count mismatch: {} entries, {} vectors",
            entries.len(),
            vectors.len()
        )));
    }
    Ok(())
}

/// Check every vector against the collection's recorded dimensions.
pub fn check_dims(
    collection: &str,
    space: &CollectionSpace,
    vectors: &[Vec<f32>],
) -> Result<(), IndexError> {
    match vectors.iter().find(|v| v.len() != space.dims) {
        Some(v) => Err(IndexError::DimensionMismatch {
            collection: collection.to_string(),
            expected: space.dims,
            got: v.len(),
        }),
        None => Ok(()),
    }
}
