//! In-memory [`VectorIndex`] implementation for tests and embedding.
//!
//! Collections are `Vec`s behind a `std::sync::RwLock`. Queries are
//! brute-force cosine distance over every stored vector.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::cosine_distance;
use crate::error::IndexError;
use crate::models::{CollectionSpace, IndexedEntry};

use super::{check_dims, check_parallel, QueryResult, VectorIndex};

struct StoredEntry {
    entry: IndexedEntry,
    vector: Vec<f32>,
}

struct Collection {
    space: CollectionSpace,
    entries: Vec<StoredEntry>,
}

/// In-memory vector index.
pub struct InMemoryIndex {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> IndexError {
    IndexError::Backend(anyhow::anyhow!("in-memory index lock poisoned"))
}

fn not_found(name: &str) -> IndexError {
    IndexError::CollectionNotFound(name.to_string())
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn collection_exists(&self, name: &str) -> Result<bool, IndexError> {
        let collections = self.collections.read().map_err(poisoned)?;
        Ok(collections.contains_key(name))
    }

    async fn delete_collection(&self, name: &str) -> Result<(), IndexError> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        collections
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found(name))
    }

    async fn create_collection(
        &self,
        name: &str,
        space: &CollectionSpace,
    ) -> Result<(), IndexError> {
        let mut collections = self.collections.write().map_err(poisoned)?;
        collections
            .entry(name.to_string())
            .or_insert_with(|| Collection {
                space: space.clone(),
                entries: Vec::new(),
            });
        Ok(())
    }

    async fn collection_space(&self, name: &str) -> Result<CollectionSpace, IndexError> {
        let collections = self.collections.read().map_err(poisoned)?;
        collections
            .get(name)
            .map(|c| c.space.clone())
            .ok_or_else(|| not_found(name))
    }

    async fn add(
        &self,
        collection: &str,
        entries: &[IndexedEntry],
        vectors: &[Vec<f32>],
    ) -> Result<(), IndexError> {
        check_parallel(entries, vectors)?;
        let mut collections = self.collections.write().map_err(poisoned)?;
        let target = collections
            .get_mut(collection)
            .ok_or_else(|| not_found(collection))?;
        check_dims(collection, &target.space, vectors)?;

        let incoming: HashSet<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        target
            .entries
            .retain(|s| !incoming.contains(s.entry.id.as_str()));

        // Later duplicates within one batch win.
        let mut seen = HashSet::new();
        let batch: Vec<StoredEntry> = entries
            .iter()
            .zip(vectors.iter())
            .rev()
            .filter(|(entry, _)| seen.insert(entry.id.as_str()))
            .map(|(entry, vector)| StoredEntry {
                entry: entry.clone(),
                vector: vector.clone(),
            })
            .collect();
        target.entries.extend(batch.into_iter().rev());
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<usize, IndexError> {
        let collections = self.collections.read().map_err(poisoned)?;
        collections
            .get(collection)
            .map(|c| c.entries.len())
            .ok_or_else(|| not_found(collection))
    }

    async fn query(
        &self,
        collection: &str,
        query_vectors: &[Vec<f32>],
        n_results: usize,
    ) -> Result<QueryResult, IndexError> {
        let collections = self.collections.read().map_err(poisoned)?;
        let target = collections
            .get(collection)
            .ok_or_else(|| not_found(collection))?;
        check_dims(collection, &target.space, query_vectors)?;

        let mut result = QueryResult::default();
        for qv in query_vectors {
            let mut scored: Vec<(f32, &StoredEntry)> = target
                .entries
                .iter()
                .map(|s| (cosine_distance(qv, &s.vector), s))
                .collect();
            scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
            scored.truncate(n_results);

            result.ids.push(scored.iter().map(|(_, s)| s.entry.id.clone()).collect());
            result
                .documents
                .push(scored.iter().map(|(_, s)| s.entry.text.clone()).collect());
            result.metadatas.push(
                scored
                    .iter()
                    .map(|(_, s)| s.entry.metadata.clone())
                    .collect(),
            );
            result.distances.push(scored.iter().map(|(d, _)| *d).collect());
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryMetadata;

    fn entry(source: &str, i: usize, text: &str) -> IndexedEntry {
        IndexedEntry {
            id: IndexedEntry::make_id(source, i),
            text: text.to_string(),
            metadata: EntryMetadata {
                source: source.to_string(),
                title: "T".to_string(),
                chunk_index: i,
            },
        }
    }

    #[tokio::test]
    async fn test_delete_missing_collection_is_not_found() {
        let index = InMemoryIndex::new();
        let err = index.delete_collection("nope").await.unwrap_err();
        assert!(matches!(err, IndexError::CollectionNotFound(name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_query_missing_collection_is_not_found() {
        let index = InMemoryIndex::new();
        let err = index.query("nope", &[vec![1.0]], 3).await.unwrap_err();
        assert!(matches!(err, IndexError::CollectionNotFound(_)));
    }

    fn space(dims: usize) -> CollectionSpace {
        CollectionSpace::new("test-model", dims)
    }

    #[tokio::test]
    async fn test_query_orders_by_distance_per_slot() {
        let index = InMemoryIndex::new();
        index.create_collection("docs", &space(2)).await.unwrap();
        index
            .add(
                "docs",
                &[
                    entry("a.md", 0, "east"),
                    entry("a.md", 1, "north"),
                    entry("b.md", 0, "mostly east"),
                ],
                &[vec![1.0, 0.0], vec![0.0, 1.0], vec![0.9, 0.1]],
            )
            .await
            .unwrap();
        assert_eq!(index.count("docs").await.unwrap(), 3);

        let res = index
            .query("docs", &[vec![1.0, 0.0], vec![0.0, 1.0]], 2)
            .await
            .unwrap();
        assert_eq!(res.len(), 2);
        assert_eq!(res.ids[0], vec!["a.md_0", "b.md_0"]);
        assert_eq!(res.ids[1][0], "a.md_1");
        assert!(res.distances[0][0] <= res.distances[0][1]);
    }

    #[tokio::test]
    async fn test_add_replaces_existing_id() {
        let index = InMemoryIndex::new();
        index.create_collection("docs", &space(1)).await.unwrap();
        index
            .add("docs", &[entry("a.md", 0, "old")], &[vec![1.0]])
            .await
            .unwrap();
        index
            .add("docs", &[entry("a.md", 0, "new")], &[vec![1.0]])
            .await
            .unwrap();
        assert_eq!(index.count("docs").await.unwrap(), 1);
        let res = index.query("docs", &[vec![1.0]], 5).await.unwrap();
        assert_eq!(res.documents[0], vec!["new"]);
    }

    #[tokio::test]
    async fn test_bulk_add_keeps_last_duplicate_and_other_entries() {
        let index = InMemoryIndex::new();
        index.create_collection("docs", &space(1)).await.unwrap();
        index
            .add(
                "docs",
                &[entry("a.md", 0, "kept"), entry("b.md", 0, "old")],
                &[vec![1.0], vec![1.0]],
            )
            .await
            .unwrap();

        let batch: Vec<IndexedEntry> = (0..500)
            .map(|i| entry("c.md", i, "bulk"))
            .chain([entry("b.md", 0, "first"), entry("b.md", 0, "second")])
            .collect();
        let vectors = vec![vec![1.0]; batch.len()];
        index.add("docs", &batch, &vectors).await.unwrap();

        assert_eq!(index.count("docs").await.unwrap(), 502);
        let res = index.query("docs", &[vec![1.0]], 600).await.unwrap();
        let texts_for = |id: &str| -> Vec<String> {
            res.ids[0]
                .iter()
                .zip(&res.documents[0])
                .filter(|(i, _)| i.as_str() == id)
                .map(|(_, t)| t.clone())
                .collect()
        };
        assert_eq!(texts_for("a.md_0"), vec!["kept"]);
        assert_eq!(texts_for("b.md_0"), vec!["second"]);
    }

    #[tokio::test]
    async fn test_add_rejects_mismatched_vectors() {
        let index = InMemoryIndex::new();
        index.create_collection("docs", &space(1)).await.unwrap();
        let err = index
            .add("docs", &[entry("a.md", 0, "x")], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::Backend(_)));
    }

    #[tokio::test]
    async fn test_recreate_keeps_original_space() {
        let index = InMemoryIndex::new();
        index.create_collection("docs", &space(2)).await.unwrap();
        index.create_collection("docs", &space(3)).await.unwrap();
        assert_eq!(index.collection_space("docs").await.unwrap(), space(2));
        assert!(matches!(
            index.collection_space("nope").await,
            Err(IndexError::CollectionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_wrong_length_vectors_are_rejected() {
        let index = InMemoryIndex::new();
        index.create_collection("docs", &space(2)).await.unwrap();
        index
            .add(
                "docs",
                &[entry("far.md", 0, "far"), entry("near.md", 0, "near")],
                &[vec![0.0, 1.0], vec![1.0, 0.0]],
            )
            .await
            .unwrap();

        let err = index
            .query("docs", &[vec![1.0, 0.0, 0.0]], 2)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch { expected: 2, got: 3, .. }
        ));

        let err = index
            .add("docs", &[entry("new.md", 0, "x")], &[vec![1.0, 0.0, 0.0]])
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
        assert_eq!(index.count("docs").await.unwrap(), 2);
    }
}
