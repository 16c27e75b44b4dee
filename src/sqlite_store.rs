//! SQLite-backed [`VectorIndex`] implementation.
//!
//! Collections are rows in `collections` that record the embedding model and
//! dimensions they were built with; entries carry their vector as a
//! little-endian f32 BLOB. Queries load every vector of the collection and
//! rank by cosine distance in Rust, which is fine for knowledge bases of a
//! few thousand chunks.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use knowledge_rag_core::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use knowledge_rag_core::store::{check_dims, check_parallel, QueryResult, VectorIndex};
use knowledge_rag_core::{CollectionSpace, EntryMetadata, IndexError, IndexedEntry};

use crate::{db, migrate};

/// SQLite implementation of the [`VectorIndex`] trait.
pub struct SqliteIndex {
    pool: SqlitePool,
}

impl SqliteIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database at `path`, creating the file and schema if needed.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::connect_path(path).await?;
        migrate::apply_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn backend(err: sqlx::Error) -> IndexError {
    IndexError::Backend(err.into())
}

struct Scored {
    id: String,
    text: String,
    metadata: EntryMetadata,
    distance: f32,
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn collection_exists(&self, name: &str) -> Result<bool, IndexError> {
        let exists: bool =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM collections WHERE name = ?")
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .map_err(backend)?;
        Ok(exists)
    }

    async fn delete_collection(&self, name: &str) -> Result<(), IndexError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query("DELETE FROM entries WHERE collection = ?")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        let deleted = sqlx::query("DELETE FROM collections WHERE name = ?")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(backend)?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await.map_err(backend)?;
            return Err(IndexError::CollectionNotFound(name.to_string()));
        }

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn create_collection(
        &self,
        name: &str,
        space: &CollectionSpace,
    ) -> Result<(), IndexError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO collections (name, model, dims, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(&space.model)
        .bind(space.dims as i64)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn collection_space(&self, name: &str) -> Result<CollectionSpace, IndexError> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT model, dims FROM collections WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        let (model, dims) =
            row.ok_or_else(|| IndexError::CollectionNotFound(name.to_string()))?;
        Ok(CollectionSpace::new(model, dims as usize))
    }

    async fn add(
        &self,
        collection: &str,
        entries: &[IndexedEntry],
        vectors: &[Vec<f32>],
    ) -> Result<(), IndexError> {
        check_parallel(entries, vectors)?;
        let space = self.collection_space(collection).await?;
        check_dims(collection, &space, vectors)?;

        let mut tx = self.pool.begin().await.map_err(backend)?;

        for (entry, vector) in entries.iter().zip(vectors.iter()) {
            let blob = vec_to_blob(vector);
            sqlx::query(
                r#"
                INSERT INTO entries (collection, id, text, source, title, chunk_index, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    text = excluded.text,
                    source = excluded.source,
                    title = excluded.title,
                    chunk_index = excluded.chunk_index,
                    embedding = excluded.embedding
                "#,
            )
            .bind(collection)
            .bind(&entry.id)
            .bind(&entry.text)
            .bind(&entry.metadata.source)
            .bind(&entry.metadata.title)
            .bind(entry.metadata.chunk_index as i64)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)?;
        debug!(collection, entries = entries.len(), "stored entries");
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<usize, IndexError> {
        if !self.collection_exists(collection).await? {
            return Err(IndexError::CollectionNotFound(collection.to_string()));
        }
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        Ok(n as usize)
    }

    async fn query(
        &self,
        collection: &str,
        query_vectors: &[Vec<f32>],
        n_results: usize,
    ) -> Result<QueryResult, IndexError> {
        let space = self.collection_space(collection).await?;
        check_dims(collection, &space, query_vectors)?;

        // Fetch all vectors once and score each query against them in Rust
        let rows = sqlx::query(
            r#"
            SELECT id, text, source, title, chunk_index, embedding
            FROM entries
            WHERE collection = ?
            "#,
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let stored: Vec<(IndexedEntry, Vec<f32>)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let chunk_index: i64 = row.get("chunk_index");
                let entry = IndexedEntry {
                    id: row.get("id"),
                    text: row.get("text"),
                    metadata: EntryMetadata {
                        source: row.get("source"),
                        title: row.get("title"),
                        chunk_index: chunk_index as usize,
                    },
                };
                (entry, blob_to_vec(&blob))
            })
            .collect();

        let mut result = QueryResult::default();
        for query_vec in query_vectors {
            let mut scored: Vec<Scored> = stored
                .iter()
                .map(|(entry, vec)| Scored {
                    id: entry.id.clone(),
                    text: entry.text.clone(),
                    metadata: entry.metadata.clone(),
                    distance: cosine_distance(query_vec, vec),
                })
                .collect();

            scored.sort_by(|a, b| {
                a.distance
                    .partial_cmp(&b.distance)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            scored.truncate(n_results);

            result.ids.push(scored.iter().map(|s| s.id.clone()).collect());
            result
                .documents
                .push(scored.iter().map(|s| s.text.clone()).collect());
            result
                .distances
                .push(scored.iter().map(|s| s.distance).collect());
            result
                .metadatas
                .push(scored.into_iter().map(|s| s.metadata).collect());
        }

        Ok(result)
    }
}
