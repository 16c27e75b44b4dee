//! Schema for the SQLite vector index.
//!
//! ```text
//! collections(name PK, model, dims, created_at)
//! entries(collection, id, text, source, title, chunk_index, embedding BLOB)
//!   PRIMARY KEY (collection, id)
//! ```
//!
//! Every statement is idempotent, so the schema is applied on each open.
//! Databases created before `model`/`dims` existed get the columns added
//! with empty defaults; such collections fail every dimension check until
//! they are re-ingested.

use anyhow::Result;
use sqlx::SqlitePool;

pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS collections (
            name TEXT PRIMARY KEY,
            model TEXT NOT NULL DEFAULT '',
            dims INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    for (column, ddl) in [
        ("model", "ALTER TABLE collections ADD COLUMN model TEXT NOT NULL DEFAULT ''"),
        ("dims", "ALTER TABLE collections ADD COLUMN dims INTEGER NOT NULL DEFAULT 0"),
    ] {
        let present: bool = sqlx::query_scalar(
            "SELECT COUNT(*) > 0 FROM pragma_table_info('collections') WHERE name = ?",
        )
        .bind(column)
        .fetch_one(pool)
        .await?;
        if !present {
            sqlx::query(ddl).execute(pool).await?;
        }
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            text TEXT NOT NULL,
            source TEXT NOT NULL,
            title TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            embedding BLOB NOT NULL,
            PRIMARY KEY (collection, id),
            FOREIGN KEY (collection) REFERENCES collections(name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_source ON entries(collection, source)")
        .execute(pool)
        .await?;

    Ok(())
}
