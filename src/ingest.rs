//! `kbrag ingest`: rebuild the index collection from the document directory.

use anyhow::Result;

use knowledge_rag_core::ingest::{IngestOptions, IngestionPipeline};

use crate::config::Config;
use crate::embedding::create_provider;
use crate::loader::load_documents;
use crate::sqlite_store::SqliteIndex;

fn ingest_options(config: &Config) -> IngestOptions {
    IngestOptions {
        collection: config.index.collection.clone(),
        chunk_size: config.chunking.chunk_size,
        overlap: config.chunking.overlap,
        batch_size: config.embedding.batch_size,
    }
}

pub async fn run_ingest(config: &Config, dry_run: bool) -> Result<()> {
    let pipeline = IngestionPipeline::new(ingest_options(config))?;

    println!("Loading documents from {}...", config.data.dir.display());
    let documents = load_documents(&config.data)?;
    println!("Found {} documents", documents.len());

    let entries = pipeline.build_entries(&documents)?;

    if dry_run {
        println!("ingest (dry-run)");
        println!("  collection: {}", config.index.collection);
        println!("  documents: {}", documents.len());
        println!("  chunks: {}", entries.len());
        return Ok(());
    }

    println!(
        "Initializing embedding provider ({})...",
        config.embedding.provider
    );
    let provider = create_provider(&config.embedding)?;
    let index = SqliteIndex::open(&config.index.path).await?;

    println!(
        "Adding {} chunks to collection '{}'...",
        entries.len(),
        config.index.collection
    );
    let report = pipeline
        .ingest(&documents, provider.as_ref(), &index)
        .await?;
    index.close().await;

    println!(
        "\nDone! Processed {} documents, created {} chunks.",
        report.documents, report.entries
    );
    Ok(())
}
