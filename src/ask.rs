//! Query-side commands: `kbrag ask`, `kbrag search`, and `kbrag documents`.

use anyhow::Result;

use crate::config::Config;
use crate::context::{build_context, open_handle};
use crate::loader::load_documents;
use knowledge_rag_core::retrieve::retrieve;

/// Answer a question and print the answer with its sources.
pub async fn run_ask(config: &Config, query: &str, k: Option<usize>, json: bool) -> Result<()> {
    let mut ctx = build_context(config).await?;
    if let Some(k) = k {
        ctx.top_k = k;
    }

    let answer = ctx.ask(query).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    println!("{}", answer.answer.trim());
    println!();
    if answer.sources.is_empty() {
        println!("Sources: (none)");
    } else {
        println!("Sources:");
        for source in &answer.sources {
            println!("  - {}", source);
        }
    }
    Ok(())
}

/// Print the top-`k` chunks for a query without generating an answer.
pub async fn run_search(config: &Config, query: &str, k: Option<usize>) -> Result<()> {
    let handle = open_handle(config).await?;
    let k = k.unwrap_or(config.retrieval.top_k);

    let query = knowledge_rag_core::context::validate_query(query)?;
    let chunks = retrieve(query, &handle, k).await?;

    if chunks.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, chunk) in chunks.iter().enumerate() {
        println!(
            "{}. [{:.4}] {} #{} - {}",
            i + 1,
            chunk.distance,
            chunk.source,
            chunk.chunk_index,
            chunk.title
        );
        let snippet: String = chunk.text.chars().take(240).collect();
        println!("    {}", snippet.replace('\n', " "));
        println!();
    }
    Ok(())
}

/// List the documents ingestion would pick up.
pub fn run_documents(config: &Config) -> Result<()> {
    let documents = load_documents(&config.data)?;
    if documents.is_empty() {
        println!("No documents found in {}", config.data.dir.display());
        return Ok(());
    }

    println!("{:<40} {:>8}  TITLE", "FILE", "CHARS");
    for doc in &documents {
        println!(
            "{:<40} {:>8}  {}",
            doc.filename,
            doc.content.chars().count(),
            doc.title
        );
    }
    Ok(())
}
