//! # knowledge-rag CLI (`kbrag`)
//!
//! ## Usage
//!
//! ```bash
//! kbrag --config ./config/kbrag.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kbrag ingest` | Rebuild the index from the document directory |
//! | `kbrag ask "<question>"` | Answer a question with cited sources |
//! | `kbrag search "<query>"` | Show the top-K retrieved chunks |
//! | `kbrag documents` | List documents that ingestion would index |
//! | `kbrag serve` | Start the HTTP query server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use knowledge_rag::{ask, config, ingest, logging, server};

/// knowledge-rag: question answering over a Markdown knowledge base.
#[derive(Parser)]
#[command(
    name = "kbrag",
    about = "Retrieval-augmented question answering over a Markdown knowledge base",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/kbrag.toml")]
    config: PathBuf,

    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the index collection from the document directory.
    ///
    /// Drops the existing collection, then chunks, embeds, and stores
    /// every matching document.
    Ingest {
        /// Show document and chunk counts without embedding or writing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Answer a question from the indexed documents.
    Ask {
        /// The question.
        query: String,

        /// Number of chunks to retrieve (defaults to `retrieval.top_k`).
        #[arg(long)]
        k: Option<usize>,

        /// Print the answer as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Retrieve the most similar chunks without generating an answer.
    Search {
        query: String,

        #[arg(long)]
        k: Option<usize>,
    },

    /// List the documents ingestion would index, with their titles.
    Documents,

    /// Start the HTTP query server.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest { dry_run } => {
            ingest::run_ingest(&cfg, dry_run).await?;
        }
        Commands::Ask { query, k, json } => {
            ask::run_ask(&cfg, &query, k, json).await?;
        }
        Commands::Search { query, k } => {
            ask::run_search(&cfg, &query, k).await?;
        }
        Commands::Documents => {
            ask::run_documents(&cfg)?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
