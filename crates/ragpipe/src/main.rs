//! # ragpipe CLI (`rgp`)
//!
//! The `rgp` binary drives the pipeline end to end: database
//! initialization, document ingestion, search, question answering, and
//! the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! rgp --config ./config/ragpipe.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rgp init` | Create the SQLite database and schema |
//! | `rgp ingest <file>` | Ingest a PDF/text/Markdown file |
//! | `rgp list` | List ingested documents |
//! | `rgp get <id>` | Show one document with its chunks |
//! | `rgp delete <id>` | Delete a document and its chunks |
//! | `rgp search "<query>"` | Vector search over indexed chunks |
//! | `rgp ask "<question>"` | Answer a question with citations |
//! | `rgp serve` | Start the JSON HTTP API |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ragpipe::{commands, config, server};

/// ragpipe: ingest documents, search them, and answer questions with
/// citations.
///
/// All commands accept a `--config` flag pointing to a TOML
/// configuration file. See `config/ragpipe.example.toml`.
#[derive(Parser)]
#[command(
    name = "rgp",
    about = "ragpipe: a retrieval-augmented generation pipeline over local documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ragpipe.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the documents/chunks
    /// tables. Idempotent: running it multiple times is safe.
    Init,

    /// Ingest a document.
    ///
    /// Extracts page text, chunks it, embeds the chunks (when a
    /// backend is configured), and indexes everything in SQLite.
    Ingest {
        /// Path to a PDF, plain-text, or Markdown file.
        file: PathBuf,
    },

    /// List ingested documents with chunk counts and status.
    List,

    /// Show one document and its chunks.
    Get {
        /// Document id (as printed by `ingest` and `list`).
        id: String,
    },

    /// Delete a document and all of its chunks.
    ///
    /// Idempotent: deleting an id that is already gone succeeds.
    Delete {
        /// Document id.
        id: String,
    },

    /// Vector search over indexed chunks.
    ///
    /// Requires an embedding backend; results are ordered by
    /// descending similarity.
    Search {
        /// The search query.
        query: String,

        /// Maximum number of results (defaults to retrieval.top_k).
        #[arg(long)]
        top_k: Option<usize>,

        /// Minimum similarity score (defaults to retrieval.min_score).
        #[arg(long)]
        min_score: Option<f32>,
    },

    /// Answer a question from the indexed documents, with citations.
    ///
    /// Requires an embedding/generation backend. When nothing relevant
    /// is indexed, prints a fixed fallback answer instead of failing.
    Ask {
        /// The question to answer.
        question: String,

        /// Number of chunks to retrieve (defaults to retrieval.top_k).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Start the JSON HTTP API.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            commands::run_init(&cfg).await?;
        }
        Commands::Ingest { file } => {
            commands::run_ingest(&cfg, &file).await?;
        }
        Commands::List => {
            commands::run_list(&cfg).await?;
        }
        Commands::Get { id } => {
            commands::run_get(&cfg, &id).await?;
        }
        Commands::Delete { id } => {
            commands::run_delete(&cfg, &id).await?;
        }
        Commands::Search {
            query,
            top_k,
            min_score,
        } => {
            commands::run_search(&cfg, &query, top_k, min_score).await?;
        }
        Commands::Ask { question, top_k } => {
            commands::run_ask(&cfg, &question, top_k).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
