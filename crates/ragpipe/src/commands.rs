//! CLI command implementations.
//!
//! Each `run_*` function owns one `rgp` subcommand: it opens the
//! store, wires the pipeline or engine, and prints a plain-text report
//! to stdout.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use ragpipe_core::chunk::TextChunker;
use ragpipe_core::ingest::IngestionPipeline;
use ragpipe_core::rag::RagEngine;
use ragpipe_core::store::DocumentStore;

use crate::backend::create_backend;
use crate::config::Config;
use crate::db;
use crate::extract::{content_type_for, FileExtractor};
use crate::migrate;
use crate::sqlite_store::SqliteStore;

pub async fn run_init(config: &Config) -> Result<()> {
    migrate::run_migrations(config).await?;
    println!("initialized {}", config.store.path.display());
    Ok(())
}

async fn open_store(config: &Config) -> Result<Arc<SqliteStore>> {
    let pool = db::connect(config).await?;
    Ok(Arc::new(SqliteStore::new(pool)))
}

fn build_chunker(config: &Config) -> Result<TextChunker> {
    TextChunker::new(config.chunking.chunk_size, config.chunking.overlap)
        .context("invalid chunking configuration")
}

pub async fn run_ingest(config: &Config, file: &Path) -> Result<()> {
    let bytes = std::fs::read(file)
        .with_context(|| format!("Failed to read input file: {}", file.display()))?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
        .unwrap_or_else(|| file.display().to_string());
    let content_type = content_type_for(&file_name);

    let store: Arc<dyn DocumentStore> = open_store(config).await?;
    let mut pipeline =
        IngestionPipeline::new(Arc::new(FileExtractor), build_chunker(config)?).with_store(store);
    if let Some(backend) = create_backend(&config.backend)? {
        pipeline = pipeline.with_embedding(backend.embedder);
    }

    match pipeline
        .process_document(&bytes, &file_name, content_type)
        .await
    {
        Ok(document) => {
            println!("ingest {}", file.display());
            println!("  document id: {}", document.id);
            println!("  content type: {}", document.content_type);
            println!("  chunks: {}", document.chunks.len());
            if !config.backend.is_enabled() {
                println!("  embeddings: skipped (backend disabled)");
            }
            println!("  status: {}", document.status);
            if document.status == ragpipe_core::models::DocumentStatus::Failed {
                bail!("document ended in status 'failed' (store rejected the save)");
            }
            println!("ok");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn run_list(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let documents = store.get_all_documents().await;

    if documents.is_empty() {
        println!("No documents.");
        return Ok(());
    }

    println!("documents: {}", documents.len());
    for doc in &documents {
        println!(
            "  {}  {:>4} chunks  {}  {}",
            doc.id,
            doc.chunks.len(),
            doc.status,
            doc.file_name
        );
    }
    Ok(())
}

pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let store = open_store(config).await?;
    let Some(document) = store.get_document(id).await else {
        println!("Document not found: {id}");
        return Ok(());
    };

    println!("document {}", document.id);
    println!("  file: {}", document.file_name);
    println!("  content type: {}", document.content_type);
    println!("  status: {}", document.status);
    println!("  chunks: {}", document.chunks.len());
    for chunk in &document.chunks {
        let embedded = if chunk.embedding.is_some() { "*" } else { " " };
        println!(
            "  [page {} #{}]{} {}",
            chunk.page_number,
            chunk.chunk_index,
            embedded,
            snippet(&chunk.text, 72)
        );
    }
    Ok(())
}

pub async fn run_delete(config: &Config, id: &str) -> Result<()> {
    let store = open_store(config).await?;
    if store.delete_document(id).await {
        println!("deleted {id}");
        Ok(())
    } else {
        bail!("delete failed for document {id}");
    }
}

pub async fn run_search(
    config: &Config,
    query: &str,
    top_k: Option<usize>,
    min_score: Option<f32>,
) -> Result<()> {
    let store: Arc<dyn DocumentStore> = open_store(config).await?;
    let mut engine = RagEngine::new(store);
    if let Some(backend) = create_backend(&config.backend)? {
        engine = engine.with_backend(backend);
    }

    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let min_score = min_score.unwrap_or(config.retrieval.min_score);
    let results = engine.search(query, top_k, min_score).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{:.3}] doc {} page {} #{}",
            i + 1,
            result.score,
            result.chunk.document_id,
            result.chunk.page_number,
            result.chunk.chunk_index
        );
        println!("   {}", snippet(&result.chunk.text, 100));
    }
    Ok(())
}

pub async fn run_ask(config: &Config, question: &str, top_k: Option<usize>) -> Result<()> {
    let store: Arc<dyn DocumentStore> = open_store(config).await?;
    let mut engine = RagEngine::new(store);
    if let Some(backend) = create_backend(&config.backend)? {
        engine = engine.with_backend(backend);
    }

    let top_k = top_k.unwrap_or(config.retrieval.top_k);
    let response = engine.generate_answer(question, top_k).await?;

    println!("{}", response.answer);
    if !response.sources.is_empty() {
        println!();
        println!("Sources:");
        for (i, source) in response.sources.iter().enumerate() {
            println!(
                "  [{}] doc {} page {} (score {:.2})",
                i + 1,
                source.document_id,
                source.page_number,
                source.score
            );
        }
    }
    println!();
    println!("tokens used: {}", response.tokens_used);
    Ok(())
}

fn snippet(text: &str, max_chars: usize) -> String {
    let flattened: String = text
        .chars()
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    if flattened.chars().count() <= max_chars {
        flattened
    } else {
        let cut: String = flattened.chars().take(max_chars).collect();
        format!("{cut}…")
    }
}
