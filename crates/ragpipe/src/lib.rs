//! # ragpipe
//!
//! A retrieval-augmented generation pipeline: ingest documents into
//! vector-embedded chunks, search them, and answer questions with a
//! grounded, cited answer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌───────────┐
//! │ Files        │──▶│ Ingestion        │──▶│  SQLite    │
//! │ PDF/text/md  │   │ chunk + embed    │   │ chunks+vec │
//! └──────────────┘   └──────────────────┘   └─────┬─────┘
//!                                                 │
//!                        ┌────────────────────────┤
//!                        ▼                        ▼
//!                  ┌──────────┐            ┌────────────┐
//!                  │   CLI    │            │ HTTP (JSON) │
//!                  │  (rgp)   │            │  /ask etc.  │
//!                  └──────────┘            └────────────┘
//! ```
//!
//! The orchestration logic (chunker, pipeline, RAG engine, store and
//! backend traits) lives in `ragpipe-core`; this crate supplies the
//! concrete pieces: TOML configuration, the SQLite store, OpenAI and
//! Ollama clients, PDF/plain-text extraction, the CLI, and the HTTP
//! API.
//!
//! ## Quick start
//!
//! ```bash
//! rgp init                          # create the database
//! rgp ingest docs/handbook.pdf      # chunk + embed + index
//! rgp search "deployment steps"     # vector search
//! rgp ask "how do we deploy?"       # grounded answer with citations
//! rgp serve                         # start the HTTP API
//! ```

pub mod backend;
pub mod commands;
pub mod config;
pub mod db;
pub mod extract;
pub mod migrate;
pub mod server;
pub mod sqlite_store;
