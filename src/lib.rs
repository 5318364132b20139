//! # coderag
//!
//! **Retrieval-augmented code search over a local source tree.**
//!
//! coderag walks a directory of source files, splits each file into
//! semantically meaningful chunks (function/method-level for Go, size-based
//! windows elsewhere), embeds every chunk through an external embedding
//! service, and stores chunks with their project/file relationships in
//! SQLite. Queries combine cosine similarity with entity-type and size
//! boosts plus optional language, path-glob, and keyword filters; top
//! matches can be fed to an external completion service for a prose answer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────┐   ┌─────────┐   ┌───────────┐   ┌──────────┐
//! │ Walker  │──▶│ Chunker │──▶│ Embedding │──▶│  SQLite  │
//! │         │   │ Go/size │   │  service  │   │  store   │
//! └─────────┘   └─────────┘   └───────────┘   └────┬─────┘
//!                                                  │
//!                     ┌────────────┬───────────────┤
//!                     ▼            ▼               ▼
//!               ┌──────────┐ ┌──────────┐   ┌────────────┐
//!               │ Analyzer │ │ Retriever│   │ LLM client │
//!               │ filters  │ │ ranking  │   │  answers   │
//!               └──────────┘ └──────────┘   └────────────┘
//! ```
//!
//! ## Data Flow
//!
//! 1. The **walker** ([`walker`]) discovers indexable files with extension,
//!    directory, pattern, and size filtering.
//! 2. The **chunker** ([`chunker`]) splits each file and assigns every chunk
//!    a deterministic MD5 `id` (position) and `hash` (content).
//! 3. The **embedding client** ([`embedding`]) batches a file's chunks into
//!    one request against the embedding service.
//! 4. The **store writer** ([`store`]) upserts project, file, and chunk rows
//!    in one transaction per file, skipping chunks whose hash is unchanged.
//! 5. The **analyzer** ([`analyzer`]) pulls language, path, and keyword
//!    filters out of a free-form question.
//! 6. The **retriever** ([`search`]) ranks candidates by cosine similarity
//!    plus structural boosts under a strict minimum-score threshold.
//! 7. The **LLM client** ([`llm`]) grounds the question in the top matches
//!    and returns the completion service's answer.
//!
//! ## Quick Start
//!
//! ```bash
//! coderag init                                  # create the database
//! coderag index --code-dir ./my-project         # ingest a source tree
//! coderag query --query-string "how is auth handled?"
//! coderag query                                 # interactive loop
//! ```

pub mod analyzer;
pub mod chunker;
pub mod config;
pub mod db;
pub mod embedding;
pub mod ingest;
pub mod language;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod query_cmd;
pub mod search;
pub mod store;
pub mod walker;
