//! Core data types for the indexing and retrieval pipeline.
//!
//! The data lifecycle is:
//!
//! ```text
//! walk() → chunk_file() → CodeChunk → embed() → store_chunks()
//!                                                    ↓
//!                                     search_code() → CodeChunk (with score)
//! ```
//!
//! A [`CodeChunk`] is the unit of indexing, retrieval, and ranking: a
//! contiguous line range of one source file, carrying a deterministic
//! identity (`id`) and a content hash (`hash`) for change detection.

/// A chunk of source code with metadata, stored in the `chunks` table.
///
/// # Identity
///
/// - `id` is MD5 of `"<file_path>:<start_line>:<end_line>"`, lower-hex.
///   Stable across re-ingest runs as long as the chunk keeps its position.
/// - `hash` is MD5 of `content`, lower-hex. Used by the store writer to skip
///   unchanged chunks on re-ingest.
///
/// # Entity types
///
/// `entity_type` is one of `"function"`, `"method"`, `"class"`, or
/// `"chunk"`. The Go structural chunker emits `function`/`method`; the
/// size-based fallback emits `chunk` with a synthetic `name` of the form
/// `chunk_<start>_<end>`.
#[derive(Debug, Clone)]
pub struct CodeChunk {
    /// MD5 of `file_path:start_line:end_line`, lower-hex.
    pub id: String,
    /// Chunk text content.
    pub content: String,
    /// Absolute path of the source file.
    pub file_path: String,
    /// Absolute path of the owning project directory.
    pub project_path: String,
    /// Language label (e.g. `"Go"`, `"Python"`, `"Unknown"`).
    pub language: String,
    /// 1-based first line of the chunk (inclusive).
    pub start_line: i64,
    /// 1-based last line of the chunk (inclusive).
    pub end_line: i64,
    /// `"function"`, `"method"`, `"class"`, or `"chunk"`.
    pub entity_type: String,
    /// Function/method name, or a synthetic `chunk_<start>_<end>` name.
    pub name: String,
    /// Parameter list (without parentheses) for functions/methods, else empty.
    pub signature: String,
    /// MD5 of `content`, lower-hex.
    pub hash: String,
    /// Embedding vector. Empty until the embedding client fills it in.
    pub embedding: Vec<f32>,
    /// Similarity score set by the retriever. Transient, never stored.
    pub score: f64,
}

impl CodeChunk {
    /// True if this chunk gets the function/method ranking boost.
    pub fn is_callable(&self) -> bool {
        self.entity_type == "function" || self.entity_type == "method"
    }
}

/// Per-file outcome of a store write, surfaced in the ingest summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreReport {
    /// Chunks inserted or rewritten in this transaction.
    pub written: u64,
    /// Chunks skipped because the stored hash matched.
    pub unchanged: u64,
}
