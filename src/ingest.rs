//! Ingestion pipeline: walk → read → chunk → embed → store.
//!
//! Files are processed sequentially. Each file is read, chunked, embedded in
//! one batched request, and written in one store transaction. Per-file
//! failures (read errors, embedding errors, store errors) are logged to
//! stderr and the run continues with the next file; only startup failures
//! (database unreachable) abort the run.
//!
//! The project a file belongs to is its first directory below the indexing
//! root, or the root itself for files directly under it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::chunker::chunk_file;
use crate::config::Config;
use crate::embedding::EmbeddingClient;
use crate::language;
use crate::models::StoreReport;
use crate::store::store_chunks;
use crate::walker;

/// Outcome of an indexing run, printed as the final summary.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub files_found: u64,
    pub files_indexed: u64,
    pub files_skipped: u64,
    pub files_failed: u64,
    pub chunks_written: u64,
    pub chunks_unchanged: u64,
}

/// Index a directory of code.
pub async fn run_index(config: &Config, pool: &SqlitePool, code_dir: &Path) -> Result<()> {
    let root = std::fs::canonicalize(code_dir)
        .with_context(|| format!("cannot resolve code directory: {}", code_dir.display()))?;

    println!("Indexing directory: {}", root.display());

    let files = walker::walk(&root, config.walker.max_file_size);
    println!("Found {} files to index", files.len());

    let embedder = EmbeddingClient::new(
        &config.embedding.url,
        config.embedding.dims,
        config.embedding.timeout_secs,
    )?;

    let mut report = IngestReport {
        files_found: files.len() as u64,
        ..IngestReport::default()
    };

    for (i, file) in files.iter().enumerate() {
        if i > 0 && i % 100 == 0 {
            println!("Processed {}/{} files", i, files.len());
        }

        match process_file(config, pool, &embedder, file, &root).await {
            Ok(Some(store_report)) => {
                report.files_indexed += 1;
                report.chunks_written += store_report.written;
                report.chunks_unchanged += store_report.unchanged;
            }
            Ok(None) => {
                report.files_skipped += 1;
            }
            Err(e) => {
                eprintln!("Error processing file {}: {:#}", file.display(), e);
                report.files_failed += 1;
            }
        }
    }

    println!("Indexing complete");
    println!("  files found: {}", report.files_found);
    println!("  files indexed: {}", report.files_indexed);
    println!("  files skipped: {}", report.files_skipped);
    println!("  files failed: {}", report.files_failed);
    println!("  chunks written: {}", report.chunks_written);
    println!("  chunks unchanged: {}", report.chunks_unchanged);

    Ok(())
}

/// Process one file. `Ok(None)` means the file was skipped (too large, or
/// nothing to chunk).
async fn process_file(
    config: &Config,
    pool: &SqlitePool,
    embedder: &EmbeddingClient,
    file: &Path,
    root: &Path,
) -> Result<Option<StoreReport>> {
    let bytes = std::fs::read(file).context("failed to read file")?;
    if bytes.len() as u64 > config.walker.max_file_size {
        return Ok(None);
    }
    let content = String::from_utf8_lossy(&bytes).into_owned();

    let ext = file
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    let language = language::from_ext(&ext);

    let file_path = file.to_string_lossy().to_string();
    let project_path = project_path_for(file, root).to_string_lossy().to_string();

    let mut chunks = chunk_file(
        &content,
        &file_path,
        &project_path,
        language,
        config.chunking.max_chunk_size,
        config.chunking.chunk_overlap,
    );
    if chunks.is_empty() {
        return Ok(None);
    }

    // One batched request per file
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let vectors = embedder
        .embed(&texts)
        .await
        .context("failed to generate embeddings")?;
    for (chunk, vector) in chunks.iter_mut().zip(vectors) {
        chunk.embedding = vector;
    }

    let report = store_chunks(pool, &chunks, &file_path, &project_path, language)
        .await
        .context("failed to store chunks")?;

    Ok(Some(report))
}

/// The project directory a file belongs to: the first path component below
/// the root, or the root itself for top-level files.
fn project_path_for(file: &Path, root: &Path) -> PathBuf {
    let relative = match file.strip_prefix(root) {
        Ok(r) => r,
        Err(_) => return root.to_path_buf(),
    };

    let mut components = relative.components();
    let first = components.next();
    match (first, components.next()) {
        (Some(first), Some(_)) => root.join(first),
        _ => root.to_path_buf(),
    }
}
