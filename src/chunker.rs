//! Splits file text into [`CodeChunk`]s.
//!
//! Two strategies:
//!
//! - **Structural** (Go only): regex passes over the text find function and
//!   method declarations; each match opens a chunk that runs to the start of
//!   the next match (or end of file). Line numbers come from precomputed
//!   line start offsets.
//! - **Size-based fallback** (every other language, or a Go file where the
//!   regex pass finds nothing): accumulate lines until the chunk reaches
//!   `max_chunk_size` bytes, then start the next chunk with the last
//!   `chunk_overlap` lines repeated.
//!
//! After chunking, every chunk gets a deterministic MD5 `id` derived from
//! `(file_path, start_line, end_line)` and an MD5 `hash` of its content for
//! change detection. Output is byte-identical across runs for the same
//! input and configuration.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::CodeChunk;

static GO_FUNC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"func\s+(\w+)\s*\((.*?)\)(?:\s+\w+)?\s*\{").expect("function pattern compiles")
});

static GO_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"func\s+\(\w+\s+\*?\w+\)\s+(\w+)\s*\((.*?)\)(?:\s+\w+)?\s*\{")
        .expect("method pattern compiles")
});

/// Split a file into chunks and assign identity.
///
/// Go files are split structurally; anything else (or a Go file with no
/// recognizable declarations) falls back to size-based windows.
pub fn chunk_file(
    content: &str,
    file_path: &str,
    project_path: &str,
    language: &str,
    max_chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<CodeChunk> {
    let mut chunks = if language == "Go" {
        chunk_go_code(content, file_path, project_path)
    } else {
        Vec::new()
    };

    if chunks.is_empty() {
        chunks = chunk_by_size(
            content,
            file_path,
            project_path,
            language,
            max_chunk_size,
            chunk_overlap,
        );
    }

    for chunk in &mut chunks {
        let id_source = format!("{}:{}:{}", chunk.file_path, chunk.start_line, chunk.end_line);
        chunk.id = format!("{:x}", md5::compute(id_source.as_bytes()));
        chunk.hash = format!("{:x}", md5::compute(chunk.content.as_bytes()));
    }

    chunks
}

struct GoMatch {
    start: usize,
    name: String,
    signature: String,
    entity_type: &'static str,
}

/// Split Go source by function and method declarations.
///
/// Each match opens a chunk running from the match start to the start of the
/// next match, or to end of file for the last one. Text before the first
/// declaration (package clause, imports) is not chunked.
fn chunk_go_code(content: &str, file_path: &str, project_path: &str) -> Vec<CodeChunk> {
    let mut matches = Vec::new();

    for caps in GO_FUNC.captures_iter(content) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        matches.push(GoMatch {
            start: whole.start(),
            name: caps.get(1).map_or("", |m| m.as_str()).to_string(),
            signature: caps.get(2).map_or("", |m| m.as_str()).to_string(),
            entity_type: "function",
        });
    }

    for caps in GO_METHOD.captures_iter(content) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        matches.push(GoMatch {
            start: whole.start(),
            name: caps.get(1).map_or("", |m| m.as_str()).to_string(),
            signature: caps.get(2).map_or("", |m| m.as_str()).to_string(),
            entity_type: "method",
        });
    }

    matches.sort_by_key(|m| m.start);

    let line_starts = line_start_offsets(content);

    let mut chunks = Vec::with_capacity(matches.len());
    for (i, m) in matches.iter().enumerate() {
        let start_pos = m.start;
        let end_pos = matches
            .get(i + 1)
            .map_or(content.len(), |next| next.start);

        chunks.push(CodeChunk {
            id: String::new(),
            content: content[start_pos..end_pos].to_string(),
            file_path: file_path.to_string(),
            project_path: project_path.to_string(),
            language: "Go".to_string(),
            start_line: line_of_offset(&line_starts, start_pos),
            end_line: line_of_offset(&line_starts, end_pos),
            entity_type: m.entity_type.to_string(),
            name: m.name.clone(),
            signature: m.signature.clone(),
            hash: String::new(),
            embedding: Vec::new(),
            score: 0.0,
        });
    }

    chunks
}

/// Split content into chunks of roughly `max_chunk_size` bytes with
/// `chunk_overlap` lines repeated at each boundary.
fn chunk_by_size(
    content: &str,
    file_path: &str,
    project_path: &str,
    language: &str,
    max_chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<CodeChunk> {
    let lines: Vec<&str> = content.split('\n').collect();

    let make = |chunk_content: String, start_line: i64, end_line: i64| CodeChunk {
        id: String::new(),
        name: format!("chunk_{}_{}", start_line, end_line),
        content: chunk_content,
        file_path: file_path.to_string(),
        project_path: project_path.to_string(),
        language: language.to_string(),
        start_line,
        end_line,
        entity_type: "chunk".to_string(),
        signature: String::new(),
        hash: String::new(),
        embedding: Vec::new(),
        score: 0.0,
    };

    // Whole file fits in a single chunk
    if content.len() <= max_chunk_size {
        return vec![make(content.to_string(), 1, lines.len() as i64)];
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_size = 0usize;
    let mut start_line = 1i64;

    for (i, line) in lines.iter().enumerate() {
        current.push(line);
        current_size += line.len() + 1;

        if current_size >= max_chunk_size || i == lines.len() - 1 {
            let end_line = start_line + current.len() as i64 - 1;
            chunks.push(make(current.join("\n"), start_line, end_line));

            let overlap = chunk_overlap.min(current.len());
            current = current[current.len() - overlap..].to_vec();
            start_line = end_line - overlap as i64 + 1;
            current_size = current.iter().map(|l| l.len() + 1).sum();
        }
    }

    chunks
}

/// Byte offset of each line start, plus one trailing sentinel past the end.
fn line_start_offsets(content: &str) -> Vec<usize> {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut offsets = Vec::with_capacity(lines.len() + 1);
    let mut pos = 0usize;
    for line in &lines {
        offsets.push(pos);
        pos += line.len() + 1;
    }
    offsets.push(pos);
    offsets
}

/// 1-based line number containing the given byte offset.
fn line_of_offset(line_starts: &[usize], offset: usize) -> i64 {
    // partition_point is the first line whose start lies past the offset;
    // the offset's own line is the one before it (0-based), so the 1-based
    // number is the partition point itself.
    line_starts.partition_point(|&start| start <= offset).max(1) as i64
}
