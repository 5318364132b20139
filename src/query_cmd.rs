//! CLI query path: filter extraction, result display, LLM answer.
//!
//! For each query the analyzer extracts language and path filters, the
//! advanced search applies them (with keyword narrowing) to produce the
//! displayed matches, and the answer is then generated from an unfiltered
//! top-five retrieval inside [`crate::llm::answer`].
//!
//! Without `--query-string` the command runs an interactive loop reading
//! queries from stdin until `exit`.

use std::io::Write;

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::analyzer;
use crate::config::Config;
use crate::embedding::EmbeddingClient;
use crate::llm::{self, CompletionClient};
use crate::models::CodeChunk;
use crate::search::search_code;

const PREVIEW_LINES: usize = 15;

/// Run the query command: one-shot with `--query-string`, interactive
/// otherwise.
pub async fn run_query(
    config: &Config,
    pool: &SqlitePool,
    query_string: Option<String>,
) -> Result<()> {
    let embedder = EmbeddingClient::new(
        &config.embedding.url,
        config.embedding.dims,
        config.embedding.timeout_secs,
    )?;
    let llm_client = CompletionClient::new(&config.llm.url, config.llm.timeout_secs)?;

    match query_string {
        Some(query) => process_query(config, pool, &embedder, &llm_client, &query).await,
        None => {
            loop {
                print!("\nEnter your query (or 'exit' to quit): ");
                std::io::stdout().flush().ok();

                let mut line = String::new();
                if std::io::stdin()
                    .read_line(&mut line)
                    .context("failed to read query")?
                    == 0
                {
                    break;
                }

                let query = line.trim();
                if query == "exit" {
                    break;
                }
                if query.is_empty() {
                    continue;
                }

                if let Err(e) = process_query(config, pool, &embedder, &llm_client, query).await {
                    eprintln!("Error processing query: {:#}", e);
                }
            }
            Ok(())
        }
    }
}

async fn process_query(
    config: &Config,
    pool: &SqlitePool,
    embedder: &EmbeddingClient,
    llm_client: &CompletionClient,
    query: &str,
) -> Result<()> {
    println!("\nQuery: {}", query);
    println!("\nSearching for relevant code...");

    let filters = analyzer::analyze(query);
    if !filters.languages.is_empty() {
        println!("Language filters: {:?}", filters.languages);
    }
    if !filters.path_globs.is_empty() {
        println!("Path filters: {:?}", filters.path_globs);
    }

    let chunks = search_code(
        pool,
        embedder,
        query,
        config.retrieval.limit,
        &filters.languages,
        &filters.path_globs,
        config.retrieval.min_score,
        true,
    )
    .await
    .context("failed to search for code")?;

    if chunks.is_empty() {
        println!("No relevant code found");
    } else {
        println!("\nRelevant code chunks:");
        for (i, chunk) in chunks.iter().enumerate() {
            println!("\n--- Chunk {} ---", i + 1);
            display_chunk(chunk);
            println!("\n{}", "-".repeat(80));
        }
    }

    println!("\nGenerating answer...");
    match llm::answer(pool, embedder, llm_client, query, config.llm.max_tokens).await {
        Ok(answer) => {
            println!("\n--- Answer ---");
            print_results_summary(&chunks);
            if !answer.is_empty() {
                println!("\nLLM Response:");
                println!("{}", answer);
            }
        }
        Err(e) => {
            eprintln!("Error generating answer: {:#}", e);
        }
    }

    Ok(())
}

fn display_chunk(chunk: &CodeChunk) {
    println!("Path: {}", chunk.file_path);
    println!("Lines: {}-{}", chunk.start_line, chunk.end_line);

    print!("Type: {}", chunk.entity_type);
    if !chunk.name.is_empty() {
        print!(" - {}", chunk.name);
    }
    println!();

    if !chunk.language.is_empty() {
        println!("Language: {}", chunk.language);
    }
    if !chunk.signature.is_empty() {
        println!("Signature: {}", chunk.signature);
    }

    println!("\nContent Preview:");
    let lines: Vec<&str> = chunk.content.split('\n').collect();
    let shown = lines.len().min(PREVIEW_LINES);
    for (j, line) in lines.iter().take(shown).enumerate() {
        println!("{}: {}", chunk.start_line + j as i64, line);
    }
    if lines.len() > shown {
        println!("... ({} more lines not shown)", lines.len() - shown);
    }
}

fn print_results_summary(chunks: &[CodeChunk]) {
    if chunks.is_empty() {
        return;
    }

    println!("\nSearch Results Summary:");
    for (i, chunk) in chunks.iter().enumerate() {
        println!("\n{}. {} (lines {}-{})", i + 1, chunk.file_path, chunk.start_line, chunk.end_line);
        println!("   Similarity Score: {:.6}", chunk.score);
        if !chunk.entity_type.is_empty() {
            println!("   Type: {}", chunk.entity_type);
        }
        if !chunk.name.is_empty() {
            println!("   Name: {}", chunk.name);
        }
        if !chunk.language.is_empty() {
            println!("   Language: {}", chunk.language);
        }
    }
}
