//! Prompt assembly and completion service client.
//!
//! [`answer`] retrieves the top five chunks for a question with the simple
//! search path (no language/path/keyword filters; the analyzer's filters
//! only shape the CLI display), formats them into a grounded prompt, and
//! asks the completion service for a prose answer.
//!
//! The completion service is an external collaborator:
//! `POST <url>` with `{"prompt", "max_tokens", "temperature"}` returns
//! `{"text", "tokens_used"}`.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::embedding::EmbeddingClient;
use crate::models::CodeChunk;
use crate::search::search_code;

/// Retrieval settings for the answer path: unfiltered top five above a
/// low similarity floor.
const ANSWER_LIMIT: usize = 5;
const ANSWER_MIN_SCORE: f64 = 0.1;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

/// Response from the completion service.
#[derive(Deserialize)]
pub struct CompletionResponse {
    pub text: String,
    #[serde(default)]
    pub tokens_used: i64,
}

/// HTTP client for the completion service.
pub struct CompletionClient {
    url: String,
    client: reqwest::Client,
}

impl CompletionClient {
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build completion HTTP client")?;

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }

    /// Send a prompt to the completion service.
    pub async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<CompletionResponse> {
        let response = self
            .client
            .post(&self.url)
            .json(&CompletionRequest {
                prompt,
                max_tokens,
                temperature: 0.2,
            })
            .send()
            .await
            .with_context(|| format!("completion request to {} failed", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("completion service returned {}: {}", status, body);
        }

        response
            .json()
            .await
            .context("failed to decode completion response")
    }
}

/// Format retrieved snippets plus the question into the grounded prompt.
pub fn build_prompt(chunks: &[CodeChunk], query: &str) -> String {
    let mut prompt = String::from("Based on the following code snippets:\n\n");

    for (i, chunk) in chunks.iter().enumerate() {
        prompt.push_str(&format!(
            "SNIPPET {} ({}, {}):\n```{}\n{}\n```\n\n",
            i + 1,
            chunk.file_path,
            chunk.entity_type,
            chunk.language.to_lowercase(),
            chunk.content
        ));
    }

    prompt.push_str(&format!("Answer the following question: {}", query));
    prompt
}

/// Answer a question grounded in the indexed code.
pub async fn answer(
    pool: &SqlitePool,
    embedder: &EmbeddingClient,
    llm: &CompletionClient,
    query: &str,
    max_tokens: u32,
) -> Result<String> {
    let chunks = search_code(
        pool,
        embedder,
        query,
        ANSWER_LIMIT,
        &[],
        &[],
        ANSWER_MIN_SCORE,
        false,
    )
    .await
    .context("failed to search for relevant chunks")?;

    let prompt = build_prompt(&chunks, query);
    let response = llm.complete(&prompt, max_tokens).await?;
    println!("LLM response received, tokens used: {}", response.tokens_used);
    Ok(response.text)
}
