//! Embedding service client and vector utilities.
//!
//! The embedding service is an external collaborator reached over HTTP:
//! `POST <url>` with `{"texts": [...]}` returns `{"embeddings": [[...], ...]}`
//! in input order. The client batches all texts of one file in a single
//! request. Transport and decoding errors propagate to the caller, which
//! fails the ingest for that file only.
//!
//! Vectors are persisted as little-endian f32 BLOBs ([`vec_to_blob`] /
//! [`blob_to_vec`]); similarity is computed in-process with
//! [`cosine_similarity`].

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    texts: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

/// HTTP client for the embedding service.
pub struct EmbeddingClient {
    url: String,
    /// Expected vector dimensionality; checked against every response when set.
    dims: Option<usize>,
    client: reqwest::Client,
}

impl EmbeddingClient {
    pub fn new(url: &str, dims: Option<usize>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build embedding HTTP client")?;

        Ok(Self {
            url: url.to_string(),
            dims,
            client,
        })
    }

    /// Embed a batch of texts, returning one vector per input text in order.
    ///
    /// # Errors
    ///
    /// Fails on transport errors, non-success status codes, a response whose
    /// length does not match the input, or (when `dims` is configured) a
    /// vector of the wrong dimensionality.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(&self.url)
            .json(&EmbeddingRequest { texts })
            .send()
            .await
            .with_context(|| format!("embedding request to {} failed", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("embedding service returned {}: {}", status, body);
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .context("failed to decode embedding response")?;

        if parsed.embeddings.len() != texts.len() {
            bail!(
                "embedding service returned {} vectors for {} texts",
                parsed.embeddings.len(),
                texts.len()
            );
        }

        if let Some(dims) = self.dims {
            for (i, vec) in parsed.embeddings.iter().enumerate() {
                if vec.len() != dims {
                    bail!(
                        "embedding {} has dimension {}, expected {}",
                        i,
                        vec.len(),
                        dims
                    );
                }
            }
        }

        Ok(parsed.embeddings)
    }

    /// Embed a single query text.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .context("empty embedding response")
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity between two vectors, in `[-1.0, 1.0]`.
///
/// Returns `0.0` for empty vectors, mismatched lengths, or zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
