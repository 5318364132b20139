//! Hybrid retrieval: vector similarity fused with structural boosts and
//! language/path/keyword filters.
//!
//! The candidate set is restricted first (language `IN`, case-sensitive
//! keyword containment in SQL, path-glob regexes in process), then each
//! candidate is scored:
//!
//! ```text
//! score = cosine(embedding, query)
//!       + 0.1  if entity_type ∈ {function, method}
//!       + 0.05 if len(content) < 500
//!       − 0.05 if len(content) > 2000
//! ```
//!
//! The `min_score` threshold is strict (`>`) and applies twice: to the raw
//! cosine score and again to the adjusted score. Results are ordered by
//! score descending with ties broken by `id` ascending, then truncated to
//! `limit`.

use anyhow::{bail, Context, Result};
use regex::Regex;
use sqlx::{Row, SqlitePool};

use crate::analyzer::{extract_keywords, glob_to_regex};
use crate::embedding::{blob_to_vec, cosine_similarity, EmbeddingClient};
use crate::models::CodeChunk;
use crate::store;

/// Boost for function/method chunks (more focused than raw windows).
const ENTITY_BOOST: f64 = 0.1;
/// Boost for chunks under this many bytes (more precise).
const SIZE_BOOST: f64 = 0.05;
const SIZE_BOOST_LIMIT: usize = 500;
/// Penalty for chunks over this many bytes (too general).
const SIZE_PENALTY: f64 = -0.05;
const SIZE_PENALTY_LIMIT: usize = 2000;

/// Search indexed chunks, ranked by adjusted similarity.
///
/// `languages` and `path_globs` restrict the candidate set when non-empty.
/// With `use_keywords`, keywords longer than three characters extracted from
/// `query` further restrict candidates by content containment.
///
/// Returns an empty list when nothing is indexed yet.
///
/// # Errors
///
/// Fails when the query embedding cannot be generated (or is empty), when a
/// path glob produces an invalid regex, or on database errors.
pub async fn search_code(
    pool: &SqlitePool,
    embedder: &EmbeddingClient,
    query: &str,
    limit: usize,
    languages: &[String],
    path_globs: &[String],
    min_score: f64,
    use_keywords: bool,
) -> Result<Vec<CodeChunk>> {
    let query_vec = embedder
        .embed_query(query)
        .await
        .context("failed to generate query embedding")?;
    if query_vec.is_empty() {
        bail!("received empty embedding for query");
    }

    if store::chunk_count(pool).await? == 0 {
        return Ok(Vec::new());
    }

    let keywords: Vec<String> = if use_keywords {
        extract_keywords(query)
            .into_iter()
            .filter(|k| k.len() > 3)
            .collect()
    } else {
        Vec::new()
    };

    let candidates = fetch_candidates(pool, languages, &keywords).await?;
    let candidates = filter_by_path(candidates, path_globs)?;

    Ok(rank_chunks(candidates, &query_vec, min_score, limit))
}

/// Load candidate chunks, restricted by language and keyword predicates.
async fn fetch_candidates(
    pool: &SqlitePool,
    languages: &[String],
    keywords: &[String],
) -> Result<Vec<CodeChunk>> {
    let mut sql = String::from(
        "SELECT id, content, file_path, project_path, start_line, end_line, \
         entity_type, name, signature, language, hash, embedding FROM chunks",
    );

    let mut clauses: Vec<String> = Vec::new();
    if !languages.is_empty() {
        let placeholders = vec!["?"; languages.len()].join(", ");
        clauses.push(format!("language IN ({})", placeholders));
    }
    if !keywords.is_empty() {
        let contains = vec!["instr(content, ?) > 0"; keywords.len()].join(" OR ");
        clauses.push(format!("({})", contains));
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    let mut query = sqlx::query(&sql);
    for language in languages {
        query = query.bind(language);
    }
    for keyword in keywords {
        query = query.bind(keyword);
    }

    let rows = query.fetch_all(pool).await?;

    let chunks = rows
        .into_iter()
        .map(|row| {
            let blob: Vec<u8> = row.get("embedding");
            CodeChunk {
                id: row.get("id"),
                content: row.get("content"),
                file_path: row.get("file_path"),
                project_path: row.get("project_path"),
                start_line: row.get("start_line"),
                end_line: row.get("end_line"),
                entity_type: row.get("entity_type"),
                name: row.get("name"),
                signature: row.get("signature"),
                language: row.get("language"),
                hash: row.get("hash"),
                embedding: blob_to_vec(&blob),
                score: 0.0,
            }
        })
        .collect();

    Ok(chunks)
}

/// Keep candidates whose `file_path` matches any of the glob patterns.
fn filter_by_path(candidates: Vec<CodeChunk>, path_globs: &[String]) -> Result<Vec<CodeChunk>> {
    if path_globs.is_empty() {
        return Ok(candidates);
    }

    let regexes: Vec<Regex> = path_globs
        .iter()
        .map(|glob| {
            Regex::new(&glob_to_regex(glob))
                .with_context(|| format!("invalid path pattern: {}", glob))
        })
        .collect::<Result<_>>()?;

    Ok(candidates
        .into_iter()
        .filter(|c| regexes.iter().any(|re| re.is_match(&c.file_path)))
        .collect())
}

/// Score, threshold, order, and truncate the candidate set.
pub fn rank_chunks(
    candidates: Vec<CodeChunk>,
    query_vec: &[f32],
    min_score: f64,
    limit: usize,
) -> Vec<CodeChunk> {
    let mut ranked: Vec<CodeChunk> = candidates
        .into_iter()
        .filter_map(|mut chunk| {
            let vector_score = f64::from(cosine_similarity(&chunk.embedding, query_vec));
            if vector_score <= min_score {
                return None;
            }

            let entity_boost = if chunk.is_callable() { ENTITY_BOOST } else { 0.0 };
            let size_boost = if chunk.content.len() < SIZE_BOOST_LIMIT {
                SIZE_BOOST
            } else {
                0.0
            };
            let size_penalty = if chunk.content.len() > SIZE_PENALTY_LIMIT {
                SIZE_PENALTY
            } else {
                0.0
            };

            let score = vector_score + entity_boost + size_boost + size_penalty;
            // Threshold applies again after adjustments
            if score <= min_score {
                return None;
            }

            chunk.score = score;
            Some(chunk)
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, entity_type: &str, content: String, embedding: Vec<f32>) -> CodeChunk {
        CodeChunk {
            id: id.to_string(),
            content,
            file_path: format!("/proj/{}.go", id),
            project_path: "/proj".to_string(),
            language: "Go".to_string(),
            start_line: 1,
            end_line: 10,
            entity_type: entity_type.to_string(),
            name: id.to_string(),
            signature: String::new(),
            hash: String::new(),
            embedding,
            score: 0.0,
        }
    }

    #[test]
    fn boosts_follow_entity_and_size() {
        // Identical direction → identical cosine of 1.0 for both.
        let q = vec![1.0, 0.0];
        let small_fn = chunk("a", "function", "x".repeat(200), vec![2.0, 0.0]);
        let big_chunk = chunk("b", "chunk", "y".repeat(2500), vec![3.0, 0.0]);

        let ranked = rank_chunks(vec![big_chunk, small_fn], &q, 0.1, 10);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].id, "a");
        assert!((ranked[0].score - (1.0 + 0.1 + 0.05)).abs() < 1e-9);
        assert!((ranked[1].score - (1.0 - 0.05)).abs() < 1e-9);
    }

    #[test]
    fn threshold_is_strict_and_applied_twice() {
        let q = vec![1.0, 0.0];
        // cosine exactly at the threshold is dropped before boosts
        let at_threshold = chunk("a", "function", "x".repeat(100), vec![1.0, 0.0]);
        let ranked = rank_chunks(vec![at_threshold], &q, 1.0, 10);
        assert!(ranked.is_empty());

        // cosine passes but the penalty drags the final score below the
        // threshold, which applies again after adjustment
        let penalized = chunk("b", "chunk", "y".repeat(2500), vec![1.0, 0.0]);
        let ranked = rank_chunks(vec![penalized], &q, 0.96, 10);
        assert!(ranked.is_empty());
    }

    #[test]
    fn negative_similarity_is_dropped() {
        let q = vec![1.0, 0.0];
        let opposite = chunk("a", "function", "x".repeat(100), vec![-1.0, 0.0]);
        assert!(rank_chunks(vec![opposite], &q, 0.1, 10).is_empty());
    }

    #[test]
    fn ties_break_by_id_ascending() {
        let q = vec![1.0, 0.0];
        let first = chunk("b", "chunk", "x".repeat(600), vec![1.0, 0.0]);
        let second = chunk("a", "chunk", "y".repeat(600), vec![2.0, 0.0]);

        let ranked = rank_chunks(vec![first, second], &q, 0.1, 10);
        assert_eq!(ranked[0].id, "a");
        assert_eq!(ranked[1].id, "b");
    }

    #[test]
    fn limit_truncates() {
        let q = vec![1.0, 0.0];
        let candidates: Vec<CodeChunk> = (0..10)
            .map(|i| chunk(&format!("c{}", i), "chunk", "x".repeat(600), vec![1.0, 0.0]))
            .collect();
        assert_eq!(rank_chunks(candidates, &q, 0.1, 3).len(), 3);
    }

    #[test]
    fn score_reproducible_from_stored_fields() {
        let q = vec![0.6, 0.8];
        let c = chunk("a", "method", "x".repeat(300), vec![0.8, 0.6]);
        let expected_cosine = f64::from(cosine_similarity(&c.embedding, &q));

        let ranked = rank_chunks(vec![c], &q, 0.1, 10);
        assert_eq!(ranked.len(), 1);
        assert!((ranked[0].score - (expected_cosine + 0.1 + 0.05)).abs() < 1e-9);
    }

    #[test]
    fn path_filter_matches_globs() {
        let a = chunk("a", "chunk", "x".to_string(), vec![1.0]);
        let mut b = chunk("b", "chunk", "y".to_string(), vec![1.0]);
        b.file_path = "/proj/tests/b_test.go".to_string();

        let kept = filter_by_path(vec![a, b], &["*test*".to_string()]).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "b");
    }

    #[test]
    fn empty_path_filter_keeps_all() {
        let a = chunk("a", "chunk", "x".to_string(), vec![1.0]);
        let kept = filter_by_path(vec![a], &[]).unwrap();
        assert_eq!(kept.len(), 1);
    }

    mod with_store {
        use super::*;
        use crate::db;
        use crate::migrate;
        use crate::store::store_chunks;
        use sqlx::SqlitePool;

        async fn seeded_pool() -> SqlitePool {
            let pool = db::connect_memory().await.unwrap();
            migrate::run_migrations(&pool).await.unwrap();

            let mut go_a = chunk("a", "function", "func ParseConfig() {}".to_string(), vec![1.0, 0.0]);
            go_a.file_path = "/proj/src/config.go".to_string();
            let mut py = chunk("b", "chunk", "def load_config(): pass".to_string(), vec![1.0, 0.0]);
            py.language = "Python".to_string();
            py.file_path = "/proj/tests/test_config.py".to_string();
            let mut go_b = chunk("c", "function", "func WriteOutput() {}".to_string(), vec![0.0, 1.0]);
            go_b.file_path = "/proj/src/output.go".to_string();

            store_chunks(&pool, &[go_a], "/proj/src/config.go", "/proj", "Go")
                .await
                .unwrap();
            store_chunks(&pool, &[py], "/proj/tests/test_config.py", "/proj", "Python")
                .await
                .unwrap();
            store_chunks(&pool, &[go_b], "/proj/src/output.go", "/proj", "Go")
                .await
                .unwrap();
            pool
        }

        #[tokio::test]
        async fn language_filter_restricts_candidates() {
            let pool = seeded_pool().await;

            let all = fetch_candidates(&pool, &[], &[]).await.unwrap();
            assert_eq!(all.len(), 3);

            let go_only = fetch_candidates(&pool, &["Go".to_string()], &[])
                .await
                .unwrap();
            assert_eq!(go_only.len(), 2);
            assert!(go_only.iter().all(|c| c.language == "Go"));
        }

        #[tokio::test]
        async fn keyword_filter_uses_case_sensitive_containment() {
            let pool = seeded_pool().await;

            let hits = fetch_candidates(&pool, &[], &["ParseConfig".to_string()])
                .await
                .unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].id, "a");

            // Containment is case-sensitive
            let misses = fetch_candidates(&pool, &[], &["parseconfig".to_string()])
                .await
                .unwrap();
            assert!(misses.is_empty());
        }

        #[tokio::test]
        async fn filters_compose_and_tighten_monotonically() {
            let pool = seeded_pool().await;
            let q = vec![1.0, 0.0];

            // Unfiltered: both chunks aligned with the query pass.
            let unfiltered = fetch_candidates(&pool, &[], &[]).await.unwrap();
            let unfiltered = rank_chunks(unfiltered, &q, 0.0, 10);
            let unfiltered_count = unfiltered.len();

            // Adding a language filter can only shrink the result set.
            let go = fetch_candidates(&pool, &["Go".to_string()], &[])
                .await
                .unwrap();
            let go = rank_chunks(go, &q, 0.0, 10);
            assert!(go.len() <= unfiltered_count);
            assert!(go.iter().all(|c| c.language == "Go"));

            // A path glob matching only the Python file narrows Go results
            // to zero.
            let go = fetch_candidates(&pool, &["Go".to_string()], &[])
                .await
                .unwrap();
            let go_in_tests =
                filter_by_path(go, &["*test*".to_string()]).unwrap();
            let go_in_tests = rank_chunks(go_in_tests, &q, 0.0, 10);
            assert!(go_in_tests.is_empty());

            // Raising min_score can only shrink the result set.
            let all = fetch_candidates(&pool, &[], &[]).await.unwrap();
            let strict = rank_chunks(all, &q, 0.9, 10);
            assert!(strict.len() <= unfiltered_count);
        }
    }
}
