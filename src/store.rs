//! Store writer: persists projects, files, and chunks.
//!
//! All writes for one file happen in a single transaction: the project and
//! file rows are upserted first, then each chunk is either skipped (stored
//! hash equals the incoming hash) or fully rewritten, embedding included.
//! Any error rolls the whole file back; callers log and continue with the
//! next file.
//!
//! Project and file rows are created lazily on first write and never
//! deleted. `created_at` is set once; `updated_at` on every write.

use std::path::Path;

use anyhow::Result;
use sqlx::SqlitePool;

use crate::embedding::vec_to_blob;
use crate::models::{CodeChunk, StoreReport};

/// Upsert the project and file rows, then write every changed chunk.
pub async fn store_chunks(
    pool: &SqlitePool,
    chunks: &[CodeChunk],
    file_path: &str,
    project_path: &str,
    language: &str,
) -> Result<StoreReport> {
    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO projects (path, name, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(path) DO UPDATE SET updated_at = excluded.updated_at
        "#,
    )
    .bind(project_path)
    .bind(basename(project_path))
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO files (path, name, language, project_path, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(path) DO UPDATE SET
            language = excluded.language,
            project_path = excluded.project_path,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(file_path)
    .bind(basename(file_path))
    .bind(language)
    .bind(project_path)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let mut report = StoreReport::default();

    for chunk in chunks {
        let stored_hash: Option<String> =
            sqlx::query_scalar("SELECT hash FROM chunks WHERE id = ?")
                .bind(&chunk.id)
                .fetch_optional(&mut *tx)
                .await?;

        // Content unchanged since the last run
        if stored_hash.as_deref() == Some(chunk.hash.as_str()) {
            report.unchanged += 1;
            continue;
        }

        sqlx::query(
            r#"
            INSERT INTO chunks (
                id, content, file_path, project_path, start_line, end_line,
                entity_type, name, signature, language, hash, embedding,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                content = excluded.content,
                file_path = excluded.file_path,
                project_path = excluded.project_path,
                start_line = excluded.start_line,
                end_line = excluded.end_line,
                entity_type = excluded.entity_type,
                name = excluded.name,
                signature = excluded.signature,
                language = excluded.language,
                hash = excluded.hash,
                embedding = excluded.embedding,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&chunk.id)
        .bind(&chunk.content)
        .bind(&chunk.file_path)
        .bind(&chunk.project_path)
        .bind(chunk.start_line)
        .bind(chunk.end_line)
        .bind(&chunk.entity_type)
        .bind(&chunk.name)
        .bind(&chunk.signature)
        .bind(&chunk.language)
        .bind(&chunk.hash)
        .bind(vec_to_blob(&chunk.embedding))
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        report.written += 1;
    }

    tx.commit().await?;
    Ok(report)
}

/// Number of chunks currently indexed.
pub async fn chunk_count(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn basename(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::chunk_file;
    use crate::db;
    use crate::migrate;

    async fn test_pool() -> SqlitePool {
        let pool = db::connect_memory().await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        pool
    }

    fn go_chunks(content: &str) -> Vec<CodeChunk> {
        let mut chunks = chunk_file(content, "/proj/a.go", "/proj", "Go", 1000, 100);
        for (i, c) in chunks.iter_mut().enumerate() {
            c.embedding = vec![i as f32 + 1.0, 0.5, -0.25];
        }
        chunks
    }

    const TWO_FUNCS: &str = "func A() {\n\tx()\n}\n\nfunc B() {\n\ty()\n}\n";

    #[tokio::test]
    async fn first_write_stores_everything() {
        let pool = test_pool().await;
        let chunks = go_chunks(TWO_FUNCS);

        let report = store_chunks(&pool, &chunks, "/proj/a.go", "/proj", "Go")
            .await
            .unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(report.unchanged, 0);
        assert_eq!(chunk_count(&pool).await.unwrap(), 2);

        let projects: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(projects, 1);
        let files: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(files, 1);
    }

    #[tokio::test]
    async fn unchanged_reingest_writes_nothing() {
        let pool = test_pool().await;
        let chunks = go_chunks(TWO_FUNCS);

        store_chunks(&pool, &chunks, "/proj/a.go", "/proj", "Go")
            .await
            .unwrap();
        let report = store_chunks(&pool, &chunks, "/proj/a.go", "/proj", "Go")
            .await
            .unwrap();

        assert_eq!(report.written, 0);
        assert_eq!(report.unchanged, 2);
        assert_eq!(chunk_count(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn changed_chunk_is_rewritten_others_skipped() {
        let pool = test_pool().await;
        let before = go_chunks(TWO_FUNCS);
        store_chunks(&pool, &before, "/proj/a.go", "/proj", "Go")
            .await
            .unwrap();

        // Same line ranges, one body changed: same ids, one new hash.
        let after = go_chunks("func A() {\n\tz()\n}\n\nfunc B() {\n\ty()\n}\n");
        assert_eq!(before[0].id, after[0].id);
        assert_ne!(before[0].hash, after[0].hash);

        let report = store_chunks(&pool, &after, "/proj/a.go", "/proj", "Go")
            .await
            .unwrap();
        assert_eq!(report.written, 1);
        assert_eq!(report.unchanged, 1);

        let content: String = sqlx::query_scalar("SELECT content FROM chunks WHERE id = ?")
            .bind(&after[0].id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(content.contains("z()"));
    }

    #[tokio::test]
    async fn project_and_file_rows_have_names() {
        let pool = test_pool().await;
        let chunks = go_chunks(TWO_FUNCS);
        store_chunks(&pool, &chunks, "/proj/a.go", "/proj", "Go")
            .await
            .unwrap();

        let project_name: String = sqlx::query_scalar("SELECT name FROM projects WHERE path = ?")
            .bind("/proj")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(project_name, "proj");

        let (file_name, language): (String, String) =
            sqlx::query_as("SELECT name, language FROM files WHERE path = ?")
                .bind("/proj/a.go")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(file_name, "a.go");
        assert_eq!(language, "Go");
    }

    #[tokio::test]
    async fn embedding_blob_roundtrips() {
        let pool = test_pool().await;
        let chunks = go_chunks(TWO_FUNCS);
        store_chunks(&pool, &chunks, "/proj/a.go", "/proj", "Go")
            .await
            .unwrap();

        let blob: Vec<u8> = sqlx::query_scalar("SELECT embedding FROM chunks WHERE id = ?")
            .bind(&chunks[0].id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(crate::embedding::blob_to_vec(&blob), chunks[0].embedding);
    }
}
