//! Database schema migrations.
//!
//! Creates all required tables and indexes; every statement is idempotent,
//! so running `coderag init` repeatedly is safe. The schema is the
//! relational rendering of the project/file/chunk graph:
//!
//! ```text
//! ┌──────────────┐      ┌──────────────┐      ┌───────────────────┐
//! │   projects   │◀──┐  │    files     │◀──┐  │      chunks       │
//! │              │   │  │              │   │  │                   │
//! │ path (PK)    │   └──│ project_path │   └──│ file_path         │
//! │ name         │      │ path (PK)    │      │ id (PK)           │
//! │ created_at   │      │ name         │      │ content           │
//! │ updated_at   │      │ language     │      │ start/end_line    │
//! └──────────────┘      │ created_at   │      │ entity_type, name │
//!                       │ updated_at   │      │ signature, hash   │
//!                       └──────────────┘      │ language          │
//!                                             │ embedding (BLOB)  │
//!                                             │ created/updated   │
//!                                             └───────────────────┘
//! ```
//!
//! Indexes on `hash`, `language`, `entity_type`, and `file_path` back the
//! change-detection lookup and the retrieval filters.

use anyhow::Result;
use sqlx::SqlitePool;

/// Run all schema migrations. Safe to call on every startup.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            path TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            path TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            language TEXT NOT NULL,
            project_path TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            FOREIGN KEY (project_path) REFERENCES projects(path)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            file_path TEXT NOT NULL,
            project_path TEXT NOT NULL,
            start_line INTEGER NOT NULL,
            end_line INTEGER NOT NULL,
            entity_type TEXT NOT NULL,
            name TEXT NOT NULL,
            signature TEXT NOT NULL DEFAULT '',
            language TEXT NOT NULL,
            hash TEXT NOT NULL,
            embedding BLOB NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            FOREIGN KEY (file_path) REFERENCES files(path)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_hash ON chunks(hash)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_language ON chunks(language)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_entity_type ON chunks(entity_type)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_file_path ON chunks(file_path)")
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = db::connect_memory().await.unwrap();
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
