//! # coderag CLI
//!
//! Index a source tree and ask questions about it.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `coderag init` | Create the SQLite database and schema |
//! | `coderag index --code-dir <path>` | Walk, chunk, embed, and store a directory |
//! | `coderag query --query-string "<q>"` | One-shot query |
//! | `coderag query` | Interactive query loop |
//!
//! Settings come from an optional TOML config file (`--config`) with CLI
//! flags layered on top. The database schema is created on every startup,
//! so `init` is only needed to prepare a database ahead of time.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use coderag::{config, db, ingest, migrate, query_cmd};

/// coderag: retrieval-augmented code search over a local source tree.
#[derive(Parser)]
#[command(
    name = "coderag",
    about = "Index a source tree and answer natural-language questions about it",
    version
)]
struct Cli {
    /// Path to an optional TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// URL of the embedding service.
    #[arg(long, global = true)]
    embedding_url: Option<String>,

    /// URL of the completion service.
    #[arg(long, global = true)]
    llm_url: Option<String>,

    /// Maximum chunk size in bytes for the size-based chunker.
    #[arg(long, global = true)]
    max_chunk_size: Option<usize>,

    /// Lines of overlap between consecutive size-based chunks.
    #[arg(long, global = true)]
    chunk_overlap: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and schema. Idempotent.
    Init,

    /// Index a directory of code.
    Index {
        /// Directory to index.
        #[arg(long)]
        code_dir: PathBuf,
    },

    /// Query the indexed code.
    Query {
        /// Query string; without it an interactive loop starts.
        #[arg(long)]
        query_string: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = config::Overrides {
        db_path: cli.db_path.clone(),
        embedding_url: cli.embedding_url.clone(),
        llm_url: cli.llm_url.clone(),
        max_chunk_size: cli.max_chunk_size,
        chunk_overlap: cli.chunk_overlap,
    };
    let config = config::load_config(cli.config.as_deref(), &overrides)?;

    // Store unreachable or schema failure at startup is fatal.
    let pool = db::connect(&config.db.path)
        .await
        .with_context(|| format!("failed to open database: {}", config.db.path.display()))?;
    migrate::run_migrations(&pool)
        .await
        .context("failed to initialize database schema")?;

    match cli.command {
        Commands::Init => {
            println!("Database initialized: {}", config.db.path.display());
        }
        Commands::Index { code_dir } => {
            ingest::run_index(&config, &pool, &code_dir).await?;
        }
        Commands::Query { query_string } => {
            query_cmd::run_query(&config, &pool, query_string).await?;
        }
    }

    pool.close().await;
    Ok(())
}
