use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub walker: WalkerConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/coderag.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct WalkerConfig {
    /// Files larger than this many bytes are skipped.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_max_file_size() -> u64 {
    1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Target chunk size in bytes for the size-based fallback.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
    /// Lines repeated at the start of each subsequent fallback chunk.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_max_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_url")]
    pub url: String,
    /// Expected vector dimensionality; responses are verified when set.
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            dims: None,
            timeout_secs: default_embedding_timeout(),
        }
    }
}

fn default_embedding_url() -> String {
    "http://localhost:8080/embeddings".to_string()
}

fn default_embedding_timeout() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_url")]
    pub url: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    /// Maximum tokens requested from the completion service.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: default_llm_url(),
            timeout_secs: default_llm_timeout(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_llm_url() -> String {
    "http://localhost:8081/completion".to_string()
}

fn default_llm_timeout() -> u64 {
    180
}

fn default_max_tokens() -> u32 {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Results returned by the query path.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Strict similarity floor, applied before and after boosts.
    #[serde(default = "default_min_score")]
    pub min_score: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            min_score: default_min_score(),
        }
    }
}

fn default_limit() -> usize {
    5
}

fn default_min_score() -> f64 {
    0.1
}

/// CLI flag values layered over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub db_path: Option<PathBuf>,
    pub embedding_url: Option<String>,
    pub llm_url: Option<String>,
    pub max_chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
}

/// Load configuration: built-in defaults, then the TOML file (when given),
/// then CLI overrides.
pub fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<Config> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p)
                .with_context(|| format!("failed to read config file: {}", p.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("failed to parse config file: {}", p.display()))?
        }
        None => Config::default(),
    };

    if let Some(db_path) = &overrides.db_path {
        config.db.path = db_path.clone();
    }
    if let Some(url) = &overrides.embedding_url {
        config.embedding.url = url.clone();
    }
    if let Some(url) = &overrides.llm_url {
        config.llm.url = url.clone();
    }
    if let Some(size) = overrides.max_chunk_size {
        config.chunking.max_chunk_size = size;
    }
    if let Some(overlap) = overrides.chunk_overlap {
        config.chunking.chunk_overlap = overlap;
    }

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.max_chunk_size == 0 {
        anyhow::bail!("chunking.max_chunk_size must be > 0");
    }
    if config.walker.max_file_size == 0 {
        anyhow::bail!("walker.max_file_size must be > 0");
    }
    if config.retrieval.limit < 1 {
        anyhow::bail!("retrieval.limit must be >= 1");
    }
    if !(-1.0..=1.0).contains(&config.retrieval.min_score) {
        anyhow::bail!("retrieval.min_score must be in [-1.0, 1.0]");
    }
    if let Some(dims) = config.embedding.dims {
        if dims == 0 {
            anyhow::bail!("embedding.dims must be > 0 when set");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_config_file() {
        let config = load_config(None, &Overrides::default()).unwrap();
        assert_eq!(config.chunking.max_chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.walker.max_file_size, 1024 * 1024);
        assert_eq!(config.retrieval.limit, 5);
        assert!((config.retrieval.min_score - 0.1).abs() < 1e-12);
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("coderag.toml");
        fs::write(
            &path,
            r#"
[chunking]
max_chunk_size = 2000

[embedding]
url = "http://example.test/embed"
dims = 384
"#,
        )
        .unwrap();

        let config = load_config(Some(&path), &Overrides::default()).unwrap();
        assert_eq!(config.chunking.max_chunk_size, 2000);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.embedding.url, "http://example.test/embed");
        assert_eq!(config.embedding.dims, Some(384));
    }

    #[test]
    fn cli_overrides_win() {
        let overrides = Overrides {
            db_path: Some(PathBuf::from("/tmp/x.sqlite")),
            embedding_url: Some("http://flag.test/embed".to_string()),
            llm_url: None,
            max_chunk_size: Some(500),
            chunk_overlap: Some(10),
        };
        let config = load_config(None, &overrides).unwrap();
        assert_eq!(config.db.path, PathBuf::from("/tmp/x.sqlite"));
        assert_eq!(config.embedding.url, "http://flag.test/embed");
        assert_eq!(config.chunking.max_chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 10);
    }

    #[test]
    fn rejects_zero_chunk_size() {
        let overrides = Overrides {
            max_chunk_size: Some(0),
            ..Overrides::default()
        };
        assert!(load_config(None, &overrides).is_err());
    }

    #[test]
    fn rejects_missing_config_file() {
        assert!(load_config(Some(Path::new("/nonexistent/coderag.toml")), &Overrides::default()).is_err());
    }
}
