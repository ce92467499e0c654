//! Environment-driven server configuration.

use std::path::PathBuf;

/// Which transport the server speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Sse,
}

/// Everything the server reads from `ENGRAM_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub transport: Transport,
    pub port: u16,
    pub embedding_endpoint: Option<String>,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub llm_endpoint: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            db_path: var("ENGRAM_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("engram.db")),
            transport: match var("ENGRAM_TRANSPORT").as_deref() {
                Some("sse") => Transport::Sse,
                _ => Transport::Stdio,
            },
            port: var("ENGRAM_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(8765),
            embedding_endpoint: var("ENGRAM_EMBEDDING_ENDPOINT"),
            embedding_api_key: var("ENGRAM_EMBEDDING_API_KEY"),
            embedding_model: var("ENGRAM_EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            embedding_dimensions: var("ENGRAM_EMBEDDING_DIMENSIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(256),
            llm_endpoint: var("ENGRAM_LLM_ENDPOINT"),
            llm_api_key: var("ENGRAM_LLM_API_KEY"),
            llm_model: var("ENGRAM_LLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
        }
    }
}
