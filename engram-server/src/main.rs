//! MCP server binary: wires the engine, capability providers, and the
//! selected transport from environment configuration.

mod config;
mod llm;
mod rpc;
mod sse;
mod stdio;
mod tools;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use engram_core::config::EngineConfig;
use engram_core::traits::{IEmbeddingProvider, ILlmClient};
use engram_embeddings::{HashedEmbedder, HttpEmbedder};
use engram_engine::MemoryEngine;

use crate::config::{ServerConfig, Transport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // In stdio mode, stdout belongs to the protocol; log to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(db = %config.db_path.display(), transport = ?config.transport, "starting engram server");

    let embedder: Arc<dyn IEmbeddingProvider> = match &config.embedding_endpoint {
        Some(endpoint) => Arc::new(HttpEmbedder::new(
            endpoint.clone(),
            config.embedding_api_key.clone(),
            config.embedding_model.clone(),
            config.embedding_dimensions,
        )),
        None => {
            tracing::warn!(
                "ENGRAM_EMBEDDING_ENDPOINT not set; using the deterministic hashed embedder"
            );
            Arc::new(HashedEmbedder::new(config.embedding_dimensions))
        }
    };

    let llm_client: Arc<dyn ILlmClient> = match &config.llm_endpoint {
        Some(endpoint) => Arc::new(llm::HttpLlmClient::new(
            endpoint.clone(),
            config.llm_api_key.clone(),
            config.llm_model.clone(),
        )),
        None => {
            tracing::warn!(
                "ENGRAM_LLM_ENDPOINT not set; remember_facts will extract nothing"
            );
            Arc::new(llm::NullLlmClient)
        }
    };

    let engine = Arc::new(MemoryEngine::open(
        &config.db_path,
        embedder,
        llm_client,
        EngineConfig::default(),
    )?);

    match config.transport {
        Transport::Stdio => stdio::serve(engine).await,
        Transport::Sse => sse::serve(engine, config.port).await,
    }
}
