//! Semantic search from the command line.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use engram_core::chunk::ChunkKind;
use engram_core::config::EngineConfig;
use engram_core::errors::{EngramError, EngramResult};
use engram_core::traits::{IEmbeddingProvider, ILlmClient, LlmMessage};
use engram_embeddings::{HashedEmbedder, HttpEmbedder};
use engram_engine::{MemoryEngine, RecallHit};
use engram_storage::queries::admin;
use engram_storage::Store;

use super::open_existing;

/// The CLI never runs extraction, but the engine contract wants an LLM
/// capability. This one extracts nothing.
struct NoLlm;

#[async_trait]
impl ILlmClient for NoLlm {
    async fn complete(
        &self,
        _messages: &[LlmMessage],
        _system_prompt: &str,
        cancel: &CancellationToken,
    ) -> EngramResult<String> {
        if cancel.is_cancelled() {
            return Err(EngramError::Cancelled);
        }
        Ok("[]".to_string())
    }
}

/// Embedder from `ENGRAM_EMBEDDING_*`, falling back to the hashed
/// provider. Must resolve to the model the database is pinned to.
fn embedder_from_env() -> Arc<dyn IEmbeddingProvider> {
    let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
    let dimensions = var("ENGRAM_EMBEDDING_DIMENSIONS")
        .and_then(|v| v.parse().ok())
        .unwrap_or(256);
    match var("ENGRAM_EMBEDDING_ENDPOINT") {
        Some(endpoint) => Arc::new(HttpEmbedder::new(
            endpoint,
            var("ENGRAM_EMBEDDING_API_KEY"),
            var("ENGRAM_EMBEDDING_MODEL").unwrap_or_else(|| "text-embedding-3-small".to_string()),
            dimensions,
        )),
        None => Arc::new(HashedEmbedder::new(dimensions)),
    }
}

/// Build a read-mostly engine over an open store.
pub(crate) fn offline_engine(store: Store, config: EngineConfig) -> Result<MemoryEngine> {
    Ok(MemoryEngine::from_store(
        store,
        embedder_from_env(),
        Arc::new(NoLlm),
        config,
    )?)
}

pub async fn search(
    db: &Path,
    text: &str,
    agent: Option<&str>,
    kind: Option<ChunkKind>,
    limit: usize,
    json: bool,
) -> Result<()> {
    let store = open_existing(db)?;
    let agents: Vec<String> = match agent {
        Some(agent) => vec![agent.to_string()],
        None => store
            .with_conn(admin::list_agents)?
            .into_iter()
            .map(|a| a.agent_id)
            .collect(),
    };
    let engine = offline_engine(store, EngineConfig::default())?;

    let cancel = CancellationToken::new();
    let mut hits: Vec<(String, RecallHit)> = Vec::new();
    for agent_id in &agents {
        let agent_hits = engine
            .recall_memories(agent_id, text, Some(limit), kind, None, &cancel)
            .await?;
        hits.extend(agent_hits.into_iter().map(|h| (agent_id.clone(), h)));
    }
    hits.sort_by(|a, b| b.1.score.partial_cmp(&a.1.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(limit);

    if json {
        let rows: Vec<serde_json::Value> = hits
            .iter()
            .map(|(agent_id, hit)| {
                serde_json::json!({
                    "agentId": agent_id,
                    "id": hit.chunk.id,
                    "kind": hit.chunk.kind,
                    "content": hit.chunk.content,
                    "similarity": hit.similarity,
                    "score": hit.score,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("no matches");
        return Ok(());
    }
    for (agent_id, hit) in &hits {
        println!(
            "[{:.2}] {} {} {}",
            hit.score, agent_id, hit.chunk.id, hit.chunk.content
        );
    }
    Ok(())
}
