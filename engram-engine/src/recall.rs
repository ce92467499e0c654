//! The recall engine: brute-force scored scan with a best-effort
//! retrieval boost.

use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use engram_core::chunk::{Chunk, ChunkKind};
use engram_core::constants::{
    DEFAULT_RECALL_LIMIT, MAX_RECALL_LIMIT, MIN_RECALL_LIMIT, STRENGTH_FLOOR,
};
use engram_core::errors::EngramResult;
use engram_core::vector::cosine_similarity;
use engram_storage::queries::{chunk_ops, chunk_query};
use engram_storage::scope::normalize_scopes;
use engram_strength::formula::{effective_strength, recency_score, retrieval_boost, search_score};

use crate::engine::MemoryEngine;

/// One recall result with its score breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct RecallHit {
    pub chunk: Chunk,
    pub similarity: f64,
    pub strength: f64,
    pub recency: f64,
    pub score: f64,
}

impl MemoryEngine {
    /// Rank the agent's active chunks against a query. Results below
    /// the similarity floor or whose effective strength has decayed
    /// under the strength floor are dropped before ranking.
    pub async fn recall_memories(
        &self,
        agent_id: &str,
        query: &str,
        limit: Option<usize>,
        kind: Option<ChunkKind>,
        scopes: Option<&[String]>,
        cancel: &CancellationToken,
    ) -> EngramResult<Vec<RecallHit>> {
        let limit = limit
            .unwrap_or(DEFAULT_RECALL_LIMIT)
            .clamp(MIN_RECALL_LIMIT, MAX_RECALL_LIMIT);

        let query_embedding = self.embed_checked(query, cancel).await?;

        let normalized = scopes.map(|s| normalize_scopes(s));
        let candidates = self.store.with_conn(|conn| match kind {
            Some(kind) => chunk_query::get_active_chunks(
                conn,
                agent_id,
                kind,
                self.config.max_search_chunks as i64,
                normalized.as_deref(),
            ),
            None => chunk_query::get_all_active_chunks(
                conn,
                agent_id,
                self.config.max_search_chunks as i64,
                normalized.as_deref(),
            ),
        })?;

        let now = Utc::now();
        let mut hits: Vec<RecallHit> = Vec::new();
        for chunk in candidates {
            let similarity = cosine_similarity(&query_embedding, &chunk.embedding)?;
            if similarity < self.config.min_similarity {
                continue;
            }
            let hours = (now - chunk.last_accessed_at).num_seconds().max(0) as f64 / 3600.0;
            let strength =
                effective_strength(chunk.running_intensity.value(), chunk.access_count, hours);
            if strength < STRENGTH_FLOOR {
                continue;
            }
            let days = (now - chunk.created_at).num_seconds().max(0) as f64 / 86400.0;
            let recency = recency_score(days);
            let score = search_score(similarity, strength, recency);
            hits.push(RecallHit {
                chunk,
                similarity,
                strength,
                recency,
                score,
            });
        }

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);

        tracing::debug!(agent_id, query_len = query.len(), results = hits.len(), "recall complete");

        // Best-effort retrieval boost. Busy/locked errors are swallowed
        // (the search already succeeded) and a cancelled token stops
        // all further best-effort writes.
        for hit in &hits {
            if cancel.is_cancelled() {
                break;
            }
            let boosted = retrieval_boost(hit.chunk.running_intensity.value());
            match self
                .store
                .with_conn(|conn| chunk_ops::touch_chunk(conn, &hit.chunk.id, boosted, now))
            {
                Ok(()) => {}
                Err(e) if e.is_transient_busy() => {
                    tracing::warn!(chunk_id = %hit.chunk.id, error = %e, "retrieval boost skipped");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(hits)
    }
}
