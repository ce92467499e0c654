//! The forget engine: semantic match plus transactional hard delete
//! with predecessor resurrection.

use tokio_util::sync::CancellationToken;

use engram_core::errors::{EngramError, EngramResult};
use engram_core::vector::cosine_similarity;
use engram_storage::queries::{chunk_ops, chunk_query};
use engram_storage::scope::normalize_scopes;

use crate::engine::MemoryEngine;

impl MemoryEngine {
    /// Delete every active chunk whose similarity to `description`
    /// meets the threshold. The chunks each match directly superseded
    /// are resurrected in the same transaction, bounded to this agent
    /// and the match's scope. Returns the deleted contents.
    pub async fn forget_memory(
        &self,
        agent_id: &str,
        description: &str,
        threshold: Option<f64>,
        scopes: Option<&[String]>,
        cancel: &CancellationToken,
    ) -> EngramResult<Vec<String>> {
        let threshold = threshold.unwrap_or(self.config.forget_threshold);
        let description_embedding = self.embed_checked(description, cancel).await?;

        let normalized = scopes.map(|s| normalize_scopes(s));
        // Superseded chunks are invisible here: they can only become
        // forgettable again once their superseder is deleted.
        let candidates = self.store.with_conn(|conn| {
            chunk_query::get_all_active_chunks(
                conn,
                agent_id,
                self.config.max_search_chunks as i64,
                normalized.as_deref(),
            )
        })?;

        let mut matches = Vec::new();
        for chunk in candidates {
            let similarity = cosine_similarity(&description_embedding, &chunk.embedding)?;
            if similarity >= threshold {
                matches.push(chunk);
            }
        }
        if matches.is_empty() {
            return Ok(Vec::new());
        }
        if cancel.is_cancelled() {
            return Err(EngramError::Cancelled);
        }

        tracing::info!(agent_id, matched = matches.len(), threshold, "forgetting chunks");

        self.store.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| EngramError::storage(format!("forget begin: {e}")))?;
            for chunk in &matches {
                // superseded_by is single-hop by construction, so
                // clearing direct references handles chains naturally.
                chunk_ops::clear_superseded_by_scoped(&tx, &chunk.id, agent_id, &chunk.scope)?;
                chunk_ops::delete_chunk(&tx, &chunk.id)?;
            }
            tx.commit()
                .map_err(|e| EngramError::storage(format!("forget commit: {e}")))
        })?;

        Ok(matches.into_iter().map(|c| c.content).collect())
    }
}
