//! The store-memory path: verbatim dedup by content hash with a
//! TOCTOU-safe fallback on the unique index.

use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use engram_core::chunk::Chunk;
use engram_core::constants::MEMORY_REINFORCE_READING;
use engram_core::errors::{EngramError, EngramResult};
use engram_core::hash::content_hash;
use engram_storage::queries::{chunk_ops, chunk_query};
use engram_storage::scope::normalize_scope;
use engram_storage::is_unique_violation;
use engram_strength::formula::updated_intensity;

use crate::engine::MemoryEngine;

/// Outcome of a store_memory call.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StoreOutcome {
    /// A new memory row was created.
    Stored { id: String, content: String },
    /// The content already existed; the row was reinforced instead.
    Strengthened {
        id: String,
        content: String,
        encounter_count: i64,
        new_intensity: f64,
    },
}

impl MemoryEngine {
    /// Store raw content as a memory. Verbatim duplicates within the
    /// same agent and scope collapse onto the existing row, which gets
    /// strengthened with a fixed 0.5 reading.
    pub async fn store_memory(
        &self,
        agent_id: &str,
        content: &str,
        metadata: Option<&str>,
        scope: Option<&str>,
        cancel: &CancellationToken,
    ) -> EngramResult<StoreOutcome> {
        if let Some(meta) = metadata {
            serde_json::from_str::<serde_json::Value>(meta).map_err(|e| {
                EngramError::InvalidMetadata {
                    reason: e.to_string(),
                }
            })?;
        }
        if let Some(max) = self.config.max_content_length {
            let length = content.chars().count();
            if length > max {
                return Err(EngramError::InputTooLong { length, max });
            }
        }

        let scope = normalize_scope(scope);
        let hash = content_hash(content);

        // Fast path: already stored, reinforce without embedding.
        if let Some(existing) = self.store.with_conn(|conn| {
            chunk_query::get_memory_by_hash(conn, agent_id, &hash, Some(&scope))
        })? {
            return self.strengthen(existing);
        }

        let embedding = self.embed_checked(content, cancel).await?;
        let chunk = Chunk::new_memory(
            agent_id,
            &scope,
            content,
            embedding,
            metadata.map(str::to_string),
        );

        match self
            .store
            .with_conn(|conn| chunk_ops::insert_chunk(conn, &chunk))
        {
            Ok(()) => Ok(StoreOutcome::Stored {
                id: chunk.id,
                content: chunk.content,
            }),
            // A concurrent writer inserted the same content between the
            // hash check and our insert. Re-read and reinforce theirs.
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!(agent_id, "store_memory lost insert race, reinforcing");
                let existing = self
                    .store
                    .with_conn(|conn| {
                        chunk_query::get_memory_by_hash(conn, agent_id, &hash, Some(&scope))
                    })?
                    .ok_or_else(|| {
                        EngramError::storage("memory vanished between conflict and re-read")
                    })?;
                self.strengthen(existing)
            }
            Err(e) => Err(e),
        }
    }

    /// Reinforce an existing memory with the fixed 0.5 reading.
    fn strengthen(&self, existing: Chunk) -> EngramResult<StoreOutcome> {
        let new_intensity = updated_intensity(
            existing.running_intensity.value(),
            existing.encounter_count,
            MEMORY_REINFORCE_READING,
        );
        self.store.with_conn(|conn| {
            chunk_ops::reinforce_chunk(conn, &existing.id, new_intensity, Utc::now())
        })?;
        Ok(StoreOutcome::Strengthened {
            id: existing.id,
            content: existing.content,
            encounter_count: existing.encounter_count + 1,
            new_intensity,
        })
    }
}
