//! Administrative chunk mutation for dashboard and CLI use.

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use engram_core::chunk::{Chunk, ChunkKind};
use engram_core::errors::{EngramError, EngramResult};
use engram_core::hash::content_hash;
use engram_storage::queries::chunk_ops;

use crate::engine::MemoryEngine;

impl MemoryEngine {
    /// Replace a chunk's content: re-embed, then atomically swap
    /// content, hash, embedding, and both timestamps. Returns the
    /// updated row. A unique-constraint violation (memory content
    /// colliding with another memory) rolls the whole update back.
    pub async fn update_chunk(
        &self,
        id: &str,
        new_content: &str,
        cancel: &CancellationToken,
    ) -> EngramResult<Chunk> {
        let existing = self
            .store
            .with_conn(|conn| chunk_ops::get_chunk(conn, id))?
            .ok_or_else(|| EngramError::ChunkNotFound { id: id.to_string() })?;

        let embedding = self.embed_checked(new_content, cancel).await?;
        let hash = match existing.kind {
            ChunkKind::Memory => Some(content_hash(new_content)),
            ChunkKind::Fact => None,
        };

        self.store.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| EngramError::storage(format!("update_chunk begin: {e}")))?;
            chunk_ops::replace_chunk_content(
                &tx,
                id,
                new_content,
                hash.as_deref(),
                &embedding,
                Utc::now(),
            )?;
            let updated = chunk_ops::get_chunk(&tx, id)?
                .ok_or_else(|| EngramError::ChunkNotFound { id: id.to_string() })?;
            tx.commit()
                .map_err(|e| EngramError::storage(format!("update_chunk commit: {e}")))?;
            Ok(updated)
        })
    }

    /// Delete a chunk and clear any `superseded_by` reference to it in
    /// one transaction. Returns whether a row was deleted.
    pub fn delete_chunk(&self, id: &str) -> EngramResult<bool> {
        self.store.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| EngramError::storage(format!("delete_chunk begin: {e}")))?;
            chunk_ops::clear_superseded_by_all(&tx, id)?;
            let deleted = chunk_ops::delete_chunk(&tx, id)?;
            tx.commit()
                .map_err(|e| EngramError::storage(format!("delete_chunk commit: {e}")))?;
            Ok(deleted)
        })
    }
}
