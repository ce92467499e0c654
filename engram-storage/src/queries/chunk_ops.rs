//! Insert, mutate, and delete operations on chunks.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use engram_core::chunk::{Chunk, ChunkKind, Intensity};
use engram_core::errors::EngramResult;
use engram_core::vector;

use super::{fmt_ts, parse_ts};
use crate::to_storage_err;

pub(crate) const CHUNK_COLUMNS: &str = "id, agent_id, scope, content, content_hash, embedding, \
     metadata, kind, running_intensity, encounter_count, access_count, \
     last_accessed_at, superseded_by, created_at";

/// Insert a chunk. Unique-constraint violations (memory dedup index)
/// surface as storage errors for the caller's TOCTOU fallback.
pub fn insert_chunk(conn: &Connection, chunk: &Chunk) -> EngramResult<()> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO chunks (id, agent_id, scope, content, content_hash, embedding,
                                 metadata, kind, running_intensity, encounter_count,
                                 access_count, last_accessed_at, superseded_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .map_err(to_storage_err)?;
    stmt.execute(params![
        chunk.id,
        chunk.agent_id,
        chunk.scope,
        chunk.content,
        chunk.content_hash,
        vector::to_blob(&chunk.embedding),
        chunk.metadata,
        chunk.kind.as_str(),
        chunk.running_intensity.value(),
        chunk.encounter_count,
        chunk.access_count,
        fmt_ts(chunk.last_accessed_at),
        chunk.superseded_by,
        fmt_ts(chunk.created_at),
    ])
    .map_err(to_storage_err)?;
    Ok(())
}

/// Get a single chunk by id, regardless of agent or supersession.
pub fn get_chunk(conn: &Connection, id: &str) -> EngramResult<Option<Chunk>> {
    let mut stmt = conn
        .prepare_cached(&format!("SELECT {CHUNK_COLUMNS} FROM chunks WHERE id = ?1"))
        .map_err(to_storage_err)?;
    let row = stmt
        .query_row(params![id], |row| Ok(row_to_chunk(row)))
        .optional()
        .map_err(to_storage_err)?;
    row.transpose()
}

/// Reinforce on re-encounter: new intensity, one more encounter and
/// access, fresh `last_accessed_at`.
pub fn reinforce_chunk(
    conn: &Connection,
    id: &str,
    new_intensity: f64,
    now: DateTime<Utc>,
) -> EngramResult<()> {
    let mut stmt = conn
        .prepare_cached(
            "UPDATE chunks SET running_intensity = ?2,
                               encounter_count = encounter_count + 1,
                               access_count = access_count + 1,
                               last_accessed_at = ?3
             WHERE id = ?1",
        )
        .map_err(to_storage_err)?;
    stmt.execute(params![id, new_intensity.clamp(0.0, 1.0), fmt_ts(now)])
        .map_err(to_storage_err)?;
    Ok(())
}

/// Retrieval boost: bumped intensity, one more access, fresh
/// `last_accessed_at`. The encounter count is untouched.
pub fn touch_chunk(
    conn: &Connection,
    id: &str,
    boosted_intensity: f64,
    now: DateTime<Utc>,
) -> EngramResult<()> {
    let mut stmt = conn
        .prepare_cached(
            "UPDATE chunks SET running_intensity = ?2,
                               access_count = access_count + 1,
                               last_accessed_at = ?3
             WHERE id = ?1",
        )
        .map_err(to_storage_err)?;
    stmt.execute(params![id, boosted_intensity.clamp(0.0, 1.0), fmt_ts(now)])
        .map_err(to_storage_err)?;
    Ok(())
}

/// Mark `old_id` superseded by `new_id`.
pub fn supersede_chunk(conn: &Connection, new_id: &str, old_id: &str) -> EngramResult<()> {
    let mut stmt = conn
        .prepare_cached("UPDATE chunks SET superseded_by = ?1 WHERE id = ?2")
        .map_err(to_storage_err)?;
    stmt.execute(params![new_id, old_id]).map_err(to_storage_err)?;
    Ok(())
}

/// Resurrect the chunks a target directly superseded, bounded to the
/// target's agent and scope so stale cross-agent references are never
/// touched.
pub fn clear_superseded_by_scoped(
    conn: &Connection,
    target_id: &str,
    agent_id: &str,
    scope: &str,
) -> EngramResult<usize> {
    let mut stmt = conn
        .prepare_cached(
            "UPDATE chunks SET superseded_by = NULL
             WHERE superseded_by = ?1 AND agent_id = ?2 AND scope = ?3",
        )
        .map_err(to_storage_err)?;
    let rows = stmt
        .execute(params![target_id, agent_id, scope])
        .map_err(to_storage_err)?;
    Ok(rows)
}

/// Delete a chunk row. Returns whether a row was deleted.
pub fn delete_chunk(conn: &Connection, id: &str) -> EngramResult<bool> {
    let mut stmt = conn
        .prepare_cached("DELETE FROM chunks WHERE id = ?1")
        .map_err(to_storage_err)?;
    let rows = stmt.execute(params![id]).map_err(to_storage_err)?;
    Ok(rows > 0)
}

/// Clear every `superseded_by` reference to `id` (any agent). Used by
/// the administrative delete, which operates on raw ids.
pub fn clear_superseded_by_all(conn: &Connection, id: &str) -> EngramResult<usize> {
    let mut stmt = conn
        .prepare_cached("UPDATE chunks SET superseded_by = NULL WHERE superseded_by = ?1")
        .map_err(to_storage_err)?;
    let rows = stmt.execute(params![id]).map_err(to_storage_err)?;
    Ok(rows)
}

/// Replace a chunk's content, hash, embedding, and both timestamps.
/// Callers wrap this in a transaction together with their re-read.
pub fn replace_chunk_content(
    conn: &Connection,
    id: &str,
    content: &str,
    content_hash: Option<&str>,
    embedding: &[f32],
    now: DateTime<Utc>,
) -> EngramResult<()> {
    let ts = fmt_ts(now);
    let mut stmt = conn
        .prepare_cached(
            "UPDATE chunks SET content = ?2, content_hash = ?3, embedding = ?4,
                               created_at = ?5, last_accessed_at = ?6
             WHERE id = ?1",
        )
        .map_err(to_storage_err)?;
    stmt.execute(params![
        id,
        content,
        content_hash,
        vector::to_blob(embedding),
        ts,
        ts
    ])
    .map_err(to_storage_err)?;
    Ok(())
}

/// Parse a row from the chunks table into a Chunk.
/// Column order must match `CHUNK_COLUMNS`.
pub(crate) fn row_to_chunk(row: &rusqlite::Row<'_>) -> EngramResult<Chunk> {
    let get_err = |e: rusqlite::Error| to_storage_err(e);

    let kind_str: String = row.get(7).map_err(get_err)?;
    let kind = ChunkKind::parse(&kind_str)
        .ok_or_else(|| engram_core::EngramError::storage(format!("unknown kind '{kind_str}'")))?;

    let embedding_blob: Vec<u8> = row.get(5).map_err(get_err)?;
    let last_accessed_str: String = row.get(11).map_err(get_err)?;
    let created_str: String = row.get(13).map_err(get_err)?;

    Ok(Chunk {
        id: row.get(0).map_err(get_err)?,
        agent_id: row.get(1).map_err(get_err)?,
        scope: row.get(2).map_err(get_err)?,
        content: row.get(3).map_err(get_err)?,
        content_hash: row.get(4).map_err(get_err)?,
        embedding: vector::from_blob(&embedding_blob),
        metadata: row.get(6).map_err(get_err)?,
        kind,
        running_intensity: Intensity::new(row.get(8).map_err(get_err)?),
        encounter_count: row.get(9).map_err(get_err)?,
        access_count: row.get(10).map_err(get_err)?,
        last_accessed_at: parse_ts(&last_accessed_str)?,
        superseded_by: row.get(12).map_err(get_err)?,
        created_at: parse_ts(&created_str)?,
    })
}
