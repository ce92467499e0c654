//! Administrative reads and bulk deletes for the inspection CLI.

use rusqlite::{params, Connection, ToSql};
use serde::Serialize;

use engram_core::chunk::{Chunk, ChunkKind};
use engram_core::errors::EngramResult;

use super::chunk_ops::{row_to_chunk, CHUNK_COLUMNS};
use crate::to_storage_err;

/// Whole-database counters for `stats`.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub agents: i64,
    pub chunks: i64,
    pub facts: i64,
    pub memories: i64,
    pub superseded: i64,
    pub blocks: i64,
}

pub fn stats(conn: &Connection) -> EngramResult<StoreStats> {
    let count = |sql: &str| -> EngramResult<i64> {
        conn.query_row(sql, [], |row| row.get(0)).map_err(to_storage_err)
    };
    Ok(StoreStats {
        agents: count("SELECT COUNT(DISTINCT agent_id) FROM chunks")?,
        chunks: count("SELECT COUNT(*) FROM chunks")?,
        facts: count("SELECT COUNT(*) FROM chunks WHERE kind = 'fact'")?,
        memories: count("SELECT COUNT(*) FROM chunks WHERE kind = 'memory'")?,
        superseded: count("SELECT COUNT(*) FROM chunks WHERE superseded_by IS NOT NULL")?,
        blocks: count("SELECT COUNT(*) FROM memory_blocks")?,
    })
}

/// Per-agent chunk counts for `agents`.
#[derive(Debug, Clone, Serialize)]
pub struct AgentSummary {
    pub agent_id: String,
    pub facts: i64,
    pub memories: i64,
}

pub fn list_agents(conn: &Connection) -> EngramResult<Vec<AgentSummary>> {
    let mut stmt = conn
        .prepare(
            "SELECT agent_id,
                    SUM(CASE WHEN kind = 'fact' THEN 1 ELSE 0 END),
                    SUM(CASE WHEN kind = 'memory' THEN 1 ELSE 0 END)
             FROM chunks GROUP BY agent_id ORDER BY agent_id",
        )
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(AgentSummary {
                agent_id: row.get(0)?,
                facts: row.get(1)?,
                memories: row.get(2)?,
            })
        })
        .map_err(to_storage_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)
}

/// Chunks for one agent, optionally filtered by kind, optionally
/// including superseded rows. Newest first.
pub fn list_chunks(
    conn: &Connection,
    agent_id: &str,
    kind: Option<ChunkKind>,
    include_superseded: bool,
    limit: i64,
) -> EngramResult<Vec<Chunk>> {
    let mut sql = format!("SELECT {CHUNK_COLUMNS} FROM chunks WHERE agent_id = ?");
    let kind_str = kind.map(ChunkKind::as_str);
    if kind_str.is_some() {
        sql.push_str(" AND kind = ?");
    }
    if !include_superseded {
        sql.push_str(" AND superseded_by IS NULL");
    }
    sql.push_str(" ORDER BY created_at DESC LIMIT ?");

    let mut stmt = conn.prepare(&sql).map_err(to_storage_err)?;
    let mut args: Vec<&dyn ToSql> = vec![&agent_id];
    if let Some(ref k) = kind_str {
        args.push(k);
    }
    args.push(&limit);

    let mut rows = stmt.query(&args[..]).map_err(to_storage_err)?;
    let mut chunks = Vec::new();
    while let Some(row) = rows.next().map_err(to_storage_err)? {
        chunks.push(row_to_chunk(row)?);
    }
    Ok(chunks)
}

/// Every chunk for an agent, superseded included, id order. Export path.
pub fn all_chunks_for_agent(conn: &Connection, agent_id: &str) -> EngramResult<Vec<Chunk>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {CHUNK_COLUMNS} FROM chunks WHERE agent_id = ?1 ORDER BY id"
        ))
        .map_err(to_storage_err)?;
    let mut rows = stmt.query(params![agent_id]).map_err(to_storage_err)?;
    let mut chunks = Vec::new();
    while let Some(row) = rows.next().map_err(to_storage_err)? {
        chunks.push(row_to_chunk(row)?);
    }
    Ok(chunks)
}

/// Bulk delete with optional agent and created-at cutoff filters.
/// Returns the number of rows removed.
pub fn purge_chunks(
    conn: &Connection,
    agent_id: Option<&str>,
    before: Option<&str>,
) -> EngramResult<usize> {
    let mut sql = "DELETE FROM chunks WHERE 1 = 1".to_string();
    let mut args: Vec<&dyn ToSql> = Vec::new();
    if let Some(ref agent) = agent_id {
        sql.push_str(" AND agent_id = ?");
        args.push(agent);
    }
    if let Some(ref cutoff) = before {
        // created_at is string-sortable ISO-8601, so < compares as time.
        sql.push_str(" AND created_at < ?");
        args.push(cutoff);
    }
    conn.execute(&sql, &args[..]).map_err(to_storage_err)
}

/// Insert-or-ignore a chunk row (import path). Returns false when the
/// primary key already existed and the row was skipped.
pub fn insert_chunk_ignore(conn: &Connection, chunk: &Chunk) -> EngramResult<bool> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT OR IGNORE INTO chunks
                (id, agent_id, scope, content, content_hash, embedding, metadata, kind,
                 running_intensity, encounter_count, access_count, last_accessed_at,
                 superseded_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .map_err(to_storage_err)?;
    let rows = stmt
        .execute(params![
            chunk.id,
            chunk.agent_id,
            chunk.scope,
            chunk.content,
            chunk.content_hash,
            engram_core::vector::to_blob(&chunk.embedding),
            chunk.metadata,
            chunk.kind.as_str(),
            chunk.running_intensity.value(),
            chunk.encounter_count,
            chunk.access_count,
            super::fmt_ts(chunk.last_accessed_at),
            chunk.superseded_by,
            super::fmt_ts(chunk.created_at),
        ])
        .map_err(to_storage_err)?;
    Ok(rows > 0)
}

/// Insert-or-ignore a block row (import path).
pub fn insert_block_ignore(
    conn: &Connection,
    agent_id: &str,
    scope: &str,
    key: &str,
    value: &str,
    updated_at: &str,
) -> EngramResult<bool> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT OR IGNORE INTO memory_blocks (agent_id, scope, key, value, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .map_err(to_storage_err)?;
    let rows = stmt
        .execute(params![agent_id, scope, key, value, updated_at])
        .map_err(to_storage_err)?;
    Ok(rows > 0)
}
