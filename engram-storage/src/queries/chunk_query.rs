//! Scoped and unscoped reads over active chunks.

use rusqlite::{params, Connection, OptionalExtension, ToSql};

use engram_core::chunk::{Chunk, ChunkKind};
use engram_core::errors::EngramResult;

use super::chunk_ops::{row_to_chunk, CHUNK_COLUMNS};
use crate::to_storage_err;

/// Active chunks of one kind for an agent, newest-accessed first.
/// `limit = -1` means unlimited. An empty scope list yields no rows.
pub fn get_active_chunks(
    conn: &Connection,
    agent_id: &str,
    kind: ChunkKind,
    limit: i64,
    scopes: Option<&[String]>,
) -> EngramResult<Vec<Chunk>> {
    active_chunks_filtered(conn, agent_id, Some(kind), limit, scopes)
}

/// Active chunks across both kinds.
pub fn get_all_active_chunks(
    conn: &Connection,
    agent_id: &str,
    limit: i64,
    scopes: Option<&[String]>,
) -> EngramResult<Vec<Chunk>> {
    active_chunks_filtered(conn, agent_id, None, limit, scopes)
}

fn active_chunks_filtered(
    conn: &Connection,
    agent_id: &str,
    kind: Option<ChunkKind>,
    limit: i64,
    scopes: Option<&[String]>,
) -> EngramResult<Vec<Chunk>> {
    // A caller that filters by scope but supplies no scopes has asked
    // for the empty partition set.
    if let Some(list) = scopes {
        if list.is_empty() {
            return Ok(Vec::new());
        }
    }

    match (kind, scopes) {
        (Some(kind), None) => {
            let mut stmt = conn
                .prepare_cached(&format!(
                    "SELECT {CHUNK_COLUMNS} FROM chunks
                     WHERE agent_id = ?1 AND kind = ?2 AND superseded_by IS NULL
                     ORDER BY last_accessed_at DESC LIMIT ?3"
                ))
                .map_err(to_storage_err)?;
            collect_chunks(stmt.query(params![agent_id, kind.as_str(), limit]))
        }
        (None, None) => {
            let mut stmt = conn
                .prepare_cached(&format!(
                    "SELECT {CHUNK_COLUMNS} FROM chunks
                     WHERE agent_id = ?1 AND superseded_by IS NULL
                     ORDER BY last_accessed_at DESC LIMIT ?2"
                ))
                .map_err(to_storage_err)?;
            collect_chunks(stmt.query(params![agent_id, limit]))
        }
        (Some(kind), Some([scope])) => {
            // The single-scope case is the hot path and stays cached.
            let mut stmt = conn
                .prepare_cached(&format!(
                    "SELECT {CHUNK_COLUMNS} FROM chunks
                     WHERE agent_id = ?1 AND kind = ?2 AND scope = ?3
                       AND superseded_by IS NULL
                     ORDER BY last_accessed_at DESC LIMIT ?4"
                ))
                .map_err(to_storage_err)?;
            collect_chunks(stmt.query(params![agent_id, kind.as_str(), scope, limit]))
        }
        (None, Some([scope])) => {
            let mut stmt = conn
                .prepare_cached(&format!(
                    "SELECT {CHUNK_COLUMNS} FROM chunks
                     WHERE agent_id = ?1 AND scope = ?2 AND superseded_by IS NULL
                     ORDER BY last_accessed_at DESC LIMIT ?3"
                ))
                .map_err(to_storage_err)?;
            collect_chunks(stmt.query(params![agent_id, scope, limit]))
        }
        (kind, Some(scopes)) => {
            // Many scopes: build the statement with one placeholder per
            // value. Not worth caching, the arity varies per call.
            let placeholders = vec!["?"; scopes.len()].join(", ");
            let kind_clause = if kind.is_some() { "AND kind = ? " } else { "" };
            let sql = format!(
                "SELECT {CHUNK_COLUMNS} FROM chunks
                 WHERE agent_id = ? {kind_clause}AND scope IN ({placeholders})
                   AND superseded_by IS NULL
                 ORDER BY last_accessed_at DESC LIMIT ?"
            );
            let mut stmt = conn.prepare(&sql).map_err(to_storage_err)?;

            let kind_str = kind.map(ChunkKind::as_str);
            let mut args: Vec<&dyn ToSql> = vec![&agent_id];
            if let Some(ref k) = kind_str {
                args.push(k);
            }
            for scope in scopes {
                args.push(scope);
            }
            args.push(&limit);
            collect_chunks(stmt.query(&args[..]))
        }
    }
}

fn collect_chunks(
    rows: Result<rusqlite::Rows<'_>, rusqlite::Error>,
) -> EngramResult<Vec<Chunk>> {
    let mut rows = rows.map_err(to_storage_err)?;
    let mut chunks = Vec::new();
    while let Some(row) = rows.next().map_err(to_storage_err)? {
        chunks.push(row_to_chunk(row)?);
    }
    Ok(chunks)
}

/// Look up the active memory with this content hash, at most one row.
pub fn get_memory_by_hash(
    conn: &Connection,
    agent_id: &str,
    hash: &str,
    scope: Option<&str>,
) -> EngramResult<Option<Chunk>> {
    let row = match scope {
        Some(scope) => {
            let mut stmt = conn
                .prepare_cached(&format!(
                    "SELECT {CHUNK_COLUMNS} FROM chunks
                     WHERE agent_id = ?1 AND scope = ?2 AND content_hash = ?3
                       AND kind = 'memory' AND superseded_by IS NULL
                     LIMIT 1"
                ))
                .map_err(to_storage_err)?;
            stmt.query_row(params![agent_id, scope, hash], |row| Ok(row_to_chunk(row)))
                .optional()
                .map_err(to_storage_err)?
        }
        None => {
            let mut stmt = conn
                .prepare_cached(&format!(
                    "SELECT {CHUNK_COLUMNS} FROM chunks
                     WHERE agent_id = ?1 AND content_hash = ?2
                       AND kind = 'memory' AND superseded_by IS NULL
                     LIMIT 1"
                ))
                .map_err(to_storage_err)?;
            stmt.query_row(params![agent_id, hash], |row| Ok(row_to_chunk(row)))
                .optional()
                .map_err(to_storage_err)?
        }
    };
    row.transpose()
}
