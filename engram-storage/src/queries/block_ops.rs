//! Memory block reads and upserts.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use engram_core::chunk::MemoryBlock;
use engram_core::errors::EngramResult;

use super::{fmt_ts, parse_ts};
use crate::to_storage_err;

/// Fetch a block by key. Missing blocks are None, not an error.
pub fn get_block(
    conn: &Connection,
    agent_id: &str,
    key: &str,
    scope: &str,
) -> EngramResult<Option<MemoryBlock>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT agent_id, scope, key, value, updated_at
             FROM memory_blocks
             WHERE agent_id = ?1 AND scope = ?2 AND key = ?3",
        )
        .map_err(to_storage_err)?;
    let row = stmt
        .query_row(params![agent_id, scope, key], |row| Ok(row_to_block(row)))
        .optional()
        .map_err(to_storage_err)?;
    row.transpose()
}

/// Create or replace a block.
pub fn upsert_block(
    conn: &Connection,
    agent_id: &str,
    scope: &str,
    key: &str,
    value: &str,
    now: DateTime<Utc>,
) -> EngramResult<()> {
    let mut stmt = conn
        .prepare_cached(
            "INSERT INTO memory_blocks (agent_id, scope, key, value, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(agent_id, scope, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
        )
        .map_err(to_storage_err)?;
    stmt.execute(params![agent_id, scope, key, value, fmt_ts(now)])
        .map_err(to_storage_err)?;
    Ok(())
}

/// All blocks for an agent, across scopes, ordered by scope then key.
pub fn list_blocks(conn: &Connection, agent_id: &str) -> EngramResult<Vec<MemoryBlock>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT agent_id, scope, key, value, updated_at
             FROM memory_blocks WHERE agent_id = ?1
             ORDER BY scope, key",
        )
        .map_err(to_storage_err)?;
    let mut rows = stmt.query(params![agent_id]).map_err(to_storage_err)?;
    let mut blocks = Vec::new();
    while let Some(row) = rows.next().map_err(to_storage_err)? {
        blocks.push(row_to_block(row)?);
    }
    Ok(blocks)
}

fn row_to_block(row: &rusqlite::Row<'_>) -> EngramResult<MemoryBlock> {
    let updated_str: String = row.get(4).map_err(to_storage_err)?;
    Ok(MemoryBlock {
        agent_id: row.get(0).map_err(to_storage_err)?,
        scope: row.get(1).map_err(to_storage_err)?,
        key: row.get(2).map_err(to_storage_err)?,
        value: row.get(3).map_err(to_storage_err)?,
        updated_at: parse_ts(&updated_str)?,
    })
}
