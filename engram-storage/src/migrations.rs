//! Schema creation and upgrades.
//!
//! All statements are idempotent; pre-scope databases are upgraded in
//! place (scope column on `chunks`, rebuilt `memory_blocks` primary key,
//! rebuilt memory dedup index). Each table's migration is atomic.

use rusqlite::Connection;

use engram_core::errors::EngramResult;

use crate::to_storage_err;

/// Idempotent schema. The partial unique index on
/// `(agent_id, scope, content_hash)` is the serialization point for
/// concurrent `store_memory` writers.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    agent_id TEXT NOT NULL,
    scope TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL,
    content_hash TEXT,
    embedding BLOB NOT NULL,
    metadata TEXT,
    kind TEXT NOT NULL CHECK (kind IN ('fact', 'memory')),
    running_intensity REAL NOT NULL DEFAULT 0.5,
    encounter_count INTEGER NOT NULL DEFAULT 1,
    access_count INTEGER NOT NULL DEFAULT 0,
    last_accessed_at TEXT NOT NULL,
    superseded_by TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS memory_blocks (
    agent_id TEXT NOT NULL,
    scope TEXT NOT NULL DEFAULT '',
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (agent_id, scope, key)
);

CREATE TABLE IF NOT EXISTS engram_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_chunks_memory_dedup
    ON chunks (agent_id, scope, content_hash) WHERE kind = 'memory';
CREATE INDEX IF NOT EXISTS idx_chunks_agent_kind ON chunks (agent_id, kind);
CREATE INDEX IF NOT EXISTS idx_chunks_agent_accessed ON chunks (agent_id, last_accessed_at);
CREATE INDEX IF NOT EXISTS idx_chunks_superseded
    ON chunks (superseded_by) WHERE superseded_by IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_chunks_agent_created ON chunks (agent_id, created_at);
CREATE INDEX IF NOT EXISTS idx_chunks_agent_scope ON chunks (agent_id, scope);
";

/// Bring a database (fresh or legacy) up to the current schema.
pub fn run_migrations(conn: &Connection) -> EngramResult<()> {
    if table_exists(conn, "chunks")? && !column_exists(conn, "chunks", "scope")? {
        migrate_chunks_add_scope(conn)?;
    }
    if table_exists(conn, "memory_blocks")? && !column_exists(conn, "memory_blocks", "scope")? {
        migrate_blocks_add_scope(conn)?;
    }
    conn.execute_batch(SCHEMA).map_err(to_storage_err)?;
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> EngramResult<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )
        .map_err(to_storage_err)?;
    Ok(count > 0)
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> EngramResult<bool> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .map_err(to_storage_err)?;
    let mut rows = stmt.query([]).map_err(to_storage_err)?;
    while let Some(row) = rows.next().map_err(to_storage_err)? {
        let name: String = row.get(1).map_err(to_storage_err)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Add `scope` to a pre-scope `chunks` table and rebuild the memory
/// dedup index so it keys on `(agent_id, scope, content_hash)`.
fn migrate_chunks_add_scope(conn: &Connection) -> EngramResult<()> {
    tracing::info!("upgrading chunks table: adding scope column");
    conn.execute_batch(
        "
        BEGIN;
        ALTER TABLE chunks ADD COLUMN scope TEXT NOT NULL DEFAULT '';
        DROP INDEX IF EXISTS idx_chunks_memory_dedup;
        COMMIT;
        ",
    )
    .map_err(to_storage_err)?;
    Ok(())
}

/// Rebuild `memory_blocks` so its primary key includes `scope`.
/// SQLite cannot alter a primary key, so the table is recreated and the
/// rows copied over with the global scope.
fn migrate_blocks_add_scope(conn: &Connection) -> EngramResult<()> {
    tracing::info!("upgrading memory_blocks table: adding scope to primary key");
    conn.execute_batch(
        "
        BEGIN;
        CREATE TABLE memory_blocks_scoped (
            agent_id TEXT NOT NULL,
            scope TEXT NOT NULL DEFAULT '',
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (agent_id, scope, key)
        );
        INSERT INTO memory_blocks_scoped (agent_id, scope, key, value, updated_at)
            SELECT agent_id, '', key, value, updated_at FROM memory_blocks;
        DROP TABLE memory_blocks;
        ALTER TABLE memory_blocks_scoped RENAME TO memory_blocks;
        COMMIT;
        ",
    )
    .map_err(to_storage_err)?;
    Ok(())
}
