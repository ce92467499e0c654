//! Engine metadata key/value pairs.

use rusqlite::{params, Connection, OptionalExtension};

use engram_core::errors::EngramResult;

use crate::to_storage_err;

pub fn get_meta(conn: &Connection, key: &str) -> EngramResult<Option<String>> {
    conn.prepare_cached("SELECT value FROM engram_meta WHERE key = ?1")
        .map_err(to_storage_err)?
        .query_row(params![key], |row| row.get(0))
        .optional()
        .map_err(to_storage_err)
}

pub fn set_meta(conn: &Connection, key: &str, value: &str) -> EngramResult<()> {
    conn.prepare_cached(
        "INSERT INTO engram_meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .map_err(to_storage_err)?
    .execute(params![key, value])
    .map_err(to_storage_err)?;
    Ok(())
}
