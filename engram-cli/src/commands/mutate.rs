//! Destructive subcommands: delete and purge.

use std::path::Path;

use anyhow::{bail, Result};

use engram_core::errors::EngramError;
use engram_storage::queries::{admin, chunk_ops};

use super::{confirm, open_existing};

pub fn delete(db: &Path, ids: &[String], force: bool, json: bool) -> Result<()> {
    let store = open_existing(db)?;
    if !confirm(&format!("delete {} chunk(s)?", ids.len()), force)? {
        bail!("aborted");
    }

    let mut deleted = 0usize;
    let mut missing = Vec::new();
    for id in ids {
        // Row removal and reference cleanup are one transaction, the
        // same shape as the engine's administrative delete.
        let removed = store.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| EngramError::storage(format!("delete begin: {e}")))?;
            chunk_ops::clear_superseded_by_all(&tx, id)?;
            let removed = chunk_ops::delete_chunk(&tx, id)?;
            tx.commit()
                .map_err(|e| EngramError::storage(format!("delete commit: {e}")))?;
            Ok(removed)
        })?;
        if removed {
            deleted += 1;
        } else {
            missing.push(id.clone());
        }
    }

    if json {
        println!(
            "{}",
            serde_json::json!({ "deleted": deleted, "missing": missing })
        );
    } else {
        println!("deleted {deleted} chunk(s)");
        for id in &missing {
            println!("not found: {id}");
        }
    }
    Ok(())
}

pub fn purge(
    db: &Path,
    agent: Option<&str>,
    before: Option<&str>,
    force: bool,
    json: bool,
) -> Result<()> {
    let store = open_existing(db)?;
    let what = match (agent, before) {
        (Some(agent), Some(before)) => format!("chunks of '{agent}' created before {before}"),
        (Some(agent), None) => format!("ALL chunks of '{agent}'"),
        (None, Some(before)) => format!("all chunks created before {before}"),
        (None, None) => "ALL chunks in the database".to_string(),
    };
    if !confirm(&format!("purge {what}?"), force)? {
        bail!("aborted");
    }

    let removed = store.with_conn(|conn| admin::purge_chunks(conn, agent, before))?;
    if json {
        println!("{}", serde_json::json!({ "purged": removed }));
    } else {
        println!("purged {removed} chunk(s)");
    }
    Ok(())
}
