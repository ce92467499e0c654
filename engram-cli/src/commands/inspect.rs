//! Read-only inspection subcommands.

use std::path::Path;

use anyhow::{bail, Result};

use engram_core::chunk::ChunkKind;
use engram_storage::queries::{admin, block_ops};
use engram_storage::Store;

use super::open_existing;

pub fn init(db: &Path, json: bool) -> Result<()> {
    Store::open(db)?;
    if json {
        println!("{}", serde_json::json!({ "initialized": db.display().to_string() }));
    } else {
        println!("initialized {}", db.display());
    }
    Ok(())
}

pub fn stats(db: &Path, json: bool) -> Result<()> {
    let store = open_existing(db)?;
    let stats = store.with_conn(admin::stats)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    println!("agents      {}", stats.agents);
    println!("chunks      {}", stats.chunks);
    println!("  facts     {}", stats.facts);
    println!("  memories  {}", stats.memories);
    println!("  superseded {}", stats.superseded);
    println!("blocks      {}", stats.blocks);
    Ok(())
}

pub fn agents(db: &Path, json: bool) -> Result<()> {
    let store = open_existing(db)?;
    let agents = store.with_conn(admin::list_agents)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&agents)?);
        return Ok(());
    }
    if agents.is_empty() {
        println!("no agents");
        return Ok(());
    }
    for agent in agents {
        println!(
            "{}  facts={} memories={}",
            agent.agent_id, agent.facts, agent.memories
        );
    }
    Ok(())
}

pub fn chunks(
    db: &Path,
    agent: &str,
    kind: Option<ChunkKind>,
    superseded: bool,
    limit: i64,
    json: bool,
) -> Result<()> {
    let store = open_existing(db)?;
    let chunks =
        store.with_conn(|conn| admin::list_chunks(conn, agent, kind, superseded, limit))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
        return Ok(());
    }
    for chunk in chunks {
        let marker = if chunk.superseded_by.is_some() { "x" } else { " " };
        println!(
            "{} {} [{}] i={:.2} n={} {}",
            marker,
            chunk.id,
            chunk.kind,
            chunk.running_intensity.value(),
            chunk.encounter_count,
            chunk.content
        );
    }
    Ok(())
}

pub fn blocks(db: &Path, agent: &str, json: bool) -> Result<()> {
    let store = open_existing(db)?;
    let blocks = store.with_conn(|conn| block_ops::list_blocks(conn, agent))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&blocks)?);
        return Ok(());
    }
    for block in blocks {
        let scope = if block.scope.is_empty() { "(global)" } else { block.scope.as_str() };
        println!("{scope}/{}  {} bytes", block.key, block.value.len());
    }
    Ok(())
}

pub fn block(db: &Path, agent: &str, key: &str, json: bool) -> Result<()> {
    let store = open_existing(db)?;
    let block = store.with_conn(|conn| block_ops::get_block(conn, agent, key, ""))?;
    match block {
        Some(block) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&block)?);
            } else {
                println!("{}", block.value);
            }
            Ok(())
        }
        None => bail!("block '{key}' not found for agent '{agent}'"),
    }
}
