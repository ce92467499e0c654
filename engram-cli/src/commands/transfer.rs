//! Export and import of a single agent's memory.
//!
//! The file format is versioned JSON with Base64-encoded embedding
//! blobs. Import is insert-or-ignore on primary keys; rows that already
//! exist are counted as skipped, never overwritten.

use std::path::Path;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use engram_core::chunk::{Chunk, ChunkKind, Intensity};
use engram_core::vector;
use engram_storage::queries::{admin, block_ops};
use engram_storage::Store;

use super::open_existing;

pub const EXPORT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFile {
    pub version: u32,
    pub agent_id: String,
    pub exported_at: String,
    pub chunks: Vec<ExportChunk>,
    pub blocks: Vec<ExportBlock>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportChunk {
    pub id: String,
    pub scope: String,
    pub content: String,
    pub content_hash: Option<String>,
    /// Base64 of the little-endian float32 blob.
    pub embedding: String,
    pub metadata: Option<String>,
    pub kind: String,
    pub running_intensity: f64,
    pub encounter_count: i64,
    pub access_count: i64,
    pub last_accessed_at: String,
    pub superseded_by: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBlock {
    pub scope: String,
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("bad timestamp '{s}'"))?
        .with_timezone(&Utc))
}

/// Collect an agent's chunks (superseded included) and blocks.
pub fn build_export(store: &Store, agent_id: &str) -> Result<ExportFile> {
    let chunks = store.with_conn(|conn| admin::all_chunks_for_agent(conn, agent_id))?;
    let blocks = store.with_conn(|conn| block_ops::list_blocks(conn, agent_id))?;

    Ok(ExportFile {
        version: EXPORT_VERSION,
        agent_id: agent_id.to_string(),
        exported_at: fmt_ts(Utc::now()),
        chunks: chunks
            .into_iter()
            .map(|c| ExportChunk {
                id: c.id,
                scope: c.scope,
                content: c.content,
                content_hash: c.content_hash,
                embedding: BASE64.encode(vector::to_blob(&c.embedding)),
                metadata: c.metadata,
                kind: c.kind.as_str().to_string(),
                running_intensity: c.running_intensity.value(),
                encounter_count: c.encounter_count,
                access_count: c.access_count,
                last_accessed_at: fmt_ts(c.last_accessed_at),
                superseded_by: c.superseded_by,
                created_at: fmt_ts(c.created_at),
            })
            .collect(),
        blocks: blocks
            .into_iter()
            .map(|b| ExportBlock {
                scope: b.scope,
                key: b.key,
                value: b.value,
                updated_at: fmt_ts(b.updated_at),
            })
            .collect(),
    })
}

/// Apply an export file. Returns (inserted, skipped) counts over chunks
/// and blocks combined.
pub fn apply_import(store: &Store, file: &ExportFile) -> Result<(usize, usize)> {
    if file.version != EXPORT_VERSION {
        bail!("unsupported export version {}", file.version);
    }

    let mut inserted = 0usize;
    let mut skipped = 0usize;
    for raw in &file.chunks {
        let Some(kind) = ChunkKind::parse(&raw.kind) else {
            bail!("unknown chunk kind '{}' in export", raw.kind);
        };
        let blob = BASE64
            .decode(&raw.embedding)
            .with_context(|| format!("bad embedding encoding on chunk {}", raw.id))?;
        let chunk = Chunk {
            id: raw.id.clone(),
            agent_id: file.agent_id.clone(),
            scope: raw.scope.clone(),
            content: raw.content.clone(),
            content_hash: raw.content_hash.clone(),
            embedding: vector::from_blob(&blob),
            metadata: raw.metadata.clone(),
            kind,
            running_intensity: Intensity::new(raw.running_intensity),
            encounter_count: raw.encounter_count,
            access_count: raw.access_count,
            last_accessed_at: parse_ts(&raw.last_accessed_at)?,
            superseded_by: raw.superseded_by.clone(),
            created_at: parse_ts(&raw.created_at)?,
        };
        let was_inserted = store.with_conn(|conn| admin::insert_chunk_ignore(conn, &chunk))?;
        if was_inserted {
            inserted += 1;
        } else {
            skipped += 1;
        }
    }

    for block in &file.blocks {
        let was_inserted = store.with_conn(|conn| {
            admin::insert_block_ignore(
                conn,
                &file.agent_id,
                &block.scope,
                &block.key,
                &block.value,
                &block.updated_at,
            )
        })?;
        if was_inserted {
            inserted += 1;
        } else {
            skipped += 1;
        }
    }
    Ok((inserted, skipped))
}

pub fn export(db: &Path, agent: &str) -> Result<()> {
    let store = open_existing(db)?;
    let file = build_export(&store, agent)?;
    println!("{}", serde_json::to_string_pretty(&file)?);
    Ok(())
}

pub fn import(db: &Path, path: &Path, json: bool) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let file: ExportFile = serde_json::from_str(&raw).context("malformed export file")?;

    // Import may target a fresh database.
    let store = Store::open(db)?;
    let (inserted, skipped) = apply_import(&store, &file)?;
    if json {
        println!(
            "{}",
            serde_json::json!({ "inserted": inserted, "skipped": skipped })
        );
    } else {
        println!("imported {inserted} row(s), skipped {skipped} duplicate(s)");
    }
    Ok(())
}
