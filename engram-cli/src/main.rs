//! `engram` — inspection CLI over an Engram database.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use engram_core::chunk::ChunkKind;

#[derive(Parser)]
#[command(name = "engram", about = "Inspect and manage Engram memory databases", version)]
struct Cli {
    /// Path to the database file.
    #[arg(long, global = true, env = "ENGRAM_DB_PATH", default_value = "engram.db")]
    db: PathBuf,

    /// Emit machine-readable JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database file and schema.
    Init,
    /// Whole-database counters.
    Stats,
    /// List agents with chunk counts.
    Agents,
    /// List chunks for an agent.
    Chunks {
        agent: String,
        /// Restrict to one kind: f (facts) or m (memories).
        #[arg(long, value_parser = parse_kind)]
        kind: Option<ChunkKind>,
        /// Include superseded chunks.
        #[arg(long)]
        superseded: bool,
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// List memory blocks for an agent.
    Blocks { agent: String },
    /// Show one memory block.
    Block { agent: String, key: String },
    /// Semantic search across chunks.
    Search {
        text: String,
        /// Restrict to one agent; searches every agent otherwise.
        #[arg(long)]
        agent: Option<String>,
        #[arg(long, value_parser = parse_kind)]
        kind: Option<ChunkKind>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Delete chunks by id.
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Skip the confirmation prompt.
        #[arg(long)]
        force: bool,
    },
    /// Bulk-delete chunks, optionally filtered.
    Purge {
        #[arg(long)]
        agent: Option<String>,
        /// Only chunks created before this ISO-8601 timestamp.
        #[arg(long)]
        before: Option<String>,
        #[arg(long)]
        force: bool,
    },
    /// Export an agent's chunks and blocks as JSON.
    Export { agent: String },
    /// Import a previously exported file. Existing rows are skipped.
    Import { file: PathBuf },
}

fn parse_kind(value: &str) -> Result<ChunkKind, String> {
    match value {
        "f" | "fact" => Ok(ChunkKind::Fact),
        "m" | "memory" => Ok(ChunkKind::Memory),
        other => Err(format!("expected 'f' or 'm', got '{other}'")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Init => commands::init(&cli.db, cli.json),
        Command::Stats => commands::stats(&cli.db, cli.json),
        Command::Agents => commands::agents(&cli.db, cli.json),
        Command::Chunks {
            agent,
            kind,
            superseded,
            limit,
        } => commands::chunks(&cli.db, &agent, kind, superseded, limit, cli.json),
        Command::Blocks { agent } => commands::blocks(&cli.db, &agent, cli.json),
        Command::Block { agent, key } => commands::block(&cli.db, &agent, &key, cli.json),
        Command::Search {
            text,
            agent,
            kind,
            limit,
        } => commands::search(&cli.db, &text, agent.as_deref(), kind, limit, cli.json).await,
        Command::Delete { ids, force } => commands::delete(&cli.db, &ids, force, cli.json),
        Command::Purge {
            agent,
            before,
            force,
        } => commands::purge(&cli.db, agent.as_deref(), before.as_deref(), force, cli.json),
        Command::Export { agent } => commands::export(&cli.db, &agent),
        Command::Import { file } => commands::import(&cli.db, &file, cli.json),
    }
}
