//! Subcommand implementations.

mod inspect;
mod mutate;
mod search;
mod transfer;

pub use inspect::{agents, block, blocks, chunks, init, stats};
pub use mutate::{delete, purge};
pub use search::search;
pub use transfer::{export, import};

use std::path::Path;

use anyhow::{Context, Result};

use engram_storage::Store;

/// Open an existing database or fail with a non-zero exit.
pub(crate) fn open_existing(db: &Path) -> Result<Store> {
    Store::open_existing(db).with_context(|| format!("cannot open database {}", db.display()))
}

/// Ask for confirmation on stdin unless `--force` was given.
pub(crate) fn confirm(prompt: &str, force: bool) -> Result<bool> {
    if force {
        return Ok(true);
    }
    eprint!("{prompt} [y/N] ");
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
