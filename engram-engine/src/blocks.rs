//! Memory-block tools: recall, replace, append.
//!
//! Precondition failures are structured outcomes, not errors; the
//! caller renders them with a machine-readable discriminator.

use chrono::Utc;
use serde::Serialize;

use engram_core::chunk::MemoryBlock;
use engram_core::constants::BLOCK_SIZE_WARN_BYTES;
use engram_core::errors::EngramResult;
use engram_storage::queries::block_ops;
use engram_storage::scope::normalize_scope;

use crate::engine::MemoryEngine;

/// Outcome of a replace_block call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReplaceBlockOutcome {
    Replaced { replacements: usize },
    BlockNotFound,
    EmptyOldText,
    TextNotFound,
}

impl ReplaceBlockOutcome {
    /// Machine-readable discriminator for tool `details` payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Replaced { .. } => "replaced",
            Self::BlockNotFound => "block_not_found",
            Self::EmptyOldText => "empty_old_text",
            Self::TextNotFound => "text_not_found",
        }
    }
}

/// Outcome of an append_block call.
#[derive(Debug, Clone, Serialize)]
pub struct AppendBlockOutcome {
    /// False when the block existed and was extended.
    pub created: bool,
    /// UTF-8 size of the block after the append.
    pub total_bytes: usize,
}

impl AppendBlockOutcome {
    /// Whether the human-readable response should carry a size warning.
    pub fn oversized(&self) -> bool {
        self.total_bytes > BLOCK_SIZE_WARN_BYTES
    }
}

impl MemoryEngine {
    /// Fetch a block. Missing blocks are None, not an error.
    pub fn recall_block(
        &self,
        agent_id: &str,
        key: &str,
        scope: Option<&str>,
    ) -> EngramResult<Option<MemoryBlock>> {
        let scope = normalize_scope(scope);
        self.store
            .with_conn(|conn| block_ops::get_block(conn, agent_id, key, &scope))
    }

    /// Replace all non-overlapping occurrences of `old_text`,
    /// left-to-right.
    pub fn replace_block(
        &self,
        agent_id: &str,
        key: &str,
        old_text: &str,
        new_text: &str,
        scope: Option<&str>,
    ) -> EngramResult<ReplaceBlockOutcome> {
        let scope = normalize_scope(scope);
        let Some(block) = self
            .store
            .with_conn(|conn| block_ops::get_block(conn, agent_id, key, &scope))?
        else {
            return Ok(ReplaceBlockOutcome::BlockNotFound);
        };
        if old_text.is_empty() {
            return Ok(ReplaceBlockOutcome::EmptyOldText);
        }
        let replacements = block.value.matches(old_text).count();
        if replacements == 0 {
            return Ok(ReplaceBlockOutcome::TextNotFound);
        }

        let value = block.value.replace(old_text, new_text);
        self.store.with_conn(|conn| {
            block_ops::upsert_block(conn, agent_id, &scope, key, &value, Utc::now())
        })?;
        Ok(ReplaceBlockOutcome::Replaced { replacements })
    }

    /// Append to a block, creating it if missing. Existing content is
    /// separated from the new content with a newline.
    pub fn append_block(
        &self,
        agent_id: &str,
        key: &str,
        text: &str,
        scope: Option<&str>,
    ) -> EngramResult<AppendBlockOutcome> {
        let scope = normalize_scope(scope);
        let existing = self
            .store
            .with_conn(|conn| block_ops::get_block(conn, agent_id, key, &scope))?;

        let (created, value) = match existing {
            Some(block) => (false, format!("{}\n{}", block.value, text)),
            None => (true, text.to_string()),
        };
        let total_bytes = value.len();
        self.store.with_conn(|conn| {
            block_ops::upsert_block(conn, agent_id, &scope, key, &value, Utc::now())
        })?;
        Ok(AppendBlockOutcome {
            created,
            total_bytes,
        })
    }
}
