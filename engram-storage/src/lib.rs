//! # engram-storage
//!
//! SQLite persistence for the Engram memory system: schema and
//! migrations, the embedding-model pin, the scoped query layer over a
//! cached-statement connection, and the conversation FTS adapter.

pub mod fts;
pub mod migrations;
pub mod queries;
pub mod scope;
pub mod store;

pub use fts::{ConversationHit, ConversationSearch, ConversationSearchOutcome};
pub use store::Store;

use engram_core::EngramError;

/// Map a rusqlite error into the workspace error type, classifying
/// busy/locked conditions so the recall boost can swallow them.
pub(crate) fn to_storage_err(e: rusqlite::Error) -> EngramError {
    if let Some(code) = e.sqlite_error_code() {
        if matches!(
            code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        ) {
            return EngramError::StorageBusy {
                message: e.to_string(),
            };
        }
    }
    EngramError::Storage {
        message: e.to_string(),
    }
}

/// Whether a storage error is a unique-constraint violation. The
/// store-memory path uses this to detect a concurrent writer winning
/// the insert race and fall back to reinforcement.
pub fn is_unique_violation(e: &EngramError) -> bool {
    matches!(e, EngramError::Storage { message } if message.contains("UNIQUE constraint failed"))
}
