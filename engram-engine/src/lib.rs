//! # engram-engine
//!
//! The memory engine proper: fact extraction and conflict
//! classification, the remember-facts pipeline, the hash-deduplicated
//! store-memory path, the scored recall scan, transactional forgetting,
//! and the memory-block tools.
//!
//! The engine suspends at exactly two points: embedding calls and LLM
//! calls. Everything else runs synchronously against the store, and no
//! transaction ever spans an external call.

pub mod blocks;
pub mod classify;
pub mod engine;
pub mod extraction;
pub mod forget;
pub mod mutate;
pub mod recall;
pub mod remember;
pub mod store_memory;

pub use blocks::{AppendBlockOutcome, ReplaceBlockOutcome};
pub use classify::Verdict;
pub use engine::MemoryEngine;
pub use extraction::ExtractedFact;
pub use recall::RecallHit;
pub use remember::RememberAction;
pub use store_memory::StoreOutcome;
