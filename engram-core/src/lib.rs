//! # engram-core
//!
//! Foundation crate for the Engram memory system.
//! Defines all types, traits, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod chunk;
pub mod config;
pub mod constants;
pub mod errors;
pub mod hash;
pub mod id;
pub mod traits;
pub mod vector;

// Re-export the most commonly used types at the crate root.
pub use chunk::{Chunk, ChunkKind, Intensity, MemoryBlock};
pub use config::EngineConfig;
pub use errors::{EngramError, EngramResult};
