//! Capability traits injected into the engine.
//!
//! The embedding function and the LLM client are the engine's only
//! suspension points. Both accept a cancellation token; on cancellation
//! the in-flight call is abandoned and the current operation fails with
//! `Cancelled` without further database writes.

pub mod embedding;
pub mod llm;

pub use embedding::IEmbeddingProvider;
pub use llm::{ILlmClient, LlmMessage, LlmRole};
