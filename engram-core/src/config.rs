//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Tunable limits for the engine. `Default` matches the documented
/// behavior; deployments override individual fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum remember_facts input length, in characters.
    pub max_text_length: usize,
    /// Optional bound on store_memory content length, in characters.
    pub max_content_length: Option<usize>,
    /// Cap on the working set loaded for a remember-facts batch.
    pub max_search_facts: usize,
    /// Cap on the candidate set scanned by recall.
    pub max_search_chunks: usize,
    /// Recall drops candidates below this cosine similarity.
    pub min_similarity: f64,
    /// Default similarity threshold for forget_memory.
    pub forget_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_text_length: constants::MAX_TEXT_LENGTH,
            max_content_length: None,
            max_search_facts: constants::MAX_SEARCH_FACTS,
            max_search_chunks: constants::MAX_SEARCH_CHUNKS,
            min_similarity: constants::MIN_SIMILARITY,
            forget_threshold: constants::DEFAULT_FORGET_THRESHOLD,
        }
    }
}
