//! Tuning constants for the strength model and the conflict pipeline.

/// Engram system version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Base exponential decay rate per hour.
pub const DECAY_LAMBDA: f64 = 0.001;

/// Additive intensity bump applied on retrieval, clamped to 1.0.
pub const RETRIEVAL_BOOST: f64 = 0.02;

/// Chunks whose effective strength falls below this are invisible to recall.
pub const STRENGTH_FLOOR: f64 = 0.05;

/// Composite search score weights. Must sum to 1.0.
pub const WEIGHT_SIMILARITY: f64 = 0.6;
pub const WEIGHT_STRENGTH: f64 = 0.3;
pub const WEIGHT_RECENCY: f64 = 0.1;

/// Below this similarity a new fact is inserted without classification.
pub const AMBIGUOUS_THRESHOLD: f64 = 0.78;

/// Above this similarity a new fact is a duplicate without an LLM call.
pub const DUPLICATE_THRESHOLD: f64 = 0.93;

/// Conflict candidates considered per extracted fact.
pub const CONFLICT_TOP_K: usize = 5;

/// Cap on the working set loaded for a remember-facts batch.
pub const MAX_SEARCH_FACTS: usize = 10_000;

/// Cap on the candidate set scanned by recall.
pub const MAX_SEARCH_CHUNKS: usize = 10_000;

/// Recall drops candidates below this cosine similarity.
pub const MIN_SIMILARITY: f64 = 0.1;

/// Default similarity threshold for forget_memory.
pub const DEFAULT_FORGET_THRESHOLD: f64 = 0.7;

/// Maximum input length for remember_facts, in characters.
pub const MAX_TEXT_LENGTH: usize = 10_000;

/// Recall result limit: default and clamp bounds.
pub const DEFAULT_RECALL_LIMIT: usize = 10;
pub const MIN_RECALL_LIMIT: usize = 1;
pub const MAX_RECALL_LIMIT: usize = 50;

/// The fixed intensity reading used when store_memory strengthens an
/// existing memory.
pub const MEMORY_REINFORCE_READING: f64 = 0.5;

/// Append warns (in the human-readable text only) past this many bytes.
pub const BLOCK_SIZE_WARN_BYTES: usize = 100 * 1024;
