//! Error types shared across the Engram workspace.

/// Result alias used by every crate in the workspace.
pub type EngramResult<T> = Result<T, EngramError>;

/// All failure modes surfaced by the engine.
///
/// Precondition failures on block and chunk operations (missing block,
/// empty `old_text`, ...) are NOT errors; they are structured outcomes
/// in the respective result enums, so callers can render them without
/// unwinding.
#[derive(Debug, thiserror::Error)]
pub enum EngramError {
    #[error("SQLite error: {message}")]
    Storage { message: String },

    /// Busy/locked storage error. Swallowed only during the best-effort
    /// retrieval boost in recall; surfaced everywhere else.
    #[error("SQLite busy: {message}")]
    StorageBusy { message: String },

    #[error("embedding model mismatch: database is pinned to '{pinned}', got '{requested}'")]
    ModelMismatch { pinned: String, requested: String },

    #[error("vector length mismatch: {left} vs {right}")]
    VectorLenMismatch { left: usize, right: usize },

    #[error("zero-length vector")]
    ZeroLengthVector,

    #[error("unsafe table identifier: '{name}'")]
    UnsafeIdentifier { name: String },

    #[error("input too long: {length} characters (max {max})")]
    InputTooLong { length: usize, max: usize },

    #[error("metadata is not valid JSON: {reason}")]
    InvalidMetadata { reason: String },

    #[error("chunk not found: {id}")]
    ChunkNotFound { id: String },

    #[error("embedding provider error: {message}")]
    Embedding { message: String },

    #[error("LLM client error: {message}")]
    Llm { message: String },

    #[error("operation cancelled")]
    Cancelled,
}

impl EngramError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
        }
    }

    /// Whether this error is a transient busy/locked condition that the
    /// recall boost is allowed to swallow.
    pub fn is_transient_busy(&self) -> bool {
        matches!(self, Self::StorageBusy { .. })
    }

    /// Machine-readable discriminator for tool `details` payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Storage { .. } => "storage_error",
            Self::StorageBusy { .. } => "storage_busy",
            Self::ModelMismatch { .. } => "model_mismatch",
            Self::VectorLenMismatch { .. } => "vector_len_mismatch",
            Self::ZeroLengthVector => "zero_length_vector",
            Self::UnsafeIdentifier { .. } => "unsafe_identifier",
            Self::InputTooLong { .. } => "input_too_long",
            Self::InvalidMetadata { .. } => "invalid_metadata",
            Self::ChunkNotFound { .. } => "chunk_not_found",
            Self::Embedding { .. } => "embedding_error",
            Self::Llm { .. } => "llm_error",
            Self::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_classification() {
        assert!(EngramError::StorageBusy {
            message: "database is locked".into()
        }
        .is_transient_busy());
        assert!(!EngramError::storage("disk I/O error").is_transient_busy());
        assert!(!EngramError::Cancelled.is_transient_busy());
    }

    #[test]
    fn display_includes_detail() {
        let e = EngramError::ModelMismatch {
            pinned: "text-embedding-3-small".into(),
            requested: "nomic-embed-text".into(),
        };
        let s = e.to_string();
        assert!(s.contains("text-embedding-3-small"));
        assert!(s.contains("nomic-embed-text"));
    }
}
