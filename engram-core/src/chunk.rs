//! Chunk and memory-block models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hash::content_hash;
use crate::id::new_chunk_id;

/// Whether a chunk is an extracted factual claim or raw stored content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    /// Atomic truth-bearing claim, subject to conflict resolution.
    Fact,
    /// Raw experiential content, deduplicated verbatim, never superseded.
    Memory,
}

impl ChunkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fact => "fact",
            Self::Memory => "memory",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fact" => Some(Self::Fact),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running intensity clamped to [0.0, 1.0].
/// A moving-average strength-like quantity, updated on encounters.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Intensity(f64);

impl Intensity {
    /// Create a new Intensity, clamping to [0.0, 1.0].
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    /// Get the raw f64 value.
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Intensity {
    fn default() -> Self {
        Self(0.5)
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

impl From<f64> for Intensity {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Intensity> for f64 {
    fn from(i: Intensity) -> Self {
        i.0
    }
}

/// A fact or memory row. The unit of storage, recall, and forgetting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// ULID — 26 chars, lexicographically ordered by creation time.
    pub id: String,
    /// Opaque namespace key; every query is agent-scoped.
    pub agent_id: String,
    /// Opaque partition within an agent; empty string is the global scope.
    pub scope: String,
    pub content: String,
    /// Hex SHA-256 of `content` for memories; None for facts.
    pub content_hash: Option<String>,
    /// Fixed-width float32 vector from the embedding capability.
    pub embedding: Vec<f32>,
    /// Caller-defined metadata, typically JSON.
    pub metadata: Option<String>,
    pub kind: ChunkKind,
    pub running_intensity: Intensity,
    /// Times this content has been encountered (>= 1).
    pub encounter_count: i64,
    /// Times this chunk has been returned by recall.
    pub access_count: i64,
    pub last_accessed_at: DateTime<Utc>,
    /// When set, the chunk is inactive: excluded from recall and from
    /// conflict candidacy.
    pub superseded_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    /// Compose a new fact chunk. Facts carry no content hash.
    pub fn new_fact(
        agent_id: &str,
        scope: &str,
        content: &str,
        embedding: Vec<f32>,
        intensity: Intensity,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_chunk_id(),
            agent_id: agent_id.to_string(),
            scope: scope.to_string(),
            content: content.to_string(),
            content_hash: None,
            embedding,
            metadata: None,
            kind: ChunkKind::Fact,
            running_intensity: intensity,
            encounter_count: 1,
            access_count: 0,
            last_accessed_at: now,
            superseded_by: None,
            created_at: now,
        }
    }

    /// Compose a new memory chunk. Memories are hash-deduplicated.
    pub fn new_memory(
        agent_id: &str,
        scope: &str,
        content: &str,
        embedding: Vec<f32>,
        metadata: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_chunk_id(),
            agent_id: agent_id.to_string(),
            scope: scope.to_string(),
            content: content.to_string(),
            content_hash: Some(content_hash(content)),
            embedding,
            metadata,
            kind: ChunkKind::Memory,
            running_intensity: Intensity::default(),
            encounter_count: 1,
            access_count: 0,
            last_accessed_at: now,
            superseded_by: None,
            created_at: now,
        }
    }

    /// An active chunk is recall-eligible and a conflict candidate.
    pub fn is_active(&self) -> bool {
        self.superseded_by.is_none()
    }
}

/// Named mutable text buffer keyed by `(agent_id, scope, key)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryBlock {
    pub agent_id: String,
    pub scope: String,
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensity_clamps() {
        assert_eq!(Intensity::new(1.7).value(), 1.0);
        assert_eq!(Intensity::new(-0.2).value(), 0.0);
        assert_eq!(Intensity::new(0.42).value(), 0.42);
    }

    #[test]
    fn kind_round_trips() {
        for kind in [ChunkKind::Fact, ChunkKind::Memory] {
            assert_eq!(ChunkKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ChunkKind::parse("episode"), None);
    }

    #[test]
    fn new_fact_has_no_hash() {
        let c = Chunk::new_fact("a1", "", "likes rust", vec![0.1, 0.2], Intensity::new(0.7));
        assert_eq!(c.kind, ChunkKind::Fact);
        assert!(c.content_hash.is_none());
        assert_eq!(c.encounter_count, 1);
        assert_eq!(c.access_count, 0);
        assert!(c.is_active());
        assert_eq!(c.id.len(), 26);
    }

    #[test]
    fn new_memory_hashes_content() {
        let c = Chunk::new_memory("a1", "project", "saw a heron", vec![1.0], None);
        assert_eq!(c.kind, ChunkKind::Memory);
        assert_eq!(c.content_hash.as_deref(), Some(crate::hash::content_hash("saw a heron").as_str()));
        assert_eq!(c.scope, "project");
    }
}
