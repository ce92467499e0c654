//! Deterministic term-hashing fallback provider.
//!
//! Produces dense vectors by hashing lowercase terms into
//! fixed-dimension buckets weighted by term frequency, then
//! L2-normalizing. Not as semantically rich as neural embeddings, but
//! always available and fully deterministic.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use engram_core::errors::{EngramError, EngramResult};
use engram_core::traits::IEmbeddingProvider;

/// Offline fallback embedder.
pub struct HashedEmbedder {
    dimensions: usize,
    model: String,
}

impl HashedEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            model: format!("hashed-tf-{dimensions}"),
        }
    }

    /// Hash a term into a bucket index using FNV-1a.
    fn hash_term(term: &str, dims: usize) -> usize {
        let mut h: u64 = 0xcbf29ce484222325;
        for b in term.as_bytes() {
            h ^= *b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        (h as usize) % dims
    }

    /// Tokenize text into lowercase alphanumeric terms.
    fn tokenize(text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|s| s.len() >= 2)
            .map(|s| s.to_lowercase())
            .collect()
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimensions];
        for term in Self::tokenize(text) {
            v[Self::hash_term(&term, self.dimensions)] += 1.0;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl IEmbeddingProvider for HashedEmbedder {
    async fn embed(&self, text: &str, cancel: &CancellationToken) -> EngramResult<Vec<f32>> {
        if cancel.is_cancelled() {
            return Err(EngramError::Cancelled);
        }
        Ok(self.vector(text))
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
