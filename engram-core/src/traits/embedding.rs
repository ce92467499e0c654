use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::EngramResult;

/// Embedding generation provider.
///
/// All vectors written to one database must share dimensionality; the
/// model id is pinned in the engine metadata table on first use.
#[async_trait]
pub trait IEmbeddingProvider: Send + Sync {
    /// Embed a single text, returning a vector of floats.
    async fn embed(&self, text: &str, cancel: &CancellationToken) -> EngramResult<Vec<f32>>;

    /// Identifier of the embedding model, used for the database pin.
    fn model_id(&self) -> &str;

    /// The dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;
}
