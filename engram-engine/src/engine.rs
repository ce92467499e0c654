//! MemoryEngine — owns the store and the injected capabilities.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use engram_core::config::EngineConfig;
use engram_core::errors::{EngramError, EngramResult};
use engram_core::traits::{IEmbeddingProvider, ILlmClient};
use engram_storage::Store;

/// The engine context: database handle, prepared statements, and
/// capability objects, with explicit lifetime. No singletons.
pub struct MemoryEngine {
    pub(crate) store: Store,
    pub(crate) embedder: Arc<dyn IEmbeddingProvider>,
    pub(crate) llm: Arc<dyn ILlmClient>,
    pub(crate) config: EngineConfig,
}

impl MemoryEngine {
    /// Open a file-backed engine. The embedding model is pinned in the
    /// database on first open; a different model later is a fatal
    /// `ModelMismatch`.
    pub fn open(
        path: &Path,
        embedder: Arc<dyn IEmbeddingProvider>,
        llm: Arc<dyn ILlmClient>,
        config: EngineConfig,
    ) -> EngramResult<Self> {
        let store = Store::open(path)?;
        Self::from_store(store, embedder, llm, config)
    }

    /// Open an in-memory engine (for testing).
    pub fn open_in_memory(
        embedder: Arc<dyn IEmbeddingProvider>,
        llm: Arc<dyn ILlmClient>,
        config: EngineConfig,
    ) -> EngramResult<Self> {
        let store = Store::open_in_memory()?;
        Self::from_store(store, embedder, llm, config)
    }

    /// Wrap an already-open store, verifying the model pin.
    pub fn from_store(
        store: Store,
        embedder: Arc<dyn IEmbeddingProvider>,
        llm: Arc<dyn ILlmClient>,
        config: EngineConfig,
    ) -> EngramResult<Self> {
        store.verify_embedding_model(embedder.model_id())?;
        Ok(Self {
            store,
            embedder,
            llm,
            config,
        })
    }

    /// Direct store access for inspection tooling.
    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Embed a text, then re-check the token so no database write
    /// happens after cancellation.
    pub(crate) async fn embed_checked(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> EngramResult<Vec<f32>> {
        let embedding = self.embedder.embed(text, cancel).await?;
        if cancel.is_cancelled() {
            return Err(EngramError::Cancelled);
        }
        Ok(embedding)
    }
}
