//! Stub embedding and LLM capabilities for integration tests.
//!
//! `StubEmbedder` returns pinned vectors for known texts and a
//! deterministic token-hash vector otherwise. `ScriptedLlm` replays a
//! queue of canned responses and records every call.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use engram_core::errors::{EngramError, EngramResult};
use engram_core::traits::{IEmbeddingProvider, ILlmClient, LlmMessage};

/// Embedder with an explicit text → vector table. Unknown texts get a
/// deterministic hash-bucket vector so distinct texts rarely collide.
pub struct StubEmbedder {
    mapping: Mutex<HashMap<String, Vec<f32>>>,
    dimensions: usize,
    model: String,
}

impl StubEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            mapping: Mutex::new(HashMap::new()),
            dimensions,
            model: "stub-embedder".to_string(),
        }
    }

    /// Pin the vector returned for an exact text.
    pub fn pin(&self, text: &str, vector: Vec<f32>) {
        self.mapping
            .lock()
            .unwrap()
            .insert(text.to_string(), vector);
    }

    fn fallback_vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimensions];
        for token in text.split_whitespace() {
            let mut h: u64 = 0xcbf29ce484222325;
            for b in token.to_lowercase().as_bytes() {
                h ^= *b as u64;
                h = h.wrapping_mul(0x100000001b3);
            }
            v[(h as usize) % self.dimensions] += 1.0;
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
impl IEmbeddingProvider for StubEmbedder {
    async fn embed(&self, text: &str, cancel: &CancellationToken) -> EngramResult<Vec<f32>> {
        if cancel.is_cancelled() {
            return Err(EngramError::Cancelled);
        }
        if let Some(v) = self.mapping.lock().unwrap().get(text) {
            return Ok(v.clone());
        }
        Ok(self.fallback_vector(text))
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// One recorded LLM call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system_prompt: String,
    pub user_content: String,
}

/// LLM stub replaying a response queue front-to-back. When the queue
/// runs dry it answers `[]`, which both the extractor and the
/// classifier treat as a harmless no-op.
#[derive(Default)]
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(responses: &[&str]) -> Self {
        let llm = Self::new();
        for r in responses {
            llm.push_response(r);
        }
        llm
    }

    pub fn push_response(&self, response: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(response.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ILlmClient for ScriptedLlm {
    async fn complete(
        &self,
        messages: &[LlmMessage],
        system_prompt: &str,
        cancel: &CancellationToken,
    ) -> EngramResult<String> {
        if cancel.is_cancelled() {
            return Err(EngramError::Cancelled);
        }
        self.calls.lock().unwrap().push(RecordedCall {
            system_prompt: system_prompt.to_string(),
            user_content: messages
                .first()
                .map(|m| m.content.clone())
                .unwrap_or_default(),
        });
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "[]".to_string());
        Ok(response)
    }
}
