//! OpenAI-compatible `/v1/embeddings` HTTP provider.

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use engram_core::errors::{EngramError, EngramResult};
use engram_core::traits::IEmbeddingProvider;

/// Remote embedding provider speaking the OpenAI embeddings wire shape.
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
            dimensions,
        }
    }

    async fn request(&self, text: &str) -> EngramResult<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngramError::embedding(format!("request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EngramError::embedding(format!(
                "endpoint returned {status}: {detail}"
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| EngramError::embedding(format!("malformed response: {e}")))?;
        let row = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| EngramError::embedding("response carried no embeddings"))?;
        if row.embedding.len() != self.dimensions {
            return Err(EngramError::embedding(format!(
                "expected {} dimensions, endpoint returned {}",
                self.dimensions,
                row.embedding.len()
            )));
        }
        Ok(row.embedding)
    }
}

#[async_trait]
impl IEmbeddingProvider for HttpEmbedder {
    async fn embed(&self, text: &str, cancel: &CancellationToken) -> EngramResult<Vec<f32>> {
        tokio::select! {
            _ = cancel.cancelled() => Err(EngramError::Cancelled),
            result = self.request(text) => result,
        }
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
