//! OpenAI-compatible `/v1/chat/completions` client for the LLM
//! capability, plus a no-op fallback for LLM-less deployments.

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use engram_core::errors::{EngramError, EngramResult};
use engram_core::traits::{ILlmClient, LlmMessage};

/// Stateless, non-streaming chat client.
pub struct HttpLlmClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageBody,
}

#[derive(Deserialize)]
struct ChatMessageBody {
    content: Option<String>,
}

impl HttpLlmClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
        }
    }

    async fn request(&self, messages: &[LlmMessage], system_prompt: &str) -> EngramResult<String> {
        let mut body_messages = vec![serde_json::json!({
            "role": "system",
            "content": system_prompt,
        })];
        for m in messages {
            body_messages.push(serde_json::json!({
                "role": m.role.as_str(),
                "content": m.content,
            }));
        }
        let body = serde_json::json!({
            "model": self.model,
            "messages": body_messages,
            "temperature": 0.0,
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| EngramError::llm(format!("request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EngramError::llm(format!("endpoint returned {status}: {detail}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| EngramError::llm(format!("malformed response: {e}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| EngramError::llm("response carried no choices"))?;
        Ok(content)
    }
}

#[async_trait]
impl ILlmClient for HttpLlmClient {
    async fn complete(
        &self,
        messages: &[LlmMessage],
        system_prompt: &str,
        cancel: &CancellationToken,
    ) -> EngramResult<String> {
        tokio::select! {
            _ = cancel.cancelled() => Err(EngramError::Cancelled),
            result = self.request(messages, system_prompt) => result,
        }
    }
}

/// Fallback for deployments without an LLM endpoint: extraction finds
/// nothing and classification stays at its DISTINCT default, so
/// remember_facts degrades to a no-op while every other tool works.
pub struct NullLlmClient;

#[async_trait]
impl ILlmClient for NullLlmClient {
    async fn complete(
        &self,
        _messages: &[LlmMessage],
        _system_prompt: &str,
        cancel: &CancellationToken,
    ) -> EngramResult<String> {
        if cancel.is_cancelled() {
            return Err(EngramError::Cancelled);
        }
        Ok("[]".to_string())
    }
}
