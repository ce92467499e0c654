use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::EngramResult;

/// Role of a chat message sent to the LLM capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmRole {
    System,
    User,
    Assistant,
}

impl LlmRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone)]
pub struct LlmMessage {
    pub role: LlmRole,
    pub content: String,
}

impl LlmMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: LlmRole::User,
            content: content.into(),
        }
    }
}

/// Stateless, non-streaming completion client.
#[async_trait]
pub trait ILlmClient: Send + Sync {
    /// Run a completion over the messages with the given system prompt
    /// and return the raw response text.
    async fn complete(
        &self,
        messages: &[LlmMessage],
        system_prompt: &str,
        cancel: &CancellationToken,
    ) -> EngramResult<String>;
}
