use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::ModelSettings;

/// Role tag for a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single role-tagged message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Generation parameters forwarded with every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: usize,
}

impl From<&ModelSettings> for GenerationParams {
    fn from(settings: &ModelSettings) -> Self {
        Self {
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

/// One request to the model client: messages, packed context, parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRequest {
    pub messages: Vec<ChatMessage>,
    pub params: GenerationParams,
}

/// Response from a model
#[derive(Debug, Clone)]
pub struct ModelReply {
    /// The reply text: a thought and an optional structured tool call
    pub content: String,
    /// Usage statistics if the provider reports them
    pub usage: Option<TokenUsage>,
    /// Model that generated the response
    pub model_name: String,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// Failure modes surfaced by a model client
///
/// Clients retry transient faults with bounded backoff themselves; by the
/// time either variant reaches the agent loop it is final, and the loop
/// fails the session.
#[derive(Error, Debug, Clone)]
pub enum ModelError {
    #[error("transient model failure (retries exhausted): {0}")]
    Transient(String),

    #[error("fatal model failure: {0}")]
    Fatal(String),
}

impl ModelError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ModelError::Fatal(_))
    }
}
