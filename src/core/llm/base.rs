use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::session::{Role, Turn};

/// Error types for reasoning calls
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LLMError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Provider error: {0}")]
    ProviderError(String),
    #[error("Provider returned an empty reply")]
    EmptyResponse,
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Reasoning timed out after {0:?}")]
    Timeout(Duration),
}

/// One message of the conversation sent to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role,
            content: turn.content.clone(),
        }
    }
}

/// Everything a provider needs to produce one reply
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningRequest {
    /// Agent system prompt, without retrieved knowledge
    pub system_prompt: String,
    /// Ordered history, ending with the user turn being answered
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Retrieved snippets, in retrieval order
    pub knowledge: Vec<String>,
}

impl ReasoningRequest {
    /// System prompt with retrieved knowledge appended verbatim.
    pub fn system_prompt_with_knowledge(&self) -> String {
        if self.knowledge.is_empty() {
            return self.system_prompt.clone();
        }
        let knowledge_text = self
            .knowledge
            .iter()
            .map(|chunk| format!("- {chunk}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}\n\nRelevant Knowledge:\n{knowledge_text}", self.system_prompt)
    }
}

/// Connection settings for a reasoning provider
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LLMConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
}

impl LLMConfig {
    pub(crate) fn base_url_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.base_url
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
    }
}

/// Conversational reasoning capability
#[async_trait]
pub trait BaseLLM: Send + Sync {
    /// Produce a reply. An empty or whitespace-only reply is an error.
    async fn complete(&self, request: &ReasoningRequest) -> Result<String, LLMError>;

    /// Model identifier used for requests
    fn model(&self) -> &str;

    fn get_provider_info(&self) -> &'static str;
}

/// Map a non-success HTTP status into the matching error variant
pub(crate) fn status_error(status: reqwest::StatusCode, message: String) -> LLMError {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        LLMError::AuthenticationFailed(message)
    } else {
        LLMError::ProviderError(message)
    }
}

/// Reject blank replies, trimming surrounding whitespace otherwise
pub(crate) fn non_empty(reply: String) -> Result<String, LLMError> {
    let trimmed = reply.trim();
    if trimmed.is_empty() {
        Err(LLMError::EmptyResponse)
    } else {
        Ok(trimmed.to_string())
    }
}
