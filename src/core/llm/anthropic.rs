//! Anthropic messages API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::base::{
    BaseLLM, LLMConfig, LLMError, ReasoningRequest, non_empty, status_error,
};

pub const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic messages client
pub struct AnthropicLLM {
    config: LLMConfig,
    client: Client,
}

impl AnthropicLLM {
    pub fn new(mut config: LLMConfig) -> Result<Self, LLMError> {
        if config.api_key.is_empty() {
            return Err(LLMError::AuthenticationFailed(
                "Anthropic API key is required".to_string(),
            ));
        }
        if config.model.is_empty() {
            config.model = DEFAULT_ANTHROPIC_MODEL.to_string();
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| LLMError::InvalidConfiguration(format!("HTTP client: {e}")))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl BaseLLM for AnthropicLLM {
    async fn complete(&self, request: &ReasoningRequest) -> Result<String, LLMError> {
        let system = request.system_prompt_with_knowledge();
        let body = MessagesRequest {
            model: &self.config.model,
            system: &system,
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let url = format!("{}/v1/messages", self.config.base_url_or(ANTHROPIC_API_BASE));
        let response = self
            .client
            .post(url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LLMError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(
                status,
                format!("Anthropic error ({status}): {text}"),
            ));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ProviderError(format!("Failed to parse response: {e}")))?;

        let reply: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();
        debug!(model = %self.config.model, chars = reply.len(), "Anthropic reply received");
        non_empty(reply)
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn get_provider_info(&self) -> &'static str {
        "Anthropic Messages"
    }
}
