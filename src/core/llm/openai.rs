//! OpenAI chat completions.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::base::{
    BaseLLM, LLMConfig, LLMError, ReasoningRequest, non_empty, status_error,
};

pub const OPENAI_API_BASE: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI chat completions client
pub struct OpenAILLM {
    config: LLMConfig,
    client: Client,
}

impl OpenAILLM {
    pub fn new(mut config: LLMConfig) -> Result<Self, LLMError> {
        if config.api_key.is_empty() {
            return Err(LLMError::AuthenticationFailed(
                "OpenAI API key is required".to_string(),
            ));
        }
        if config.model.is_empty() {
            config.model = DEFAULT_OPENAI_MODEL.to_string();
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| LLMError::InvalidConfiguration(format!("HTTP client: {e}")))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl BaseLLM for OpenAILLM {
    async fn complete(&self, request: &ReasoningRequest) -> Result<String, LLMError> {
        let system = request.system_prompt_with_knowledge();
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if !system.is_empty() {
            messages.push(WireMessage {
                role: "system",
                content: &system,
            });
        }
        messages.extend(request.messages.iter().map(|m| WireMessage {
            role: m.role.as_str(),
            content: &m.content,
        }));

        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url_or(OPENAI_API_BASE)
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LLMError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, format!("OpenAI error ({status}): {text}")));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ProviderError(format!("Failed to parse response: {e}")))?;

        let reply = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        debug!(model = %self.config.model, chars = reply.len(), "OpenAI completion received");
        non_empty(reply)
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn get_provider_info(&self) -> &'static str {
        "OpenAI Chat Completions"
    }
}
