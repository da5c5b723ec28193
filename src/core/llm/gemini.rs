//! Google Gemini `generateContent`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::base::{
    BaseLLM, LLMConfig, LLMError, ReasoningRequest, non_empty, status_error,
};
use crate::core::session::Role;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Gemini client
pub struct GeminiLLM {
    config: LLMConfig,
    client: Client,
}

impl GeminiLLM {
    pub fn new(mut config: LLMConfig) -> Result<Self, LLMError> {
        if config.api_key.is_empty() {
            return Err(LLMError::AuthenticationFailed(
                "Google API key is required".to_string(),
            ));
        }
        if config.model.is_empty() {
            config.model = DEFAULT_GEMINI_MODEL.to_string();
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| LLMError::InvalidConfiguration(format!("HTTP client: {e}")))?;
        Ok(Self { config, client })
    }
}

fn gemini_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

#[async_trait]
impl BaseLLM for GeminiLLM {
    async fn complete(&self, request: &ReasoningRequest) -> Result<String, LLMError> {
        let system = request.system_prompt_with_knowledge();
        let body = GenerateContentRequest {
            contents: request
                .messages
                .iter()
                .map(|m| Content {
                    role: gemini_role(m.role),
                    parts: vec![TextPart { text: &m.content }],
                })
                .collect(),
            system_instruction: (!system.is_empty()).then(|| SystemInstruction {
                parts: vec![TextPart { text: &system }],
            }),
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url_or(GEMINI_API_BASE),
            self.config.model
        );
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LLMError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, format!("Gemini error ({status}): {text}")));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ProviderError(format!("Failed to parse response: {e}")))?;

        let reply: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        debug!(model = %self.config.model, chars = reply.len(), "Gemini reply received");
        non_empty(reply)
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn get_provider_info(&self) -> &'static str {
        "Google Gemini"
    }
}
