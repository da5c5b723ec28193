//! OpenAI Whisper batch transcription client.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use super::messages::{OpenAIErrorResponse, VerboseTranscriptionResponse};
use crate::core::audio::encode_wav;
use crate::core::stt::base::{BaseSTT, STTConfig, STTError, STTResult, status_error};

/// Default OpenAI API base URL
pub const OPENAI_API_BASE: &str = "https://api.openai.com";

/// Default transcription model
pub const DEFAULT_OPENAI_STT_MODEL: &str = "whisper-1";

/// Whisper rejects uploads above 25MB
const MAX_FILE_SIZE_BYTES: usize = 25 * 1024 * 1024;

/// OpenAI transcription provider.
///
/// Each utterance is wrapped in a WAV container and uploaded as a multipart
/// form to `/v1/audio/transcriptions`.
pub struct OpenAISTT {
    config: STTConfig,
    http_client: Client,
}

impl OpenAISTT {
    pub fn new(config: STTConfig) -> Result<Self, STTError> {
        if config.api_key.is_empty() {
            return Err(STTError::AuthenticationFailed(
                "OpenAI API key is required".to_string(),
            ));
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(120))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| {
                STTError::ConfigurationError(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn api_url(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(OPENAI_API_BASE)
            .trim_end_matches('/');
        format!("{base}/v1/audio/transcriptions")
    }

    fn model(&self) -> &str {
        if self.config.model.is_empty() {
            DEFAULT_OPENAI_STT_MODEL
        } else {
            &self.config.model
        }
    }
}

#[async_trait]
impl BaseSTT for OpenAISTT {
    async fn transcribe(&self, audio: Bytes) -> Result<STTResult, STTError> {
        if audio.is_empty() {
            return Ok(STTResult::new("", None));
        }
        if audio.len() > MAX_FILE_SIZE_BYTES {
            return Err(STTError::AudioProcessingError(format!(
                "Audio buffer ({} bytes) exceeds maximum file size ({} bytes)",
                audio.len(),
                MAX_FILE_SIZE_BYTES
            )));
        }

        let wav_data = encode_wav(&audio, self.config.sample_rate, self.config.channels)
            .map_err(|e| STTError::AudioProcessingError(format!("WAV encoding failed: {e}")))?;

        debug!(bytes = wav_data.len(), model = self.model(), "Sending audio to OpenAI");

        let file_part = Part::bytes(wav_data)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| STTError::ConfigurationError(format!("Invalid MIME type: {e}")))?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.model().to_string())
            .text("response_format", "verbose_json");

        if !self.config.language.is_empty() {
            form = form.text("language", self.config.language.clone());
        }

        let response = self
            .http_client
            .post(self.api_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| STTError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| STTError::NetworkError(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let error_msg = if let Ok(error_response) =
                serde_json::from_str::<OpenAIErrorResponse>(&response_text)
            {
                format!(
                    "OpenAI API error: {} ({})",
                    error_response.error.message, error_response.error.error_type
                )
            } else {
                format!("OpenAI API error ({status}): {response_text}")
            };
            return Err(status_error(status, error_msg));
        }

        let parsed: VerboseTranscriptionResponse = serde_json::from_str(&response_text)
            .map_err(|e| STTError::ProviderError(format!("Failed to parse response: {e}")))?;

        let result = STTResult::new(parsed.text.trim(), parsed.confidence());
        info!(
            chars = result.transcript.len(),
            confidence = ?result.confidence,
            "OpenAI transcription complete"
        );
        Ok(result)
    }

    fn get_provider_info(&self) -> &'static str {
        "OpenAI Whisper STT"
    }
}
