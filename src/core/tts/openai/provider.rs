//! OpenAI TTS provider.
//!
//! - Endpoint: `POST https://api.openai.com/v1/audio/speech`
//! - Output: requested as `pcm` (24kHz 16-bit mono little-endian)
//! - Speed: 0.25 to 4.0

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use super::config::{OPENAI_PCM_SAMPLE_RATE, OpenAITTSModel, OpenAIVoice};
use crate::core::tts::base::{AudioData, BaseTTS, TTSConfig, TTSError, TTSResult, status_error};

/// OpenAI API base URL
pub const OPENAI_TTS_BASE: &str = "https://api.openai.com";

/// OpenAI TTS provider implementation using the Audio Speech API
pub struct OpenAITTS {
    config: TTSConfig,
    model: OpenAITTSModel,
    voice: OpenAIVoice,
    speed: f32,
    http_client: Client,
}

impl OpenAITTS {
    pub fn new(config: TTSConfig) -> TTSResult<Self> {
        if config.api_key.is_empty() {
            return Err(TTSError::AuthenticationFailed(
                "OpenAI API key is required".to_string(),
            ));
        }

        let model = OpenAITTSModel::from_str_or_default(&config.model);
        let voice = config
            .voice_id
            .as_deref()
            .map(OpenAIVoice::from_str_or_default)
            .unwrap_or_default();
        let speed = config.speaking_rate.unwrap_or(1.0).clamp(0.25, 4.0);

        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| TTSError::InvalidConfiguration(format!("HTTP client: {e}")))?;

        Ok(Self {
            config,
            model,
            voice,
            speed,
            http_client,
        })
    }

    pub fn model(&self) -> OpenAITTSModel {
        self.model
    }

    pub fn voice(&self) -> OpenAIVoice {
        self.voice
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    fn api_url(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(OPENAI_TTS_BASE)
            .trim_end_matches('/');
        format!("{base}/v1/audio/speech")
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        let mut body = json!({
            "model": self.model.as_str(),
            "input": text,
            "voice": self.voice.as_str(),
            "response_format": "pcm",
        });

        // Add speed if not default (1.0)
        if (self.speed - 1.0).abs() > 0.001 {
            body["speed"] = json!(self.speed);
        }
        body
    }
}

#[async_trait]
impl BaseTTS for OpenAITTS {
    async fn synthesize(&self, text: &str) -> TTSResult<AudioData> {
        let response = self
            .http_client
            .post(self.api_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&self.request_body(text))
            .send()
            .await
            .map_err(|e| TTSError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(
                status,
                format!("OpenAI TTS error ({status}): {body}"),
            ));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| TTSError::NetworkError(format!("Failed to read audio: {e}")))?;

        debug!(bytes = data.len(), voice = self.voice.as_str(), "OpenAI synthesis complete");
        Ok(AudioData::pcm16(data, OPENAI_PCM_SAMPLE_RATE))
    }

    fn get_provider_info(&self) -> &'static str {
        "OpenAI TTS"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TTSConfig {
        TTSConfig {
            provider: "openai".to_string(),
            api_key: "sk-test".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_openai_tts_defaults() {
        let tts = OpenAITTS::new(config()).unwrap();
        assert_eq!(tts.model(), OpenAITTSModel::Tts1);
        assert_eq!(tts.voice(), OpenAIVoice::Alloy);
        assert_eq!(tts.speed(), 1.0);
        assert!(tts.request_body("hi").get("speed").is_none());
    }

    #[test]
    fn test_openai_tts_speed_clamped() {
        let tts = OpenAITTS::new(TTSConfig {
            speaking_rate: Some(9.0),
            ..config()
        })
        .unwrap();
        assert_eq!(tts.speed(), 4.0);
        assert_eq!(tts.request_body("hi")["speed"], json!(4.0));

        let tts = OpenAITTS::new(TTSConfig {
            speaking_rate: Some(0.1),
            ..config()
        })
        .unwrap();
        assert_eq!(tts.speed(), 0.25);
    }

    #[test]
    fn test_request_body_requests_pcm() {
        let tts = OpenAITTS::new(TTSConfig {
            voice_id: Some("nova".to_string()),
            ..config()
        })
        .unwrap();
        let body = tts.request_body("Hello");
        assert_eq!(body["response_format"], "pcm");
        assert_eq!(body["voice"], "nova");
        assert_eq!(body["input"], "Hello");
    }

    #[test]
    fn test_missing_key() {
        assert!(OpenAITTS::new(TTSConfig::default()).is_err());
    }
}
