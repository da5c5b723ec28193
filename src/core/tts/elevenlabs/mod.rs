//! ElevenLabs TTS provider.
//!
//! - Endpoint: `POST https://api.elevenlabs.io/v1/text-to-speech/{voice_id}`
//! - Output: requested as `pcm_16000` so it matches the default inbound rate

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use crate::core::tts::base::{AudioData, BaseTTS, TTSConfig, TTSError, TTSResult, status_error};

/// ElevenLabs API base URL
pub const ELEVENLABS_TTS_BASE: &str = "https://api.elevenlabs.io";

/// Default voice ("Rachel")
pub const DEFAULT_ELEVENLABS_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

/// Default model
pub const DEFAULT_ELEVENLABS_MODEL: &str = "eleven_turbo_v2";

const OUTPUT_SAMPLE_RATE: u32 = 16_000;

/// ElevenLabs TTS provider
pub struct ElevenLabsTTS {
    config: TTSConfig,
    voice_id: String,
    model: String,
    http_client: Client,
}

impl ElevenLabsTTS {
    pub fn new(config: TTSConfig) -> TTSResult<Self> {
        if config.api_key.is_empty() {
            return Err(TTSError::AuthenticationFailed(
                "ElevenLabs API key is required".to_string(),
            ));
        }

        let voice_id = config
            .voice_id
            .clone()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_ELEVENLABS_VOICE_ID.to_string());
        let model = if config.model.is_empty() {
            DEFAULT_ELEVENLABS_MODEL.to_string()
        } else {
            config.model.clone()
        };

        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| TTSError::InvalidConfiguration(format!("HTTP client: {e}")))?;

        Ok(Self {
            config,
            voice_id,
            model,
            http_client,
        })
    }

    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_url(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(ELEVENLABS_TTS_BASE)
            .trim_end_matches('/');
        format!("{base}/v1/text-to-speech/{}", self.voice_id)
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        let mut body = json!({
            "text": text,
            "model_id": self.model,
        });
        let speed = self.config.speaking_rate.unwrap_or(1.0);
        if (speed - 1.0).abs() > 0.001 {
            // ElevenLabs accepts a narrower speed range than OpenAI
            body["voice_settings"] = json!({ "speed": speed.clamp(0.7, 1.2) });
        }
        body
    }
}

#[async_trait]
impl BaseTTS for ElevenLabsTTS {
    async fn synthesize(&self, text: &str) -> TTSResult<AudioData> {
        let response = self
            .http_client
            .post(self.api_url())
            .query(&[("output_format", "pcm_16000")])
            .header("xi-api-key", &self.config.api_key)
            .header("Accept", "audio/pcm")
            .json(&self.request_body(text))
            .send()
            .await
            .map_err(|e| TTSError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(
                status,
                format!("ElevenLabs TTS error ({status}): {body}"),
            ));
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| TTSError::NetworkError(format!("Failed to read audio: {e}")))?;

        debug!(bytes = data.len(), voice_id = %self.voice_id, "ElevenLabs synthesis complete");
        Ok(AudioData::pcm16(data, OUTPUT_SAMPLE_RATE))
    }

    fn get_provider_info(&self) -> &'static str {
        "ElevenLabs TTS"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TTSConfig {
        TTSConfig {
            api_key: "xi-test".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_elevenlabs_defaults() {
        let tts = ElevenLabsTTS::new(config()).unwrap();
        assert_eq!(tts.voice_id(), DEFAULT_ELEVENLABS_VOICE_ID);
        assert_eq!(tts.model(), DEFAULT_ELEVENLABS_MODEL);
        assert!(tts.api_url().ends_with("/v1/text-to-speech/21m00Tcm4TlvDq8ikWAM"));
        assert!(tts.request_body("hi").get("voice_settings").is_none());
    }

    #[test]
    fn test_elevenlabs_custom_voice_and_speed() {
        let tts = ElevenLabsTTS::new(TTSConfig {
            voice_id: Some("voice-123".to_string()),
            speaking_rate: Some(2.0),
            ..config()
        })
        .unwrap();
        assert!(tts.api_url().ends_with("/voice-123"));
        assert_eq!(tts.request_body("hi")["voice_settings"]["speed"], json!(1.2f32));
    }

    #[test]
    fn test_elevenlabs_requires_key() {
        assert!(matches!(
            ElevenLabsTTS::new(TTSConfig::default()),
            Err(TTSError::AuthenticationFailed(_))
        ));
    }
}
