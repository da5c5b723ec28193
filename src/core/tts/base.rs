use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::audio::AudioEncoding;

/// Error types for TTS operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TTSError {
    #[error("Provider not ready: {0}")]
    ProviderNotReady(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Provider error: {0}")]
    ProviderError(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Synthesis timed out after {0:?}")]
    Timeout(Duration),
}

pub type TTSResult<T> = Result<T, TTSError>;

/// Synthesized audio returned by a provider
#[derive(Debug, Clone, PartialEq)]
pub struct AudioData {
    /// Encoded audio bytes
    pub data: Bytes,
    /// Container/codec of `data`
    pub encoding: AudioEncoding,
    /// Sample rate of the audio in Hz
    pub sample_rate: u32,
}

impl AudioData {
    pub fn pcm16(data: impl Into<Bytes>, sample_rate: u32) -> Self {
        Self {
            data: data.into(),
            encoding: AudioEncoding::Pcm16,
            sample_rate,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Configuration for TTS providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TTSConfig {
    /// Provider tag (openai, elevenlabs)
    pub provider: String,
    /// API key for the TTS provider
    pub api_key: String,
    /// Voice ID or name; `None` selects the provider default
    pub voice_id: Option<String>,
    /// Model to use; empty selects the provider default
    pub model: String,
    /// Speaking rate multiplier (1.0 is normal)
    pub speaking_rate: Option<f32>,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for TTSConfig {
    fn default() -> Self {
        Self {
            provider: "elevenlabs".to_string(),
            api_key: String::new(),
            voice_id: None,
            model: String::new(),
            speaking_rate: Some(1.0),
            base_url: None,
        }
    }
}

/// Text-to-speech capability
///
/// One request per reply. Dropping the returned future aborts the HTTP
/// request, which is how barge-in stops provider work mid-flight.
#[async_trait]
pub trait BaseTTS: Send + Sync {
    /// Synthesize `text` into audio
    async fn synthesize(&self, text: &str) -> TTSResult<AudioData>;

    /// Get provider information
    fn get_provider_info(&self) -> &'static str;
}

/// Map a non-success HTTP status into the matching error variant
pub(crate) fn status_error(status: reqwest::StatusCode, message: String) -> TTSError {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        TTSError::AuthenticationFailed(message)
    } else {
        TTSError::ProviderError(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tts_config_default() {
        let config = TTSConfig::default();
        assert_eq!(config.provider, "elevenlabs");
        assert_eq!(config.speaking_rate, Some(1.0));
        assert!(config.voice_id.is_none());
    }

    #[test]
    fn test_audio_data_pcm16() {
        let audio = AudioData::pcm16(vec![0u8, 1, 2, 3], 24_000);
        assert_eq!(audio.encoding, AudioEncoding::Pcm16);
        assert!(!audio.is_empty());
    }
}
