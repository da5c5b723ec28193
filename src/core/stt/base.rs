use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::audio::DEFAULT_SAMPLE_RATE;

/// Error types for STT operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum STTError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Provider error: {0}")]
    ProviderError(String),
    #[error("Invalid audio format: {0}")]
    AudioProcessingError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Transcription timed out after {0:?}")]
    Timeout(Duration),
}

/// Final transcript of one utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct STTResult {
    /// The transcribed text
    pub transcript: String,
    /// Provider-reported confidence (0.0 to 1.0), when the provider reports one
    pub confidence: Option<f32>,
}

impl STTResult {
    pub fn new(transcript: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            transcript: transcript.into(),
            confidence,
        }
    }

    /// Whether the transcript carries no words
    pub fn is_blank(&self) -> bool {
        self.transcript.trim().is_empty()
    }
}

/// Configuration shared by all transcription providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct STTConfig {
    /// Provider tag (openai, deepgram)
    pub provider: String,
    /// API key for the STT provider
    pub api_key: String,
    /// Language code for transcription (e.g., "en", "en-US")
    pub language: String,
    /// Sample rate of the PCM16 audio in Hz
    pub sample_rate: u32,
    /// Number of audio channels (1 for mono)
    pub channels: u16,
    /// Model to use; empty selects the provider default
    pub model: String,
    /// Base URL override, used to point a provider at a proxy or a test server
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for STTConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            api_key: String::new(),
            language: "en".to_string(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: 1,
            model: String::new(),
            base_url: None,
        }
    }
}

/// Batch transcription capability
///
/// One call per completed utterance. Implementations are stateless between
/// calls so a single instance may be shared by every call of an agent.
#[async_trait]
pub trait BaseSTT: Send + Sync {
    /// Transcribe a complete PCM16 little-endian utterance
    async fn transcribe(&self, audio: Bytes) -> Result<STTResult, STTError>;

    /// Get provider-specific information
    fn get_provider_info(&self) -> &'static str;
}

/// Map a non-success HTTP status into the matching error variant
pub(crate) fn status_error(status: reqwest::StatusCode, message: String) -> STTError {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        STTError::AuthenticationFailed(message)
    } else {
        STTError::ProviderError(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stt_result_blank() {
        assert!(STTResult::new("   ", None).is_blank());
        assert!(!STTResult::new("hello", Some(0.9)).is_blank());
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(reqwest::StatusCode::UNAUTHORIZED, "x".into()),
            STTError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            status_error(reqwest::StatusCode::BAD_GATEWAY, "x".into()),
            STTError::ProviderError(_)
        ));
    }
}
