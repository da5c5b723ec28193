//! Deepgram pre-recorded transcription.
//!
//! Used as the fallback transcription provider. Raw PCM16 is posted as the
//! request body with the encoding described in query parameters, so no
//! container is needed.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::core::stt::base::{BaseSTT, STTConfig, STTError, STTResult, status_error};

/// Default Deepgram API base URL
pub const DEEPGRAM_API_BASE: &str = "https://api.deepgram.com";

/// Default transcription model
pub const DEFAULT_DEEPGRAM_MODEL: &str = "nova-2";

#[derive(Debug, Deserialize)]
struct ListenResponse {
    results: ListenResults,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    #[serde(default)]
    channels: Vec<ListenChannel>,
}

#[derive(Debug, Deserialize)]
struct ListenChannel {
    #[serde(default)]
    alternatives: Vec<ListenAlternative>,
}

#[derive(Debug, Deserialize)]
struct ListenAlternative {
    #[serde(default)]
    transcript: String,
    #[serde(default)]
    confidence: Option<f32>,
}

/// Deepgram transcription provider
pub struct DeepgramSTT {
    config: STTConfig,
    http_client: Client,
}

impl DeepgramSTT {
    pub fn new(config: STTConfig) -> Result<Self, STTError> {
        if config.api_key.is_empty() {
            return Err(STTError::AuthenticationFailed(
                "Deepgram API key is required".to_string(),
            ));
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
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
            .unwrap_or(DEEPGRAM_API_BASE)
            .trim_end_matches('/');
        format!("{base}/v1/listen")
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        let model = if self.config.model.is_empty() {
            DEFAULT_DEEPGRAM_MODEL.to_string()
        } else {
            self.config.model.clone()
        };
        let mut query = vec![
            ("model", model),
            ("punctuate", "true".to_string()),
            ("encoding", "linear16".to_string()),
            ("sample_rate", self.config.sample_rate.to_string()),
            ("channels", self.config.channels.to_string()),
        ];
        if !self.config.language.is_empty() {
            query.push(("language", self.config.language.clone()));
        }
        query
    }
}

#[async_trait]
impl BaseSTT for DeepgramSTT {
    async fn transcribe(&self, audio: Bytes) -> Result<STTResult, STTError> {
        if audio.is_empty() {
            return Ok(STTResult::new("", None));
        }

        let response = self
            .http_client
            .post(self.api_url())
            .query(&self.query())
            .header("Authorization", format!("Token {}", self.config.api_key))
            .header("Content-Type", "application/octet-stream")
            .body(audio)
            .send()
            .await
            .map_err(|e| STTError::NetworkError(format!("Request failed: {e}")))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| STTError::NetworkError(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(status_error(
                status,
                format!("Deepgram API error ({status}): {response_text}"),
            ));
        }

        let parsed: ListenResponse = serde_json::from_str(&response_text)
            .map_err(|e| STTError::ProviderError(format!("Failed to parse response: {e}")))?;

        let best = parsed
            .results
            .channels
            .into_iter()
            .next()
            .and_then(|c| c.alternatives.into_iter().next());

        let result = match best {
            Some(alt) => STTResult::new(alt.transcript.trim(), alt.confidence),
            None => STTResult::new("", None),
        };
        info!(
            chars = result.transcript.len(),
            confidence = ?result.confidence,
            "Deepgram transcription complete"
        );
        Ok(result)
    }

    fn get_provider_info(&self) -> &'static str {
        "Deepgram STT"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deepgram_requires_key() {
        assert!(matches!(
            DeepgramSTT::new(STTConfig::default()),
            Err(STTError::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn test_query_parameters() {
        let stt = DeepgramSTT::new(STTConfig {
            api_key: "dg".to_string(),
            language: "en-US".to_string(),
            ..Default::default()
        })
        .unwrap();
        let query = stt.query();
        assert!(query.contains(&("model", "nova-2".to_string())));
        assert!(query.contains(&("sample_rate", "16000".to_string())));
        assert!(query.contains(&("language", "en-US".to_string())));
    }

    #[test]
    fn test_parse_listen_response() {
        let json = r#"{"results": {"channels": [{"alternatives": [
            {"transcript": "hello world", "confidence": 0.98}
        ]}]}}"#;
        let parsed: ListenResponse = serde_json::from_str(json).unwrap();
        let alt = &parsed.results.channels[0].alternatives[0];
        assert_eq!(alt.transcript, "hello world");
        assert_eq!(alt.confidence, Some(0.98));
    }
}
