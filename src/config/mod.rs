//! Configuration module for the voice agent gateway
//!
//! Server configuration comes from environment variables (optionally seeded
//! from a `.env` file in `main.rs`) and an optional YAML file.
//! Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Example
//! ```rust,no_run
//! use voice_agent_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> anyhow::Result<()> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config = ServerConfig::from_file(&PathBuf::from("config.yaml"))?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, bail};
use url::Url;

use crate::core::providers::{ProviderCredentials, ProviderKey};
use crate::core::turn::StageTimeouts;
use crate::transport::LiveKitSettings;

mod env;
mod yaml;

pub use yaml::YamlConfig;

/// Server configuration
///
/// Contains everything needed to run the gateway:
/// - Server settings (host, port, CORS)
/// - LiveKit connection settings
/// - Provider API keys and optional endpoint overrides
/// - Per-stage provider timeouts
/// - Session sweep settings
/// - Knowledge service and agent seed file
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // LiveKit settings
    pub livekit_url: String,
    pub livekit_api_key: Option<String>,
    pub livekit_api_secret: Option<String>,

    // Provider API keys
    /// OpenAI key, used for Whisper STT, OpenAI TTS and GPT reasoning
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    /// Google AI Studio key for Gemini reasoning
    pub google_api_key: Option<String>,
    pub deepgram_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,

    // Provider endpoint overrides (proxies, self-hosted gateways, tests)
    pub openai_base_url: Option<String>,
    pub anthropic_base_url: Option<String>,
    pub google_base_url: Option<String>,
    pub deepgram_base_url: Option<String>,
    pub elevenlabs_base_url: Option<String>,

    // Provider timeouts
    pub transcription_timeout_ms: u64,
    pub synthesis_timeout_ms: u64,
    pub reasoning_timeout_ms: u64,
    pub knowledge_timeout_ms: u64,

    // Sessions
    /// Active sessions idle longer than this are marked `timeout`
    pub session_idle_timeout_seconds: u64,
    pub session_sweep_interval_seconds: u64,

    /// Knowledge search endpoint; retrieval is disabled when unset
    pub knowledge_url: Option<String>,
    /// YAML file of agent configurations loaded at startup
    pub agents_file: Option<PathBuf>,
    /// PCM rate requested from the media transport
    pub sample_rate: u32,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            livekit_url: "ws://localhost:7880".to_string(),
            livekit_api_key: None,
            livekit_api_secret: None,
            openai_api_key: None,
            anthropic_api_key: None,
            google_api_key: None,
            deepgram_api_key: None,
            elevenlabs_api_key: None,
            openai_base_url: None,
            anthropic_base_url: None,
            google_base_url: None,
            deepgram_base_url: None,
            elevenlabs_base_url: None,
            transcription_timeout_ms: 5_000,
            synthesis_timeout_ms: 5_000,
            reasoning_timeout_ms: 15_000,
            knowledge_timeout_ms: 3_000,
            session_idle_timeout_seconds: 3_600,
            session_sweep_interval_seconds: 60,
            knowledge_url: None,
            agents_file: None,
            sample_rate: crate::core::audio::DEFAULT_SAMPLE_RATE,
            cors_allowed_origins: None,
        }
    }
}

/// Zeroize all secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        for secret in [
            &mut self.livekit_api_key,
            &mut self.livekit_api_secret,
            &mut self.openai_api_key,
            &mut self.anthropic_api_key,
            &mut self.google_api_key,
            &mut self.deepgram_api_key,
            &mut self.elevenlabs_api_key,
        ]
        .into_iter()
        .flatten()
        {
            secret.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self> {
        let config = env::load_from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file on top of the environment.
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml_config = YamlConfig::from_file(path)?;
        let mut config = env::load_from_env()?;
        yaml_config.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot work at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.livekit_api_key.is_some() != self.livekit_api_secret.is_some() {
            bail!("LIVEKIT_API_KEY and LIVEKIT_API_SECRET must be set together");
        }
        for (name, value) in [
            ("transcription", self.transcription_timeout_ms),
            ("synthesis", self.synthesis_timeout_ms),
            ("reasoning", self.reasoning_timeout_ms),
            ("knowledge", self.knowledge_timeout_ms),
        ] {
            if value == 0 {
                bail!("{name} timeout must be greater than zero");
            }
        }
        if !(8_000..=48_000).contains(&self.sample_rate) {
            bail!(
                "Audio sample rate must be between 8000 and 48000 Hz, got {}",
                self.sample_rate
            );
        }
        if self.session_sweep_interval_seconds == 0 {
            bail!("Session sweep interval must be greater than zero");
        }

        check_url("LiveKit URL", &self.livekit_url, &["ws", "wss", "http", "https"])?;
        let http_urls = [
            ("Knowledge URL", &self.knowledge_url),
            ("OpenAI base URL", &self.openai_base_url),
            ("Anthropic base URL", &self.anthropic_base_url),
            ("Google base URL", &self.google_base_url),
            ("Deepgram base URL", &self.deepgram_base_url),
            ("ElevenLabs base URL", &self.elevenlabs_base_url),
        ];
        for (name, value) in http_urls {
            if let Some(value) = value {
                check_url(name, value, &["http", "https"])?;
            }
        }
        Ok(())
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Provider keys in the shape the pipeline builder consumes.
    pub fn provider_credentials(&self) -> ProviderCredentials {
        fn key(api_key: &Option<String>, base_url: &Option<String>) -> Option<ProviderKey> {
            api_key.as_ref().map(|k| {
                let key = ProviderKey::new(k.clone());
                match base_url {
                    Some(url) => key.with_base_url(url.clone()),
                    None => key,
                }
            })
        }

        ProviderCredentials {
            openai: key(&self.openai_api_key, &self.openai_base_url),
            anthropic: key(&self.anthropic_api_key, &self.anthropic_base_url),
            google: key(&self.google_api_key, &self.google_base_url),
            deepgram: key(&self.deepgram_api_key, &self.deepgram_base_url),
            elevenlabs: key(&self.elevenlabs_api_key, &self.elevenlabs_base_url),
        }
    }

    pub fn stage_timeouts(&self) -> StageTimeouts {
        StageTimeouts {
            transcription: Duration::from_millis(self.transcription_timeout_ms),
            synthesis: Duration::from_millis(self.synthesis_timeout_ms),
            reasoning: Duration::from_millis(self.reasoning_timeout_ms),
            knowledge: Duration::from_millis(self.knowledge_timeout_ms),
        }
    }

    /// LiveKit settings, or `None` when no API credentials are configured.
    pub fn livekit_settings(&self) -> Option<LiveKitSettings> {
        match (&self.livekit_api_key, &self.livekit_api_secret) {
            (Some(api_key), Some(api_secret)) => Some(LiveKitSettings {
                url: self.livekit_url.clone(),
                api_key: api_key.clone(),
                api_secret: api_secret.clone(),
                sample_rate: self.sample_rate,
            }),
            _ => None,
        }
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout_seconds)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_seconds)
    }
}

fn check_url(name: &str, value: &str, schemes: &[&str]) -> Result<()> {
    let url = Url::parse(value).map_err(|e| anyhow::anyhow!("{name} is invalid ({value}): {e}"))?;
    if !schemes.contains(&url.scheme()) {
        bail!(
            "{name} must use one of {} schemes, got {}",
            schemes.join("/"),
            url.scheme()
        );
    }
    if url.host_str().is_none() {
        bail!("{name} must have a host: {value}");
    }
    Ok(())
}
