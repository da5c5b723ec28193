use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use super::ServerConfig;

/// Complete YAML configuration structure
///
/// Every field is optional; anything present overrides the environment.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///
/// livekit:
///   url: "ws://localhost:7880"
///   api_key: "your-api-key"
///   api_secret: "your-api-secret"
///
/// providers:
///   openai_api_key: "sk-..."
///   deepgram_api_key: "dg-..."
///   elevenlabs_api_key: "xi-..."
///   openai_base_url: "http://localhost:9000"
///
/// timeouts:
///   transcription_ms: 5000
///   reasoning_ms: 15000
///
/// sessions:
///   idle_timeout_seconds: 3600
///   sweep_interval_seconds: 60
///
/// knowledge:
///   url: "http://knowledge.internal/search"
///
/// agents:
///   file: "agents.yaml"
///
/// audio:
///   sample_rate: 16000
///
/// security:
///   cors_allowed_origins: "*"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub livekit: Option<LiveKitYaml>,
    pub providers: Option<ProvidersYaml>,
    pub timeouts: Option<TimeoutsYaml>,
    pub sessions: Option<SessionsYaml>,
    pub knowledge: Option<KnowledgeYaml>,
    pub agents: Option<AgentsYaml>,
    pub audio: Option<AudioYaml>,
    pub security: Option<SecurityYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LiveKitYaml {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

/// Provider API keys and endpoint overrides
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub deepgram_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub anthropic_base_url: Option<String>,
    pub google_base_url: Option<String>,
    pub deepgram_base_url: Option<String>,
    pub elevenlabs_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TimeoutsYaml {
    pub transcription_ms: Option<u64>,
    pub synthesis_ms: Option<u64>,
    pub reasoning_ms: Option<u64>,
    pub knowledge_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionsYaml {
    pub idle_timeout_seconds: Option<u64>,
    pub sweep_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct KnowledgeYaml {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AgentsYaml {
    /// YAML map of `agent_id -> AgentConfig` seeded at startup
    pub file: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AudioYaml {
    /// Inbound/outbound PCM rate on the media transport
    pub sample_rate: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub cors_allowed_origins: Option<String>,
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn set_opt<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

impl YamlConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_yaml::from_str(&contents).context("Failed to parse YAML config")
    }

    /// Overlay every value present in the file onto `config`.
    pub fn apply(self, config: &mut ServerConfig) {
        if let Some(server) = self.server {
            set(&mut config.host, server.host);
            set(&mut config.port, server.port);
        }
        if let Some(livekit) = self.livekit {
            set(&mut config.livekit_url, livekit.url);
            set_opt(&mut config.livekit_api_key, livekit.api_key);
            set_opt(&mut config.livekit_api_secret, livekit.api_secret);
        }
        if let Some(p) = self.providers {
            set_opt(&mut config.openai_api_key, p.openai_api_key);
            set_opt(&mut config.anthropic_api_key, p.anthropic_api_key);
            set_opt(&mut config.google_api_key, p.google_api_key);
            set_opt(&mut config.deepgram_api_key, p.deepgram_api_key);
            set_opt(&mut config.elevenlabs_api_key, p.elevenlabs_api_key);
            set_opt(&mut config.openai_base_url, p.openai_base_url);
            set_opt(&mut config.anthropic_base_url, p.anthropic_base_url);
            set_opt(&mut config.google_base_url, p.google_base_url);
            set_opt(&mut config.deepgram_base_url, p.deepgram_base_url);
            set_opt(&mut config.elevenlabs_base_url, p.elevenlabs_base_url);
        }
        if let Some(t) = self.timeouts {
            set(&mut config.transcription_timeout_ms, t.transcription_ms);
            set(&mut config.synthesis_timeout_ms, t.synthesis_ms);
            set(&mut config.reasoning_timeout_ms, t.reasoning_ms);
            set(&mut config.knowledge_timeout_ms, t.knowledge_ms);
        }
        if let Some(s) = self.sessions {
            set(&mut config.session_idle_timeout_seconds, s.idle_timeout_seconds);
            set(&mut config.session_sweep_interval_seconds, s.sweep_interval_seconds);
        }
        if let Some(k) = self.knowledge {
            set_opt(&mut config.knowledge_url, k.url);
        }
        if let Some(a) = self.agents {
            set_opt(&mut config.agents_file, a.file.map(PathBuf::from));
        }
        if let Some(audio) = self.audio {
            set(&mut config.sample_rate, audio.sample_rate);
        }
        if let Some(security) = self.security {
            set_opt(&mut config.cors_allowed_origins, security.cors_allowed_origins);
        }
    }
}
