use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use super::ServerConfig;

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_opt(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {key}: {value}")),
        None => Ok(default),
    }
}

/// Build a configuration from environment variables, falling back to
/// defaults for anything unset.
pub(crate) fn load_from_env() -> Result<ServerConfig> {
    let defaults = ServerConfig::default();

    Ok(ServerConfig {
        host: env_opt("HOST").unwrap_or(defaults.host.clone()),
        port: env_parse("PORT", defaults.port)?,

        livekit_url: env_opt("LIVEKIT_URL").unwrap_or(defaults.livekit_url.clone()),
        livekit_api_key: env_opt("LIVEKIT_API_KEY"),
        livekit_api_secret: env_opt("LIVEKIT_API_SECRET"),

        openai_api_key: env_opt("OPENAI_API_KEY"),
        anthropic_api_key: env_opt("ANTHROPIC_API_KEY"),
        google_api_key: env_opt("GOOGLE_API_KEY"),
        deepgram_api_key: env_opt("DEEPGRAM_API_KEY"),
        elevenlabs_api_key: env_opt("ELEVENLABS_API_KEY"),

        openai_base_url: env_opt("OPENAI_BASE_URL"),
        anthropic_base_url: env_opt("ANTHROPIC_BASE_URL"),
        google_base_url: env_opt("GOOGLE_BASE_URL"),
        deepgram_base_url: env_opt("DEEPGRAM_BASE_URL"),
        elevenlabs_base_url: env_opt("ELEVENLABS_BASE_URL"),

        transcription_timeout_ms: env_parse(
            "TRANSCRIPTION_TIMEOUT_MS",
            defaults.transcription_timeout_ms,
        )?,
        synthesis_timeout_ms: env_parse("SYNTHESIS_TIMEOUT_MS", defaults.synthesis_timeout_ms)?,
        reasoning_timeout_ms: env_parse("REASONING_TIMEOUT_MS", defaults.reasoning_timeout_ms)?,
        knowledge_timeout_ms: env_parse("KNOWLEDGE_TIMEOUT_MS", defaults.knowledge_timeout_ms)?,

        session_idle_timeout_seconds: env_parse(
            "SESSION_IDLE_TIMEOUT_SECONDS",
            defaults.session_idle_timeout_seconds,
        )?,
        session_sweep_interval_seconds: env_parse(
            "SESSION_SWEEP_INTERVAL_SECONDS",
            defaults.session_sweep_interval_seconds,
        )?,

        knowledge_url: env_opt("KNOWLEDGE_URL"),
        agents_file: env_opt("AGENTS_FILE").map(PathBuf::from),
        sample_rate: env_parse("AUDIO_SAMPLE_RATE", defaults.sample_rate)?,
        cors_allowed_origins: env_opt("CORS_ALLOWED_ORIGINS"),
    })
}
