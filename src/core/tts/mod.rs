mod base;
pub mod elevenlabs;
pub mod openai;

pub use base::{AudioData, BaseTTS, TTSConfig, TTSError, TTSResult};
pub use elevenlabs::{DEFAULT_ELEVENLABS_MODEL, DEFAULT_ELEVENLABS_VOICE_ID, ElevenLabsTTS};
pub use openai::{OpenAITTS, OpenAITTSModel, OpenAIVoice};

/// Supported TTS providers
///
/// There is deliberately no cross-provider fallback: a voice id only means
/// something to the provider that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TTSProvider {
    ElevenLabs,
    OpenAI,
}

impl std::fmt::Display for TTSProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TTSProvider::ElevenLabs => write!(f, "elevenlabs"),
            TTSProvider::OpenAI => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for TTSProvider {
    type Err = TTSError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "elevenlabs" | "eleven_labs" | "11labs" => Ok(TTSProvider::ElevenLabs),
            "openai" => Ok(TTSProvider::OpenAI),
            _ => Err(TTSError::InvalidConfiguration(format!(
                "Unsupported TTS provider: {s}. Supported providers: elevenlabs, openai"
            ))),
        }
    }
}

/// Factory function to create a TTS provider.
///
/// # Example
///
/// ```rust
/// use voice_agent_gateway::core::tts::{create_tts_provider, TTSConfig, TTSProvider};
///
/// let config = TTSConfig {
///     api_key: "sk-test".to_string(),
///     voice_id: Some("nova".to_string()),
///     ..Default::default()
/// };
/// let tts = create_tts_provider(TTSProvider::OpenAI, config).unwrap();
/// assert_eq!(tts.get_provider_info(), "OpenAI TTS");
/// ```
pub fn create_tts_provider(
    provider: TTSProvider,
    config: TTSConfig,
) -> TTSResult<Box<dyn BaseTTS>> {
    match provider {
        TTSProvider::ElevenLabs => Ok(Box::new(ElevenLabsTTS::new(config)?)),
        TTSProvider::OpenAI => Ok(Box::new(OpenAITTS::new(config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tts_provider_parsing() {
        assert_eq!(
            "ElevenLabs".parse::<TTSProvider>().unwrap(),
            TTSProvider::ElevenLabs
        );
        assert_eq!("openai".parse::<TTSProvider>().unwrap(), TTSProvider::OpenAI);
        assert!(matches!(
            "polly".parse::<TTSProvider>(),
            Err(TTSError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_create_tts_provider() {
        let config = TTSConfig {
            api_key: "test_key".to_string(),
            voice_id: Some("test_voice_id".to_string()),
            ..Default::default()
        };
        let tts = create_tts_provider(TTSProvider::ElevenLabs, config).unwrap();
        assert_eq!(tts.get_provider_info(), "ElevenLabs TTS");

        assert!(create_tts_provider(TTSProvider::OpenAI, TTSConfig::default()).is_err());
    }
}
