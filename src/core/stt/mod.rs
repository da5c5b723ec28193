mod base;
pub mod deepgram;
pub mod openai;

// Re-export public types and traits
pub use base::{BaseSTT, STTConfig, STTError, STTResult};

pub use deepgram::DeepgramSTT;
pub use openai::OpenAISTT;

/// Supported STT providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum STTProvider {
    /// OpenAI Whisper STT REST API
    OpenAI,
    /// Deepgram pre-recorded STT REST API
    Deepgram,
}

impl std::fmt::Display for STTProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            STTProvider::OpenAI => write!(f, "openai"),
            STTProvider::Deepgram => write!(f, "deepgram"),
        }
    }
}

impl std::str::FromStr for STTProvider {
    type Err = STTError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "whisper" => Ok(STTProvider::OpenAI),
            "deepgram" => Ok(STTProvider::Deepgram),
            _ => Err(STTError::ConfigurationError(format!(
                "Unsupported STT provider: {s}. Supported providers: openai, deepgram"
            ))),
        }
    }
}

/// Factory function to create STT providers using the enum directly
///
/// # Examples
/// ```rust
/// use voice_agent_gateway::core::stt::{create_stt_provider, STTConfig, STTProvider};
///
/// let config = STTConfig {
///     api_key: "dg-key".to_string(),
///     ..Default::default()
/// };
/// let stt = create_stt_provider(STTProvider::Deepgram, config).unwrap();
/// assert_eq!(stt.get_provider_info(), "Deepgram STT");
/// ```
pub fn create_stt_provider(
    provider: STTProvider,
    config: STTConfig,
) -> Result<Box<dyn BaseSTT>, STTError> {
    match provider {
        STTProvider::OpenAI => Ok(Box::new(OpenAISTT::new(config)?)),
        STTProvider::Deepgram => Ok(Box::new(DeepgramSTT::new(config)?)),
    }
}

/// Get a list of all supported STT providers
pub fn get_supported_stt_providers() -> Vec<&'static str> {
    vec!["openai", "deepgram"]
}

#[cfg(test)]
mod factory_tests {
    use super::*;

    #[test]
    fn test_stt_provider_enum_from_string() {
        assert_eq!("openai".parse::<STTProvider>().unwrap(), STTProvider::OpenAI);
        assert_eq!("Whisper".parse::<STTProvider>().unwrap(), STTProvider::OpenAI);
        assert_eq!(
            "DEEPGRAM".parse::<STTProvider>().unwrap(),
            STTProvider::Deepgram
        );

        let result = "invalid".parse::<STTProvider>();
        if let Err(STTError::ConfigurationError(msg)) = result {
            assert!(msg.contains("Unsupported STT provider: invalid"));
        } else {
            panic!("Expected ConfigurationError");
        }
    }

    #[test]
    fn test_stt_provider_display_round_trip() {
        for name in get_supported_stt_providers() {
            let provider: STTProvider = name.parse().unwrap();
            assert_eq!(provider.to_string(), name);
        }
    }

    #[test]
    fn test_create_stt_provider() {
        let config = STTConfig {
            api_key: "test".to_string(),
            ..Default::default()
        };
        let stt = create_stt_provider(STTProvider::OpenAI, config).unwrap();
        assert_eq!(stt.get_provider_info(), "OpenAI Whisper STT");

        let missing_key = create_stt_provider(STTProvider::Deepgram, STTConfig::default());
        assert!(missing_key.is_err());
    }
}
