//! Provider credentials and the construction of provider clients for a
//! compiled pipeline.

use std::sync::Arc;

use zeroize::Zeroize;

use crate::core::agent::PipelineDefinition;
use crate::core::llm::{BaseLLM, LLMConfig, LLMError, LLMProvider, create_llm_provider};
use crate::core::stt::{BaseSTT, STTConfig, STTError, STTProvider, create_stt_provider};
use crate::core::tts::{BaseTTS, TTSConfig, TTSError, TTSProvider, create_tts_provider};

/// API key plus optional endpoint override for one vendor.
#[derive(Clone, Default)]
pub struct ProviderKey {
    pub api_key: String,
    pub base_url: Option<String>,
}

impl ProviderKey {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

impl std::fmt::Debug for ProviderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderKey")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Drop for ProviderKey {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}

/// Credentials for every supported vendor. Absent keys surface as
/// authentication errors when a pipeline needs that vendor.
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    pub openai: Option<ProviderKey>,
    pub anthropic: Option<ProviderKey>,
    pub google: Option<ProviderKey>,
    pub deepgram: Option<ProviderKey>,
    pub elevenlabs: Option<ProviderKey>,
}

fn key_parts(key: Option<&ProviderKey>) -> (String, Option<String>) {
    key.map(|k| (k.api_key.clone(), k.base_url.clone()))
        .unwrap_or_default()
}

impl ProviderCredentials {
    pub fn stt_key(&self, provider: STTProvider) -> Option<&ProviderKey> {
        match provider {
            STTProvider::OpenAI => self.openai.as_ref(),
            STTProvider::Deepgram => self.deepgram.as_ref(),
        }
    }

    pub fn tts_key(&self, provider: TTSProvider) -> Option<&ProviderKey> {
        match provider {
            TTSProvider::OpenAI => self.openai.as_ref(),
            TTSProvider::ElevenLabs => self.elevenlabs.as_ref(),
        }
    }

    pub fn llm_key(&self, provider: LLMProvider) -> Option<&ProviderKey> {
        match provider {
            LLMProvider::OpenAI => self.openai.as_ref(),
            LLMProvider::Anthropic => self.anthropic.as_ref(),
            LLMProvider::Google => self.google.as_ref(),
        }
    }

    pub fn build_stt(
        &self,
        provider: STTProvider,
        definition: &PipelineDefinition,
        sample_rate: u32,
    ) -> Result<Arc<dyn BaseSTT>, STTError> {
        let (api_key, base_url) = key_parts(self.stt_key(provider));
        let config = STTConfig {
            provider: provider.to_string(),
            api_key,
            language: definition.language.clone(),
            sample_rate,
            channels: 1,
            model: String::new(),
            base_url,
        };
        Ok(Arc::from(create_stt_provider(provider, config)?))
    }

    pub fn build_tts(&self, definition: &PipelineDefinition) -> Result<Arc<dyn BaseTTS>, TTSError> {
        let (api_key, base_url) = key_parts(self.tts_key(definition.tts_provider));
        let config = TTSConfig {
            provider: definition.tts_provider.to_string(),
            api_key,
            voice_id: definition.voice_id.clone(),
            model: definition.voice_model.clone().unwrap_or_default(),
            speaking_rate: Some(definition.voice_speed),
            base_url,
        };
        Ok(Arc::from(create_tts_provider(definition.tts_provider, config)?))
    }

    pub fn build_llm(&self, definition: &PipelineDefinition) -> Result<Arc<dyn BaseLLM>, LLMError> {
        let (api_key, base_url) = key_parts(self.llm_key(definition.llm_provider));
        let config = LLMConfig {
            api_key,
            model: definition.llm_model.clone(),
            base_url,
        };
        Ok(Arc::from(create_llm_provider(definition.llm_provider, config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::agent::AgentConfig;

    fn definition() -> PipelineDefinition {
        PipelineDefinition::compile("a", &AgentConfig::default()).unwrap()
    }

    #[test]
    fn test_debug_hides_key() {
        let key = ProviderKey::new("sk-secret");
        assert!(!format!("{key:?}").contains("sk-secret"));
    }

    #[test]
    fn test_build_with_credentials() {
        let creds = ProviderCredentials {
            openai: Some(ProviderKey::new("sk")),
            elevenlabs: Some(ProviderKey::new("xi")),
            ..Default::default()
        };
        let def = definition();
        assert!(creds.build_stt(STTProvider::OpenAI, &def, 16_000).is_ok());
        assert!(creds.build_tts(&def).is_ok());
        assert!(creds.build_llm(&def).is_ok());
    }

    #[test]
    fn test_missing_credentials_fail() {
        let creds = ProviderCredentials::default();
        let def = definition();
        assert!(matches!(
            creds.build_stt(STTProvider::Deepgram, &def, 16_000),
            Err(STTError::AuthenticationFailed(_))
        ));
        assert!(creds.build_tts(&def).is_err());
    }
}
