//! Reasoning providers.
//!
//! The pipeline treats reasoning as an opaque call: ordered history plus an
//! optional knowledge block in, one reply string out.

pub mod anthropic;
mod base;
pub mod gemini;
pub mod openai;

pub use anthropic::AnthropicLLM;
pub use base::{BaseLLM, ChatMessage, LLMConfig, LLMError, ReasoningRequest};
pub use gemini::GeminiLLM;
pub use openai::{DEFAULT_OPENAI_MODEL, OpenAILLM};

/// Supported reasoning providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LLMProvider {
    OpenAI,
    Anthropic,
    Google,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Google => write!(f, "google"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "anthropic" | "claude" => Ok(LLMProvider::Anthropic),
            "google" | "gemini" => Ok(LLMProvider::Google),
            _ => Err(LLMError::InvalidConfiguration(format!(
                "Unsupported LLM provider: {s}. Supported providers: openai, anthropic, google"
            ))),
        }
    }
}

impl LLMProvider {
    /// Pick a provider and model for an agent.
    ///
    /// An explicit provider tag wins. Without one, the model name prefix
    /// decides (`gpt`, `o1`/`o3`, `claude`, `gemini`). Anything else falls
    /// back to OpenAI `gpt-4o-mini`.
    pub fn resolve(provider: Option<&str>, model: &str) -> (LLMProvider, String) {
        if let Some(provider) = provider.and_then(|p| p.parse::<LLMProvider>().ok()) {
            return (provider, model.to_string());
        }

        let lower = model.to_lowercase();
        if lower.starts_with("gpt") || lower.starts_with("o1") || lower.starts_with("o3") {
            (LLMProvider::OpenAI, model.to_string())
        } else if lower.starts_with("claude") {
            (LLMProvider::Anthropic, model.to_string())
        } else if lower.starts_with("gemini") {
            (LLMProvider::Google, model.to_string())
        } else {
            (LLMProvider::OpenAI, DEFAULT_OPENAI_MODEL.to_string())
        }
    }
}

/// Factory function to create a reasoning provider
pub fn create_llm_provider(
    provider: LLMProvider,
    config: LLMConfig,
) -> Result<Box<dyn BaseLLM>, LLMError> {
    match provider {
        LLMProvider::OpenAI => Ok(Box::new(OpenAILLM::new(config)?)),
        LLMProvider::Anthropic => Ok(Box::new(AnthropicLLM::new(config)?)),
        LLMProvider::Google => Ok(Box::new(GeminiLLM::new(config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_explicit_provider() {
        let (provider, model) = LLMProvider::resolve(Some("anthropic"), "my-finetune");
        assert_eq!(provider, LLMProvider::Anthropic);
        assert_eq!(model, "my-finetune");
    }

    #[test]
    fn test_resolve_by_model_prefix() {
        assert_eq!(
            LLMProvider::resolve(None, "gpt-4o").0,
            LLMProvider::OpenAI
        );
        assert_eq!(
            LLMProvider::resolve(None, "claude-3-5-sonnet-latest").0,
            LLMProvider::Anthropic
        );
        assert_eq!(
            LLMProvider::resolve(Some("unknown"), "gemini-1.5-pro").0,
            LLMProvider::Google
        );
    }

    #[test]
    fn test_resolve_fallback() {
        let (provider, model) = LLMProvider::resolve(None, "llama-3");
        assert_eq!(provider, LLMProvider::OpenAI);
        assert_eq!(model, "gpt-4o-mini");
    }

    #[test]
    fn test_create_llm_provider() {
        let llm = create_llm_provider(
            LLMProvider::Google,
            LLMConfig {
                api_key: "key".into(),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(llm.model(), "gemini-1.5-flash");
        assert!(create_llm_provider(LLMProvider::OpenAI, LLMConfig::default()).is_err());
    }
}
