//! Per-agent configuration record.

use serde::{Deserialize, Serialize};

use crate::core::vad::SegmenterConfig;

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_system_prompt() -> String {
    "You are a helpful voice assistant. Keep replies short and conversational.".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_voice_provider() -> String {
    "elevenlabs".to_string()
}

fn default_voice_speed() -> f32 {
    1.0
}

fn default_stt_provider() -> String {
    "openai".to_string()
}

fn default_stt_fallback() -> Option<String> {
    Some("deepgram".to_string())
}

fn default_language() -> String {
    "en".to_string()
}

fn default_knowledge_top_k() -> usize {
    3
}

fn default_max_duration_seconds() -> u64 {
    1800
}

fn default_end_after_silence_seconds() -> u64 {
    600
}

/// Agent configuration, immutable once loaded.
///
/// `version` increases on every upsert; the runtime cache keys nothing on it
/// but it is logged with every compiled pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: u64,

    // Reasoning
    /// Explicit provider tag; when absent the model name decides
    #[serde(default)]
    pub llm_provider: Option<String>,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    // Synthesis
    #[serde(default = "default_voice_provider")]
    pub voice_provider: String,
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub voice_model: Option<String>,
    #[serde(default = "default_voice_speed")]
    pub voice_speed: f32,

    // Transcription
    #[serde(default = "default_stt_provider")]
    pub stt_provider: String,
    /// Provider tried once when the primary fails; `None` disables fallback
    #[serde(default = "default_stt_fallback")]
    pub stt_fallback_provider: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    /// Transcripts reporting a lower confidence are discarded
    #[serde(default)]
    pub min_transcript_confidence: Option<f32>,

    // Knowledge
    #[serde(default)]
    pub knowledge_base_ids: Vec<String>,
    #[serde(default = "default_knowledge_top_k")]
    pub knowledge_top_k: usize,

    // Output policy
    #[serde(default)]
    pub pii_redaction_enabled: bool,
    #[serde(default)]
    pub pii_redaction_list: Vec<String>,

    // Turn taking
    #[serde(default)]
    pub segmenter: SegmenterConfig,
    #[serde(default = "default_max_duration_seconds")]
    pub max_duration_seconds: u64,
    #[serde(default = "default_end_after_silence_seconds")]
    pub end_after_silence_seconds: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: 0,
            llm_provider: None,
            llm_model: default_llm_model(),
            system_prompt: default_system_prompt(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            voice_provider: default_voice_provider(),
            voice_id: None,
            voice_model: None,
            voice_speed: default_voice_speed(),
            stt_provider: default_stt_provider(),
            stt_fallback_provider: default_stt_fallback(),
            language: default_language(),
            min_transcript_confidence: None,
            knowledge_base_ids: Vec::new(),
            knowledge_top_k: default_knowledge_top_k(),
            pii_redaction_enabled: false,
            pii_redaction_list: Vec::new(),
            segmenter: SegmenterConfig::default(),
            max_duration_seconds: default_max_duration_seconds(),
            end_after_silence_seconds: default_end_after_silence_seconds(),
        }
    }
}
