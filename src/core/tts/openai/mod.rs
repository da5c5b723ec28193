//! OpenAI TTS provider module.
//!
//! # Supported Models
//!
//! - `tts-1` - Standard quality, lower latency
//! - `tts-1-hd` - High definition quality, higher latency
//! - `gpt-4o-mini-tts`

mod config;
mod provider;

pub use config::{OPENAI_PCM_SAMPLE_RATE, OpenAITTSModel, OpenAIVoice};
pub use provider::{OPENAI_TTS_BASE, OpenAITTS};
