//! OpenAI Speech-to-Text (Whisper) API integration.
//!
//! Whisper is a REST batch API: the segmenter hands over a complete
//! utterance, which is packaged as WAV and uploaded in one request.
//!
//! # API Reference
//!
//! - API Endpoint: `POST https://api.openai.com/v1/audio/transcriptions`
//! - Max file size: 25MB
//! - Documentation: <https://platform.openai.com/docs/api-reference/audio/createTranscription>

mod client;
mod messages;

pub use client::{DEFAULT_OPENAI_STT_MODEL, OPENAI_API_BASE, OpenAISTT};
pub use messages::{OpenAIError, OpenAIErrorResponse, VerboseTranscriptionResponse};
