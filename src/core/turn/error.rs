use thiserror::Error;

use crate::core::llm::LLMError;
use crate::core::session::SessionError;
use crate::core::stt::STTError;
use crate::core::tts::TTSError;
use crate::transport::TransportError;

/// Failure of one turn, or of the call itself.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TurnError {
    #[error("Transcription failed: {0}")]
    Transcription(#[from] STTError),

    #[error("Transcript was empty")]
    EmptyTranscript,

    #[error("Transcript confidence {confidence:.2} below minimum {minimum:.2}")]
    LowConfidence { confidence: f32, minimum: f32 },

    #[error("Reasoning failed: {0}")]
    Reasoning(#[from] LLMError),

    #[error("Synthesis failed: {0}")]
    Synthesis(#[from] TTSError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TurnError {
    /// Fatal errors tear the call down; everything else returns the call to
    /// `Listening`.
    pub fn is_fatal(&self) -> bool {
        match self {
            TurnError::Transport(e) => e.is_fatal(),
            TurnError::Internal(_) => true,
            _ => false,
        }
    }

    /// Pipeline stage the error belongs to, for logs and events.
    pub fn stage(&self) -> &'static str {
        match self {
            TurnError::Transcription(_)
            | TurnError::EmptyTranscript
            | TurnError::LowConfidence { .. } => "transcription",
            TurnError::Reasoning(_) => "reasoning",
            TurnError::Synthesis(_) => "synthesis",
            TurnError::Session(_) => "session",
            TurnError::Transport(_) => "transport",
            TurnError::Internal(_) => "internal",
        }
    }
}
