use std::fmt;

use serde::Serialize;

/// Turn-taking state of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// Transport not attached yet
    #[default]
    Idle,
    /// Waiting for the caller to finish an utterance
    Listening,
    /// Transcription and reasoning in flight
    Processing,
    /// Synthesizing or playing a reply
    Speaking,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnState::Idle => write!(f, "Idle"),
            TurnState::Listening => write!(f, "Listening"),
            TurnState::Processing => write!(f, "Processing"),
            TurnState::Speaking => write!(f, "Speaking"),
        }
    }
}
