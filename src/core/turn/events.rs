use serde::Serialize;

use super::state::TurnState;

/// Why a call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The inbound stream ended
    Disconnected,
    /// Stopped by the supervisor or process shutdown
    Shutdown,
    /// Reached the agent's maximum call duration
    MaxDuration,
    /// Caller silent for longer than the agent allows
    Silence,
    /// Session was ended or expired outside the call
    SessionClosed,
    /// Unrecoverable transport failure
    TransportError,
}

/// Observable progress of a call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    StateChanged { from: TurnState, to: TurnState },
    UtteranceReady { duration_ms: u64 },
    Transcript { text: String },
    Reply { text: String },
    /// A reply was dropped unspoken because newer user speech was queued
    ReplyPreempted,
    BargeIn,
    PlaybackCompleted,
    TurnFailed { stage: &'static str, error: String },
    CallEnded { reason: EndReason },
}
