//! Session and turn types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use time::OffsetDateTime;

/// Errors raised by session mutations and session persistence.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    /// The session has reached a terminal status
    #[error("Session {0} is closed")]
    Closed(String),

    /// No session exists for the key
    #[error("Session not found: {0}")]
    NotFound(String),

    /// The key is already bound to another agent
    #[error("Session {session_key} belongs to agent {agent_id}")]
    AgentMismatch { session_key: String, agent_id: String },

    /// Backing store failure
    #[error("Session storage error: {0}")]
    Storage(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel a session was opened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Text,
    #[default]
    Voice,
    Phone,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Text => write!(f, "text"),
            Channel::Voice => write!(f, "voice"),
            Channel::Phone => write!(f, "phone"),
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "chat" => Ok(Channel::Text),
            "voice" | "livekit_voice" => Ok(Channel::Voice),
            "phone" | "sip" => Ok(Channel::Phone),
            _ => Err(SessionError::Storage(format!(
                "Unsupported channel: {s}. Supported channels: text, voice, phone"
            ))),
        }
    }
}

/// Lifecycle status. `Ended` and `Timeout` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    Ended,
    Timeout,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Active)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Ended => write!(f, "ended"),
            SessionStatus::Timeout => write!(f, "timeout"),
        }
    }
}

/// One recorded history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Set once the synthesized reply finished playing. Always false for
    /// user turns, and for replies that were preempted or failed synthesis.
    #[serde(default)]
    pub spoken: bool,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: OffsetDateTime::now_utc(),
            spoken: false,
        }
    }
}

/// Durable per-call conversation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_key: String,
    pub agent_id: String,
    pub channel: Channel,
    pub status: SessionStatus,
    history: Vec<Turn>,
    /// Free-form scratch state carried between turns
    pub context: Map<String, Value>,
    message_count: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_activity_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub ended_at: Option<OffsetDateTime>,
}

impl Session {
    pub fn new(
        session_key: impl Into<String>,
        agent_id: impl Into<String>,
        channel: Channel,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            session_key: session_key.into(),
            agent_id: agent_id.into(),
            channel,
            status: SessionStatus::Active,
            history: Vec::new(),
            context: Map::new(),
            message_count: 0,
            started_at: now,
            last_activity_at: now,
            ended_at: None,
        }
    }

    /// Ordered turn history.
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Number of turns appended since creation, unaffected by truncation.
    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Append a turn and refresh the activity timestamp.
    pub fn append_turn(&mut self, role: Role, content: impl Into<String>) -> SessionResult<&Turn> {
        if self.status.is_terminal() {
            return Err(SessionError::Closed(self.session_key.clone()));
        }
        let turn = Turn::new(role, content);
        self.last_activity_at = turn.timestamp;
        self.history.push(turn);
        self.message_count += 1;
        Ok(&self.history[self.history.len() - 1])
    }

    /// Last turn, if any.
    pub fn last_turn(&self) -> Option<&Turn> {
        self.history.last()
    }

    /// Mark the most recent assistant turn as fully played back.
    ///
    /// Returns false when the last turn is not an assistant reply, which
    /// means a newer user turn has already superseded it.
    pub fn mark_last_reply_spoken(&mut self) -> bool {
        match self.history.last_mut() {
            Some(turn) if turn.role == Role::Assistant => {
                turn.spoken = true;
                true
            }
            _ => false,
        }
    }

    /// Merge stage-produced context deltas, overwriting existing keys.
    pub fn merge_context(&mut self, delta: Map<String, Value>) {
        for (key, value) in delta {
            self.context.insert(key, value);
        }
    }

    /// Administrative truncation: keep only the newest `keep` turns.
    pub fn truncate_history(&mut self, keep: usize) {
        let len = self.history.len();
        if len > keep {
            self.history.drain(..len - keep);
        }
    }

    /// `active -> ended`. Returns false if the session was already terminal.
    pub fn end(&mut self) -> bool {
        self.close(SessionStatus::Ended)
    }

    /// `active -> timeout`. Returns false if the session was already terminal.
    pub fn expire(&mut self) -> bool {
        self.close(SessionStatus::Timeout)
    }

    pub fn touch(&mut self) {
        self.last_activity_at = OffsetDateTime::now_utc();
    }

    fn close(&mut self, status: SessionStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        self.ended_at = Some(OffsetDateTime::now_utc());
        true
    }
}
