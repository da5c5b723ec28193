//! Transport adapter
//!
//! The turn orchestrator only ever sees two narrow capabilities: an ordered
//! inbound frame source and a sequential outbound sink. The LiveKit adapter
//! implements both over a room connection; the channel transport implements
//! them over in-process channels for tests and local tooling.

pub mod channel;
pub mod codec;
pub mod livekit;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::core::audio::AudioFrame;
use crate::core::tts::AudioData;

pub use channel::{ChannelAudioSink, ChannelAudioSource, channel_source};
pub use codec::{decode_to_pcm, prepare_outbound, resample_linear};
pub use livekit::{LiveKitSettings, LiveKitTransport, mint_agent_token};

/// Transport failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Transport disconnected: {0}")]
    Disconnected(String),
    #[error("Transport I/O error: {0}")]
    Io(String),
    #[error("Unsupported audio encoding: {0}")]
    UnsupportedEncoding(String),
    #[error("Failed to decode audio: {0}")]
    Decode(String),
    #[error("Failed to mint access token: {0}")]
    Token(String),
}

impl TransportError {
    /// Whether the call cannot continue after this error.
    ///
    /// Decode failures only affect one reply; everything touching the
    /// connection itself ends the call.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::Disconnected(_) | Self::Io(_) | Self::Token(_)
        )
    }
}

/// How a playback request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Every frame was handed to the transport
    Completed,
    /// The cancellation token fired before the last frame
    Interrupted,
}

/// Ordered, non-seekable inbound audio.
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Next inbound frame, or `None` once the remote side has gone away.
    ///
    /// Must be cancel-safe: the orchestrator polls it inside `select!`.
    async fn next_frame(&mut self) -> Result<Option<AudioFrame>, TransportError>;

    /// Release the underlying connection. Idempotent.
    async fn close(&mut self);
}

/// Sequential outbound audio.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Decode, resample and write `audio` frame by frame until done or
    /// until `cancel` fires.
    async fn play(
        &self,
        audio: AudioData,
        cancel: &CancellationToken,
    ) -> Result<PlaybackOutcome, TransportError>;

    /// Drop anything buffered but not yet played.
    async fn clear(&self);

    /// Rate the sink expects its PCM at.
    fn sample_rate(&self) -> u32;
}
