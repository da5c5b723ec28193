//! LiveKit room transport.
//!
//! The agent joins the call's room as `agent-{agent_id}`, publishes one
//! audio track for its replies and forwards every remote (non-agent) audio
//! track into the inbound frame channel at the requested sample rate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use livekit::options::TrackPublishOptions;
use livekit::track::{LocalAudioTrack, LocalTrack, RemoteTrack, TrackSource};
use livekit::webrtc::audio_frame::AudioFrame as RtcAudioFrame;
use livekit::webrtc::audio_source::native::NativeAudioSource;
use livekit::webrtc::audio_source::{AudioSourceOptions, RtcAudioSource};
use livekit::webrtc::audio_stream::native::NativeAudioStream;
use livekit::{Room, RoomEvent, RoomOptions};
use livekit_api::access_token::{AccessToken, VideoGrants};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::codec::prepare_outbound;
use super::{AudioSink, AudioSource, PlaybackOutcome, TransportError};
use crate::core::audio::{AudioFrame, DEFAULT_FRAME_DURATION_MS};
use crate::core::tts::AudioData;

/// Name of the track the agent speaks on
pub const AGENT_TRACK_NAME: &str = "agent-voice";

/// Participant identity prefix reserved for agents
pub const AGENT_IDENTITY_PREFIX: &str = "agent-";

/// Milliseconds of audio the native source may queue ahead of playback
const SOURCE_QUEUE_MS: u32 = 200;

const INBOUND_CHANNEL_CAPACITY: usize = 512;

/// Connection settings for the LiveKit server
#[derive(Debug, Clone)]
pub struct LiveKitSettings {
    pub url: String,
    pub api_key: String,
    pub api_secret: String,
    /// Rate inbound audio is requested at and outbound audio is resampled to
    pub sample_rate: u32,
}

/// Identity used by the agent in the room.
pub fn agent_identity(agent_id: &str) -> String {
    format!("{AGENT_IDENTITY_PREFIX}{agent_id}")
}

/// Mint a room-join token for the agent participant.
pub fn mint_agent_token(
    settings: &LiveKitSettings,
    room_name: &str,
    agent_id: &str,
) -> Result<String, TransportError> {
    let identity = agent_identity(agent_id);
    AccessToken::with_api_key(&settings.api_key, &settings.api_secret)
        .with_identity(&identity)
        .with_name(&identity)
        .with_grants(VideoGrants {
            room_join: true,
            room: room_name.to_string(),
            ..Default::default()
        })
        .to_jwt()
        .map_err(|e| TransportError::Token(e.to_string()))
}

/// Entry point for joining a room.
pub struct LiveKitTransport;

impl LiveKitTransport {
    /// Join `room_name`, publish the agent track and start forwarding remote
    /// audio.
    pub async fn connect(
        settings: &LiveKitSettings,
        room_name: &str,
        agent_id: &str,
    ) -> Result<(LiveKitAudioSource, LiveKitAudioSink), TransportError> {
        let token = mint_agent_token(settings, room_name, agent_id)?;

        let (room, events) = Room::connect(&settings.url, &token, RoomOptions::default())
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        let room = Arc::new(room);

        let source = NativeAudioSource::new(
            AudioSourceOptions::default(),
            settings.sample_rate,
            1,
            SOURCE_QUEUE_MS,
        );
        let track = LocalAudioTrack::create_audio_track(
            AGENT_TRACK_NAME,
            RtcAudioSource::Native(source.clone()),
        );
        room.local_participant()
            .publish_track(
                LocalTrack::Audio(track),
                TrackPublishOptions {
                    source: TrackSource::Microphone,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        info!(room = room_name, agent_id, "Joined LiveKit room");

        let (tx, rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        let shutdown = CancellationToken::new();
        let pump = tokio::spawn(pump_room_events(
            events,
            tx,
            settings.sample_rate,
            shutdown.clone(),
        ));

        let inbound = LiveKitAudioSource {
            rx,
            room: Some(Arc::clone(&room)),
            pump: Some(pump),
            shutdown,
        };
        let outbound = LiveKitAudioSink {
            source,
            sample_rate: settings.sample_rate,
            _room: room,
        };
        Ok((inbound, outbound))
    }
}

/// Forward remote audio tracks until the room disconnects. Dropping the
/// sender when this returns is what ends the inbound stream.
async fn pump_room_events(
    mut events: mpsc::UnboundedReceiver<RoomEvent>,
    tx: mpsc::Sender<AudioFrame>,
    sample_rate: u32,
    shutdown: CancellationToken,
) {
    let mut forwarders = JoinSet::new();

    loop {
        let event = tokio::select! {
            _ = shutdown.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        match event {
            RoomEvent::TrackSubscribed {
                track, participant, ..
            } => {
                let identity = participant.identity().0;
                if identity.starts_with(AGENT_IDENTITY_PREFIX) {
                    continue;
                }
                if let RemoteTrack::Audio(audio_track) = track {
                    debug!(participant = %identity, "Forwarding remote audio track");
                    let mut stream =
                        NativeAudioStream::new(audio_track.rtc_track(), sample_rate as i32, 1);
                    let tx = tx.clone();
                    forwarders.spawn(async move {
                        while let Some(frame) = stream.next().await {
                            if frame.data.is_empty() {
                                continue;
                            }
                            let frame = AudioFrame::new(frame.data.to_vec(), frame.sample_rate);
                            if tx.send(frame).await.is_err() {
                                break;
                            }
                        }
                    });
                }
            }
            RoomEvent::Disconnected { reason } => {
                warn!(reason = ?reason, "LiveKit room disconnected");
                break;
            }
            _ => {}
        }
    }

    forwarders.shutdown().await;
}

/// Inbound side of a LiveKit call
pub struct LiveKitAudioSource {
    rx: mpsc::Receiver<AudioFrame>,
    room: Option<Arc<Room>>,
    pump: Option<tokio::task::JoinHandle<()>>,
    shutdown: CancellationToken,
}

#[async_trait]
impl AudioSource for LiveKitAudioSource {
    async fn next_frame(&mut self) -> Result<Option<AudioFrame>, TransportError> {
        Ok(self.rx.recv().await)
    }

    async fn close(&mut self) {
        self.shutdown.cancel();
        self.rx.close();
        if let Some(pump) = self.pump.take() {
            if tokio::time::timeout(Duration::from_secs(2), pump).await.is_err() {
                warn!("Room event pump did not stop in time");
            }
        }
        if let Some(room) = self.room.take() {
            if let Err(e) = room.close().await {
                warn!(error = %e, "Failed to close LiveKit room");
            }
        }
    }
}

/// Outbound side of a LiveKit call
pub struct LiveKitAudioSink {
    source: NativeAudioSource,
    sample_rate: u32,
    _room: Arc<Room>,
}

#[async_trait]
impl AudioSink for LiveKitAudioSink {
    async fn play(
        &self,
        audio: AudioData,
        cancel: &CancellationToken,
    ) -> Result<PlaybackOutcome, TransportError> {
        let frames = prepare_outbound(&audio, self.sample_rate, DEFAULT_FRAME_DURATION_MS)?;

        for frame in frames {
            let rtc_frame = RtcAudioFrame {
                samples_per_channel: frame.samples.len() as u32,
                data: frame.samples.into(),
                sample_rate: self.sample_rate,
                num_channels: 1,
            };
            tokio::select! {
                _ = cancel.cancelled() => return Ok(PlaybackOutcome::Interrupted),
                result = self.source.capture_frame(&rtc_frame) => {
                    result.map_err(|e| TransportError::Io(e.to_string()))?;
                }
            }
        }
        Ok(PlaybackOutcome::Completed)
    }

    async fn clear(&self) {
        self.source.clear_buffer();
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
