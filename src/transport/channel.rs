//! In-process transport over tokio channels.
//!
//! Used by the integration tests and anywhere audio is produced locally.
//! The sink keeps every frame it "played" so callers can assert on output.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::codec::prepare_outbound;
use super::{AudioSink, AudioSource, PlaybackOutcome, TransportError};
use crate::core::audio::{AudioFrame, DEFAULT_FRAME_DURATION_MS};
use crate::core::tts::AudioData;

/// Inbound half backed by an mpsc receiver. Dropping every sender ends the
/// stream.
pub struct ChannelAudioSource {
    rx: mpsc::Receiver<AudioFrame>,
}

/// Create a bounded inbound channel and its source.
pub fn channel_source(capacity: usize) -> (mpsc::Sender<AudioFrame>, ChannelAudioSource) {
    let (tx, rx) = mpsc::channel(capacity);
    (tx, ChannelAudioSource { rx })
}

#[async_trait]
impl AudioSource for ChannelAudioSource {
    async fn next_frame(&mut self) -> Result<Option<AudioFrame>, TransportError> {
        Ok(self.rx.recv().await)
    }

    async fn close(&mut self) {
        self.rx.close();
    }
}

/// Outbound half that records frames instead of sending them anywhere.
#[derive(Clone)]
pub struct ChannelAudioSink {
    sample_rate: u32,
    /// Sleep this long per frame to imitate real-time playback
    pacing: Option<Duration>,
    played: Arc<Mutex<Vec<AudioFrame>>>,
    clears: Arc<AtomicUsize>,
}

impl ChannelAudioSink {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            pacing: None,
            played: Arc::new(Mutex::new(Vec::new())),
            clears: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Play at real-time speed, one frame every `frame_duration`.
    pub fn with_pacing(mut self, frame_duration: Duration) -> Self {
        self.pacing = Some(frame_duration);
        self
    }

    /// Every frame written so far.
    pub fn played_frames(&self) -> Vec<AudioFrame> {
        self.played.lock().clone()
    }

    pub fn played_samples(&self) -> usize {
        self.played.lock().iter().map(|f| f.samples.len()).sum()
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioSink for ChannelAudioSink {
    async fn play(
        &self,
        audio: AudioData,
        cancel: &CancellationToken,
    ) -> Result<PlaybackOutcome, TransportError> {
        let frames = prepare_outbound(&audio, self.sample_rate, DEFAULT_FRAME_DURATION_MS)?;

        for frame in frames {
            if cancel.is_cancelled() {
                return Ok(PlaybackOutcome::Interrupted);
            }
            self.played.lock().push(frame);
            if let Some(pacing) = self.pacing {
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(PlaybackOutcome::Interrupted),
                    _ = tokio::time::sleep(pacing) => {}
                }
            }
        }
        Ok(PlaybackOutcome::Completed)
    }

    async fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_source_ends_when_senders_drop() {
        let (tx, mut source) = channel_source(4);
        tx.send(AudioFrame::silence(160, 16_000)).await.unwrap();
        drop(tx);

        assert!(source.next_frame().await.unwrap().is_some());
        assert!(source.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sink_records_frames() {
        let sink = ChannelAudioSink::new(16_000);
        let audio = AudioData::pcm16(AudioFrame::new(vec![7; 480], 16_000).to_le_bytes(), 16_000);

        let outcome = sink.play(audio, &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::Completed);
        assert_eq!(sink.played_frames().len(), 3);
        assert_eq!(sink.played_samples(), 480);
    }

    #[tokio::test]
    async fn test_sink_interrupted() {
        let sink = ChannelAudioSink::new(16_000).with_pacing(Duration::from_millis(10));
        let audio = AudioData::pcm16(
            AudioFrame::new(vec![7; 16_000], 16_000).to_le_bytes(),
            16_000,
        );
        let token = CancellationToken::new();

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(35)).await;
            cancel.cancel();
        });

        let outcome = sink.play(audio, &token).await.unwrap();
        assert_eq!(outcome, PlaybackOutcome::Interrupted);
        assert!(sink.played_frames().len() < 100);
    }
}
