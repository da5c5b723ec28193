//! Energy-based speech segmenter
//!
//! Folds a stream of fixed-duration PCM frames into complete utterances.
//! Leading silence is never buffered; trailing silence up to the configured
//! run length is part of the utterance. Duration filtering is deliberately
//! left to the transcription stage.

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace};

use super::config::SegmenterConfig;
use crate::core::audio::AudioFrame;

/// A completed span of user speech, handed to the turn orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    /// Concatenated PCM16 little-endian audio
    pub audio: Bytes,
    /// Number of frames in the utterance (speech plus trailing silence)
    pub frame_count: usize,
    /// Sample rate of the contained audio
    pub sample_rate: u32,
}

impl Utterance {
    /// Duration of the utterance in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.audio.len() as u64 / 2) * 1000 / self.sample_rate as u64
    }

    pub fn is_empty(&self) -> bool {
        self.audio.is_empty()
    }
}

/// Speech segmenter state machine
///
/// Holds exactly three pieces of mutable state: whether speech is in
/// progress, the current trailing silence run, and the utterance buffer.
#[derive(Debug)]
pub struct SpeechSegmenter {
    config: SegmenterConfig,
    is_speaking: bool,
    silence_run_length: u32,
    buffer: BytesMut,
    frame_count: usize,
    sample_rate: u32,
}

impl SpeechSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            config,
            is_speaking: false,
            silence_run_length: 0,
            buffer: BytesMut::new(),
            frame_count: 0,
            sample_rate: 0,
        }
    }

    /// Feed one frame; returns a completed utterance when the trailing
    /// silence run reaches `silence_run_threshold`.
    pub fn feed(&mut self, frame: &AudioFrame) -> Option<Utterance> {
        let energy = frame.average_amplitude();

        if energy > self.config.energy_threshold {
            if !self.is_speaking {
                debug!(energy, "Speech onset detected");
                self.sample_rate = frame.sample_rate;
            }
            self.is_speaking = true;
            self.silence_run_length = 0;
            self.append(frame);
            return None;
        }

        if !self.is_speaking {
            trace!(energy, "Dropping leading silence frame");
            return None;
        }

        self.silence_run_length += 1;
        self.append(frame);

        if self.silence_run_length >= self.config.silence_run_threshold {
            let utterance = Utterance {
                audio: std::mem::take(&mut self.buffer).freeze(),
                frame_count: self.frame_count,
                sample_rate: self.sample_rate,
            };
            debug!(
                frames = utterance.frame_count,
                bytes = utterance.audio.len(),
                duration_ms = utterance.duration_ms(),
                "Utterance complete"
            );
            self.reset();
            return Some(utterance);
        }

        None
    }

    /// Whether an utterance is currently being accumulated
    pub fn is_speaking(&self) -> bool {
        self.is_speaking
    }

    /// Current trailing silence run, in frames
    pub fn silence_run_length(&self) -> u32 {
        self.silence_run_length
    }

    /// Bytes accumulated for the in-progress utterance
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Discard any partial utterance and return to the initial state
    pub fn reset(&mut self) {
        self.is_speaking = false;
        self.silence_run_length = 0;
        self.buffer = BytesMut::new();
        self.frame_count = 0;
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    fn append(&mut self, frame: &AudioFrame) {
        frame.write_le_bytes(&mut self.buffer);
        self.frame_count += 1;
    }
}
