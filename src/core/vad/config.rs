//! Speech segmenter configuration types

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Configuration for energy-based speech segmentation
///
/// Both thresholds are tunable per agent so that a noisy phone line and a
/// quiet browser microphone can share the same segmenter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Mean absolute amplitude (0 - 32768) above which a frame counts as speech
    pub energy_threshold: f32,

    /// Number of consecutive silent frames that closes an utterance
    pub silence_run_threshold: u32,

    /// Expected duration of one inbound frame (ms)
    /// Only used to convert millisecond settings into frame counts
    pub frame_duration_ms: u32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 500.0,
            // 800ms of trailing silence at 20ms frames
            silence_run_threshold: 40,
            frame_duration_ms: 20,
        }
    }
}

impl SegmenterConfig {
    /// Create a new SegmenterConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from a trailing-silence duration instead of a frame count
    pub fn with_silence_duration(
        energy_threshold: f32,
        silence_ms: u32,
        frame_duration_ms: u32,
    ) -> Self {
        let config = Self {
            energy_threshold,
            silence_run_threshold: 0,
            frame_duration_ms,
        };
        Self {
            silence_run_threshold: config.frames_for_duration(silence_ms).max(1) as u32,
            ..config
        }
    }

    /// Calculate number of frames for a given duration in milliseconds
    pub fn frames_for_duration(&self, duration_ms: u32) -> usize {
        if self.frame_duration_ms == 0 {
            return 0;
        }
        (duration_ms as f32 / self.frame_duration_ms as f32).ceil() as usize
    }

    /// Trailing silence (ms) needed before an utterance is emitted
    pub fn silence_duration_ms(&self) -> u32 {
        self.silence_run_threshold * self.frame_duration_ms
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.energy_threshold.is_finite() || self.energy_threshold < 0.0 {
            anyhow::bail!("energy_threshold must be a non-negative number");
        }
        if self.energy_threshold > 32768.0 {
            anyhow::bail!("energy_threshold cannot exceed the 16-bit amplitude range");
        }
        if self.silence_run_threshold == 0 {
            anyhow::bail!("silence_run_threshold must be greater than 0");
        }
        if self.frame_duration_ms == 0 {
            anyhow::bail!("frame_duration_ms must be greater than 0");
        }
        Ok(())
    }
}
