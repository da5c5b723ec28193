//! Audio primitives shared by the segmenter, the providers and the transport.
//!
//! Everything inside the voice core is 16-bit signed little-endian PCM, mono.
//! Compressed formats only ever appear at the provider boundary and are
//! handled by the transport's outbound decoder.

use std::io::Cursor;

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

/// Default inbound sample rate requested from the media transport.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Default frame duration used when splitting PCM into transport frames.
pub const DEFAULT_FRAME_DURATION_MS: u32 = 10;

/// One fixed-duration block of mono PCM audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// Signed 16-bit samples
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Build a frame from little-endian PCM16 bytes. A trailing odd byte is ignored.
    pub fn from_le_bytes(data: &[u8], sample_rate: u32) -> Self {
        let samples = data
            .chunks_exact(2)
            .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
            .collect();
        Self::new(samples, sample_rate)
    }

    /// A frame of digital silence.
    pub fn silence(num_samples: usize, sample_rate: u32) -> Self {
        Self::new(vec![0; num_samples], sample_rate)
    }

    /// Mean absolute sample value on the 0..=32768 scale.
    ///
    /// This is the energy measure the speech segmenter compares against its
    /// configured threshold.
    pub fn average_amplitude(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: u64 = self
            .samples
            .iter()
            .map(|s| (*s as i32).unsigned_abs() as u64)
            .sum();
        sum as f32 / self.samples.len() as f32
    }

    /// Frame duration in milliseconds.
    pub fn duration_ms(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 * 1000.0 / self.sample_rate as f32
    }

    /// Append the frame as little-endian PCM16 to `buf`.
    pub fn write_le_bytes(&self, buf: &mut BytesMut) {
        buf.reserve(self.samples.len() * 2);
        for sample in &self.samples {
            buf.put_i16_le(*sample);
        }
    }

    pub fn to_le_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.samples.len() * 2);
        self.write_le_bytes(&mut buf);
        buf.freeze()
    }
}

/// Container/codec of an audio payload returned by a synthesis provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioEncoding {
    /// Raw signed 16-bit little-endian PCM, mono
    #[default]
    Pcm16,
    /// RIFF/WAVE container carrying integer PCM
    Wav,
    /// MPEG layer 3
    Mp3,
    /// Ogg/Opus
    Opus,
}

impl AudioEncoding {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pcm16 => "pcm16",
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Opus => "opus",
        }
    }

    /// Whether the transport can turn this encoding into PCM without a codec.
    pub fn is_pcm_compatible(&self) -> bool {
        matches!(self, Self::Pcm16 | Self::Wav)
    }
}

impl std::fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wrap raw PCM16 bytes in a WAV container.
///
/// Batch transcription APIs expect a file upload; the utterance buffer is
/// headerless PCM.
pub fn encode_wav(pcm: &[u8], sample_rate: u32, channels: u16) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(pcm.len() + 44));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for chunk in pcm.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Split PCM samples into frames of `frame_ms` milliseconds. The final frame
/// may be shorter.
pub fn split_into_frames(samples: &[i16], sample_rate: u32, frame_ms: u32) -> Vec<AudioFrame> {
    let samples_per_frame = ((sample_rate as u64 * frame_ms as u64) / 1000).max(1) as usize;
    samples
        .chunks(samples_per_frame)
        .map(|chunk| AudioFrame::new(chunk.to_vec(), sample_rate))
        .collect()
}
