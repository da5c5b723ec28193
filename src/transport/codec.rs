//! Outbound decode/resample stage.
//!
//! Synthesis providers return audio at their own rate and container; the
//! transport needs mono PCM16 at its source rate in fixed-size frames.

use std::io::Cursor;

use crate::core::audio::{AudioEncoding, AudioFrame, split_into_frames};
use crate::core::tts::AudioData;

use super::TransportError;

/// Decode a synthesis payload into mono PCM16 samples and their sample rate.
pub fn decode_to_pcm(audio: &AudioData) -> Result<(Vec<i16>, u32), TransportError> {
    match audio.encoding {
        AudioEncoding::Pcm16 => {
            let samples = audio
                .data
                .chunks_exact(2)
                .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
                .collect();
            Ok((samples, audio.sample_rate))
        }
        AudioEncoding::Wav => decode_wav(&audio.data),
        other => Err(TransportError::UnsupportedEncoding(other.to_string())),
    }
}

fn decode_wav(data: &[u8]) -> Result<(Vec<i16>, u32), TransportError> {
    let reader = hound::WavReader::new(Cursor::new(data))
        .map_err(|e| TransportError::Decode(e.to_string()))?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(TransportError::UnsupportedEncoding(format!(
            "wav {:?} {}-bit",
            spec.sample_format, spec.bits_per_sample
        )));
    }

    let interleaved = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TransportError::Decode(e.to_string()))?;

    let channels = spec.channels.max(1) as usize;
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|s| *s as i32).sum();
                (sum / frame.len() as i32) as i16
            })
            .collect()
    };
    Ok((samples, spec.sample_rate))
}

/// Linear-interpolation resampler. Returns the input unchanged when the
/// rates already match.
pub fn resample_linear(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return samples.to_vec();
    }

    let out_len = ((samples.len() as u64 * to_rate as u64) / from_rate as u64).max(1) as usize;
    let step = from_rate as f64 / to_rate as f64;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = (pos.floor() as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = pos - idx as f64;
            let value = samples[idx] as f64 * (1.0 - frac) + samples[next] as f64 * frac;
            value.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16
        })
        .collect()
}

/// Decode, resample to `target_rate` and split into `frame_ms` frames.
pub fn prepare_outbound(
    audio: &AudioData,
    target_rate: u32,
    frame_ms: u32,
) -> Result<Vec<AudioFrame>, TransportError> {
    let (samples, rate) = decode_to_pcm(audio)?;
    let samples = resample_linear(&samples, rate, target_rate);
    Ok(split_into_frames(&samples, target_rate, frame_ms))
}
