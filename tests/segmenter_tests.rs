//! Integration tests for the energy-based speech segmenter

use voice_agent_gateway::core::audio::{AudioFrame, split_into_frames};
use voice_agent_gateway::core::vad::{SegmenterConfig, SpeechSegmenter};

const SAMPLE_RATE: u32 = 16_000;
const FRAME_MS: u32 = 20;

/// Generate a speech-like signal (two summed tones)
fn tone(duration_ms: u32, amplitude: f32) -> Vec<i16> {
    let samples = (SAMPLE_RATE * duration_ms / 1000) as usize;
    (0..samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            let signal = (2.0 * std::f32::consts::PI * 220.0 * t).sin() * 0.6
                + (2.0 * std::f32::consts::PI * 660.0 * t).sin() * 0.4;
            (signal * amplitude) as i16
        })
        .collect()
}

fn silence(duration_ms: u32) -> Vec<i16> {
    vec![0; (SAMPLE_RATE * duration_ms / 1000) as usize]
}

fn frames(samples: &[i16]) -> Vec<AudioFrame> {
    split_into_frames(samples, SAMPLE_RATE, FRAME_MS)
}

fn segment(config: SegmenterConfig, audio: &[i16]) -> Vec<u64> {
    let mut segmenter = SpeechSegmenter::new(config);
    frames(audio)
        .iter()
        .filter_map(|frame| segmenter.feed(frame))
        .map(|u| u.duration_ms())
        .collect()
}

#[test]
fn test_two_sentences_become_two_utterances() {
    let config = SegmenterConfig::with_silence_duration(500.0, 400, FRAME_MS);
    let mut audio = silence(300);
    audio.extend(tone(1_000, 8_000.0));
    audio.extend(silence(600));
    audio.extend(tone(500, 8_000.0));
    audio.extend(silence(600));

    let durations = segment(config, &audio);
    // speech plus the 400ms trailing silence, leading silence dropped
    assert_eq!(durations, vec![1_400, 900]);
}

#[test]
fn test_short_pause_does_not_split() {
    let config = SegmenterConfig::with_silence_duration(500.0, 400, FRAME_MS);
    let mut audio = tone(600, 8_000.0);
    audio.extend(silence(200));
    audio.extend(tone(600, 8_000.0));
    audio.extend(silence(400));

    assert_eq!(segment(config, &audio), vec![1_800]);
}

#[test]
fn test_quiet_line_needs_lower_threshold() {
    let mut audio = tone(800, 400.0);
    audio.extend(silence(500));

    let default = SegmenterConfig::with_silence_duration(500.0, 400, FRAME_MS);
    assert!(segment(default, &audio).is_empty());

    let sensitive = SegmenterConfig::with_silence_duration(100.0, 400, FRAME_MS);
    assert_eq!(segment(sensitive, &audio).len(), 1);
}

#[test]
fn test_unfinished_speech_is_held() {
    let config = SegmenterConfig::with_silence_duration(500.0, 400, FRAME_MS);
    let mut segmenter = SpeechSegmenter::new(config);
    let mut audio = tone(500, 8_000.0);
    audio.extend(silence(200));

    for frame in frames(&audio) {
        assert!(segmenter.feed(&frame).is_none());
    }
    assert!(segmenter.is_speaking());
    assert_eq!(segmenter.buffered_bytes(), 700 * 16 * 2);
}
