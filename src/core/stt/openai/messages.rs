//! Response types for the OpenAI transcription API.

use serde::{Deserialize, Serialize};

/// Verbose transcription response (`verbose_json` format).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerboseTranscriptionResponse {
    /// The transcribed text (full transcript).
    pub text: String,

    /// The language of the audio (ISO-639-1 code).
    #[serde(default)]
    pub language: Option<String>,

    /// Duration of the audio in seconds.
    #[serde(default)]
    pub duration: Option<f64>,

    /// Segment-level details.
    #[serde(default)]
    pub segments: Vec<TranscriptionSegment>,
}

/// A segment of transcribed audio.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscriptionSegment {
    pub id: i32,
    pub start: f64,
    pub end: f64,
    pub text: String,

    /// Average log probability of the segment tokens.
    #[serde(default)]
    pub avg_logprob: Option<f64>,

    /// Probability that the segment contains no speech.
    #[serde(default)]
    pub no_speech_prob: Option<f64>,
}

/// OpenAI API error response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAIErrorResponse {
    pub error: OpenAIError,
}

/// OpenAI API error details.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAIError {
    pub message: String,

    #[serde(rename = "type")]
    pub error_type: String,

    #[serde(default)]
    pub code: Option<String>,
}

impl VerboseTranscriptionResponse {
    /// Confidence derived from the segments' average log probability.
    ///
    /// `avg_logprob` sits in roughly [-1, 0] for usable transcriptions and is
    /// mapped linearly onto [0, 1]. Returns `None` when no segment reports one.
    pub fn confidence(&self) -> Option<f32> {
        let (sum, count) = self
            .segments
            .iter()
            .filter_map(|seg| seg.avg_logprob)
            .fold((0.0, 0usize), |(sum, count), p| (sum + p, count + 1));

        if count == 0 {
            return None;
        }
        let avg = sum / count as f64;
        Some((avg + 1.0).clamp(0.0, 1.0) as f32)
    }
}
