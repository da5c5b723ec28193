//! Voice Activity Detection (VAD) module
//!
//! Energy-based speech segmentation for the per-call worker. The segmenter
//! is a pure fold over the inbound frame sequence: it never blocks and it
//! cannot fail, so it runs inline in the worker's frame-receive loop.
//!
//! # Example
//!
//! ```rust
//! use voice_agent_gateway::core::audio::AudioFrame;
//! use voice_agent_gateway::core::vad::{SegmenterConfig, SpeechSegmenter};
//!
//! let mut segmenter = SpeechSegmenter::new(SegmenterConfig {
//!     silence_run_threshold: 2,
//!     ..Default::default()
//! });
//!
//! assert!(segmenter.feed(&AudioFrame::new(vec![4000; 320], 16000)).is_none());
//! assert!(segmenter.feed(&AudioFrame::silence(320, 16000)).is_none());
//! let utterance = segmenter.feed(&AudioFrame::silence(320, 16000)).unwrap();
//! assert_eq!(utterance.frame_count, 3);
//! ```

pub mod config;
pub mod segmenter;

pub use config::SegmenterConfig;
pub use segmenter::{SpeechSegmenter, Utterance};
