//! In-process provider doubles and call harness for integration tests
//!
//! - `ScriptedSTT` returns queued transcripts in order
//! - `ScriptedLLM` answers "reply to: <last user message>"
//! - `ToneTTS` returns a fixed-length PCM16 tone
//! - `start_call` wires them into a `TurnOrchestrator` over channel transport

// Allow dead code in test infrastructure - not every test uses every helper
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use voice_agent_gateway::core::agent::{AgentConfig, PipelineDefinition};
use voice_agent_gateway::core::audio::AudioFrame;
use voice_agent_gateway::core::llm::{BaseLLM, LLMError, ReasoningRequest};
use voice_agent_gateway::core::session::{Channel, InMemorySessionStore, Session, SessionStore};
use voice_agent_gateway::core::stt::{BaseSTT, STTError, STTResult};
use voice_agent_gateway::core::tts::{AudioData, BaseTTS, TTSError};
use voice_agent_gateway::core::turn::{TurnError, TurnEvent, TurnOrchestrator, TurnPipeline};
use voice_agent_gateway::core::vad::SegmenterConfig;
use voice_agent_gateway::transport::{ChannelAudioSink, channel_source};

pub const SAMPLE_RATE: u32 = 16_000;
pub const FRAME_MS: u32 = 20;
pub const SAMPLES_PER_FRAME: usize = (SAMPLE_RATE * FRAME_MS / 1000) as usize;

/// Trailing silent frames that close an utterance in test agents
pub const SILENCE_FRAMES: u32 = 3;

// =============================================================================
// Audio
// =============================================================================

pub fn speech_frame() -> AudioFrame {
    AudioFrame::new(vec![2_000; SAMPLES_PER_FRAME], SAMPLE_RATE)
}

pub fn silent_frame() -> AudioFrame {
    AudioFrame::silence(SAMPLES_PER_FRAME, SAMPLE_RATE)
}

/// Frames for one complete utterance: `speech` loud frames then enough
/// silence to close it.
pub fn utterance_frames(speech: usize) -> Vec<AudioFrame> {
    let mut frames = vec![speech_frame(); speech];
    frames.extend(std::iter::repeat_n(silent_frame(), SILENCE_FRAMES as usize));
    frames
}

// =============================================================================
// Providers
// =============================================================================

/// Returns queued results in order, then repeats `default_transcript`.
pub struct ScriptedSTT {
    script: Mutex<VecDeque<Result<STTResult, STTError>>>,
    default_transcript: String,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedSTT {
    pub fn new(transcripts: &[&str]) -> Arc<Self> {
        Self::scripted(
            transcripts
                .iter()
                .map(|t| Ok(STTResult::new(*t, Some(0.95))))
                .collect(),
        )
    }

    pub fn scripted(script: Vec<Result<STTResult, STTError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            default_transcript: "hello".to_string(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn with_delay(transcripts: &[&str], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(
                transcripts
                    .iter()
                    .map(|t| Ok(STTResult::new(*t, Some(0.95))))
                    .collect(),
            ),
            default_transcript: "hello".to_string(),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BaseSTT for ScriptedSTT {
    async fn transcribe(&self, _audio: Bytes) -> Result<STTResult, STTError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| Ok(STTResult::new(self.default_transcript.clone(), Some(0.95))))
    }

    fn get_provider_info(&self) -> &'static str {
        "scripted-stt"
    }
}

/// Answers the last user message after an optional delay.
pub struct ScriptedLLM {
    delay: Duration,
    failure: Option<LLMError>,
    pub requests: Mutex<Vec<ReasoningRequest>>,
}

impl ScriptedLLM {
    pub fn new() -> Arc<Self> {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            failure: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: LLMError) -> Arc<Self> {
        Arc::new(Self {
            delay: Duration::ZERO,
            failure: Some(error),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl BaseLLM for ScriptedLLM {
    async fn complete(&self, request: &ReasoningRequest) -> Result<String, LLMError> {
        self.requests.lock().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(e) = &self.failure {
            return Err(e.clone());
        }
        let last = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(format!("reply to: {last}"))
    }

    fn model(&self) -> &str {
        "scripted"
    }

    fn get_provider_info(&self) -> &'static str {
        "scripted-llm"
    }
}

/// Synthesizes every reply into `duration_ms` of PCM16 tone.
pub struct ToneTTS {
    duration_ms: u32,
    pub texts: Mutex<Vec<String>>,
}

impl ToneTTS {
    pub fn new(duration_ms: u32) -> Arc<Self> {
        Arc::new(Self {
            duration_ms,
            texts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.texts.lock().len()
    }
}

#[async_trait]
impl BaseTTS for ToneTTS {
    async fn synthesize(&self, text: &str) -> Result<AudioData, TTSError> {
        self.texts.lock().push(text.to_string());
        let samples = (SAMPLE_RATE * self.duration_ms / 1000) as usize;
        let frame = AudioFrame::new(vec![1_000; samples], SAMPLE_RATE);
        Ok(AudioData::pcm16(frame.to_le_bytes(), SAMPLE_RATE))
    }

    fn get_provider_info(&self) -> &'static str {
        "tone-tts"
    }
}

// =============================================================================
// Call harness
// =============================================================================

/// Agent tuned for short test utterances.
pub fn test_agent() -> AgentConfig {
    AgentConfig {
        segmenter: SegmenterConfig {
            energy_threshold: 500.0,
            silence_run_threshold: SILENCE_FRAMES,
            frame_duration_ms: FRAME_MS,
        },
        max_duration_seconds: 0,
        end_after_silence_seconds: 0,
        ..Default::default()
    }
}

pub struct CallHarness {
    pub frames: mpsc::Sender<AudioFrame>,
    pub sink: ChannelAudioSink,
    pub store: Arc<InMemorySessionStore>,
    pub events: mpsc::Receiver<TurnEvent>,
    pub shutdown: CancellationToken,
    pub handle: JoinHandle<Result<Session, TurnError>>,
}

impl CallHarness {
    pub async fn send_utterance(&self, speech_frames: usize) {
        for frame in utterance_frames(speech_frames) {
            self.frames.send(frame).await.unwrap();
        }
    }

    /// Wait for the first event matching `pred`, returning every event seen
    /// up to and including it.
    pub async fn wait_for(&mut self, pred: impl Fn(&TurnEvent) -> bool) -> Vec<TurnEvent> {
        let mut seen = Vec::new();
        let result = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(event) = self.events.recv().await {
                let done = pred(&event);
                seen.push(event);
                if done {
                    return true;
                }
            }
            false
        })
        .await;
        assert!(
            matches!(result, Ok(true)),
            "expected event never arrived, saw {seen:?}"
        );
        seen
    }

    /// Hang up by dropping the inbound stream and return the final session.
    pub async fn hang_up(self) -> Session {
        drop(self.frames);
        self.handle.await.unwrap().unwrap()
    }
}

pub fn start_call(
    config: AgentConfig,
    stt: Arc<dyn BaseSTT>,
    llm: Arc<dyn BaseLLM>,
    tts: Arc<dyn BaseTTS>,
    sink: ChannelAudioSink,
) -> CallHarness {
    let definition = Arc::new(PipelineDefinition::compile("test-agent", &config).unwrap());
    let pipeline = Arc::new(
        TurnPipeline::new(definition, llm)
            .with_transcription(stt, None)
            .with_synthesis(tts),
    );
    let store = Arc::new(InMemorySessionStore::new());
    let session = Session::new("call-1", "test-agent", Channel::Voice);
    let (frames, source) = channel_source(256);
    let (events_tx, events) = mpsc::channel(256);
    let shutdown = CancellationToken::new();

    let orchestrator = TurnOrchestrator::new(
        session,
        store.clone() as Arc<dyn SessionStore>,
        pipeline,
        Box::new(source),
        Arc::new(sink.clone()),
    )
    .with_events(events_tx)
    .with_shutdown(shutdown.clone());

    CallHarness {
        frames,
        sink,
        store,
        events,
        shutdown,
        handle: tokio::spawn(orchestrator.run()),
    }
}
