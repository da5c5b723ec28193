//! Per-call turn-taking worker.
//!
//! One `TurnOrchestrator` drives one call. It owns the session for the
//! lifetime of the call, runs the segmenter inline on every inbound frame
//! and keeps at most one turn task alive: either a processing task
//! (transcription + reasoning) or a speaking task (synthesis + playback).
//!
//! ```text
//! Idle -> Listening -> Processing -> Speaking -> Listening
//!             ^            |  ^          |
//!             +- failure --+  +- barge-in+
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::TurnError;
use super::events::{EndReason, TurnEvent};
use super::pipeline::TurnPipeline;
use super::state::TurnState;
use crate::core::audio::AudioFrame;
use crate::core::session::{Session, SessionError, SessionStore};
use crate::core::vad::{SpeechSegmenter, Utterance};
use crate::transport::{AudioSink, AudioSource, PlaybackOutcome};

/// Result of one processing task. The session travels with the task and
/// comes back here, so exactly one owner ever mutates it.
struct ProcessingOutput {
    session: Session,
    transcript: Option<String>,
    outcome: Result<String, TurnError>,
}

type SpeakingResult = Result<PlaybackOutcome, TurnError>;

async fn wait_task<T>(task: &mut Option<JoinHandle<T>>) -> Result<T, JoinError> {
    match task.as_mut() {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Synthesize and play one reply. Cancellation drops the synthesis request
/// if it is still in flight, otherwise stops playback between frames.
async fn speak(
    pipeline: Arc<TurnPipeline>,
    sink: Arc<dyn AudioSink>,
    reply: String,
    cancel: CancellationToken,
) -> SpeakingResult {
    let audio = tokio::select! {
        _ = cancel.cancelled() => return Ok(PlaybackOutcome::Interrupted),
        audio = pipeline.synthesize(&reply) => audio?,
    };
    Ok(sink.play(audio, &cancel).await?)
}

fn non_zero(duration: Duration) -> Option<Duration> {
    (!duration.is_zero()).then_some(duration)
}

pub struct TurnOrchestrator {
    session_key: String,
    session: Option<Session>,
    store: Arc<dyn SessionStore>,
    pipeline: Arc<TurnPipeline>,
    source: Box<dyn AudioSource>,
    sink: Arc<dyn AudioSink>,
    segmenter: SpeechSegmenter,

    state: TurnState,
    /// Utterances completed while a reply was still being produced
    pending: VecDeque<Utterance>,
    processing: Option<JoinHandle<ProcessingOutput>>,
    speaking: Option<JoinHandle<SpeakingResult>>,
    playback_cancel: CancellationToken,
    /// Last moment the caller spoke or the agent finished speaking
    last_activity: Instant,

    max_duration: Option<Duration>,
    end_after_silence: Option<Duration>,
    events: Option<mpsc::Sender<TurnEvent>>,
    shutdown: CancellationToken,
}

impl TurnOrchestrator {
    pub fn new(
        session: Session,
        store: Arc<dyn SessionStore>,
        pipeline: Arc<TurnPipeline>,
        source: Box<dyn AudioSource>,
        sink: Arc<dyn AudioSink>,
    ) -> Self {
        let definition = pipeline.definition();
        let segmenter = SpeechSegmenter::new(definition.segmenter.clone());
        let max_duration = non_zero(definition.max_duration);
        let end_after_silence = non_zero(definition.end_after_silence);

        Self {
            session_key: session.session_key.clone(),
            session: Some(session),
            store,
            pipeline,
            source,
            sink,
            segmenter,
            state: TurnState::Idle,
            pending: VecDeque::new(),
            processing: None,
            speaking: None,
            playback_cancel: CancellationToken::new(),
            last_activity: Instant::now(),
            max_duration,
            end_after_silence,
            events: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Publish progress events. Sends never block the worker; events are
    /// dropped when the receiver falls behind.
    pub fn with_events(mut self, events: mpsc::Sender<TurnEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Stop the call when `shutdown` is cancelled.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Drive the call until the transport ends, a limit is hit or shutdown
    /// is requested. Returns the final session, already ended and saved.
    pub async fn run(mut self) -> Result<Session, TurnError> {
        let call_deadline = self.max_duration.map(|d| Instant::now() + d);
        info!(session_key = %self.session_key, "Call started");
        self.transition(TurnState::Listening);

        let ended: Result<EndReason, TurnError> = loop {
            let silence_deadline = match (self.state, self.end_after_silence) {
                (TurnState::Listening, Some(limit)) => Some(self.last_activity + limit),
                _ => None,
            };

            let step = tokio::select! {
                _ = self.shutdown.cancelled() => break Ok(EndReason::Shutdown),
                _ = sleep_until_opt(call_deadline) => break Ok(EndReason::MaxDuration),
                _ = sleep_until_opt(silence_deadline) => break Ok(EndReason::Silence),
                frame = self.source.next_frame() => match frame {
                    Ok(Some(frame)) => self.on_frame(frame).await,
                    Ok(None) => break Ok(EndReason::Disconnected),
                    Err(e) => Err(TurnError::Transport(e)),
                },
                joined = wait_task(&mut self.processing) => {
                    self.processing = None;
                    self.on_processing_done(joined).await
                }
                joined = wait_task(&mut self.speaking) => {
                    self.speaking = None;
                    self.on_speaking_done(joined).await
                }
            };

            if let Err(e) = step {
                if e.is_fatal() {
                    break Err(e);
                }
                self.report_failure(&e);
                if matches!(e, TurnError::Session(SessionError::Closed(_))) {
                    break Ok(EndReason::SessionClosed);
                }
            }
        };

        let reason = match &ended {
            Ok(reason) => *reason,
            Err(_) => EndReason::TransportError,
        };
        let session = self.teardown(reason).await;

        match ended {
            Ok(_) => session,
            Err(e) => {
                error!(session_key = %self.session_key, error = %e, "Call failed");
                Err(e)
            }
        }
    }

    async fn on_frame(&mut self, frame: AudioFrame) -> Result<(), TurnError> {
        if frame.average_amplitude() > self.segmenter.config().energy_threshold {
            self.last_activity = Instant::now();
        }
        match self.segmenter.feed(&frame) {
            Some(utterance) => self.on_utterance(utterance).await,
            None => Ok(()),
        }
    }

    async fn on_utterance(&mut self, utterance: Utterance) -> Result<(), TurnError> {
        self.emit(TurnEvent::UtteranceReady {
            duration_ms: utterance.duration_ms(),
        });

        match self.state {
            TurnState::Idle | TurnState::Listening => self.start_processing(utterance),
            TurnState::Processing => {
                debug!(
                    session_key = %self.session_key,
                    queued = self.pending.len() + 1,
                    "Utterance queued behind in-flight turn"
                );
                self.pending.push_back(utterance);
                Ok(())
            }
            TurnState::Speaking => {
                info!(session_key = %self.session_key, "Barge-in, cancelling reply");
                self.emit(TurnEvent::BargeIn);
                self.stop_speaking().await;
                self.start_processing(utterance)
            }
        }
    }

    fn start_processing(&mut self, utterance: Utterance) -> Result<(), TurnError> {
        let mut session = self
            .session
            .take()
            .ok_or_else(|| TurnError::Internal("session already checked out".to_string()))?;
        let store = Arc::clone(&self.store);
        let pipeline = Arc::clone(&self.pipeline);

        self.processing = Some(tokio::spawn(async move {
            let (transcript, outcome) = match pipeline.transcribe(utterance.audio).await {
                Ok(text) => {
                    let outcome = pipeline.respond(store.as_ref(), &mut session, &text).await;
                    (Some(text), outcome)
                }
                Err(e) => (None, Err(e)),
            };
            ProcessingOutput {
                session,
                transcript,
                outcome,
            }
        }));
        self.transition(TurnState::Processing);
        Ok(())
    }

    async fn on_processing_done(
        &mut self,
        joined: Result<ProcessingOutput, JoinError>,
    ) -> Result<(), TurnError> {
        let output =
            joined.map_err(|e| TurnError::Internal(format!("processing task failed: {e}")))?;
        self.session = Some(output.session);
        if let Some(text) = output.transcript {
            self.emit(TurnEvent::Transcript { text });
        }

        let result = match output.outcome {
            Ok(reply) => {
                self.emit(TurnEvent::Reply {
                    text: reply.clone(),
                });
                if let Some(next) = self.pending.pop_front() {
                    // newer speech already waiting: the reply is never spoken
                    self.emit(TurnEvent::ReplyPreempted);
                    return self.start_processing(next);
                }
                self.start_speaking(reply);
                return Ok(());
            }
            Err(e) => Err(e),
        };

        match self.pending.pop_front() {
            Some(next) => self.start_processing(next)?,
            None => self.transition(TurnState::Listening),
        }
        result
    }

    fn start_speaking(&mut self, reply: String) {
        let cancel = CancellationToken::new();
        self.playback_cancel = cancel.clone();
        let pipeline = Arc::clone(&self.pipeline);
        let sink = Arc::clone(&self.sink);

        self.speaking = Some(tokio::spawn(speak(pipeline, sink, reply, cancel)));
        self.transition(TurnState::Speaking);
    }

    /// Cancel synthesis/playback and wait until the speaking task is gone.
    async fn stop_speaking(&mut self) {
        self.playback_cancel.cancel();
        if let Some(handle) = self.speaking.take() {
            match handle.await {
                Ok(Ok(outcome)) => debug!(?outcome, "Speaking task stopped"),
                Ok(Err(e)) => debug!(error = %e, "Speaking task ended with error"),
                Err(e) => warn!(error = %e, "Speaking task panicked"),
            }
        }
        self.sink.clear().await;
    }

    async fn on_speaking_done(
        &mut self,
        joined: Result<SpeakingResult, JoinError>,
    ) -> Result<(), TurnError> {
        let outcome =
            joined.map_err(|e| TurnError::Internal(format!("speaking task failed: {e}")))?;
        self.last_activity = Instant::now();

        let result = match outcome {
            Ok(PlaybackOutcome::Completed) => {
                self.emit(TurnEvent::PlaybackCompleted);
                if let Some(session) = self.session.as_mut() {
                    if session.mark_last_reply_spoken() {
                        if let Err(e) = self.store.save(session).await {
                            warn!(session_key = %self.session_key, error = %e, "Failed to save session");
                        }
                    }
                }
                Ok(())
            }
            Ok(PlaybackOutcome::Interrupted) => Ok(()),
            Err(e) => Err(e),
        };

        self.transition(TurnState::Listening);
        result
    }

    async fn teardown(&mut self, reason: EndReason) -> Result<Session, TurnError> {
        self.playback_cancel.cancel();
        if let Some(handle) = self.speaking.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.processing.take() {
            match handle.await {
                Ok(output) => self.session = Some(output.session),
                Err(e) => warn!(session_key = %self.session_key, error = %e, "Processing task lost"),
            }
        }
        self.source.close().await;

        let mut session = match self.session.take() {
            Some(session) => session,
            None => self.load_stored().await?,
        };
        if session.end() {
            match self.store.save(&session).await {
                Ok(()) => {}
                // closed elsewhere; the stored status wins
                Err(SessionError::Closed(_)) => session = self.load_stored().await?,
                Err(e) => return Err(e.into()),
            }
        }

        self.state = TurnState::Idle;
        self.emit(TurnEvent::CallEnded { reason });
        info!(
            session_key = %self.session_key,
            ?reason,
            message_count = session.message_count(),
            "Call ended"
        );
        Ok(session)
    }

    async fn load_stored(&self) -> Result<Session, TurnError> {
        self.store
            .load(&self.session_key)
            .await?
            .ok_or_else(|| TurnError::Internal("session lost during teardown".to_string()))
    }

    fn transition(&mut self, to: TurnState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        if to == TurnState::Listening {
            self.last_activity = Instant::now();
        }
        debug!(session_key = %self.session_key, %from, %to, "Turn state changed");
        self.emit(TurnEvent::StateChanged { from, to });
    }

    fn report_failure(&self, e: &TurnError) {
        warn!(
            session_key = %self.session_key,
            stage = e.stage(),
            error = %e,
            "Turn failed"
        );
        self.emit(TurnEvent::TurnFailed {
            stage: e.stage(),
            error: e.to_string(),
        });
    }

    fn emit(&self, event: TurnEvent) {
        if let Some(events) = &self.events {
            let _ = events.try_send(event);
        }
    }
}
