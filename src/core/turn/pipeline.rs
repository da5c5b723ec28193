//! STT -> knowledge -> reasoning -> redaction -> TTS for a single turn.
//!
//! Every external call runs under its own timeout; an elapsed timeout is
//! mapped into the stage's error type so callers handle it exactly like a
//! provider error.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::error::TurnError;
use crate::core::agent::PipelineDefinition;
use crate::core::knowledge::{KnowledgeError, KnowledgeRetriever, NoopRetriever};
use crate::core::llm::{BaseLLM, ChatMessage, LLMError, ReasoningRequest};
use crate::core::providers::ProviderCredentials;
use crate::core::session::{Role, Session, SessionStore};
use crate::core::stt::{BaseSTT, STTError};
use crate::core::tts::{AudioData, BaseTTS, TTSError};

/// Session context key holding the snippets used for the latest reply
pub const KNOWLEDGE_CONTEXT_KEY: &str = "knowledge";

/// Synthesis attempts per reply (first try plus one retry)
const SYNTHESIS_ATTEMPTS: usize = 2;

/// Upper bound for each external call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTimeouts {
    pub transcription: Duration,
    pub synthesis: Duration,
    pub reasoning: Duration,
    pub knowledge: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            transcription: Duration::from_secs(5),
            synthesis: Duration::from_secs(5),
            reasoning: Duration::from_secs(15),
            knowledge: Duration::from_secs(3),
        }
    }
}

async fn timed<T, E>(
    limit: Duration,
    fut: impl Future<Output = Result<T, E>>,
    on_timeout: impl FnOnce(Duration) -> E,
) -> Result<T, E> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(limit)),
    }
}

/// Persist the user turn of a turn whose reasoning failed. A save failure
/// is only logged so the caller still sees the reasoning error.
async fn save_partial_turn(store: &dyn SessionStore, session: &Session) {
    if let Err(e) = store.save(session).await {
        warn!(
            session_key = %session.session_key,
            error = %e,
            "Failed to save user turn after reasoning failure"
        );
    }
}

/// Primary transcription provider with a single fallback attempt.
#[derive(Clone)]
pub struct TranscriptionStage {
    primary: Arc<dyn BaseSTT>,
    fallback: Option<Arc<dyn BaseSTT>>,
    min_confidence: Option<f32>,
}

impl TranscriptionStage {
    pub fn new(
        primary: Arc<dyn BaseSTT>,
        fallback: Option<Arc<dyn BaseSTT>>,
        min_confidence: Option<f32>,
    ) -> Self {
        Self {
            primary,
            fallback,
            min_confidence,
        }
    }

    /// Transcribe an utterance. Blank or low-confidence transcripts are
    /// failures; a provider error on the primary is retried once on the
    /// fallback.
    pub async fn transcribe(&self, audio: Bytes, timeout: Duration) -> Result<String, TurnError> {
        let result = match timed(
            timeout,
            self.primary.transcribe(audio.clone()),
            STTError::Timeout,
        )
        .await
        {
            Ok(result) => result,
            Err(primary_err) => match &self.fallback {
                Some(fallback) => {
                    warn!(
                        primary = self.primary.get_provider_info(),
                        fallback = fallback.get_provider_info(),
                        error = %primary_err,
                        "Primary transcription failed, trying fallback"
                    );
                    timed(timeout, fallback.transcribe(audio), STTError::Timeout).await?
                }
                None => return Err(primary_err.into()),
            },
        };

        if result.is_blank() {
            return Err(TurnError::EmptyTranscript);
        }
        if let (Some(minimum), Some(confidence)) = (self.min_confidence, result.confidence) {
            if confidence < minimum {
                return Err(TurnError::LowConfidence {
                    confidence,
                    minimum,
                });
            }
        }
        Ok(result.transcript.trim().to_string())
    }
}

/// The per-agent set of stage providers.
///
/// Built once per call from the cached `PipelineDefinition`; provider
/// selection never happens per turn.
pub struct TurnPipeline {
    definition: Arc<PipelineDefinition>,
    llm: Arc<dyn BaseLLM>,
    transcription: Option<TranscriptionStage>,
    tts: Option<Arc<dyn BaseTTS>>,
    retriever: Arc<dyn KnowledgeRetriever>,
    timeouts: StageTimeouts,
}

impl TurnPipeline {
    pub fn new(definition: Arc<PipelineDefinition>, llm: Arc<dyn BaseLLM>) -> Self {
        Self {
            definition,
            llm,
            transcription: None,
            tts: None,
            retriever: Arc::new(NoopRetriever),
            timeouts: StageTimeouts::default(),
        }
    }

    pub fn with_transcription(
        mut self,
        primary: Arc<dyn BaseSTT>,
        fallback: Option<Arc<dyn BaseSTT>>,
    ) -> Self {
        let min_confidence = self.definition.min_transcript_confidence;
        self.transcription = Some(TranscriptionStage::new(primary, fallback, min_confidence));
        self
    }

    pub fn with_synthesis(mut self, tts: Arc<dyn BaseTTS>) -> Self {
        self.tts = Some(tts);
        self
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn KnowledgeRetriever>) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn with_timeouts(mut self, timeouts: StageTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Build every provider the definition names. `voice` adds the STT and
    /// TTS stages; text sessions only need reasoning.
    pub fn from_definition(
        definition: Arc<PipelineDefinition>,
        credentials: &ProviderCredentials,
        retriever: Arc<dyn KnowledgeRetriever>,
        timeouts: StageTimeouts,
        sample_rate: u32,
        voice: bool,
    ) -> Result<Self, TurnError> {
        let llm = credentials.build_llm(&definition)?;
        let mut pipeline = Self::new(Arc::clone(&definition), llm)
            .with_retriever(retriever)
            .with_timeouts(timeouts);

        if voice {
            let primary = credentials.build_stt(definition.stt_primary, &definition, sample_rate)?;
            let fallback = match definition.stt_fallback {
                Some(provider) => match credentials.build_stt(provider, &definition, sample_rate) {
                    Ok(stt) => Some(stt),
                    Err(e) => {
                        warn!(
                            agent_id = %definition.agent_id,
                            provider = %provider,
                            error = %e,
                            "Fallback transcription provider unavailable"
                        );
                        None
                    }
                },
                None => None,
            };
            let tts = credentials.build_tts(&definition)?;
            pipeline = pipeline.with_transcription(primary, fallback).with_synthesis(tts);
        }
        Ok(pipeline)
    }

    pub fn definition(&self) -> &PipelineDefinition {
        &self.definition
    }

    pub fn timeouts(&self) -> StageTimeouts {
        self.timeouts
    }

    /// Transcribe one utterance with the configured providers.
    pub async fn transcribe(&self, audio: Bytes) -> Result<String, TurnError> {
        let stage = self.transcription.as_ref().ok_or_else(|| {
            TurnError::Transcription(STTError::ConfigurationError(
                "no transcription provider configured".to_string(),
            ))
        })?;

        let started = Instant::now();
        let transcript = stage
            .transcribe(audio, self.timeouts.transcription)
            .await?;
        debug!(
            latency_ms = started.elapsed().as_millis() as u64,
            chars = transcript.len(),
            "Utterance transcribed"
        );
        Ok(transcript)
    }

    /// Record `user_text`, produce the assistant reply, record and persist it.
    ///
    /// If reasoning fails the user turn is still persisted.
    pub async fn respond(
        &self,
        store: &dyn SessionStore,
        session: &mut Session,
        user_text: &str,
    ) -> Result<String, TurnError> {
        session.append_turn(Role::User, user_text)?;

        let knowledge = self.retrieve_knowledge(session, user_text).await;

        let request = ReasoningRequest {
            system_prompt: self.definition.system_prompt.clone(),
            messages: session.history().iter().map(ChatMessage::from).collect(),
            temperature: self.definition.temperature,
            max_tokens: self.definition.max_tokens,
            knowledge: knowledge.clone(),
        };

        let started = Instant::now();
        let reply = match timed(
            self.timeouts.reasoning,
            self.llm.complete(&request),
            LLMError::Timeout,
        )
        .await
        {
            Ok(reply) => reply,
            Err(e) => {
                save_partial_turn(store, session).await;
                return Err(e.into());
            }
        };
        if reply.trim().is_empty() {
            save_partial_turn(store, session).await;
            return Err(LLMError::EmptyResponse.into());
        }

        let reply = self.definition.redactor.redact(&reply).into_owned();
        session.append_turn(Role::Assistant, reply.as_str())?;

        if self.definition.has_knowledge() {
            let mut delta = Map::new();
            delta.insert(
                KNOWLEDGE_CONTEXT_KEY.to_string(),
                Value::Array(knowledge.into_iter().map(Value::String).collect()),
            );
            session.merge_context(delta);
        }

        store.save(session).await?;

        info!(
            session_key = %session.session_key,
            agent_id = %self.definition.agent_id,
            model = self.llm.model(),
            latency_ms = started.elapsed().as_millis() as u64,
            message_count = session.message_count(),
            "Turn completed"
        );
        Ok(reply)
    }

    async fn retrieve_knowledge(&self, session: &Session, query: &str) -> Vec<String> {
        let Some(stage) = &self.definition.knowledge else {
            return Vec::new();
        };

        let result = timed(
            self.timeouts.knowledge,
            self.retriever
                .retrieve(query, &stage.knowledge_base_ids, stage.top_k),
            KnowledgeError::Timeout,
        )
        .await;

        match result {
            Ok(mut snippets) => {
                snippets.truncate(stage.top_k);
                debug!(
                    session_key = %session.session_key,
                    snippets = snippets.len(),
                    "Knowledge retrieved"
                );
                snippets
            }
            Err(e) => {
                warn!(
                    session_key = %session.session_key,
                    error = %e,
                    "Knowledge retrieval failed, continuing without context"
                );
                Vec::new()
            }
        }
    }

    /// Synthesize a reply, retrying once. An empty payload counts as a
    /// failure.
    pub async fn synthesize(&self, text: &str) -> Result<AudioData, TurnError> {
        let tts = self.tts.as_ref().ok_or(TTSError::ProviderNotReady(
            "no synthesis provider configured".to_string(),
        ))?;

        let mut last_err = TTSError::ProviderError("synthesis not attempted".to_string());
        for attempt in 1..=SYNTHESIS_ATTEMPTS {
            let result = timed(
                self.timeouts.synthesis,
                tts.synthesize(text),
                TTSError::Timeout,
            )
            .await
            .and_then(|audio| {
                if audio.is_empty() {
                    Err(TTSError::ProviderError("provider returned no audio".to_string()))
                } else {
                    Ok(audio)
                }
            });

            match result {
                Ok(audio) => return Ok(audio),
                Err(e) => {
                    warn!(
                        provider = tts.get_provider_info(),
                        attempt,
                        error = %e,
                        "Synthesis attempt failed"
                    );
                    last_err = e;
                }
            }
        }
        Err(last_err.into())
    }
}
