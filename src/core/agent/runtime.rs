//! Compiled per-agent pipeline definitions and their cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::config::AgentConfig;
use super::source::{AgentConfigSource, AgentError};
use crate::core::llm::LLMProvider;
use crate::core::redaction::{PiiClass, PiiRedactor};
use crate::core::stt::STTProvider;
use crate::core::tts::TTSProvider;
use crate::core::vad::SegmenterConfig;

/// Knowledge retrieval stage settings
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeStage {
    pub knowledge_base_ids: Vec<String>,
    pub top_k: usize,
}

/// Which stages run for an agent and which provider backs each one.
///
/// Provider tags are resolved here, once per compile, so a bad tag is
/// reported when the agent is loaded rather than mid-call.
#[derive(Debug, Clone)]
pub struct PipelineDefinition {
    pub agent_id: String,
    pub version: u64,

    pub llm_provider: LLMProvider,
    pub llm_model: String,
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,

    pub stt_primary: STTProvider,
    pub stt_fallback: Option<STTProvider>,
    pub language: String,
    pub min_transcript_confidence: Option<f32>,

    pub tts_provider: TTSProvider,
    pub voice_id: Option<String>,
    pub voice_model: Option<String>,
    pub voice_speed: f32,

    /// `None` when the agent has no knowledge bases attached
    pub knowledge: Option<KnowledgeStage>,
    pub redactor: PiiRedactor,

    pub segmenter: SegmenterConfig,
    pub max_duration: Duration,
    pub end_after_silence: Duration,
}

impl PipelineDefinition {
    pub fn compile(agent_id: &str, config: &AgentConfig) -> Result<Self, AgentError> {
        let invalid = |message: String| AgentError::InvalidConfiguration {
            agent_id: agent_id.to_string(),
            message,
        };

        let (llm_provider, llm_model) =
            LLMProvider::resolve(config.llm_provider.as_deref(), &config.llm_model);

        let stt_primary: STTProvider = config
            .stt_provider
            .parse()
            .map_err(|e| invalid(format!("{e}")))?;
        let stt_fallback = match config.stt_fallback_provider.as_deref() {
            Some(tag) if !tag.is_empty() => {
                let fallback: STTProvider = tag.parse().map_err(|e| invalid(format!("{e}")))?;
                (fallback != stt_primary).then_some(fallback)
            }
            _ => None,
        };

        let tts_provider: TTSProvider = config
            .voice_provider
            .parse()
            .map_err(|e| invalid(format!("{e}")))?;

        config
            .segmenter
            .validate()
            .map_err(|e| invalid(format!("{e}")))?;

        if let Some(min) = config.min_transcript_confidence {
            if !(0.0..=1.0).contains(&min) {
                return Err(invalid(format!(
                    "min_transcript_confidence must be within 0.0..=1.0, got {min}"
                )));
            }
        }

        let knowledge = (!config.knowledge_base_ids.is_empty()).then(|| KnowledgeStage {
            knowledge_base_ids: config.knowledge_base_ids.clone(),
            top_k: config.knowledge_top_k,
        });

        let redactor = if config.pii_redaction_enabled {
            let classes: Vec<PiiClass> = config
                .pii_redaction_list
                .iter()
                .filter_map(|name| match name.parse::<PiiClass>() {
                    Ok(class) => Some(class),
                    Err(e) => {
                        warn!(agent_id, error = %e, "Ignoring unknown PII class");
                        None
                    }
                })
                .collect();
            PiiRedactor::new(&classes)
        } else {
            PiiRedactor::disabled()
        };

        Ok(Self {
            agent_id: agent_id.to_string(),
            version: config.version,
            llm_provider,
            llm_model,
            system_prompt: config.system_prompt.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stt_primary,
            stt_fallback,
            language: config.language.clone(),
            min_transcript_confidence: config.min_transcript_confidence,
            tts_provider,
            voice_id: config.voice_id.clone(),
            voice_model: config.voice_model.clone(),
            voice_speed: config.voice_speed,
            knowledge,
            redactor,
            segmenter: config.segmenter.clone(),
            max_duration: Duration::from_secs(config.max_duration_seconds),
            end_after_silence: Duration::from_secs(config.end_after_silence_seconds),
        })
    }

    pub fn has_knowledge(&self) -> bool {
        self.knowledge.is_some()
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, Arc<PipelineDefinition>>,
    /// Loads currently compiling, per agent
    in_flight: HashMap<String, usize>,
    /// Bumped by an invalidate that races in-flight loads; a load only
    /// caches its result if the generation it started under is still
    /// current. Dropped once the agent has no loads in flight.
    generations: HashMap<String, u64>,
}

impl CacheState {
    fn generation(&self, agent_id: &str) -> u64 {
        self.generations.get(agent_id).copied().unwrap_or(0)
    }

    fn begin_load(&mut self, agent_id: &str) -> u64 {
        *self.in_flight.entry(agent_id.to_string()).or_insert(0) += 1;
        self.generation(agent_id)
    }

    fn end_load(&mut self, agent_id: &str) {
        if let Some(count) = self.in_flight.get_mut(agent_id) {
            *count -= 1;
            if *count == 0 {
                self.in_flight.remove(agent_id);
                self.generations.remove(agent_id);
            }
        }
    }
}

/// Deregisters an in-flight load on every exit path, including the caller
/// dropping the `load` future.
struct InFlightLoad<'a> {
    state: &'a RwLock<CacheState>,
    agent_id: &'a str,
}

impl Drop for InFlightLoad<'_> {
    fn drop(&mut self) {
        self.state.write().end_load(self.agent_id);
    }
}

/// Memoized `agent_id -> PipelineDefinition` map.
///
/// Reads take a shared lock; `invalidate` takes the write lock. Compilation
/// happens with no lock held, so a slow configuration source never blocks
/// other agents.
pub struct AgentRuntimeCache {
    source: Arc<dyn AgentConfigSource>,
    state: RwLock<CacheState>,
}

impl AgentRuntimeCache {
    pub fn new(source: Arc<dyn AgentConfigSource>) -> Self {
        Self {
            source,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Return the cached definition or build it from the current configuration.
    pub async fn load(&self, agent_id: &str) -> Result<Arc<PipelineDefinition>, AgentError> {
        if let Some(definition) = self.state.read().entries.get(agent_id) {
            return Ok(Arc::clone(definition));
        }

        let generation = {
            let mut state = self.state.write();
            if let Some(definition) = state.entries.get(agent_id) {
                return Ok(Arc::clone(definition));
            }
            state.begin_load(agent_id)
        };
        let _in_flight = InFlightLoad {
            state: &self.state,
            agent_id,
        };

        let config = self.source.fetch(agent_id).await?;
        let definition = Arc::new(PipelineDefinition::compile(agent_id, &config)?);

        let mut state = self.state.write();
        if state.generation(agent_id) != generation {
            // invalidated while compiling: serve this caller, cache nothing
            debug!(agent_id, "Agent invalidated during load, result not cached");
            return Ok(definition);
        }
        let cached = state
            .entries
            .entry(agent_id.to_string())
            .or_insert_with(|| Arc::clone(&definition));
        if Arc::ptr_eq(cached, &definition) {
            info!(
                agent_id,
                version = definition.version,
                llm = %definition.llm_provider,
                stt = %definition.stt_primary,
                tts = %definition.tts_provider,
                knowledge = definition.has_knowledge(),
                "Compiled agent pipeline"
            );
        }
        Ok(Arc::clone(cached))
    }

    /// Evict the entry for `agent_id`. Once this returns, no load that began
    /// earlier can repopulate the cache.
    pub fn invalidate(&self, agent_id: &str) {
        let mut state = self.state.write();
        state.entries.remove(agent_id);
        if state.in_flight.contains_key(agent_id) {
            *state.generations.entry(agent_id.to_string()).or_insert(0) += 1;
        }
        debug!(agent_id, "Agent runtime invalidated");
    }

    /// Agents with bookkeeping beyond a cached entry (in-flight loads or
    /// pending generations).
    pub fn tracked_loads(&self) -> usize {
        let state = self.state.read();
        state.in_flight.len().max(state.generations.len())
    }

    pub fn is_cached(&self, agent_id: &str) -> bool {
        self.state.read().entries.contains_key(agent_id)
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::agent::InMemoryAgentConfigSource;

    #[test]
    fn test_compile_defaults() {
        let def = PipelineDefinition::compile("a", &AgentConfig::default()).unwrap();
        assert_eq!(def.llm_provider, LLMProvider::OpenAI);
        assert_eq!(def.stt_primary, STTProvider::OpenAI);
        assert_eq!(def.stt_fallback, Some(STTProvider::Deepgram));
        assert_eq!(def.tts_provider, TTSProvider::ElevenLabs);
        assert!(!def.has_knowledge());
        assert!(!def.redactor.is_enabled());
        assert_eq!(def.max_duration, Duration::from_secs(1800));
    }

    #[test]
    fn test_compile_knowledge_and_redaction() {
        let config = AgentConfig {
            knowledge_base_ids: vec!["kb-1".into()],
            knowledge_top_k: 5,
            pii_redaction_enabled: true,
            pii_redaction_list: vec!["email".into(), "blood_type".into()],
            ..Default::default()
        };
        let def = PipelineDefinition::compile("a", &config).unwrap();
        assert_eq!(def.knowledge.as_ref().unwrap().top_k, 5);
        assert_eq!(def.redactor.classes(), &[PiiClass::Email]);
    }

    #[test]
    fn test_compile_redaction_list_ignored_when_disabled() {
        let config = AgentConfig {
            pii_redaction_enabled: false,
            pii_redaction_list: vec!["email".into()],
            ..Default::default()
        };
        let def = PipelineDefinition::compile("a", &config).unwrap();
        assert!(!def.redactor.is_enabled());
    }

    #[test]
    fn test_compile_drops_fallback_equal_to_primary() {
        let config = AgentConfig {
            stt_provider: "deepgram".into(),
            stt_fallback_provider: Some("deepgram".into()),
            ..Default::default()
        };
        let def = PipelineDefinition::compile("a", &config).unwrap();
        assert!(def.stt_fallback.is_none());
    }

    #[test]
    fn test_compile_rejects_unknown_provider() {
        let config = AgentConfig {
            voice_provider: "polly".into(),
            ..Default::default()
        };
        let err = PipelineDefinition::compile("a", &config).unwrap_err();
        assert!(matches!(err, AgentError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_compile_rejects_bad_confidence() {
        let config = AgentConfig {
            min_transcript_confidence: Some(1.5),
            ..Default::default()
        };
        assert!(PipelineDefinition::compile("a", &config).is_err());
    }

    #[tokio::test]
    async fn test_load_memoizes_and_invalidate_rebuilds() {
        let source = Arc::new(InMemoryAgentConfigSource::new());
        source.upsert("a", AgentConfig::default());
        let cache = AgentRuntimeCache::new(source.clone());

        let first = cache.load("a").await.unwrap();
        let second = cache.load("a").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        source.upsert(
            "a",
            AgentConfig {
                system_prompt: "updated".into(),
                ..Default::default()
            },
        );
        // still cached until invalidated
        assert_ne!(cache.load("a").await.unwrap().system_prompt, "updated");

        cache.invalidate("a");
        assert!(!cache.is_cached("a"));
        let rebuilt = cache.load("a").await.unwrap();
        assert_eq!(rebuilt.system_prompt, "updated");
        assert_eq!(rebuilt.version, 2);
    }

    #[tokio::test]
    async fn test_load_unknown_agent() {
        let cache = AgentRuntimeCache::new(Arc::new(InMemoryAgentConfigSource::new()));
        assert!(matches!(
            cache.load("ghost").await,
            Err(AgentError::NotFound(_))
        ));
        assert!(cache.is_empty());
        assert_eq!(cache.tracked_loads(), 0);
    }

    #[tokio::test]
    async fn test_invalidate_leaves_no_bookkeeping_at_rest() {
        let source = Arc::new(InMemoryAgentConfigSource::new());
        source.upsert("a", AgentConfig::default());
        let cache = AgentRuntimeCache::new(source);

        for i in 0..100 {
            cache.invalidate(&format!("ghost-{i}"));
        }
        cache.load("a").await.unwrap();
        cache.invalidate("a");
        assert_eq!(cache.tracked_loads(), 0);

        cache.load("a").await.unwrap();
        assert!(cache.is_cached("a"));
        assert_eq!(cache.tracked_loads(), 0);
    }
}
