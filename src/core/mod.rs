pub mod agent;
pub mod audio;
pub mod knowledge;
pub mod llm;
pub mod providers;
pub mod redaction;
pub mod session;
pub mod stt;
pub mod supervisor;
pub mod tts;
pub mod turn;
pub mod vad;

// Re-export commonly used types for convenience
pub use agent::{
    AgentConfig, AgentConfigSource, AgentError, AgentRuntimeCache, InMemoryAgentConfigSource,
    PipelineDefinition,
};

pub use audio::{AudioEncoding, AudioFrame};

pub use knowledge::{HttpKnowledgeRetriever, KnowledgeError, KnowledgeRetriever, NoopRetriever};

pub use llm::{BaseLLM, LLMError, LLMProvider, ReasoningRequest, create_llm_provider};

pub use providers::{ProviderCredentials, ProviderKey};

pub use redaction::{PiiClass, PiiRedactor};

pub use session::{
    Channel, InMemorySessionStore, Role, Session, SessionError, SessionStatus, SessionStore, Turn,
};

pub use stt::{BaseSTT, STTConfig, STTError, STTProvider, STTResult, create_stt_provider};

pub use supervisor::{CallInfo, CallSupervisor, SupervisorError};

pub use tts::{AudioData, BaseTTS, TTSConfig, TTSError, TTSProvider, create_tts_provider};

pub use turn::{
    EndReason, StageTimeouts, TurnError, TurnEvent, TurnOrchestrator, TurnPipeline, TurnState,
};

pub use vad::{SegmenterConfig, SpeechSegmenter, Utterance};
