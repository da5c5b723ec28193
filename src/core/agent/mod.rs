//! Agent configuration and the per-agent runtime cache.

pub mod config;
pub mod runtime;
pub mod source;

pub use config::AgentConfig;
pub use runtime::{AgentRuntimeCache, KnowledgeStage, PipelineDefinition};
pub use source::{AgentConfigSource, AgentError, InMemoryAgentConfigSource};
