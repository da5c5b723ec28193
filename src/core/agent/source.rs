//! Where agent configurations come from.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tracing::info;

use super::config::AgentConfig;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AgentError {
    #[error("Agent not found: {0}")]
    NotFound(String),

    #[error("Invalid agent configuration for {agent_id}: {message}")]
    InvalidConfiguration { agent_id: String, message: String },

    #[error("Agent configuration source error: {0}")]
    Source(String),
}

/// Read access to the agent configuration store.
#[async_trait]
pub trait AgentConfigSource: Send + Sync {
    /// Fetch the current configuration for `agent_id`.
    async fn fetch(&self, agent_id: &str) -> Result<AgentConfig, AgentError>;
}

/// Process-local configuration store.
#[derive(Debug, Default)]
pub struct InMemoryAgentConfigSource {
    agents: DashMap<String, AgentConfig>,
}

impl InMemoryAgentConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from a YAML map of `agent_id -> AgentConfig`.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read agents file {}: {e}", path.display()))?;
        let agents: HashMap<String, AgentConfig> = serde_yaml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse agents file {}: {e}", path.display()))?;

        let source = Self::new();
        for (agent_id, config) in agents {
            config.segmenter.validate().map_err(|e| {
                anyhow::anyhow!("Agent {agent_id} has an invalid segmenter config: {e}")
            })?;
            source.agents.insert(agent_id, config);
        }
        info!(count = source.len(), path = %path.display(), "Loaded agent configurations");
        Ok(source)
    }

    /// Insert or replace a configuration, assigning the next version number.
    pub fn upsert(&self, agent_id: &str, mut config: AgentConfig) -> AgentConfig {
        let mut entry = self
            .agents
            .entry(agent_id.to_string())
            .or_insert_with(AgentConfig::default);
        config.version = entry.version + 1;
        *entry = config.clone();
        config
    }

    pub fn remove(&self, agent_id: &str) -> Option<AgentConfig> {
        self.agents.remove(agent_id).map(|(_, config)| config)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[async_trait]
impl AgentConfigSource for InMemoryAgentConfigSource {
    async fn fetch(&self, agent_id: &str) -> Result<AgentConfig, AgentError> {
        self.agents
            .get(agent_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| AgentError::NotFound(agent_id.to_string()))
    }
}
