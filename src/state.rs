use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ServerConfig;
use crate::core::agent::{AgentRuntimeCache, InMemoryAgentConfigSource};
use crate::core::knowledge::{HttpKnowledgeRetriever, KnowledgeRetriever, NoopRetriever};
use crate::core::providers::ProviderCredentials;
use crate::core::session::{InMemorySessionStore, SessionLocks, SessionStore};
use crate::core::supervisor::CallSupervisor;

/// Application state shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    pub sessions: Arc<dyn SessionStore>,
    /// Serializes request-driven turns and call start-up per session key
    pub session_locks: SessionLocks,
    pub agents: Arc<InMemoryAgentConfigSource>,
    pub runtime_cache: Arc<AgentRuntimeCache>,
    pub supervisor: CallSupervisor,
    pub credentials: ProviderCredentials,
    pub retriever: Arc<dyn KnowledgeRetriever>,
    /// Cancelled on process shutdown; background tasks hang off it
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Build state from configuration, seeding agents from `agents_file`.
    pub async fn new(config: ServerConfig) -> anyhow::Result<Arc<Self>> {
        let agents = match &config.agents_file {
            Some(path) => InMemoryAgentConfigSource::from_yaml_file(path)?,
            None => InMemoryAgentConfigSource::new(),
        };

        let retriever: Arc<dyn KnowledgeRetriever> = match &config.knowledge_url {
            Some(url) => {
                info!(url = %url, "Knowledge retrieval enabled");
                Arc::new(
                    HttpKnowledgeRetriever::new(url.clone())
                        .context("Failed to build knowledge client")?,
                )
            }
            None => Arc::new(NoopRetriever),
        };

        Ok(Self::with_parts(
            config,
            Arc::new(InMemorySessionStore::new()),
            Arc::new(agents),
            retriever,
        ))
    }

    /// Assemble state from explicit parts.
    pub fn with_parts(
        config: ServerConfig,
        sessions: Arc<dyn SessionStore>,
        agents: Arc<InMemoryAgentConfigSource>,
        retriever: Arc<dyn KnowledgeRetriever>,
    ) -> Arc<Self> {
        let credentials = config.provider_credentials();
        let runtime_cache = Arc::new(AgentRuntimeCache::new(agents.clone()));

        Arc::new(Self {
            config,
            sessions,
            session_locks: SessionLocks::new(),
            agents,
            runtime_cache,
            supervisor: CallSupervisor::new(),
            credentials,
            retriever,
            shutdown: CancellationToken::new(),
        })
    }
}
